//! Capability gate: which optional external tools are installed.
//!
//! Scanning and relocation shell out to `fd` and `git`. The gate reports
//! which of those are present so dependent operations can fail fast with a
//! precise error instead of a confusing subprocess failure.

use std::env;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// One external tool dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Git,
    Fd,
}

impl Feature {
    /// Executable name probed on `$PATH`.
    pub fn binary(self) -> &'static str {
        match self {
            Feature::Git => "git",
            Feature::Fd => "fd",
        }
    }

    pub const ALL: [Feature; 2] = [Feature::Git, Feature::Fd];
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// The set of external tools present on this system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Features {
    pub git: bool,
    pub fd: bool,
}

impl Features {
    /// Probe `$PATH` for each supported tool.
    pub fn detect() -> Self {
        Self {
            git: binary_on_path("git"),
            fd: binary_on_path("fd"),
        }
    }

    /// A set with every tool present.
    pub fn all() -> Self {
        Self { git: true, fd: true }
    }

    pub fn has(&self, feature: Feature) -> bool {
        match feature {
            Feature::Git => self.git,
            Feature::Fd => self.fd,
        }
    }

    /// Fails with the exact set of missing tools, or succeeds silently.
    pub fn require(&self, needed: &[Feature]) -> Result<(), MissingFeatureError> {
        let missing: Vec<Feature> = needed
            .iter()
            .copied()
            .filter(|feature| !self.has(*feature))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MissingFeatureError { missing })
        }
    }
}

/// A required external tool is not installed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("missing required tools: {}", format_missing(.missing))]
pub struct MissingFeatureError {
    pub missing: Vec<Feature>,
}

fn format_missing(missing: &[Feature]) -> String {
    missing
        .iter()
        .map(|feature| feature.binary())
        .collect::<Vec<_>>()
        .join(", ")
}

fn binary_on_path(name: &str) -> bool {
    let Some(paths) = env::var_os("PATH") else {
        return false;
    };

    env::split_paths(&paths).any(|dir| is_executable(&dir.join(name)))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_all_present() {
        let features = Features::all();
        assert!(features.require(&[Feature::Git, Feature::Fd]).is_ok());
    }

    #[test]
    fn test_require_reports_exactly_the_missing_tools() {
        let features = Features {
            git: true,
            fd: false,
        };

        let err = features.require(&[Feature::Git, Feature::Fd]).unwrap_err();
        assert_eq!(err.missing, vec![Feature::Fd]);
        assert_eq!(err.to_string(), "missing required tools: fd");
    }

    #[test]
    fn test_require_lists_every_missing_tool() {
        let features = Features::default();
        let err = features.require(&Feature::ALL).unwrap_err();
        assert_eq!(err.missing, vec![Feature::Git, Feature::Fd]);
        assert_eq!(err.to_string(), "missing required tools: git, fd");
    }

    #[test]
    fn test_require_nothing_always_passes() {
        assert!(Features::default().require(&[]).is_ok());
    }
}
