//! Provenance enumeration: the remote URLs observed for a directory.

use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;

/// Source of remote-provenance identifiers for a directory.
///
/// Implementations may shell out, call a library, or consult an index; the
/// reconciler only needs the current set for intersection tests.
pub trait ProvenanceSource {
    fn remotes(&self, dir: &Path) -> BTreeSet<String>;
}

/// Enumerates provenance by running `git remote -v`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCli;

impl ProvenanceSource for GitCli {
    fn remotes(&self, dir: &Path) -> BTreeSet<String> {
        remotes(dir)
    }
}

/// Collect the remote URLs of the repository containing `dir`.
///
/// Returns an empty set when the directory is not a repository or git is
/// unavailable.
pub fn remotes(dir: &Path) -> BTreeSet<String> {
    let output = match Command::new("git")
        .args(["remote", "-v"])
        .current_dir(dir)
        .output()
    {
        Ok(output) if output.status.success() => output,
        _ => return BTreeSet::new(),
    };

    parse_remotes(&String::from_utf8_lossy(&output.stdout))
}

// `git remote -v` prints `<name>\t<url> (fetch|push)`; the URL is the
// provenance identifier. Fetch/push pairs collapse in the set.
fn parse_remotes(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_owned)
        .collect()
}
