//! Candidate discovery through the external `fd` tool.

use crate::config::ScanConfig;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Source of candidate repository roots for relocation.
pub trait RepoRoots {
    fn roots(&self, scope: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Enumerates repository roots by asking `fd` for `.git` directories.
#[derive(Debug, Default, Clone, Copy)]
pub struct FdCli;

impl RepoRoots for FdCli {
    fn roots(&self, scope: &Path) -> io::Result<Vec<PathBuf>> {
        find_git_roots(scope)
    }
}

/// Files under `scope` matching the scan settings that are hidden from
/// version control.
///
/// Two `fd` passes: one including ignored files, one honoring ignore rules.
/// The candidates are the difference. A matching file that is *not* ignored
/// is committed (or committable) and therefore not a secret to adopt.
pub fn find_env_files(scan: &ScanConfig, scope: &Path) -> io::Result<Vec<PathBuf>> {
    let all = run_fd(scan, scope, true)?;
    let unignored: BTreeSet<PathBuf> = run_fd(scan, scope, false)?.into_iter().collect();

    Ok(all
        .into_iter()
        .filter(|path| !unignored.contains(path))
        .collect())
}

/// Directories containing a `.git` entry under `scope`.
pub fn find_git_roots(scope: &Path) -> io::Result<Vec<PathBuf>> {
    let output = Command::new("fd")
        .args([
            "--absolute-path",
            "--hidden",
            "--no-ignore",
            "--type",
            "d",
            "--glob",
            ".git",
        ])
        .arg(scope)
        .output()?;

    if !output.status.success() {
        return Err(fd_failure(&output));
    }

    Ok(parse_paths(&String::from_utf8_lossy(&output.stdout))
        .into_iter()
        .filter_map(|git_dir| git_dir.parent().map(Path::to_path_buf))
        .collect())
}

fn run_fd(scan: &ScanConfig, scope: &Path, include_ignored: bool) -> io::Result<Vec<PathBuf>> {
    let mut cmd = Command::new("fd");
    cmd.arg("--absolute-path")
        .arg("--hidden")
        .args(["--exclude", &scan.exclude])
        .arg(&scan.matcher);

    if include_ignored {
        cmd.arg("--no-ignore");
    }

    let output = cmd.arg(scope).output()?;
    if !output.status.success() {
        return Err(fd_failure(&output));
    }

    Ok(parse_paths(&String::from_utf8_lossy(&output.stdout)))
}

fn fd_failure(output: &std::process::Output) -> io::Error {
    io::Error::other(format!(
        "fd exited with {}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr).trim()
    ))
}

fn parse_paths(stdout: &str) -> Vec<PathBuf> {
    stdout
        .lines()
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paths_skips_blank_lines() {
        let paths = parse_paths("/a/.env\n\n/b/.env\n");
        assert_eq!(paths, vec![PathBuf::from("/a/.env"), PathBuf::from("/b/.env")]);
    }

    #[test]
    fn test_parse_paths_empty_output() {
        assert!(parse_paths("").is_empty());
    }
}
