//! Directory relocation: find where a tracked file's repository moved to,
//! matching on shared provenance rather than on any path reference.

use crate::discover::{FdCli, RepoRoots};
use crate::features::{Feature, Features};
use crate::git::{GitCli, ProvenanceSource};
use crate::store::models::TrackedFile;
use crate::sync::SyncError;
use std::path::PathBuf;
use tracing::debug;

/// Resolves replacement directories for records whose directory vanished.
pub struct Resolver {
    features: Features,
    scope: PathBuf,
    roots: Box<dyn RepoRoots>,
    provenance: Box<dyn ProvenanceSource>,
}

impl Resolver {
    pub fn new(
        features: Features,
        scope: PathBuf,
        roots: Box<dyn RepoRoots>,
        provenance: Box<dyn ProvenanceSource>,
    ) -> Self {
        Self {
            features,
            scope,
            roots,
            provenance,
        }
    }

    /// Resolver backed by the external `fd` and `git` tools.
    pub fn with_cli_tools(features: Features, scope: PathBuf) -> Self {
        Self::new(features, scope, Box::new(FdCli), Box::new(GitCli))
    }

    /// Directories under the search scope whose current remotes intersect
    /// the record's stored provenance. Deduplicated, in no particular order.
    ///
    /// Both external tools are required, and checked before any enumeration
    /// so a missing tool cannot be mistaken for "no candidates".
    pub fn candidates(&self, record: &TrackedFile) -> Result<Vec<PathBuf>, SyncError> {
        self.features.require(&[Feature::Git, Feature::Fd])?;

        let mut matches = Vec::new();
        for root in self.roots.roots(&self.scope)? {
            if record.shares_remote(&self.provenance.remotes(&root)) && !matches.contains(&root) {
                matches.push(root);
            }
        }

        debug!(
            record = %record.path().display(),
            candidates = matches.len(),
            "relocation search finished"
        );
        Ok(matches)
    }

    pub(crate) fn provenance(&self) -> &dyn ProvenanceSource {
        self.provenance.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};
    use std::io;
    use std::path::Path;
    use tempfile::TempDir;

    struct StaticRoots(Vec<PathBuf>);

    impl RepoRoots for StaticRoots {
        fn roots(&self, _scope: &Path) -> io::Result<Vec<PathBuf>> {
            Ok(self.0.clone())
        }
    }

    struct StaticRemotes(BTreeMap<PathBuf, BTreeSet<String>>);

    impl ProvenanceSource for StaticRemotes {
        fn remotes(&self, dir: &Path) -> BTreeSet<String> {
            self.0.get(dir).cloned().unwrap_or_default()
        }
    }

    struct FixedRemotes(BTreeSet<String>);

    impl ProvenanceSource for FixedRemotes {
        fn remotes(&self, _dir: &Path) -> BTreeSet<String> {
            self.0.clone()
        }
    }

    fn remote_set(urls: &[&str]) -> BTreeSet<String> {
        urls.iter().map(|url| url.to_string()).collect()
    }

    fn record(remotes: &[&str]) -> (TrackedFile, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, b"A=1\n").unwrap();
        let record =
            TrackedFile::from_disk_with(&path, &FixedRemotes(remote_set(remotes))).unwrap();
        (record, dir)
    }

    #[test]
    fn test_candidates_match_on_intersection_not_equality() {
        let (record, _dir) = record(&["origin:repoA"]);

        let root = PathBuf::from("/roots/a");
        let resolver = Resolver::new(
            Features::all(),
            PathBuf::from("/roots"),
            Box::new(StaticRoots(vec![root.clone()])),
            Box::new(StaticRemotes(BTreeMap::from([(
                root.clone(),
                // The repo gained a remote since the record was written.
                remote_set(&["origin:repoA", "fork:repoA"]),
            )]))),
        );

        assert_eq!(resolver.candidates(&record).unwrap(), vec![root]);
    }

    #[test]
    fn test_candidates_excludes_unrelated_roots() {
        let (record, _dir) = record(&["origin:repoA"]);

        let matching = PathBuf::from("/roots/a");
        let unrelated = PathBuf::from("/roots/b");
        let resolver = Resolver::new(
            Features::all(),
            PathBuf::from("/roots"),
            Box::new(StaticRoots(vec![unrelated.clone(), matching.clone()])),
            Box::new(StaticRemotes(BTreeMap::from([
                (matching.clone(), remote_set(&["origin:repoA"])),
                (unrelated, remote_set(&["origin:repoB"])),
            ]))),
        );

        assert_eq!(resolver.candidates(&record).unwrap(), vec![matching]);
    }

    #[test]
    fn test_candidates_are_deduplicated() {
        let (record, _dir) = record(&["origin:repoA"]);

        let root = PathBuf::from("/roots/a");
        let resolver = Resolver::new(
            Features::all(),
            PathBuf::from("/roots"),
            Box::new(StaticRoots(vec![root.clone(), root.clone()])),
            Box::new(StaticRemotes(BTreeMap::from([(
                root.clone(),
                remote_set(&["origin:repoA"]),
            )]))),
        );

        assert_eq!(resolver.candidates(&record).unwrap(), vec![root]);
    }

    #[test]
    fn test_record_without_remotes_matches_nothing() {
        let (record, _dir) = record(&[]);

        let root = PathBuf::from("/roots/a");
        let resolver = Resolver::new(
            Features::all(),
            PathBuf::from("/roots"),
            Box::new(StaticRoots(vec![root.clone()])),
            Box::new(StaticRemotes(BTreeMap::from([(
                root,
                remote_set(&["origin:repoA"]),
            )]))),
        );

        assert!(resolver.candidates(&record).unwrap().is_empty());
    }

    #[test]
    fn test_missing_tools_reported_precisely() {
        let (record, _dir) = record(&["origin:repoA"]);

        let resolver = Resolver::new(
            Features {
                git: false,
                fd: true,
            },
            PathBuf::from("/roots"),
            Box::new(StaticRoots(Vec::new())),
            Box::new(FixedRemotes(BTreeSet::new())),
        );

        let err = resolver.candidates(&record).unwrap_err();
        match err {
            SyncError::MissingFeature(missing) => {
                assert_eq!(missing.to_string(), "missing required tools: git");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
