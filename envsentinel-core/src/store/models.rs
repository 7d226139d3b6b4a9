//! Record model for tracked files.

use crate::git::{self, ProvenanceSource};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

/// One protected file: its location, provenance, and last-known content.
///
/// `directory` is derived from `path` and cached for relocation lookups.
/// `content` and `content_hash` are only ever updated together, so the hash
/// always matches the stored bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    path: PathBuf,
    directory: PathBuf,
    remotes: BTreeSet<String>,
    content_hash: String,
    content: Vec<u8>,
}

impl TrackedFile {
    /// Build a record from the live filesystem: absolute path, current git
    /// remotes of the containing directory, current content.
    pub fn from_disk(path: &Path) -> io::Result<Self> {
        Self::from_disk_with(path, &git::GitCli)
    }

    /// [`TrackedFile::from_disk`] with an explicit provenance source.
    pub fn from_disk_with(path: &Path, provenance: &dyn ProvenanceSource) -> io::Result<Self> {
        let path = std::path::absolute(path)?;
        let directory = parent_dir(&path)?;
        let remotes = provenance.remotes(&directory);
        let content = std::fs::read(&path)?;
        let content_hash = digest(&content);

        Ok(Self {
            path,
            directory,
            remotes,
            content_hash,
            content,
        })
    }

    /// Rehydrate a record from persisted fields. `directory` is derived.
    pub(crate) fn from_parts(
        path: PathBuf,
        remotes: BTreeSet<String>,
        content_hash: String,
        content: Vec<u8>,
    ) -> io::Result<Self> {
        let directory = parent_dir(&path)?;

        Ok(Self {
            path,
            directory,
            remotes,
            content_hash,
            content,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn remotes(&self) -> &BTreeSet<String> {
        &self.remotes
    }

    /// Lowercase-hex SHA-256 of the stored content.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// True if any of `other` matches this record's stored provenance.
    pub fn shares_remote(&self, other: &BTreeSet<String>) -> bool {
        !self.remotes.is_disjoint(other)
    }

    /// Adopt new content. The hash is recomputed in the same step so the
    /// pair can never be observed out of sync.
    pub(crate) fn set_content(&mut self, content: Vec<u8>) {
        self.content_hash = digest(&content);
        self.content = content;
    }

    /// Move the record under `new_dir`, keeping the file name and refreshing
    /// provenance from the new location.
    pub(crate) fn relocate_to(
        &mut self,
        new_dir: &Path,
        provenance: &dyn ProvenanceSource,
    ) -> io::Result<()> {
        let name = self
            .path
            .file_name()
            .ok_or_else(|| io::Error::other("record path has no file name"))?;

        self.path = new_dir.join(name);
        self.directory = new_dir.to_path_buf();
        self.remotes = provenance.remotes(new_dir);
        Ok(())
    }
}

/// Lowercase-hex SHA-256 of `bytes`.
pub fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn parent_dir(path: &Path) -> io::Result<PathBuf> {
    path.parent().map(Path::to_path_buf).ok_or_else(|| {
        io::Error::other(format!(
            "path has no parent directory: {}",
            path.display()
        ))
    })
}
