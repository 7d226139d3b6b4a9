//! Snapshot store lifecycle: decrypt on open, mutate in memory, re-encrypt
//! on close only when something changed.

pub mod models;
mod schema;
#[cfg(test)]
mod tests;

pub use models::TrackedFile;

use crate::config::Config;
use crate::crypto::Keyring;
use crate::discover;
use crate::features::{Feature, Features};
use crate::platform;
use crate::relocate::Resolver;
use crate::sync::{self, SyncDirection, SyncError, SyncOutcome};
use crate::Result;
use schema::Database;
use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Whether `close` may persist the working copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseMode {
    /// Discard the working copy; the artifact is never touched.
    ReadOnly,
    /// Re-encrypt and replace the artifact if any record changed.
    Write,
}

/// The snapshot store: an exclusive in-memory working copy of every tracked
/// record, decrypted from (and re-encrypted to) a single artifact on disk.
///
/// Key material is built fresh from configuration for the open and for the
/// close; it is never held for the lifetime of the store.
pub struct Store {
    db: Database,
    config: Config,
    snapshot_path: PathBuf,
    features: OnceCell<Features>,
    /// Paths mutated since open; close persists only when non-empty.
    dirty: BTreeSet<PathBuf>,
    /// No artifact existed at open; the first write-mode close materializes
    /// one even with no records.
    fresh: bool,
}

impl Store {
    /// Open the store at the default snapshot location using the on-disk
    /// configuration.
    pub fn open() -> Result<Self> {
        let config = Config::load()?;
        Self::open_at(&platform::get_default_snapshot_path(), config)
    }

    /// Open the store against an explicit artifact path.
    pub fn open_at(snapshot_path: &Path, config: Config) -> Result<Self> {
        let db = Database::in_memory()?;
        let fresh = !snapshot_path.exists();

        if fresh {
            debug!(path = %snapshot_path.display(), "no snapshot artifact; starting empty");
        } else {
            let keyring = Keyring::from_keys(&config.keys)?;
            let artifact = fs::File::open(snapshot_path)?;

            let mut decrypted = tempfile::NamedTempFile::new()?;
            keyring.decrypt_stream(artifact, &mut decrypted)?;
            db.restore_from(decrypted.path())?;
            debug!(path = %snapshot_path.display(), "snapshot decrypted into working copy");
        }

        Ok(Self {
            db,
            config,
            snapshot_path: snapshot_path.to_path_buf(),
            features: OnceCell::new(),
            dirty: BTreeSet::new(),
            fresh,
        })
    }

    /// All tracked records. Ordering is not significant.
    pub fn list(&self) -> Result<Vec<TrackedFile>> {
        self.db.list()
    }

    /// The record tracked under `path`.
    pub fn fetch(&self, path: &Path) -> Result<TrackedFile> {
        self.db.fetch(path)
    }

    /// Insert or replace a record, keyed by its path.
    pub fn insert(&mut self, record: &TrackedFile) -> Result<()> {
        self.db.upsert(record)?;
        self.dirty.insert(record.path().to_path_buf());
        Ok(())
    }

    /// Remove the record tracked under `path`.
    pub fn delete(&mut self, path: &Path) -> Result<()> {
        self.db.delete(path)?;
        self.dirty.insert(path.to_path_buf());
        Ok(())
    }

    /// True if a write-mode close would persist the working copy.
    pub fn has_changes(&self) -> bool {
        self.fresh || !self.dirty.is_empty()
    }

    /// Release the working copy, re-encrypting it over the artifact when
    /// `mode` allows and something changed.
    pub fn close(self, mode: CloseMode) -> Result<()> {
        match mode {
            CloseMode::Write if self.has_changes() => self.persist(),
            _ => {
                debug!("snapshot unchanged or read-only close; working copy discarded");
                Ok(())
            }
        }
    }

    // Dump the working copy, encrypt it to every recipient, and atomically
    // replace the artifact (temp file + rename in the artifact's directory).
    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.snapshot_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let staging = tempfile::TempDir::new()?;
        let plain_path = staging.path().join("snapshot.db");
        self.db.dump_to(&plain_path)?;

        let keyring = Keyring::from_keys(&self.config.keys)?;
        let artifact_dir = self.snapshot_path.parent().unwrap_or(Path::new("."));
        let mut encrypted = tempfile::NamedTempFile::new_in(artifact_dir)?;

        let mut plain = fs::File::open(&plain_path)?;
        keyring.encrypt_stream(&mut plain, encrypted.as_file_mut())?;

        encrypted
            .persist(&self.snapshot_path)
            .map_err(|e| crate::EnvSentinelError::Io(e.error))?;

        info!(
            path = %self.snapshot_path.display(),
            changed = self.dirty.len(),
            "snapshot persisted"
        );
        Ok(())
    }

    /// Paths matching the scan settings that are not yet tracked.
    ///
    /// `scope` overrides the configured search scope.
    pub fn scan(&self, scope: Option<&Path>) -> Result<Vec<PathBuf>> {
        self.can_scan()?;

        let scope = match scope {
            Some(scope) => std::path::absolute(scope)?,
            None => self.config.search_path()?,
        };

        let candidates = discover::find_env_files(&self.config.scan, &scope)?;
        let tracked: BTreeSet<PathBuf> = self
            .list()?
            .into_iter()
            .map(|record| record.path().to_path_buf())
            .collect();

        Ok(candidates
            .into_iter()
            .filter(|path| !tracked.contains(path))
            .collect())
    }

    /// Errors unless the external tools scanning needs are installed.
    pub fn can_scan(&self) -> Result<()> {
        self.features().require(&[Feature::Fd])?;
        Ok(())
    }

    /// Capability set, probed once per store lifetime.
    pub fn features(&self) -> Features {
        *self.features.get_or_init(Features::detect)
    }

    /// Reconcile `record` against the filesystem, trusting the filesystem on
    /// content drift and relocating its directory if it moved.
    ///
    /// When the outcome says so (see [`Store::update_required`]) the caller
    /// must [`Store::insert`] the record to keep the snapshot current.
    pub fn sync_record(
        &self,
        record: &mut TrackedFile,
    ) -> std::result::Result<SyncOutcome, SyncError> {
        let resolver = self.resolver()?;
        sync::reconcile(record, SyncDirection::TrustFilesystem, Some(&resolver))
    }

    /// Candidate directories the resolver would consider for `record`, for
    /// diagnostic display.
    pub fn relocation_candidates(
        &self,
        record: &TrackedFile,
    ) -> std::result::Result<Vec<PathBuf>, SyncError> {
        self.resolver()?.candidates(record)
    }

    /// True when `outcome` must be written back via [`Store::insert`].
    pub fn update_required(&self, outcome: &SyncOutcome) -> bool {
        outcome.requires_store_update()
    }

    fn resolver(&self) -> std::result::Result<Resolver, SyncError> {
        let scope = self
            .config
            .search_path()
            .map_err(|e| SyncError::Io(io::Error::other(e.to_string())))?;

        Ok(Resolver::with_cli_tools(self.features(), scope))
    }
}
