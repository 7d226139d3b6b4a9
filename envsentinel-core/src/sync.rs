//! Tracked-file reconciliation: compare a record against the live
//! filesystem and resolve any drift according to a trust direction.

use crate::features::MissingFeatureError;
use crate::relocate::Resolver;
use crate::store::models::{digest, TrackedFile};
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Which side wins when stored content and filesystem content differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// The stored record is authoritative; the file is overwritten.
    TrustDatabase,
    /// The file is authoritative; the record is updated.
    TrustFilesystem,
}

/// How reconciliation changed the record and the filesystem.
///
/// The flags are independent: a relocation and a content change can happen
/// in the same pass. No flag set means nothing needed changing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// The record's directory and path were corrected after a relocation.
    pub dir_updated: bool,
    /// The filesystem was written to match the record.
    pub restored: bool,
    /// The record was updated to match the filesystem.
    pub backed_up: bool,
}

impl SyncOutcome {
    /// Nothing changed on either side.
    pub fn is_noop(&self) -> bool {
        !(self.dir_updated || self.restored || self.backed_up)
    }

    /// True when the caller must write the record back to the store.
    /// `restored` alone only touched the filesystem.
    pub fn requires_store_update(&self) -> bool {
        self.dir_updated || self.backed_up
    }
}

/// A single record's reconciliation failure. Reported per record; one
/// failure never aborts the rest of a batch.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("directory missing")]
    DirectoryMissing,

    #[error("multiple directories found")]
    AmbiguousRelocation(Vec<PathBuf>),

    #[error(transparent)]
    MissingFeature(#[from] MissingFeatureError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Reconcile `record` with the filesystem.
///
/// `resolver` enables directory relocation; without one a vanished
/// directory is an error. On success the outcome flags say which side was
/// mutated; the caller must persist the record to the store when
/// [`SyncOutcome::requires_store_update`] holds. An ambiguous relocation
/// never mutates the record.
pub fn reconcile(
    record: &mut TrackedFile,
    direction: SyncDirection,
    resolver: Option<&Resolver>,
) -> Result<SyncOutcome, SyncError> {
    let mut outcome = SyncOutcome::default();

    if !record.directory().is_dir() {
        let resolver = resolver.ok_or(SyncError::DirectoryMissing)?;
        let mut candidates = resolver.candidates(record)?;

        match candidates.len() {
            0 => return Err(SyncError::DirectoryMissing),
            1 => {
                let new_dir = candidates.remove(0);
                debug!(
                    from = %record.directory().display(),
                    to = %new_dir.display(),
                    "relocating record"
                );
                record.relocate_to(&new_dir, resolver.provenance())?;
                outcome.dir_updated = true;
            }
            _ => return Err(SyncError::AmbiguousRelocation(candidates)),
        }
    }

    if !record.path().exists() {
        // Absent at the (possibly relocated) path: recreate from the record.
        fs::write(record.path(), record.content())?;
        outcome.restored = true;
        return Ok(outcome);
    }

    let on_disk = fs::read(record.path())?;
    if digest(&on_disk) == record.content_hash() {
        return Ok(outcome);
    }

    match direction {
        SyncDirection::TrustFilesystem => {
            record.set_content(on_disk);
            outcome.backed_up = true;
        }
        SyncDirection::TrustDatabase => {
            fs::write(record.path(), record.content())?;
            outcome.restored = true;
        }
    }

    Ok(outcome)
}

impl TrackedFile {
    /// Write this record's content back to its path, overwriting any drift.
    /// Restoring into a relocated tree is not attempted.
    pub fn restore(&mut self) -> Result<SyncOutcome, SyncError> {
        reconcile(self, SyncDirection::TrustDatabase, None)
    }
}
