//! EnvSentinel Core Library
//!
//! This library provides the reconciliation engine for tracked secret files:
//! the encrypted snapshot store, the filesystem reconciler, the directory
//! relocation resolver, and the capability gate for external tools.

pub mod config;
pub mod crypto;
pub mod discover;
pub mod features;
pub mod git;
pub mod platform;
pub mod relocate;
pub mod store;
pub mod sync;

pub use config::{Config, ScanConfig, SshKeyPair};
pub use crypto::{CryptoError, Keyring};
pub use features::{Feature, Features, MissingFeatureError};
pub use relocate::Resolver;
pub use store::{CloseMode, Store, TrackedFile};
pub use sync::{reconcile, SyncDirection, SyncError, SyncOutcome};

use std::path::PathBuf;
use thiserror::Error;

/// Result type for snapshot store operations
pub type Result<T> = std::result::Result<T, EnvSentinelError>;

/// General error type for snapshot store operations
#[derive(Error, Debug)]
pub enum EnvSentinelError {
    #[error("Crypto error: {0}")]
    Crypto(#[from] crypto::CryptoError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    MissingFeature(#[from] features::MissingFeatureError),

    #[error("No record found for path: {0}")]
    NotFound(String),

    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("Snapshot contains invalid data: {0}")]
    InvalidSnapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
