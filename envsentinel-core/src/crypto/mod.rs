//! Snapshot encryption built on age.
//!
//! The artifact is encrypted to one or more recipients; any single matching
//! identity can decrypt it. Key material is parsed from the key pairs
//! referenced in configuration and lives only for the duration of one open
//! or close operation. SSH keys (`~/.ssh/id_*`) and native age keys
//! (`AGE-SECRET-KEY-...` / `age1...`) are both accepted.

use crate::config::SshKeyPair;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while encrypting or decrypting the snapshot
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("no configured identity can decrypt the snapshot")]
    NoMatchingIdentity,

    #[error("no recipients configured to encrypt the snapshot to")]
    NoRecipients,

    #[error("unusable key {path}: {reason}")]
    UnusableKey { path: String, reason: String },

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Key material for one snapshot open or close cycle.
pub struct Keyring {
    identities: Vec<Box<dyn age::Identity>>,
    recipients: Vec<Box<dyn age::Recipient>>,
}

impl Keyring {
    /// Parse identities and recipients from the configured key pairs.
    pub fn from_keys(keys: &[SshKeyPair]) -> Result<Self> {
        let mut identities: Vec<Box<dyn age::Identity>> = Vec::with_capacity(keys.len());
        let mut recipients: Vec<Box<dyn age::Recipient>> = Vec::with_capacity(keys.len());

        for key in keys {
            identities.push(read_identity(&key.private)?);
            recipients.push(read_recipient(&key.public)?);
        }

        Ok(Self::new(identities, recipients))
    }

    /// Build a keyring from already-constructed key material.
    pub fn new(
        identities: Vec<Box<dyn age::Identity>>,
        recipients: Vec<Box<dyn age::Recipient>>,
    ) -> Self {
        Self {
            identities,
            recipients,
        }
    }

    /// Encrypt `reader` to every recipient, writing the age stream to
    /// `writer`.
    pub fn encrypt_stream(&self, reader: &mut impl Read, writer: impl Write) -> Result<()> {
        if self.recipients.is_empty() {
            return Err(CryptoError::NoRecipients);
        }

        let encryptor = age::Encryptor::with_recipients(
            self.recipients.iter().map(|r| r.as_ref() as &dyn age::Recipient),
        )
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut output = encryptor
            .wrap_output(writer)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        io::copy(reader, &mut output)?;
        output.finish()?;

        Ok(())
    }

    /// Decrypt an age stream into `writer` using the first matching
    /// identity.
    pub fn decrypt_stream(&self, reader: impl Read, writer: &mut impl Write) -> Result<()> {
        let decryptor = age::Decryptor::new(reader)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

        let mut plaintext = decryptor
            .decrypt(self.identities.iter().map(|i| i.as_ref() as &dyn age::Identity))
            .map_err(|e| match e {
                age::DecryptError::NoMatchingKeys => CryptoError::NoMatchingIdentity,
                other => CryptoError::DecryptionFailed(other.to_string()),
            })?;
        io::copy(&mut plaintext, writer)?;

        Ok(())
    }
}

fn read_identity(path: &Path) -> Result<Box<dyn age::Identity>> {
    let content = std::fs::read_to_string(path).map_err(|e| unusable(path, e))?;

    if content.trim_start().starts_with("AGE-SECRET-KEY-") {
        let identity = content
            .trim()
            .parse::<age::x25519::Identity>()
            .map_err(|e| unusable(path, e))?;
        return Ok(Box::new(identity));
    }

    let identity =
        age::ssh::Identity::from_buffer(BufReader::new(content.as_bytes()), name_of(path))
            .map_err(|e| unusable(path, e))?;
    Ok(Box::new(identity))
}

fn read_recipient(path: &Path) -> Result<Box<dyn age::Recipient>> {
    let content = std::fs::read_to_string(path).map_err(|e| unusable(path, e))?;
    let content = content.trim();

    if content.starts_with("age1") {
        let recipient = content
            .parse::<age::x25519::Recipient>()
            .map_err(|e| unusable(path, e))?;
        return Ok(Box::new(recipient));
    }

    let recipient = content
        .parse::<age::ssh::Recipient>()
        .map_err(|e| unusable(path, format!("{e:?}")))?;
    Ok(Box::new(recipient))
}

fn unusable(path: &Path, reason: impl ToString) -> CryptoError {
    CryptoError::UnusableKey {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn name_of(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}
