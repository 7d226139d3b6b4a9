//! On-disk configuration: encryption key references and scan settings.

use crate::platform;
use crate::{EnvSentinelError, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// User configuration, stored as pretty-printed JSON in the config directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub keys: Vec<SshKeyPair>,
    pub scan: ScanConfig,
}

/// Paths to a key pair on disk used for snapshot encryption.
///
/// The private half decrypts, the public half encrypts. SSH keys and native
/// age keys are both accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKeyPair {
    pub private: PathBuf,
    pub public: PathBuf,
}

/// Settings for discovering untracked candidate files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Regex matched against file names.
    pub matcher: String,
    /// Glob of file names to skip.
    pub exclude: String,
    /// Search scope; `~` means the home directory.
    pub include: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            matcher: "\\.env".to_string(),
            exclude: "*.envrc".to_string(),
            include: "~".to_string(),
        }
    }
}

impl Config {
    /// Create a fresh config with sensible defaults. Public keys are assumed
    /// to sit next to their private halves with a `.pub` suffix.
    pub fn new(private_key_paths: &[PathBuf]) -> Self {
        let keys = private_key_paths
            .iter()
            .map(|private| {
                let mut public = private.as_os_str().to_owned();
                public.push(".pub");
                SshKeyPair {
                    private: private.clone(),
                    public: PathBuf::from(public),
                }
            })
            .collect();

        Self {
            keys,
            scan: ScanConfig::default(),
        }
    }

    /// Read the config from its default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&platform::get_config_file_path())
    }

    /// Read the config from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(EnvSentinelError::Config(
                    "no config file found; run `envsentinel init` to generate one".to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&data)
            .map_err(|e| EnvSentinelError::Config(format!("invalid config file: {e}")))
    }

    /// Write the config to its default location, creating the config
    /// directory if needed. Returns the path written.
    pub fn save(&self) -> Result<PathBuf> {
        platform::ensure_config_dir()?;
        let path = platform::get_config_file_path();
        self.save_to(&path)?;
        Ok(path)
    }

    /// Write the config to an explicit path. Refuses to overwrite an
    /// existing non-empty file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Ok(info) = std::fs::metadata(path) {
            if info.len() > 0 {
                return Err(EnvSentinelError::Config(format!(
                    "config already exists at {}",
                    path.display()
                )));
            }
        }

        let data = serde_json::to_vec_pretty(self)
            .map_err(|e| EnvSentinelError::Config(e.to_string()))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Absolute directory the scan settings cover.
    pub fn search_path(&self) -> Result<PathBuf> {
        self.scan.search_path()
    }
}

impl ScanConfig {
    /// Resolve `include` to an absolute directory.
    pub fn search_path(&self) -> Result<PathBuf> {
        if self.include == "~" {
            return dirs::home_dir().ok_or_else(|| {
                EnvSentinelError::Config("could not determine home directory".to_string())
            });
        }

        Ok(std::path::absolute(&self.include)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_new_derives_public_keys() {
        let config = Config::new(&[PathBuf::from("/home/u/.ssh/id_ed25519")]);
        assert_eq!(config.keys.len(), 1);
        assert_eq!(
            config.keys[0].public,
            PathBuf::from("/home/u/.ssh/id_ed25519.pub")
        );
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let config = Config::new(&[PathBuf::from("/home/u/.ssh/id_rsa")]);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_save_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let config = Config::new(&[]);
        config.save_to(&path).unwrap();

        let err = config.save_to(&path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_load_missing_mentions_init() {
        let dir = TempDir::new().unwrap();
        let err = Config::load_from(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("init"));
    }

    #[test]
    fn test_search_path_resolves_home() {
        let scan = ScanConfig::default();
        assert_eq!(scan.search_path().unwrap(), dirs::home_dir().unwrap());
    }

    #[test]
    fn test_search_path_absolute_include() {
        let scan = ScanConfig {
            include: "/tmp/projects".to_string(),
            ..ScanConfig::default()
        };
        assert_eq!(scan.search_path().unwrap(), PathBuf::from("/tmp/projects"));
    }
}
