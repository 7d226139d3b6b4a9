//! Platform-specific paths for configuration and the snapshot artifact.

use std::path::PathBuf;

/// Get the platform-specific data directory for the snapshot artifact
///
/// Returns:
/// - Windows: %LOCALAPPDATA%\envsentinel
/// - macOS: ~/Library/Application Support/envsentinel
/// - Linux/Other: ~/.local/share/envsentinel
pub fn get_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".data")))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join("envsentinel")
}

/// Get the platform-specific config directory
pub fn get_config_dir() -> PathBuf {
    let base = dirs::config_dir()
        .or_else(dirs::data_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join("envsentinel")
}

/// Get the default path of the encrypted snapshot artifact
pub fn get_default_snapshot_path() -> PathBuf {
    get_data_dir().join("snapshots.age")
}

/// Get the path of the JSON configuration file
pub fn get_config_file_path() -> PathBuf {
    get_config_dir().join("config.json")
}

/// Ensure the data directory exists, creating it if necessary
pub fn ensure_data_dir() -> std::io::Result<PathBuf> {
    let dir = get_data_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Ensure the config directory exists, creating it if necessary
pub fn ensure_config_dir() -> std::io::Result<PathBuf> {
    let dir = get_config_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_data_dir() {
        let dir = get_data_dir();
        assert!(dir.to_string_lossy().ends_with("envsentinel"));
    }

    #[test]
    fn test_get_config_dir() {
        let dir = get_config_dir();
        assert!(dir.to_string_lossy().ends_with("envsentinel"));
    }

    #[test]
    fn test_get_default_snapshot_path() {
        let path = get_default_snapshot_path();
        assert!(path.to_string_lossy().ends_with("snapshots.age"));
    }

    #[test]
    fn test_get_config_file_path() {
        let path = get_config_file_path();
        assert!(path.to_string_lossy().ends_with("config.json"));
    }
}
