//! CLI state location.
//!
//! The local vault keeps its state in a single JSON file inside the CLI config directory:
//!
//! - `~/.config/bitwarden-cli/vault.json` (Unix)
//! - `%APPDATA%\bitwarden-cli\vault.json` (Windows)
//!
//! `BITWARDENCLI_APPDATA_DIR` overrides the directory on every platform.
//!
//! # Security
//!
//! - The directory is created with 0700 permissions and the state file with 0600 (Unix)
//! - No encryption at rest in current implementation

use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

/// Overrides the config directory.
pub const APPDATA_DIR_ENV: &str = "BITWARDENCLI_APPDATA_DIR";

/// Errors that can occur during state operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// Config directory not found (HOME or APPDATA not set).
    #[error("Config directory not found (HOME or APPDATA environment variable not set)")]
    ConfigDirNotFound,

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Get the CLI config directory
pub(crate) fn get_config_dir() -> Result<PathBuf, StateError> {
    if let Some(dir) = std::env::var_os(APPDATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA").map_err(|_| StateError::ConfigDirNotFound)?;
        Ok(PathBuf::from(appdata).join("bitwarden-cli"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").map_err(|_| StateError::ConfigDirNotFound)?;
        Ok(PathBuf::from(home).join(".config").join("bitwarden-cli"))
    }
}

/// Ensure config directory exists with proper permissions
pub(crate) fn ensure_config_dir() -> Result<PathBuf, StateError> {
    let dir = get_config_dir()?;
    std::fs::create_dir_all(&dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        std::fs::set_permissions(&dir, perms)?;
    }

    debug!(?dir, "Using config directory");
    Ok(dir)
}
