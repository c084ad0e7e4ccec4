//! Path management for contable configuration files.
//!
//! ```text
//! ~/.config/contable/          # Config directory
//! ├── config.toml              # Client configuration
//! └── logs/                    # Rolling log files
//!     └── contable.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;

const APP_DIR_NAME: &str = "contable";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Well-known locations used by the client.
pub struct ContablePaths;

impl ContablePaths {
    /// Returns the configuration directory (`~/.config/contable/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        let home = dirs::home_dir().ok_or(PathError::HomeDirNotFound)?;
        Ok(home.join(".config").join(APP_DIR_NAME))
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the directory holding rolling log files.
    pub fn logs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        let config_dir = ContablePaths::config_dir().unwrap();
        assert!(config_dir.ends_with(".config/contable"));
    }

    #[test]
    fn test_config_file() {
        let config_file = ContablePaths::config_file().unwrap();
        assert!(config_file.ends_with("config.toml"));
        let config_dir = ContablePaths::config_dir().unwrap();
        assert!(config_file.starts_with(&config_dir));
    }

    #[test]
    fn test_logs_dir() {
        let logs_dir = ContablePaths::logs_dir().unwrap();
        assert!(logs_dir.ends_with("logs"));
        let config_dir = ContablePaths::config_dir().unwrap();
        assert!(logs_dir.starts_with(&config_dir));
    }
}
