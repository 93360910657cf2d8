//! Configuration management for onair

mod coordinator;
pub mod serde_utils;

pub use coordinator::{CoordinatorConfig, GatewayConfig, VoteConfig};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("onair")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a file
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        match load_config::<CoordinatorConfig>(&path) {
            Err(ConfigError::NotFound(p)) => assert_eq!(p, path),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = CoordinatorConfig::default();
        config.idle_timeout = Duration::from_secs(120);
        config.reward_tokens = 25;
        save_config(&path, &config).unwrap();

        let loaded: CoordinatorConfig = load_config(&path).unwrap();
        assert_eq!(loaded.idle_timeout, Duration::from_secs(120));
        assert_eq!(loaded.reward_tokens, 25);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "bind_address = \"127.0.0.1:9000\"\n").unwrap();

        let loaded: CoordinatorConfig = load_config(&path).unwrap();
        assert_eq!(loaded.bind_address, "127.0.0.1:9000");
        assert_eq!(loaded.slot_duration, Duration::from_secs(60));
    }

    #[test]
    fn test_default_path_is_namespaced() {
        assert!(default_config_path().ends_with("onair/config.toml"));
    }
}
