//! Configuration loading and types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tether_core::ClientConfig;

/// Top-level configuration for the tether CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection handle settings
    #[serde(default)]
    pub client: ClientConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read, parsed, or fails validation
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("reading {}: {e}", path.display()))?;
        let config: Config = toml::from_str(&content)?;
        config.client.validate()?;
        Ok(config)
    }

    /// Load from default paths or use defaults
    ///
    /// # Errors
    /// Returns error if a found config file is invalid
    pub fn load_default() -> eyre::Result<Self> {
        // Check environment variable
        if let Ok(path) = std::env::var("TETHER_CONFIG") {
            return Self::load(&PathBuf::from(path));
        }

        // Try common paths
        let paths = [
            PathBuf::from("tether.toml"),
            PathBuf::from("/etc/tether/tether.toml"),
            dirs::config_dir()
                .map(|p| p.join("tether/tether.toml"))
                .unwrap_or_default(),
        ];

        for path in paths {
            if path.is_file() {
                return Self::load(&path);
            }
        }

        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.client, ClientConfig::default());
        assert_eq!(config.log.level, "warn");
        assert!(!config.log.json);
    }

    #[test]
    fn test_parse_config_file() {
        let dir = std::env::temp_dir().join(format!("tether-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tether.toml");
        std::fs::write(
            &path,
            r#"
            [client]
            connect_timeout = 4
            trust = "default-known-hosts"

            [log]
            level = "debug"
            json = true
            "#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(config.client.connect_timeout, 4);
        assert_eq!(
            config.client.trust,
            tether_exec::TrustPolicy::DefaultKnownHosts
        );
        assert_eq!(config.log.level, "debug");
        assert!(config.log.json);
    }

    #[test]
    fn test_invalid_client_config_is_rejected() {
        let dir = std::env::temp_dir().join(format!("tether-invalid-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tether.toml");
        std::fs::write(&path, "[client]\nkeepalive_interval = 0\n").unwrap();

        let result = Config::load(&path);
        std::fs::remove_dir_all(&dir).unwrap();

        assert!(result.is_err());
    }
}
