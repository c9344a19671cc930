//! Configuration for connection handles

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_exec::{SshConnector, SshOptions, TrustPolicy};

use crate::error::CoreError;

/// Default connect timeout, in seconds
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

/// Settings applied to every handle created from this config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Dial deadline in seconds; 0 waits indefinitely
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    /// Server host key trust policy
    #[serde(default)]
    pub trust: TrustPolicy,
    /// Seconds between keepalive requests
    pub keepalive_interval: Option<u64>,
    /// Seconds without traffic before the transport is dropped
    pub inactivity_timeout: Option<u64>,
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            trust: TrustPolicy::default(),
            keepalive_interval: None,
            inactivity_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Check values that serde cannot
    ///
    /// # Errors
    /// Returns `CoreError::ConfigError` for zero intervals or an empty pinned key
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.keepalive_interval == Some(0) {
            return Err(CoreError::ConfigError(
                "keepalive_interval must be positive".to_string(),
            ));
        }
        if self.inactivity_timeout == Some(0) {
            return Err(CoreError::ConfigError(
                "inactivity_timeout must be positive".to_string(),
            ));
        }
        if let TrustPolicy::PublicKey(key) = &self.trust {
            if key.trim().is_empty() {
                return Err(CoreError::ConfigError(
                    "trust public-key must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Options forwarded to the russh client
    #[must_use]
    pub fn ssh_options(&self) -> SshOptions {
        SshOptions {
            keepalive_interval: self.keepalive_interval.map(Duration::from_secs),
            inactivity_timeout: self.inactivity_timeout.map(Duration::from_secs),
        }
    }

    /// SSH connector honoring this config's trust policy and options
    #[must_use]
    pub fn connector(&self) -> SshConnector {
        SshConnector::new(self.trust.clone(), &self.ssh_options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.connect_timeout, 10);
        assert_eq!(config.trust, TrustPolicy::AcceptAny);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full() {
        let config: ClientConfig = toml::from_str(
            r#"
            connect_timeout = 3
            keepalive_interval = 15
            trust = { public-key = "AAAAC3NzaC1lZDI1NTE5AAAAIJdD7y3aLq454yWBdwLWbieU1ebz9/cu7/QEXn9OIeZJ" }
            "#,
        )
        .unwrap();

        assert_eq!(config.connect_timeout, 3);
        assert_eq!(
            config.ssh_options().keepalive_interval,
            Some(Duration::from_secs(15))
        );
        assert_eq!(config.ssh_options().inactivity_timeout, None);
        assert!(matches!(config.trust, TrustPolicy::PublicKey(_)));
    }

    #[test]
    fn test_validate_rejects_zero_keepalive() {
        let config = ClientConfig {
            keepalive_interval: Some(0),
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::ConfigError(_))));
    }

    #[test]
    fn test_validate_rejects_empty_pinned_key() {
        let config = ClientConfig {
            trust: TrustPolicy::PublicKey("  ".to_string()),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
