//! Server host key trust policies

use std::path::PathBuf;

use russh::keys::ssh_key;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How the client decides whether to trust a server's host key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrustPolicy {
    /// Accept any host key (like `StrictHostKeyChecking=no`)
    #[default]
    AcceptAny,
    /// Accept only this base64-encoded public key
    PublicKey(String),
    /// Check against a specific `known_hosts` file
    KnownHostsFile(PathBuf),
    /// Check against `~/.ssh/known_hosts`
    DefaultKnownHosts,
}

impl TrustPolicy {
    /// Decide whether `key` presented by `host:port` is trusted
    ///
    /// Lookup failures (unreadable file, unparsable pinned key) count as
    /// not trusted.
    pub fn verify(&self, host: &str, port: u16, key: &ssh_key::PublicKey) -> bool {
        let trusted = match self {
            TrustPolicy::AcceptAny => true,
            TrustPolicy::PublicKey(encoded) => match russh::keys::parse_public_key_base64(encoded)
            {
                Ok(pinned) => pinned == *key,
                Err(e) => {
                    warn!(error = %e, "pinned host key is not valid base64 key data");
                    false
                }
            },
            TrustPolicy::KnownHostsFile(path) => {
                russh::keys::check_known_hosts_path(host, port, key, path).unwrap_or_else(|e| {
                    warn!(path = %path.display(), error = %e, "known_hosts lookup failed");
                    false
                })
            }
            TrustPolicy::DefaultKnownHosts => russh::keys::check_known_hosts(host, port, key)
                .unwrap_or_else(|e| {
                    warn!(error = %e, "known_hosts lookup failed");
                    false
                }),
        };

        debug!(host = %host, port = port, policy = self.name(), trusted, "checked host key");
        trusted
    }

    /// Short name for logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            TrustPolicy::AcceptAny => "accept-any",
            TrustPolicy::PublicKey(_) => "public-key",
            TrustPolicy::KnownHostsFile(_) => "known-hosts-file",
            TrustPolicy::DefaultKnownHosts => "default-known-hosts",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        trust: TrustPolicy,
    }

    #[test]
    fn test_default_accepts_any() {
        assert_eq!(TrustPolicy::default(), TrustPolicy::AcceptAny);
    }

    #[test]
    fn test_parse_unit_policy() {
        let w: Wrapper = toml::from_str("trust = \"accept-any\"").unwrap();
        assert_eq!(w.trust, TrustPolicy::AcceptAny);

        let w: Wrapper = toml::from_str("trust = \"default-known-hosts\"").unwrap();
        assert_eq!(w.trust, TrustPolicy::DefaultKnownHosts);
    }

    #[test]
    fn test_parse_known_hosts_file() {
        let w: Wrapper =
            toml::from_str("trust = { known-hosts-file = \"/etc/ssh/known_hosts\" }").unwrap();
        assert_eq!(
            w.trust,
            TrustPolicy::KnownHostsFile(PathBuf::from("/etc/ssh/known_hosts"))
        );
    }
}
