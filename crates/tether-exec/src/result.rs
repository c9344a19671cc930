//! Result types for command execution

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ExecError;

/// Result of one remote command execution
///
/// `stdout` and `stderr` are always present, even when `outcome` is an
/// error: output captured before a failure or a forced termination is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// stdout output
    pub stdout: String,
    /// stderr output
    pub stderr: String,
    /// Whether the call succeeded
    pub outcome: Result<(), ExecError>,
}

impl ExecOutput {
    /// Result of a call that failed before any output could be captured
    #[must_use]
    pub fn failed(error: ExecError) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            outcome: Err(error),
        }
    }

    /// Check if the call succeeded
    #[must_use]
    pub fn success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Exit status implied by the outcome
    ///
    /// `Some(0)` on success, the remote status for a non-zero exit, `None`
    /// when the command never reported one (signal, timeout, transport error).
    #[must_use]
    pub fn exit_status(&self) -> Option<u32> {
        match &self.outcome {
            Ok(()) => Some(0),
            Err(ExecError::CommandFailed { status }) => Some(*status),
            Err(_) => None,
        }
    }

    /// The error, if the call failed
    #[must_use]
    pub fn error(&self) -> Option<&ExecError> {
        self.outcome.as_ref().err()
    }

    /// Number of values in the scripting convention: 2 on success, 3 on failure
    #[must_use]
    pub fn arity(&self) -> usize {
        if self.success() { 2 } else { 3 }
    }

    /// Flatten into the ordered `(stdout, stderr, error?)` value list
    #[must_use]
    pub fn values(&self) -> Vec<String> {
        let mut values = vec![self.stdout.clone(), self.stderr.clone()];
        if let Err(e) = &self.outcome {
            values.push(e.to_string());
        }
        values
    }
}

/// Connection target for SSH
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Host address
    pub host: String,
    /// Port (default 22)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username
    pub user: String,
}

fn default_port() -> u16 {
    22
}

impl ConnectionInfo {
    /// Create new connection info
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            user: user.into(),
        }
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// `host:port` form used in logs and errors
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Credentials presented during authentication
#[derive(Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthMethod {
    Password(String),
}

impl AuthMethod {
    /// Convenience method to create an [`AuthMethod`] from a string literal.
    pub fn with_password(password: impl Into<String>) -> Self {
        Self::Password(password.into())
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Password(_) => f.write_str("Password(<redacted>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(outcome: Result<(), ExecError>) -> ExecOutput {
        ExecOutput {
            stdout: "hi\n".to_string(),
            stderr: String::new(),
            outcome,
        }
    }

    #[test]
    fn test_success_has_two_values() {
        let out = output(Ok(()));
        assert_eq!(out.arity(), 2);
        assert_eq!(out.values(), vec!["hi\n".to_string(), String::new()]);
    }

    #[test]
    fn test_failure_has_three_values() {
        let out = output(Err(ExecError::CommandFailed { status: 1 }));
        assert_eq!(out.arity(), 3);
        assert_eq!(out.values()[2], "process exited with status 1");
        assert_eq!(out.values()[0], "hi\n");
        assert_eq!(out.exit_status(), Some(1));
    }

    #[test]
    fn test_failed_keeps_empty_streams() {
        let out = ExecOutput::failed(ExecError::NotConnected);
        assert!(out.stdout.is_empty());
        assert!(out.stderr.is_empty());
        assert_eq!(out.error(), Some(&ExecError::NotConnected));
    }

    #[test]
    fn test_password_is_redacted() {
        let auth = AuthMethod::with_password("hunter2");
        assert!(!format!("{auth:?}").contains("hunter2"));
    }

    #[test]
    fn test_connection_info_defaults() {
        let info: ConnectionInfo = toml::from_str("host = \"10.0.0.2\"\nuser = \"root\"").unwrap();
        assert_eq!(info.port, 22);
        assert_eq!(info.address(), "10.0.0.2:22");
    }
}
