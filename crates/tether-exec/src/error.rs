//! Error types for tether-exec

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while connecting to or executing on a remote host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// Host address could not be resolved or dialed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Dial did not complete within the connect timeout
    #[error("connection timed out after {timeout:?}")]
    ConnectTimeout {
        /// Connect timeout that was exceeded
        timeout: Duration,
    },

    /// Server presented a host key the trust policy rejected
    #[error("host key rejected for {host}")]
    HostKeyRejected {
        /// Host the key was presented by
        host: String,
    },

    /// Authentication failed
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No transport is held by the handle
    #[error("not connected")]
    NotConnected,

    /// Execution channel could not be opened on the transport
    #[error("failed to open session: {0}")]
    SessionOpen(String),

    /// Server refused to start the command
    #[error("failed to start command: {0}")]
    CommandStart(String),

    /// Remote command exited with a non-zero status
    #[error("process exited with status {status}")]
    CommandFailed {
        /// Exit status code
        status: u32,
    },

    /// Remote command was terminated by a signal
    #[error("process killed by signal {signal}")]
    Signaled {
        /// Signal name as reported by the server
        signal: String,
    },

    /// Channel closed without an exit status or exit signal
    #[error("process exited without exit status or exit signal")]
    MissingExitStatus,

    /// Command outlived its deadline and the session was forcibly closed
    #[error("command timed out after {timeout:?}")]
    Timeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// Transport-level failure not covered above
    #[error("transport error: {0}")]
    Transport(String),

    /// The connection handle is no longer running
    #[error("connection handle closed")]
    HandleClosed,

    /// A background worker exited before delivering its result
    #[error("operation interrupted before completion")]
    Interrupted,
}

impl ExecError {
    /// Check if error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExecError::ConnectionFailed(_)
                | ExecError::ConnectTimeout { .. }
                | ExecError::SessionOpen(_)
                | ExecError::Timeout { .. }
        )
    }

    /// Whether the error came from the remote command rather than the transport
    #[must_use]
    pub fn is_command_error(&self) -> bool {
        matches!(
            self,
            ExecError::CommandFailed { .. }
                | ExecError::Signaled { .. }
                | ExecError::MissingExitStatus
                | ExecError::Timeout { .. }
        )
    }
}
