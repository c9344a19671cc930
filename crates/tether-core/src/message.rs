//! Message types for actor communication
//!
//! Message handlers are implemented in their respective actor modules.

use kameo_macros::Reply;
use tether_exec::{AuthMethod, ConnectionInfo, ExecOutput};

/// Overwrite the connect timeout used by future `Connect` messages
#[derive(Debug)]
pub struct SetTimeout {
    /// Timeout in whole seconds; 0 disables the dial deadline
    pub seconds: u64,
}

/// Get the current connect timeout, in seconds
#[derive(Debug)]
pub struct GetTimeout;

/// Dial and authenticate, replacing any existing transport
#[derive(Debug)]
pub struct Connect {
    /// Remote host, port and user
    pub info: ConnectionInfo,
    /// Credentials
    pub auth: AuthMethod,
}

/// Run one command on a fresh session
#[derive(Debug)]
pub struct Exec {
    /// Command line passed to the remote shell
    pub command: String,
    /// Per-call deadline in seconds; zero or negative waits indefinitely
    pub timeout: i64,
}

/// Result of an `Exec` message
#[derive(Debug, Clone, Reply)]
pub struct ExecReply {
    /// Captured output and outcome
    pub output: ExecOutput,
}

/// Disconnect and drop the transport, if any
#[derive(Debug)]
pub struct Close;

/// Whether a live transport is held
#[derive(Debug)]
pub struct IsConnected;
