//! Transport seam between the execution logic and the SSH library
//!
//! `Connector` dials and authenticates, `Transport` is an established
//! connection, and `ExecChannel` is one command-execution channel on it.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::{AuthMethod, ConnectionInfo};

/// One message received on an execution channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Bytes written by the remote command to stdout
    Stdout(Vec<u8>),
    /// Bytes written by the remote command to stderr
    Stderr(Vec<u8>),
    /// Remote command exited normally
    ExitStatus(u32),
    /// Remote command was killed by a signal
    ExitSignal(String),
    /// Remote side will send no more data
    Eof,
    /// Server answered a channel request with failure
    Failure,
}

#[async_trait]
pub trait ExecChannel: Send {
    /// Ask the server to run `command` without waiting for it to finish
    async fn exec(&mut self, command: &str) -> Result<(), ExecError>;

    /// Next event, or `None` once the channel is closed
    ///
    /// Must be cancel safe: dropping the future must not lose an event.
    async fn next_event(&mut self) -> Option<ChannelEvent>;

    /// Ask the server to kill the running command
    async fn kill(&mut self) -> Result<(), ExecError>;

    /// Close the channel
    async fn close(&mut self) -> Result<(), ExecError>;
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a fresh execution channel
    async fn open_channel(&self) -> Result<Box<dyn ExecChannel>, ExecError>;

    /// Disconnect from the remote host
    async fn disconnect(&self) -> Result<(), ExecError>;

    /// Whether the underlying connection is already gone
    fn is_closed(&self) -> bool;
}

#[async_trait]
pub trait Connector: Send + Sync {
    /// Dial `info` and authenticate with `auth`
    ///
    /// `timeout` bounds establishing the connection; `None` waits indefinitely.
    async fn connect(
        &self,
        info: &ConnectionInfo,
        auth: &AuthMethod,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn Transport>, ExecError>;

    fn connector_type(&self) -> &'static str;
}
