//! tether-exec: Remote command execution over SSH
//!
//! Provides the transport seam, the russh-backed SSH transport, and the
//! session executor with its timeout governor.

pub mod error;
pub mod governor;
pub mod result;
pub mod session;
pub mod ssh;
pub mod transport;
pub mod trust;

#[cfg(test)]
mod testing;

pub use error::ExecError;
pub use governor::deadline_from_secs;
pub use result::{AuthMethod, ConnectionInfo, ExecOutput};
pub use session::{Session, execute};
pub use ssh::{SshConnector, SshOptions};
pub use transport::{ChannelEvent, Connector, ExecChannel, Transport};
pub use trust::TrustPolicy;
