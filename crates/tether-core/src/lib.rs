//! tether-core: Connection handles and their calling conventions
//!
//! Implements the `ConnectionActor` using the kameo framework, which owns one
//! handle's transport, and the blocking and async bridges callers drive it
//! through.

pub mod actor;
pub mod bridge;
pub mod config;
pub mod error;
pub mod message;

pub use actor::{ConnectionActor, ConnectionActorArgs};
pub use bridge::{AsyncClient, CallResult, PendingCall, ReturnValue, SyncClient};
pub use config::{ClientConfig, DEFAULT_CONNECT_TIMEOUT};
pub use error::CoreError;
pub use message::{Close, Connect, Exec, ExecReply, GetTimeout, IsConnected, SetTimeout};
