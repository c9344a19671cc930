//! Calling-convention bridges over a `ConnectionActor`
//!
//! [`SyncClient`] blocks the calling thread until each operation resolves.
//! [`AsyncClient`] hands `connect`/`exec` to a worker task and returns a
//! [`PendingCall`] that resolves with the same result once the worker is done.

use std::sync::Arc;

use kameo::actor::{ActorRef, Spawn};
use kameo::error::SendError;
use tracing::warn;

use tether_exec::{AuthMethod, ConnectionInfo, Connector, ExecError, ExecOutput};

use crate::actor::{ConnectionActor, ConnectionActorArgs};
use crate::config::ClientConfig;
use crate::message::{Close, Connect, Exec, GetTimeout, IsConnected, SetTimeout};

pub mod deferred;
pub mod sync;
pub mod values;

pub use deferred::{AsyncClient, PendingCall};
pub use sync::SyncClient;
pub use values::{CallResult, ReturnValue};

/// Spawn the actor owning one connection handle
///
/// Must be called from within a tokio runtime.
fn spawn_handle(config: &ClientConfig, connector: Arc<dyn Connector>) -> ActorRef<ConnectionActor> {
    ConnectionActor::spawn(ConnectionActorArgs {
        config: config.clone(),
        connector,
    })
}

fn handler_error<M>(err: SendError<M, ExecError>) -> ExecError {
    match err {
        SendError::HandlerError(e) => e,
        _ => ExecError::HandleClosed,
    }
}

async fn set_timeout(actor: &ActorRef<ConnectionActor>, seconds: u64) {
    if actor.ask(SetTimeout { seconds }).await.is_err() {
        warn!(seconds, "set_timeout on a stopped handle");
    }
}

async fn timeout(actor: &ActorRef<ConnectionActor>) -> Option<u64> {
    actor.ask(GetTimeout).await.ok()
}

async fn connect(
    actor: &ActorRef<ConnectionActor>,
    info: ConnectionInfo,
    auth: AuthMethod,
) -> Result<(), ExecError> {
    actor.ask(Connect { info, auth }).await.map_err(handler_error)
}

async fn exec(actor: &ActorRef<ConnectionActor>, command: String, timeout: i64) -> ExecOutput {
    match actor.ask(Exec { command, timeout }).await {
        Ok(reply) => reply.output,
        Err(_) => ExecOutput::failed(ExecError::HandleClosed),
    }
}

async fn close(actor: &ActorRef<ConnectionActor>) {
    if actor.ask(Close).await.is_err() {
        warn!("close on a stopped handle");
    }
}

async fn is_connected(actor: &ActorRef<ConnectionActor>) -> bool {
    actor.ask(IsConnected).await.unwrap_or(false)
}

fn target(
    host: impl Into<String>,
    port: u16,
    user: impl Into<String>,
    password: impl Into<String>,
) -> (ConnectionInfo, AuthMethod) {
    (
        ConnectionInfo::new(host, user).with_port(port),
        AuthMethod::with_password(password),
    )
}
