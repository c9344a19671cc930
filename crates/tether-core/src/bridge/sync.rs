//! Synchronous bridge: every call blocks the caller until it resolves

use std::future::Future;
use std::sync::Arc;

use kameo::actor::ActorRef;
use tokio::runtime::{Builder, Handle, Runtime};

use tether_exec::{Connector, ExecError, ExecOutput};

use crate::actor::ConnectionActor;
use crate::config::ClientConfig;
use crate::error::CoreError;

/// Connection handle driven on the caller's own thread
///
/// Owns a single-worker runtime, so the actor and the SSH session task keep
/// running between calls (keepalives, server requests). Calls must not be
/// made from inside an async context, use [`super::AsyncClient`] there.
pub struct SyncClient {
    /// Taken only by `Drop`
    runtime: Option<Runtime>,
    actor: ActorRef<ConnectionActor>,
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("actor", &self.actor.id())
            .finish_non_exhaustive()
    }
}

impl SyncClient {
    /// Create a handle dialing over SSH with `config`
    ///
    /// # Errors
    /// Returns `CoreError::RuntimeError` if the runtime cannot be built
    pub fn new(config: &ClientConfig) -> Result<Self, CoreError> {
        Self::with_connector(config, Arc::new(config.connector()))
    }

    /// Create a handle dialing through `connector`
    ///
    /// # Errors
    /// Returns `CoreError::RuntimeError` if the runtime cannot be built
    pub fn with_connector(
        config: &ClientConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, CoreError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("tether-sync")
            .enable_all()
            .build()
            .map_err(|e| CoreError::RuntimeError(e.to_string()))?;

        let actor = {
            let _guard = runtime.enter();
            super::spawn_handle(config, connector)
        };

        Ok(Self {
            runtime: Some(runtime),
            actor,
        })
    }

    /// Set the connect timeout for future `connect` calls
    pub fn set_timeout(&self, seconds: u64) {
        self.block_on(super::set_timeout(&self.actor, seconds));
    }

    /// Current connect timeout in seconds, `None` if the handle stopped
    #[must_use]
    pub fn timeout(&self) -> Option<u64> {
        self.block_on(super::timeout(&self.actor))
    }

    /// Dial and authenticate with a password
    ///
    /// # Errors
    /// Returns the connection or authentication failure; the handle stays
    /// unconnected
    pub fn connect(
        &self,
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<(), ExecError> {
        let (info, auth) = super::target(host, port, user, password);
        self.block_on(super::connect(&self.actor, info, auth))
    }

    /// Run `command`; `timeout` ≤ 0 waits indefinitely
    #[must_use]
    pub fn exec(&self, command: impl Into<String>, timeout: i64) -> ExecOutput {
        self.block_on(super::exec(&self.actor, command.into(), timeout))
    }

    /// Close the transport; a no-op when not connected
    pub fn close(&self) {
        self.block_on(super::close(&self.actor));
    }

    /// Whether a live transport is held
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.block_on(super::is_connected(&self.actor))
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        let Some(runtime) = &self.runtime else {
            unreachable!("runtime is only taken on drop");
        };
        runtime.block_on(future)
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        // Neither block_on nor a blocking runtime drop is allowed inside an
        // async context; the transport then goes down with the runtime
        if Handle::try_current().is_ok() {
            if let Some(runtime) = self.runtime.take() {
                runtime.shutdown_background();
            }
        } else {
            self.block_on(super::close(&self.actor));
        }
    }
}
