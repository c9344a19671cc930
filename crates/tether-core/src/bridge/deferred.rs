//! Asynchronous bridge: operations run on a worker task
//!
//! `connect` and `exec` return immediately with a [`PendingCall`]. The worker
//! pushes its values onto a channel sized to the operation's maximum value
//! count and closes it; the pending call resolves only after the close, so a
//! caller never observes a partial result.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use kameo::actor::ActorRef;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use tether_exec::{Connector, ExecError, ExecOutput};

use super::values::{CallResult, ReturnValue};
use crate::actor::ConnectionActor;
use crate::config::ClientConfig;

/// Result of a backgrounded operation, delivered once its worker finishes
///
/// Dropping a pending call does not cancel the worker.
#[must_use = "a pending call does nothing for the caller unless awaited"]
pub struct PendingCall<T> {
    values: mpsc::Receiver<ReturnValue>,
    received: Vec<ReturnValue>,
    closed: bool,
    worker: JoinHandle<()>,
    _result: PhantomData<fn() -> T>,
}

impl<T: CallResult> PendingCall<T> {
    /// Run `work` on a new task and bind its result to a completion channel
    pub(crate) fn spawn<F>(work: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(T::MAX_VALUES);

        let worker = tokio::spawn(async move {
            let result = work.await;
            for value in result.into_values() {
                if tx.send(value).await.is_err() {
                    debug!("pending call dropped before delivery");
                    break;
                }
            }
        });

        Self {
            values: rx,
            received: Vec::with_capacity(T::MAX_VALUES),
            closed: false,
            worker,
            _result: PhantomData,
        }
    }

    /// Resume a non-async caller through `callback` instead of an await
    pub fn on_complete<C>(self, callback: C) -> JoinHandle<()>
    where
        C: FnOnce(T) + Send + 'static,
    {
        tokio::spawn(async move { callback(self.await) })
    }
}

impl<T: CallResult> Future for PendingCall<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = &mut *self;

        while !this.closed {
            match this.values.poll_recv(cx) {
                Poll::Ready(Some(value)) => this.received.push(value),
                Poll::Ready(None) => this.closed = true,
                Poll::Pending => return Poll::Pending,
            }
        }

        match Pin::new(&mut this.worker).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(())) => Poll::Ready(T::from_values(std::mem::take(&mut this.received))),
            Poll::Ready(Err(e)) => {
                error!(error = %e, "worker exited before delivering");
                Poll::Ready(T::interrupted())
            }
        }
    }
}

/// Connection handle whose `connect`/`exec` never block the caller
///
/// Cloning yields another reference to the same handle.
#[derive(Clone)]
pub struct AsyncClient {
    actor: ActorRef<ConnectionActor>,
}

impl AsyncClient {
    /// Create a handle dialing over SSH with `config`
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_connector(config, Arc::new(config.connector()))
    }

    /// Create a handle dialing through `connector`
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn with_connector(config: &ClientConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            actor: super::spawn_handle(config, connector),
        }
    }

    /// Set the connect timeout for future `connect` calls
    pub async fn set_timeout(&self, seconds: u64) {
        super::set_timeout(&self.actor, seconds).await;
    }

    /// Current connect timeout in seconds, `None` if the handle stopped
    pub async fn timeout(&self) -> Option<u64> {
        super::timeout(&self.actor).await
    }

    /// Dial and authenticate with a password on a worker task
    pub fn connect(
        &self,
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> PendingCall<Result<(), ExecError>> {
        let actor = self.actor.clone();
        let (info, auth) = super::target(host, port, user, password);

        PendingCall::spawn(async move { super::connect(&actor, info, auth).await })
    }

    /// Run `command` on a worker task; `timeout` ≤ 0 waits indefinitely
    pub fn exec(&self, command: impl Into<String>, timeout: i64) -> PendingCall<ExecOutput> {
        let actor = self.actor.clone();
        let command = command.into();

        PendingCall::spawn(async move { super::exec(&actor, command, timeout).await })
    }

    /// Close the transport; a no-op when not connected
    pub async fn close(&self) {
        super::close(&self.actor).await;
    }

    /// Whether a live transport is held
    pub async fn is_connected(&self) -> bool {
        super::is_connected(&self.actor).await
    }
}
