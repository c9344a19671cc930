//! `ConnectionActor`: single owner of one connection handle
//!
//! Every read and write of the transport goes through this actor's mailbox,
//! so the blocking and the async bridge observe the same handle state.

use std::sync::Arc;
use std::time::Duration;

use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::ActorStopReason;
use kameo::message::{Context, Message};
use kameo::prelude::*;
use tracing::{error, info, instrument, warn};

use tether_exec::{
    ConnectionInfo, Connector, ExecError, ExecOutput, Transport, deadline_from_secs, execute,
};

use crate::config::ClientConfig;
use crate::error::CoreError;
use crate::message::{Close, Connect, Exec, ExecReply, GetTimeout, IsConnected, SetTimeout};

/// Arguments for spawning a `ConnectionActor`
pub struct ConnectionActorArgs {
    /// Client configuration
    pub config: ClientConfig,
    /// Dials the transport on `Connect`
    pub connector: Arc<dyn Connector>,
}

/// Connection handle: connect timeout plus the established transport
pub struct ConnectionActor {
    /// Dial deadline for the next `Connect`
    connect_timeout: Duration,
    /// Dials the transport
    connector: Arc<dyn Connector>,
    /// Established transport
    transport: Option<Box<dyn Transport>>,
    /// Target of the established transport
    target: Option<ConnectionInfo>,
}

impl ConnectionActor {
    /// Disconnect and forget the current transport, if any
    async fn drop_transport(&mut self, why: &str) {
        let Some(transport) = self.transport.take() else {
            return;
        };
        let target = self.target.take();

        if let Err(e) = transport.disconnect().await {
            warn!(
                address = ?target.as_ref().map(ConnectionInfo::address),
                error = %e,
                "disconnect failed"
            );
        }

        info!(
            address = ?target.as_ref().map(ConnectionInfo::address),
            reason = why,
            "transport closed"
        );
    }
}

impl Actor for ConnectionActor {
    type Args = ConnectionActorArgs;
    type Error = CoreError;

    async fn on_start(args: Self::Args, actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        info!(
            id = %actor_ref.id(),
            connector = args.connector.connector_type(),
            connect_timeout = args.config.connect_timeout,
            "ConnectionActor starting"
        );

        Ok(Self {
            connect_timeout: Duration::from_secs(args.config.connect_timeout),
            connector: args.connector,
            transport: None,
            target: None,
        })
    }

    async fn on_stop(
        &mut self,
        _actor_ref: WeakActorRef<Self>,
        reason: ActorStopReason,
    ) -> Result<(), Self::Error> {
        info!(reason = ?reason, "ConnectionActor stopping");
        self.drop_transport("handle stopped").await;
        Ok(())
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Message<SetTimeout> for ConnectionActor {
    type Reply = ();

    async fn handle(&mut self, msg: SetTimeout, _ctx: &mut Context<Self, Self::Reply>) {
        self.connect_timeout = Duration::from_secs(msg.seconds);
        info!(seconds = msg.seconds, "connect timeout updated");
    }
}

impl Message<GetTimeout> for ConnectionActor {
    type Reply = u64;

    async fn handle(&mut self, _msg: GetTimeout, _ctx: &mut Context<Self, Self::Reply>) -> u64 {
        self.connect_timeout.as_secs()
    }
}

impl Message<Connect> for ConnectionActor {
    type Reply = Result<(), ExecError>;

    #[instrument(skip(self, msg, _ctx), fields(host = %msg.info.host, port = msg.info.port, user = %msg.info.user))]
    async fn handle(&mut self, msg: Connect, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        // Close-before-replace: a reconnect never leaks the previous transport
        self.drop_transport("replaced by new connect").await;

        let dial_timeout = (!self.connect_timeout.is_zero()).then_some(self.connect_timeout);

        match self
            .connector
            .connect(&msg.info, &msg.auth, dial_timeout)
            .await
        {
            Ok(transport) => {
                self.transport = Some(transport);
                self.target = Some(msg.info);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "connect failed");
                Err(e)
            }
        }
    }
}

impl Message<Exec> for ConnectionActor {
    type Reply = ExecReply;

    #[instrument(skip(self, msg, _ctx), fields(command = %msg.command, timeout = msg.timeout))]
    async fn handle(&mut self, msg: Exec, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        let output = match &self.transport {
            Some(transport) => {
                execute(
                    transport.as_ref(),
                    &msg.command,
                    deadline_from_secs(msg.timeout),
                )
                .await
            }
            None => {
                warn!("exec before connect");
                ExecOutput::failed(ExecError::NotConnected)
            }
        };

        ExecReply { output }
    }
}

impl Message<Close> for ConnectionActor {
    type Reply = ();

    async fn handle(&mut self, _msg: Close, _ctx: &mut Context<Self, Self::Reply>) {
        self.drop_transport("closed by caller").await;
    }
}

impl Message<IsConnected> for ConnectionActor {
    type Reply = bool;

    async fn handle(&mut self, _msg: IsConnected, _ctx: &mut Context<Self, Self::Reply>) -> bool {
        self.transport
            .as_ref()
            .is_some_and(|transport| !transport.is_closed())
    }
}
