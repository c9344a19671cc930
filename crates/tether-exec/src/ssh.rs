//! SSH transport using russh crate

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::keys::ssh_key;
use russh::{ChannelMsg, Disconnect, Sig, client};
use tokio::time::timeout;
use tracing::{debug, info, instrument};

use crate::error::ExecError;
use crate::result::{AuthMethod, ConnectionInfo};
use crate::transport::{ChannelEvent, Connector, ExecChannel, Transport};
use crate::trust::TrustPolicy;

/// SSH client handler for russh
#[derive(Debug)]
struct SshClientHandler {
    host: String,
    port: u16,
    trust: TrustPolicy,
}

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(self.trust.verify(&self.host, self.port, server_public_key))
    }
}

/// Tunables forwarded to the russh client
#[derive(Debug, Clone, Default)]
pub struct SshOptions {
    /// Interval between keepalive requests
    pub keepalive_interval: Option<Duration>,
    /// Drop the connection after this long without traffic
    pub inactivity_timeout: Option<Duration>,
}

/// Dials SSH servers with password authentication
#[derive(Clone)]
pub struct SshConnector {
    trust: TrustPolicy,
    config: Arc<client::Config>,
}

impl std::fmt::Debug for SshConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConnector")
            .field("trust", &self.trust)
            .finish_non_exhaustive()
    }
}

impl SshConnector {
    /// Create a connector with the given trust policy and russh options
    #[must_use]
    pub fn new(trust: TrustPolicy, options: &SshOptions) -> Self {
        let config = client::Config {
            keepalive_interval: options.keepalive_interval,
            inactivity_timeout: options.inactivity_timeout,
            ..Default::default()
        };

        Self {
            trust,
            config: Arc::new(config),
        }
    }

    async fn establish(
        &self,
        info: &ConnectionInfo,
        auth: &AuthMethod,
    ) -> Result<SshTransport, ExecError> {
        let handler = SshClientHandler {
            host: info.host.clone(),
            port: info.port,
            trust: self.trust.clone(),
        };

        let mut handle = client::connect(self.config.clone(), (&info.host[..], info.port), handler)
            .await
            .map_err(|e| match e {
                russh::Error::UnknownKey => ExecError::HostKeyRejected {
                    host: info.address(),
                },
                other => ExecError::ConnectionFailed(other.to_string()),
            })?;

        let auth_res = match auth {
            AuthMethod::Password(password) => handle
                .authenticate_password(info.user.clone(), password.clone())
                .await
                .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?,
        };

        if !auth_res.success() {
            return Err(ExecError::AuthenticationFailed(
                "password authentication rejected".to_string(),
            ));
        }

        Ok(SshTransport {
            handle,
            address: info.address(),
        })
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new(TrustPolicy::default(), &SshOptions::default())
    }
}

#[async_trait]
impl Connector for SshConnector {
    #[instrument(skip(self, auth), fields(host = %info.host, port = info.port, user = %info.user))]
    async fn connect(
        &self,
        info: &ConnectionInfo,
        auth: &AuthMethod,
        timeout_duration: Option<Duration>,
    ) -> Result<Box<dyn Transport>, ExecError> {
        info!(
            policy = self.trust.name(),
            timeout = ?timeout_duration,
            "connecting to SSH"
        );

        let transport = match timeout_duration {
            Some(limit) => timeout(limit, self.establish(info, auth))
                .await
                .map_err(|_| ExecError::ConnectTimeout { timeout: limit })??,
            None => self.establish(info, auth).await?,
        };

        info!(address = %transport.address, "SSH connected and authenticated");

        Ok(Box::new(transport))
    }

    fn connector_type(&self) -> &'static str {
        "ssh"
    }
}

/// An authenticated SSH connection
struct SshTransport {
    handle: client::Handle<SshClientHandler>,
    address: String,
}

#[async_trait]
impl Transport for SshTransport {
    async fn open_channel(&self) -> Result<Box<dyn ExecChannel>, ExecError> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| ExecError::SessionOpen(e.to_string()))?;

        debug!(address = %self.address, "opened session channel");

        Ok(Box::new(SshChannel { channel }))
    }

    async fn disconnect(&self) -> Result<(), ExecError> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
            .map_err(|e| ExecError::Transport(e.to_string()))?;
        info!(address = %self.address, "SSH disconnected");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }
}

/// One `session` channel running a single command
struct SshChannel {
    channel: russh::Channel<client::Msg>,
}

#[async_trait]
impl ExecChannel for SshChannel {
    async fn exec(&mut self, command: &str) -> Result<(), ExecError> {
        self.channel
            .exec(true, command)
            .await
            .map_err(|e| ExecError::CommandStart(e.to_string()))
    }

    async fn next_event(&mut self) -> Option<ChannelEvent> {
        loop {
            match self.channel.wait().await? {
                ChannelMsg::Data { data } => return Some(ChannelEvent::Stdout(data.to_vec())),
                ChannelMsg::ExtendedData { data, ext } => {
                    // ext 1 is SSH_EXTENDED_DATA_STDERR
                    if ext == 1 {
                        return Some(ChannelEvent::Stderr(data.to_vec()));
                    }
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    return Some(ChannelEvent::ExitStatus(exit_status));
                }
                ChannelMsg::ExitSignal { signal_name, .. } => {
                    return Some(ChannelEvent::ExitSignal(signal_label(&signal_name)));
                }
                ChannelMsg::Eof => return Some(ChannelEvent::Eof),
                ChannelMsg::Failure => return Some(ChannelEvent::Failure),
                _ => {}
            }
        }
    }

    async fn kill(&mut self) -> Result<(), ExecError> {
        self.channel
            .signal(Sig::KILL)
            .await
            .map_err(|e| ExecError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), ExecError> {
        self.channel
            .close()
            .await
            .map_err(|e| ExecError::Transport(e.to_string()))
    }
}

fn signal_label(sig: &Sig) -> String {
    match sig {
        Sig::Custom(name) => name.clone(),
        other => format!("{other:?}"),
    }
}
