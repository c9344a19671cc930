//! Session executor: one execution channel per command
//!
//! A [`Session`] owns the channel and the output buffers for a single
//! command. [`execute`] drives it through open, start, wait and close, and
//! always closes the channel exactly once before reporting.

use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::error::ExecError;
use crate::governor;
use crate::result::ExecOutput;
use crate::transport::{ChannelEvent, ExecChannel, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Exit {
    Status(u32),
    Signal(String),
}

/// A single remote command and its captured output
pub struct Session {
    channel: Box<dyn ExecChannel>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit: Option<Exit>,
    refused: bool,
    closed: bool,
    opened_at: Instant,
}

impl Session {
    /// Open a new execution channel on `transport`
    ///
    /// # Errors
    /// Returns `ExecError::SessionOpen` if the channel cannot be created
    pub async fn open(transport: &dyn Transport) -> Result<Self, ExecError> {
        let channel = transport.open_channel().await?;

        Ok(Self {
            channel,
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit: None,
            refused: false,
            closed: false,
            opened_at: Instant::now(),
        })
    }

    /// Start `command` without waiting for it to finish
    ///
    /// # Errors
    /// Returns `ExecError::CommandStart` if the server refuses the request
    pub async fn start(&mut self, command: &str) -> Result<(), ExecError> {
        self.channel.exec(command).await
    }

    /// Collect output until the channel closes, then report how the command ended
    ///
    /// Cancel safe: every event is recorded as soon as it is received, so
    /// dropping this future keeps all output seen so far.
    ///
    /// # Errors
    /// Returns `ExecError::CommandStart` if the server refused the exec
    /// request, otherwise a command error for non-zero exits, signals, or a
    /// missing exit status
    pub async fn wait(&mut self) -> Result<(), ExecError> {
        while let Some(event) = self.channel.next_event().await {
            self.record(event);
            if self.refused {
                break;
            }
        }
        self.exit_outcome()
    }

    /// Kill the remote command and close the channel
    pub async fn terminate(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.channel.kill().await {
            debug!(error = %e, "kill request failed");
        }
        self.close().await;
    }

    /// Record output still in flight after a forced close, for at most `grace`
    pub async fn drain(&mut self, grace: Duration) {
        let drained = timeout(grace, async {
            while let Some(event) = self.channel.next_event().await {
                self.record(event);
            }
        })
        .await;

        if drained.is_err() {
            debug!(grace = ?grace, "channel still open after grace period");
        }
    }

    /// Close the channel; later calls are no-ops
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.channel.close().await {
            debug!(error = %e, "channel close failed");
        }
    }

    /// Whether the channel has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Output captured so far, as lossy UTF-8
    #[must_use]
    pub fn captured(&self) -> (String, String) {
        (
            String::from_utf8_lossy(&self.stdout).to_string(),
            String::from_utf8_lossy(&self.stderr).to_string(),
        )
    }

    /// Time since the channel was opened
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.opened_at.elapsed()
    }

    /// Build the final result from the captured output and `outcome`
    #[must_use]
    pub fn finish(self, outcome: Result<(), ExecError>) -> ExecOutput {
        let (stdout, stderr) = self.captured();
        ExecOutput {
            stdout,
            stderr,
            outcome,
        }
    }

    fn record(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Stdout(data) => self.stdout.extend_from_slice(&data),
            ChannelEvent::Stderr(data) => self.stderr.extend_from_slice(&data),
            // The exit report can precede trailing data, so keep reading
            ChannelEvent::ExitStatus(status) => self.exit = Some(Exit::Status(status)),
            ChannelEvent::ExitSignal(signal) => self.exit = Some(Exit::Signal(signal)),
            ChannelEvent::Eof => {}
            // Only a failure before any output or exit answers the exec request
            ChannelEvent::Failure => {
                if self.exit.is_none() && self.stdout.is_empty() && self.stderr.is_empty() {
                    self.refused = true;
                } else {
                    debug!("ignoring channel request failure after command started");
                }
            }
        }
    }

    fn exit_outcome(&self) -> Result<(), ExecError> {
        if self.refused {
            return Err(ExecError::CommandStart(
                "server refused exec request".to_string(),
            ));
        }
        match &self.exit {
            Some(Exit::Status(0)) => Ok(()),
            Some(Exit::Status(status)) => Err(ExecError::CommandFailed { status: *status }),
            Some(Exit::Signal(signal)) => Err(ExecError::Signaled {
                signal: signal.clone(),
            }),
            None => Err(ExecError::MissingExitStatus),
        }
    }
}

/// Run `command` on a fresh session over `transport`
///
/// `deadline` of `None` waits for the command unconditionally; otherwise the
/// session is forcibly terminated once the deadline passes. Output captured
/// before any failure is kept in the returned [`ExecOutput`].
#[instrument(skip(transport), level = "debug")]
pub async fn execute(
    transport: &dyn Transport,
    command: &str,
    deadline: Option<Duration>,
) -> ExecOutput {
    let mut session = match Session::open(transport).await {
        Ok(session) => session,
        Err(e) => {
            warn!(command = %command, error = %e, "could not open session");
            return ExecOutput::failed(e);
        }
    };

    let outcome = match session.start(command).await {
        Ok(()) => governor::await_with_deadline(&mut session, deadline).await,
        Err(e) => Err(e),
    };

    session.close().await;

    let duration = session.elapsed();
    let output = session.finish(outcome);

    match &output.outcome {
        Ok(()) => debug!(
            command = %command,
            duration = ?duration,
            "remote command completed"
        ),
        Err(e) if e.is_command_error() => info!(
            command = %command,
            status = ?output.exit_status(),
            duration = ?duration,
            error = %e,
            "remote command failed"
        ),
        Err(e) => warn!(
            command = %command,
            duration = ?duration,
            error = %e,
            "remote command could not run"
        ),
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTransport, Script};

    #[tokio::test]
    async fn test_execute_success() {
        let script = Script::new()
            .stdout("hi\n")
            .exit_status(0)
            .eof();
        let transport = MockTransport::new(script);

        let output = execute(&transport, "echo hi", None).await;

        assert!(output.success());
        assert_eq!(output.stdout, "hi\n");
        assert_eq!(output.stderr, "");
        assert_eq!(output.exit_status(), Some(0));
        assert_eq!(transport.counters().closes(), 1);
        assert_eq!(transport.counters().commands(), vec!["echo hi".to_string()]);
    }

    #[tokio::test]
    async fn test_execute_nonzero_keeps_output() {
        let script = Script::new()
            .stdout("partial")
            .stderr("boom\n")
            .exit_status(2);
        let transport = MockTransport::new(script);

        let output = execute(&transport, "false", None).await;

        assert_eq!(output.error(), Some(&ExecError::CommandFailed { status: 2 }));
        assert_eq!(output.stdout, "partial");
        assert_eq!(output.stderr, "boom\n");
        assert_eq!(output.arity(), 3);
    }

    #[tokio::test]
    async fn test_exit_status_before_trailing_data() {
        let script = Script::new().exit_status(0).stdout("late\n");
        let transport = MockTransport::new(script);

        let output = execute(&transport, "echo late", None).await;

        assert!(output.success());
        assert_eq!(output.stdout, "late\n");
    }

    #[tokio::test]
    async fn test_execute_signal() {
        let script = Script::new().exit_signal("KILL");
        let transport = MockTransport::new(script);

        let output = execute(&transport, "kill -9 $$", None).await;

        assert_eq!(
            output.error(),
            Some(&ExecError::Signaled {
                signal: "KILL".to_string()
            })
        );
        assert_eq!(output.exit_status(), None);
    }

    #[tokio::test]
    async fn test_execute_missing_exit_status() {
        let transport = MockTransport::new(Script::new().stdout("x"));

        let output = execute(&transport, "true", None).await;

        assert_eq!(output.error(), Some(&ExecError::MissingExitStatus));
        assert_eq!(output.stdout, "x");
    }

    #[tokio::test]
    async fn test_open_failure_has_no_session_to_close() {
        let transport = MockTransport::failing_open(ExecError::SessionOpen("dropped".into()));

        let output = execute(&transport, "echo hi", None).await;

        assert_eq!(output.values(), vec![
            String::new(),
            String::new(),
            "failed to open session: dropped".to_string()
        ]);
        assert_eq!(transport.counters().closes(), 0);
    }

    #[tokio::test]
    async fn test_start_failure_still_closes() {
        let transport = MockTransport::new(Script::new().refuse_exec("no shell"));

        let output = execute(&transport, "echo hi", None).await;

        assert_eq!(
            output.error(),
            Some(&ExecError::CommandStart("no shell".to_string()))
        );
        assert_eq!(transport.counters().closes(), 1);
    }

    #[tokio::test]
    async fn test_refused_exec_request_is_start_error() {
        let transport = MockTransport::new(Script::new().failure());

        let output = execute(&transport, "echo hi", None).await;

        assert_eq!(
            output.error(),
            Some(&ExecError::CommandStart(
                "server refused exec request".to_string()
            ))
        );
        assert!(!output.error().unwrap().is_command_error());
        assert_eq!(transport.counters().closes(), 1);
    }

    #[tokio::test]
    async fn test_failure_after_output_is_ignored() {
        let script = Script::new().stdout("hi\n").failure().exit_status(0);
        let transport = MockTransport::new(script);

        let output = execute(&transport, "echo hi", None).await;

        assert!(output.success());
        assert_eq!(output.stdout, "hi\n");
    }

    #[tokio::test]
    async fn test_command_and_transport_errors_are_told_apart() {
        let failed = execute(
            &MockTransport::new(Script::new().exit_status(1)),
            "false",
            None,
        )
        .await;
        let unopened = execute(
            &MockTransport::failing_open(ExecError::SessionOpen("dropped".into())),
            "false",
            None,
        )
        .await;

        assert!(failed.error().unwrap().is_command_error());
        assert!(!unopened.error().unwrap().is_command_error());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let transport = MockTransport::new(Script::new().exit_status(0));
        let mut session = Session::open(&transport).await.unwrap();

        session.close().await;
        session.terminate().await;
        session.close().await;

        assert!(session.is_closed());
        assert_eq!(transport.counters().closes(), 1);
        assert_eq!(transport.counters().kills(), 0);
    }
}
