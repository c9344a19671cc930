//! Scripted in-memory transport for unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::transport::{ChannelEvent, ExecChannel, Transport};

/// Events a mock channel replays, each after its own delay
#[derive(Debug, Clone, Default)]
pub struct Script {
    events: VecDeque<(Duration, ChannelEvent)>,
    refuse_exec: Option<String>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdout(self, text: &str) -> Self {
        self.after(Duration::ZERO, ChannelEvent::Stdout(text.as_bytes().to_vec()))
    }

    pub fn stderr(self, text: &str) -> Self {
        self.after(Duration::ZERO, ChannelEvent::Stderr(text.as_bytes().to_vec()))
    }

    pub fn exit_status(self, status: u32) -> Self {
        self.after(Duration::ZERO, ChannelEvent::ExitStatus(status))
    }

    pub fn exit_signal(self, signal: &str) -> Self {
        self.after(Duration::ZERO, ChannelEvent::ExitSignal(signal.to_string()))
    }

    pub fn eof(self) -> Self {
        self.after(Duration::ZERO, ChannelEvent::Eof)
    }

    pub fn failure(self) -> Self {
        self.after(Duration::ZERO, ChannelEvent::Failure)
    }

    pub fn refuse_exec(mut self, reason: &str) -> Self {
        self.refuse_exec = Some(reason.to_string());
        self
    }

    pub fn after(mut self, delay: Duration, event: ChannelEvent) -> Self {
        self.events.push_back((delay, event));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Counters {
    closes: Arc<AtomicUsize>,
    kills: Arc<AtomicUsize>,
    commands: Arc<Mutex<Vec<String>>>,
}

impl Counters {
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

pub struct MockTransport {
    script: Script,
    open_error: Option<ExecError>,
    counters: Counters,
}

impl MockTransport {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            open_error: None,
            counters: Counters::default(),
        }
    }

    pub fn failing_open(error: ExecError) -> Self {
        Self {
            script: Script::new(),
            open_error: Some(error),
            counters: Counters::default(),
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open_channel(&self) -> Result<Box<dyn ExecChannel>, ExecError> {
        if let Some(e) = &self.open_error {
            return Err(e.clone());
        }
        Ok(Box::new(MockChannel {
            script: self.script.clone(),
            closed: false,
            counters: self.counters.clone(),
        }))
    }

    async fn disconnect(&self) -> Result<(), ExecError> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }
}

struct MockChannel {
    script: Script,
    closed: bool,
    counters: Counters,
}

#[async_trait]
impl ExecChannel for MockChannel {
    async fn exec(&mut self, command: &str) -> Result<(), ExecError> {
        self.counters
            .commands
            .lock()
            .unwrap()
            .push(command.to_string());
        match &self.script.refuse_exec {
            Some(reason) => Err(ExecError::CommandStart(reason.clone())),
            None => Ok(()),
        }
    }

    async fn next_event(&mut self) -> Option<ChannelEvent> {
        if self.closed {
            return None;
        }
        let delay = self.script.events.front()?.0;
        tokio::time::sleep(delay).await;
        self.script.events.pop_front().map(|(_, event)| event)
    }

    async fn kill(&mut self) -> Result<(), ExecError> {
        self.counters.kills.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ExecError> {
        self.closed = true;
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
