//! Scripted in-memory transport for tests.
//!
//! `ScriptedTransport` replays a fixed sequence of read outcomes and records
//! every line sent, so session and driver tests can assert on the exact
//! conversation. `ScriptedConnector` hands out a queue of transports (or
//! connection failures), which is how reconnection paths get exercised.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use regex::bytes::Regex;

use super::{Connector, Transport};
use crate::descriptor::DeviceDescriptor;
use crate::error::{Result, TransportError};

/// One scripted read outcome.
#[derive(Debug)]
pub(crate) enum Step {
    /// Return this output (should end with a prompt the pattern matches).
    Reply(String),
    /// Simulate the connection dropping mid-read.
    Drop,
    /// Return this transport error without killing the connection.
    Fail(TransportError),
}

/// Transport double that replays [`Step`]s and records sent lines.
#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    script: VecDeque<Step>,
    /// Output returned when the script runs out.
    default_reply: String,
    connected: bool,
    sent: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    /// Transport that answers every read with `default_reply` (a prompt).
    pub(crate) fn answering(default_reply: &str) -> Self {
        Self {
            script: VecDeque::new(),
            default_reply: default_reply.to_string(),
            connected: true,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn then_reply(mut self, output: &str) -> Self {
        self.script.push_back(Step::Reply(output.to_string()));
        self
    }

    pub(crate) fn then_drop(mut self) -> Self {
        self.script.push_back(Step::Drop);
        self
    }

    pub(crate) fn then_fail(mut self, error: TransportError) -> Self {
        self.script.push_back(Step::Fail(error));
        self
    }

    /// Handle to the record of sent lines, usable after the transport has
    /// been consumed by a session.
    pub(crate) fn sent_lines(&self) -> Arc<Mutex<Vec<String>>> {
        self.sent.clone()
    }
}

impl Transport for ScriptedTransport {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        if !self.connected {
            return Err(TransportError::Disconnected.into());
        }
        self.sent.lock().unwrap().push(line.to_string());
        Ok(())
    }

    async fn read_until(&mut self, _pattern: &Regex, _timeout: Duration) -> Result<Vec<u8>> {
        if !self.connected {
            return Err(TransportError::Disconnected.into());
        }
        match self.script.pop_front() {
            Some(Step::Reply(output)) => Ok(output.into_bytes()),
            Some(Step::Drop) => {
                self.connected = false;
                Err(TransportError::Disconnected.into())
            }
            Some(Step::Fail(error)) => Err(error.into()),
            None => Ok(self.default_reply.clone().into_bytes()),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Connector double that hands out a queue of connect outcomes.
pub(crate) struct ScriptedConnector {
    outcomes: Mutex<VecDeque<Result<ScriptedTransport>>>,
    /// When set, an exhausted queue yields transports answering with this
    /// prompt instead of a connection failure.
    default_prompt: Option<&'static str>,
    connects: AtomicUsize,
}

impl ScriptedConnector {
    pub(crate) fn new(outcomes: Vec<Result<ScriptedTransport>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            default_prompt: None,
            connects: AtomicUsize::new(0),
        }
    }

    /// Connector whose every connect yields a transport answering with
    /// `prompt`.
    pub(crate) fn always(prompt: &'static str) -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            default_prompt: Some(prompt),
            connects: AtomicUsize::new(0),
        }
    }

    /// How many times `connect` has been called.
    pub(crate) fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    async fn connect(&self, descriptor: &DeviceDescriptor) -> Result<ScriptedTransport> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match self.outcomes.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => match self.default_prompt {
                Some(prompt) => Ok(ScriptedTransport::answering(prompt)),
                None => Err(TransportError::ConnectionFailed {
                    host: descriptor.host.clone(),
                    port: descriptor.port,
                    source: io::Error::new(io::ErrorKind::ConnectionRefused, "script exhausted"),
                }
                .into()),
            },
        }
    }
}
