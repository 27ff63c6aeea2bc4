//! Session handles.
//!
//! A [`Session`] owns one live connection to one device: the transport, the
//! compiled prompt pattern for its dialect, and the last prompt observed.
//! `send` is the atomic primitive every driver is built from: write one line,
//! read until the prompt (or a caller-supplied expect pattern) reappears,
//! return the cleaned output.
//!
//! Sessions are owned by exactly one task execution and never shared; all
//! operations take `&mut self` so the type system enforces that no two
//! commands are ever in flight on the same transport.

pub mod health;

use log::debug;
use regex::bytes::Regex;

use crate::config::TimingProfile;
use crate::descriptor::DeviceDescriptor;
use crate::dialect::DialectSpec;
use crate::error::{Error, Result, SessionError, TransportError};
use crate::transport::{Connector, Transport};

/// One live, stateful connection to a device.
pub struct Session<T: Transport> {
    /// Absent once closed or after an unrecoverable transport failure.
    transport: Option<T>,
    spec: &'static DialectSpec,
    prompt_pattern: Regex,
    last_prompt: String,
    timing: TimingProfile,
}

impl<T: Transport> Session<T> {
    /// Open a session: connect, wait for the first prompt, and run the
    /// dialect's priming commands (pagination disable and friends).
    pub async fn open<C>(connector: &C, descriptor: &DeviceDescriptor) -> Result<Self>
    where
        C: Connector<Transport = T>,
    {
        let spec = descriptor.dialect.spec();
        let prompt_pattern =
            Regex::new(spec.prompt_pattern).map_err(SessionError::InvalidPattern)?;

        let mut session = Self {
            transport: None,
            spec,
            prompt_pattern,
            last_prompt: String::new(),
            timing: descriptor.timing.clone(),
        };
        session.reopen(connector, descriptor).await?;
        Ok(session)
    }

    /// Discard the current transport (if any) and establish a fresh one,
    /// repeating the login read and priming commands. Priming state lives in
    /// the transport, so it never survives a reconnect.
    pub(crate) async fn reopen<C>(
        &mut self,
        connector: &C,
        descriptor: &DeviceDescriptor,
    ) -> Result<()>
    where
        C: Connector<Transport = T>,
    {
        self.close().await;

        let mut transport = connector.connect(descriptor).await?;

        // Swallow the login banner; all we need from it is the prompt.
        let banner = transport
            .read_until(&self.prompt_pattern, self.timing.read_timeout)
            .await?;
        self.transport = Some(transport);
        if let Some(prompt) = last_line(&String::from_utf8_lossy(&banner)) {
            self.last_prompt = prompt;
        }

        for command in self.spec.priming_commands {
            self.send(command).await?;
        }
        debug!("Session to {} primed, prompt '{}'", descriptor.host, self.last_prompt);
        Ok(())
    }

    /// Send one line and read until the shell prompt reappears.
    pub async fn send(&mut self, line: &str) -> Result<String> {
        let pattern = self.prompt_pattern.clone();
        self.send_expect(line, &pattern).await
    }

    /// Send one line and read until `expect` matches. Used by the interactive
    /// driver, whose expect pattern is "shell prompt or confirmation prompt" —
    /// a device asking for confirmation never shows its shell prompt.
    pub async fn send_expect(&mut self, line: &str, expect: &Regex) -> Result<String> {
        let transport = self.transport.as_mut().ok_or(SessionError::NotConnected)?;
        transport.send_line(line).await?;

        let raw = match transport.read_until(expect, self.timing.read_timeout).await {
            Ok(raw) => raw,
            Err(Error::Transport(TransportError::Timeout(d))) => {
                return Err(SessionError::PromptTimeout(d).into());
            }
            Err(e) => {
                // A connection-shaped read failure leaves the transport in an
                // unknown state; drop it so the next health check reports
                // unhealthy immediately.
                if e.is_transient() {
                    self.transport = None;
                }
                return Err(e);
            }
        };

        let text = String::from_utf8_lossy(&raw).into_owned();
        Ok(self.clean_output(&text, line))
    }

    /// Force a fresh prompt read by sending an empty line.
    pub async fn refresh_prompt(&mut self) -> Result<String> {
        self.send("").await?;
        Ok(self.last_prompt.clone())
    }

    /// Prompt read with an explicit (short) timeout, for health probes.
    pub(crate) async fn probe_prompt(&mut self) -> Result<String> {
        let transport = self.transport.as_mut().ok_or(SessionError::NotConnected)?;
        transport.send_line("").await?;
        let raw = match transport
            .read_until(&self.prompt_pattern, self.timing.health_timeout)
            .await
        {
            Ok(raw) => raw,
            Err(Error::Transport(TransportError::Timeout(d))) => {
                return Err(SessionError::PromptTimeout(d).into());
            }
            Err(e) => return Err(e),
        };
        let text = String::from_utf8_lossy(&raw).into_owned();
        if let Some(prompt) = last_line(&text) {
            self.last_prompt = prompt;
        }
        Ok(self.last_prompt.clone())
    }

    /// Best-effort teardown. Failures are swallowed: a failed close must
    /// never mask the caller's real result.
    pub async fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!("Ignoring error during session close: {e}");
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Last prompt observed on this session.
    pub fn last_prompt(&self) -> &str {
        &self.last_prompt
    }

    pub fn spec(&self) -> &'static DialectSpec {
        self.spec
    }

    pub fn timing(&self) -> &TimingProfile {
        &self.timing
    }

    /// Strip the command echo and the trailing shell prompt, updating the
    /// prompt cache when the output ends in one. Confirmation prompts and
    /// other non-shell trailing text are preserved.
    fn clean_output(&mut self, text: &str, sent: &str) -> String {
        let mut lines: Vec<&str> = text.lines().collect();

        if !sent.is_empty()
            && lines.first().is_some_and(|l| l.trim_end() == sent.trim_end())
        {
            lines.remove(0);
        }
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        if let Some(last) = lines.last()
            && self.prompt_pattern.is_match(last.as_bytes())
        {
            self.last_prompt = last.trim_end().to_string();
            lines.pop();
        }

        lines.join("\n")
    }
}

fn last_line(text: &str) -> Option<String> {
    text.lines()
        .rev()
        .map(str::trim_end)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}
