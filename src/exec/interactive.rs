//! Interactive command driver for line-mode and transactional CLIs.
//!
//! Drives one command at a time through a character-stream CLI:
//!
//! 1. Enter configuration mode and verify the prompt actually changed shape.
//! 2. Send each command, answering confirmation prompts (bounded), pacing
//!    between commands, and retrying a single command once across a
//!    reconnect when the transport drops mid-batch.
//! 3. Exit configuration mode.
//! 4. For dialects that stage configuration, commit and save, capturing both
//!    outcomes even when one fails.
//!
//! Any unrecoverable error triggers one best-effort mode exit before it
//! propagates, so the device is not left inside a configuration context.

use log::{debug, warn};
use regex::bytes::Regex;
use tokio::time::Instant;

use crate::config::EngineConfig;
use crate::descriptor::DeviceDescriptor;
use crate::dialect::DialectSpec;
use crate::error::{DriverError, Result, SessionError};
use crate::session::Session;
use crate::session::health::ensure_healthy;
use crate::transport::Connector;

/// Driver for interactive CLI dialects.
pub struct InteractiveDriver<'a, C: Connector> {
    connector: &'a C,
    descriptor: &'a DeviceDescriptor,
    config: &'a EngineConfig,
    /// Shell prompt or any confirmation token. A device waiting for
    /// confirmation never shows its shell prompt, so reads must accept both.
    expect: Regex,
    deadline: Option<Instant>,
}

impl<'a, C: Connector> InteractiveDriver<'a, C> {
    pub fn new(
        connector: &'a C,
        descriptor: &'a DeviceDescriptor,
        config: &'a EngineConfig,
        deadline: Option<Instant>,
    ) -> Result<Self> {
        let expect = build_expect_pattern(descriptor.dialect.spec(), config)
            .map_err(SessionError::InvalidPattern)?;
        Ok(Self {
            connector,
            descriptor,
            config,
            expect,
            deadline,
        })
    }

    /// Run a configuration batch through the full mode-entry/exit state
    /// machine, including the dialect's commit and save phase.
    pub async fn run_config(
        &self,
        session: &mut Session<C::Transport>,
        commands: &[String],
    ) -> Result<String> {
        let result = self.run_config_inner(session, commands).await;
        if result.is_err() {
            self.emergency_exit(session).await;
        }
        result
    }

    async fn run_config_inner(
        &self,
        session: &mut Session<C::Transport>,
        commands: &[String],
    ) -> Result<String> {
        let spec = session.spec();
        let mut output = String::new();

        self.enter_config(session).await?;

        for command in commands {
            let response = match self.send_confirmed(session, command).await {
                Ok(response) => response,
                Err(e) if e.is_transient() => {
                    // One reconnect and one retry for this command; a second
                    // failure gives up on the whole batch.
                    warn!("Transient failure on '{command}', reconnecting: {e}");
                    ensure_healthy(
                        session,
                        self.connector,
                        self.descriptor,
                        self.config,
                        self.deadline,
                    )
                    .await?;
                    self.enter_config(session).await?;
                    self.send_confirmed(session, command).await?
                }
                Err(e) => return Err(e),
            };

            if let Some(marker) = spec.detect_failure(&response) {
                debug!("Device rejected '{command}' ({marker})");
                return Err(DriverError::CommandFailed {
                    command: command.clone(),
                    message: response,
                }
                .into());
            }

            output.push_str(command);
            output.push_str(": ");
            output.push_str(&response);
            output.push('\n');

            self.pace(spec, command).await;
        }

        let response = self.send_confirmed(session, spec.exit_config).await?;
        output.push_str(spec.exit_config);
        output.push_str(": ");
        output.push_str(&response);
        output.push('\n');

        self.persist(session, spec, &mut output).await?;

        Ok(output)
    }

    /// Run show-style commands outside configuration mode.
    pub async fn run_show(
        &self,
        session: &mut Session<C::Transport>,
        commands: &[String],
    ) -> Result<String> {
        let spec = session.spec();
        let mut output = String::new();

        for command in commands {
            let response = match self.send_confirmed(session, command).await {
                Ok(response) => response,
                Err(e) if e.is_transient() => {
                    warn!("Transient failure on '{command}', reconnecting: {e}");
                    ensure_healthy(
                        session,
                        self.connector,
                        self.descriptor,
                        self.config,
                        self.deadline,
                    )
                    .await?;
                    self.send_confirmed(session, command).await?
                }
                Err(e) => return Err(e),
            };

            output.push_str(command);
            output.push_str(": ");
            output.push_str(&response);
            output.push('\n');

            self.pace(spec, command).await;
        }

        Ok(output)
    }

    /// Commit/save phase. Both steps run even if the first fails; the caller
    /// needs to see exactly which half of persistence broke.
    async fn persist(
        &self,
        session: &mut Session<C::Transport>,
        spec: &'static DialectSpec,
        output: &mut String,
    ) -> Result<()> {
        let mut failed: Option<(&'static str, String)> = None;

        for (label, token) in [("COMMIT", spec.commit), ("SAVE", spec.save)] {
            let Some(token) = token else { continue };
            match self.send_confirmed(session, token).await {
                Ok(response) => {
                    output.push_str(&format!("--- {label} OUTPUT ---\n{response}\n"));
                    if let Some(marker) = spec.detect_failure(&response) {
                        debug!("{label} rejected ({marker})");
                        failed.get_or_insert((label, response));
                    }
                }
                Err(e) => {
                    output.push_str(&format!("--- {label} OUTPUT ---\nfailed: {e}\n"));
                    failed.get_or_insert((label, e.to_string()));
                }
            }
        }

        if let Some((label, message)) = failed {
            return Err(DriverError::CommandFailed {
                command: label.to_lowercase(),
                message: format!("{message}\n\n{output}"),
            }
            .into());
        }
        Ok(())
    }

    async fn enter_config(&self, session: &mut Session<C::Transport>) -> Result<()> {
        let spec = session.spec();
        self.send_confirmed(session, spec.enter_config).await?;
        if !spec.in_config_mode(session.last_prompt()) {
            // Do not send the batch blind into an unknown session state.
            return Err(DriverError::ConfigModeRejected {
                prompt: session.last_prompt().to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Send one command, answering confirmation prompts as they appear.
    ///
    /// At most `max_confirmations` exchanges per command; a chain of nested
    /// confirmations beyond that is treated as output, never an endless loop.
    async fn send_confirmed(
        &self,
        session: &mut Session<C::Transport>,
        command: &str,
    ) -> Result<String> {
        let mut latest = session.send_expect(command, &self.expect).await?;
        let mut response = latest.clone();

        let mut exchanges = 0;
        while exchanges < self.config.max_confirmations && self.awaiting_confirmation(&latest) {
            latest = session
                .send_expect(&self.config.confirmation_reply, &self.expect)
                .await?;
            response.push('\n');
            response.push_str(&latest);
            exchanges += 1;
        }

        Ok(response)
    }

    /// A confirmation prompt is the trailing line still waiting for input;
    /// tokens buried in scrolled-past output do not count.
    fn awaiting_confirmation(&self, output: &str) -> bool {
        output
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .is_some_and(|l| self.config.has_confirmation_prompt(l))
    }

    /// Pacing between commands. Context switches (interface, protocol,
    /// address-family sub-modes) are slower on real hardware and get a
    /// longer delay.
    async fn pace(&self, spec: &'static DialectSpec, command: &str) {
        let mut delay = self.descriptor.timing.command_delay;
        if spec.is_context_switch(command) {
            delay *= self.config.context_switch_multiplier;
        }
        tokio::time::sleep(delay).await;
    }

    /// One best-effort mode exit, result swallowed.
    async fn emergency_exit(&self, session: &mut Session<C::Transport>) {
        let token = session.spec().exit_config;
        if let Err(e) = session.send(token).await {
            debug!("Emergency mode exit failed: {e}");
        }
    }
}

/// Pattern matching either the dialect's shell prompt or any configured
/// confirmation token (case-insensitive).
fn build_expect_pattern(
    spec: &'static DialectSpec,
    config: &EngineConfig,
) -> std::result::Result<Regex, regex::Error> {
    let mut alternatives = vec![format!("(?:{})", spec.prompt_pattern)];
    for token in &config.confirmation_tokens {
        alternatives.push(format!("(?i:{})", regex::escape(token)));
    }
    Regex::new(&alternatives.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::AuthMethod;
    use crate::dialect::Dialect;
    use crate::error::Error;
    use crate::transport::mock::{ScriptedConnector, ScriptedTransport};

    fn cisco_descriptor() -> DeviceDescriptor {
        DeviceDescriptor::new(
            "192.0.2.1",
            "admin",
            AuthMethod::Password("secret".into()),
            Dialect::CiscoIos,
        )
    }

    fn huawei_descriptor() -> DeviceDescriptor {
        DeviceDescriptor::new(
            "192.0.2.2",
            "admin",
            AuthMethod::Password("secret".into()),
            Dialect::HuaweiVrp,
        )
    }

    /// Cisco transport scripted through open (banner + two priming reads).
    fn cisco_transport() -> ScriptedTransport {
        ScriptedTransport::answering("switch#")
            .then_reply("switch#")
            .then_reply("switch#")
            .then_reply("switch#")
    }

    /// Huawei transport scripted through open (banner + one priming read).
    fn huawei_transport() -> ScriptedTransport {
        ScriptedTransport::answering("<CE6850>")
            .then_reply("<CE6850>")
            .then_reply("<CE6850>")
    }

    #[tokio::test(start_paused = true)]
    async fn test_line_mode_batch_enters_and_exits_config() {
        let transport = cisco_transport()
            .then_reply("configure terminal\nswitch(config)#")
            .then_reply("vlan 100\nswitch(config-vlan)#")
            .then_reply("name uplink\nswitch(config-vlan)#")
            .then_reply("end\nswitch#")
            .then_reply("write memory\nBuilding configuration...\n[OK]\nswitch#");
        let sent = transport.sent_lines();
        let connector = ScriptedConnector::new(vec![Ok(transport)]);
        let descriptor = cisco_descriptor();
        let config = EngineConfig::default();

        let mut session = Session::open(&connector, &descriptor).await.unwrap();
        let driver = InteractiveDriver::new(&connector, &descriptor, &config, None).unwrap();
        let commands = vec!["vlan 100".to_string(), "name uplink".to_string()];
        let output = driver.run_config(&mut session, &commands).await.unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![
                "terminal length 0",
                "terminal width 511",
                "configure terminal",
                "vlan 100",
                "name uplink",
                "end",
                "write memory",
            ]
        );
        assert!(output.contains("vlan 100:"));
        // The mode-exit exchange shows up in the report like any other.
        assert!(output.contains("end:"));
        assert!(output.contains("--- SAVE OUTPUT ---"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_mode_rejection_is_terminal() {
        // Prompt stays in exec mode after "configure terminal".
        let transport = cisco_transport().then_reply("configure terminal\nswitch#");
        let connector = ScriptedConnector::new(vec![Ok(transport)]);
        let descriptor = cisco_descriptor();
        let config = EngineConfig::default();

        let mut session = Session::open(&connector, &descriptor).await.unwrap();
        let driver = InteractiveDriver::new(&connector, &descriptor, &config, None).unwrap();
        let err = driver
            .run_config(&mut session, &["vlan 100".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Driver(DriverError::ConfigModeRejected { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_answered_exactly_once() {
        let transport = huawei_transport()
            .then_reply("system-view\n[CE6850]")
            .then_reply("quit\n<CE6850>")
            .then_reply("commit\n<CE6850>")
            .then_reply("save\nThe current configuration will be written to the device.\noverwrite? [y/n]")
            .then_reply("y\nSave succeeded.\n<CE6850>");
        let sent = transport.sent_lines();
        let connector = ScriptedConnector::new(vec![Ok(transport)]);
        let descriptor = huawei_descriptor();
        let config = EngineConfig::default();

        let mut session = Session::open(&connector, &descriptor).await.unwrap();
        let driver = InteractiveDriver::new(&connector, &descriptor, &config, None).unwrap();
        let output = driver.run_config(&mut session, &[]).await.unwrap();

        let sent = sent.lock().unwrap();
        let affirmatives = sent.iter().filter(|l| *l == "y").count();
        assert_eq!(affirmatives, 1);
        assert!(output.contains("Save succeeded."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_nested_confirmations_are_bounded() {
        let transport = huawei_transport()
            .then_reply("system-view\n[CE6850]")
            .then_reply("quit\n<CE6850>")
            .then_reply("commit\n<CE6850>")
            // Four confirmation prompts in a row; only three may be answered.
            .then_reply("save\nare you sure? [y/n]")
            .then_reply("y\nreally? [y/n]")
            .then_reply("y\nlast chance? [y/n]")
            .then_reply("y\nstill asking? [y/n]")
            .then_reply("<CE6850>");
        let sent = transport.sent_lines();
        let connector = ScriptedConnector::new(vec![Ok(transport)]);
        let descriptor = huawei_descriptor();
        let config = EngineConfig::default();

        let mut session = Session::open(&connector, &descriptor).await.unwrap();
        let driver = InteractiveDriver::new(&connector, &descriptor, &config, None).unwrap();
        let _ = driver.run_config(&mut session, &[]).await;

        let sent = sent.lock().unwrap();
        let affirmatives = sent.iter().filter(|l| *l == "y").count();
        assert_eq!(affirmatives, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_rejection_fails_and_emergency_exits() {
        let transport = cisco_transport()
            .then_reply("configure terminal\nswitch(config)#")
            .then_reply("vlan 9999\n% Invalid input detected at '^' marker.\nswitch(config)#")
            // Emergency exit read.
            .then_reply("end\nswitch#");
        let sent = transport.sent_lines();
        let connector = ScriptedConnector::new(vec![Ok(transport)]);
        let descriptor = cisco_descriptor();
        let config = EngineConfig::default();

        let mut session = Session::open(&connector, &descriptor).await.unwrap();
        let driver = InteractiveDriver::new(&connector, &descriptor, &config, None).unwrap();
        let err = driver
            .run_config(&mut session, &["vlan 9999".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Driver(DriverError::CommandFailed { .. })
        ));
        // The mode exit still went out after the failure.
        assert_eq!(sent.lock().unwrap().last().map(String::as_str), Some("end"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_drop_reconnects_and_retries_command() {
        let first = cisco_transport()
            .then_reply("configure terminal\nswitch(config)#")
            .then_drop();
        let second = cisco_transport()
            // Health probe after the reconnect.
            .then_reply("switch#")
            .then_reply("configure terminal\nswitch(config)#")
            .then_reply("vlan 100\nswitch(config-vlan)#")
            .then_reply("end\nswitch#")
            .then_reply("write memory\n[OK]\nswitch#");
        let retried = second.sent_lines();
        let connector = ScriptedConnector::new(vec![Ok(first), Ok(second)]);
        let descriptor = cisco_descriptor();
        let config = EngineConfig::default();

        let mut session = Session::open(&connector, &descriptor).await.unwrap();
        let driver = InteractiveDriver::new(&connector, &descriptor, &config, None).unwrap();
        let output = driver
            .run_config(&mut session, &["vlan 100".to_string()])
            .await
            .unwrap();

        assert!(output.contains("vlan 100:"));
        assert!(retried.lock().unwrap().contains(&"vlan 100".to_string()));
        assert_eq!(connector.connect_count(), 2);
    }
}
