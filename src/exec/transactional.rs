//! Transactional driver for declarative-configuration dialects.
//!
//! The whole batch is loaded into a private candidate configuration, the
//! pending diff is captured, and the candidate is committed atomically. A
//! rejected commit leaves the running configuration untouched (the protocol
//! guarantees that, not this driver) and surfaces one terminal error carrying
//! both the diff and the commit message, so operators can see exactly what
//! would have changed.
//!
//! There is no confirmation-prompt handling here: the protocol is
//! request/response, not character-stream-interactive.

use log::debug;

use crate::error::{DriverError, Result};
use crate::session::Session;
use crate::transport::Transport;

/// Driver for declarative candidate-configuration dialects.
pub struct TransactionalDriver;

impl TransactionalDriver {
    /// Load `commands` as a candidate, diff, and commit atomically. Any
    /// failure, including a transport error mid-load, triggers one
    /// best-effort rollback and mode exit before it propagates.
    pub async fn run<T: Transport>(
        &self,
        session: &mut Session<T>,
        commands: &[String],
    ) -> Result<String> {
        let result = self.run_inner(session, commands).await;
        if result.is_err() {
            self.abandon(session).await;
        }
        result
    }

    async fn run_inner<T: Transport>(
        &self,
        session: &mut Session<T>,
        commands: &[String],
    ) -> Result<String> {
        let spec = session.spec();

        session.send(spec.enter_config).await?;
        if !spec.in_config_mode(session.last_prompt()) {
            return Err(DriverError::ConfigModeRejected {
                prompt: session.last_prompt().to_string(),
            }
            .into());
        }

        for command in commands {
            let response = session.send(command).await?;
            if let Some(marker) = spec.detect_failure(&response) {
                debug!("Candidate load rejected '{command}' ({marker})");
                return Err(DriverError::CommandFailed {
                    command: command.clone(),
                    message: response,
                }
                .into());
            }
        }

        let diff = match spec.diff {
            Some(token) => session.send(token).await?,
            None => String::new(),
        };

        // The dialect table guarantees declarative dialects carry a commit
        // token; an absent one means an empty candidate workflow.
        let commit_output = match spec.commit {
            Some(token) => session.send(token).await?,
            None => String::new(),
        };
        if let Some(marker) = spec.detect_failure(&commit_output) {
            debug!("Commit rejected ({marker})");
            return Err(DriverError::CommitRejected {
                message: commit_output,
                diff,
            }
            .into());
        }

        // The commit already took effect; a failed mode exit must not turn
        // the task into a failure.
        if let Err(e) = session.send(spec.exit_config).await {
            debug!("Mode exit after successful commit failed: {e}");
        }

        Ok(format!("Diff:\n{diff}\n\nCommit:\n{commit_output}"))
    }

    /// Best-effort rollback and mode exit; the error path already carries
    /// the real failure.
    async fn abandon<T: Transport>(&self, session: &mut Session<T>) {
        if let Some(token) = session.spec().rollback {
            if let Err(e) = session.send(token).await {
                debug!("Rollback after failure also failed: {e}");
            }
        }
        let exit = session.spec().exit_config;
        if let Err(e) = session.send(exit).await {
            debug!("Mode exit after failure also failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{AuthMethod, DeviceDescriptor};
    use crate::dialect::Dialect;
    use crate::error::Error;
    use crate::transport::mock::{ScriptedConnector, ScriptedTransport};
    use tokio_test::assert_ok;

    fn junos_descriptor() -> DeviceDescriptor {
        DeviceDescriptor::new(
            "192.0.2.3",
            "admin",
            AuthMethod::Password("secret".into()),
            Dialect::Junos,
        )
    }

    /// JUNOS transport scripted through open (banner + two priming reads).
    fn junos_transport() -> ScriptedTransport {
        ScriptedTransport::answering("admin@mx480>")
            .then_reply("admin@mx480>")
            .then_reply("admin@mx480>")
            .then_reply("admin@mx480>")
    }

    #[tokio::test]
    async fn test_commit_flow_reports_diff_and_commit() {
        let transport = junos_transport()
            .then_reply("configure private\n[edit]\nadmin@mx480#")
            .then_reply("set vlans uplink vlan-id 100\n[edit]\nadmin@mx480#")
            .then_reply("show | compare\n[edit vlans]\n+   uplink { vlan-id 100; }\n[edit]\nadmin@mx480#")
            .then_reply("commit\ncommit complete\n[edit]\nadmin@mx480#")
            .then_reply("exit configuration-mode\nadmin@mx480>");
        let sent = transport.sent_lines();
        let connector = ScriptedConnector::new(vec![Ok(transport)]);

        let mut session = Session::open(&connector, &junos_descriptor()).await.unwrap();
        let output = tokio_test::assert_ok!(
            TransactionalDriver
                .run(&mut session, &["set vlans uplink vlan-id 100".to_string()])
                .await
        );

        assert!(output.starts_with("Diff:\n"));
        assert!(output.contains("+   uplink { vlan-id 100; }"));
        assert!(output.contains("\n\nCommit:\n"));
        assert!(output.contains("commit complete"));

        let sent = sent.lock().unwrap();
        assert!(sent.contains(&"show | compare".to_string()));
        assert!(sent.contains(&"commit".to_string()));
        assert_eq!(
            sent.last().map(String::as_str),
            Some("exit configuration-mode")
        );
    }

    #[tokio::test]
    async fn test_rejected_commit_rolls_back_with_diff() {
        let transport = junos_transport()
            .then_reply("configure private\n[edit]\nadmin@mx480#")
            .then_reply("set protocols bgp group x\n[edit]\nadmin@mx480#")
            .then_reply("show | compare\n[edit protocols]\n+   bgp { group x; }\n[edit]\nadmin@mx480#")
            .then_reply("commit\nerror: commit failed: incomplete group\n[edit]\nadmin@mx480#")
            .then_reply("rollback 0\nload complete\n[edit]\nadmin@mx480#")
            .then_reply("exit configuration-mode\nadmin@mx480>");
        let sent = transport.sent_lines();
        let connector = ScriptedConnector::new(vec![Ok(transport)]);

        let mut session = Session::open(&connector, &junos_descriptor()).await.unwrap();
        let err = TransactionalDriver
            .run(&mut session, &["set protocols bgp group x".to_string()])
            .await
            .unwrap_err();

        let Error::Driver(DriverError::CommitRejected { message, diff }) = err else {
            panic!("expected CommitRejected, got {err}");
        };
        assert!(message.contains("commit failed"));
        assert!(diff.contains("+   bgp { group x; }"));

        let sent = sent.lock().unwrap();
        assert!(sent.contains(&"rollback 0".to_string()));
    }

    #[tokio::test]
    async fn test_transport_failure_mid_load_still_exits_config_mode() {
        use crate::error::{SessionError, TransportError};
        use std::time::Duration;

        // The read for the set line times out; the device is still in
        // configure-private and must be backed out before the error surfaces.
        let transport = junos_transport()
            .then_reply("configure private\n[edit]\nadmin@mx480#")
            .then_fail(TransportError::Timeout(Duration::from_secs(20)))
            .then_reply("rollback 0\nload complete\n[edit]\nadmin@mx480#")
            .then_reply("exit configuration-mode\nadmin@mx480>");
        let sent = transport.sent_lines();
        let connector = ScriptedConnector::new(vec![Ok(transport)]);

        let mut session = Session::open(&connector, &junos_descriptor()).await.unwrap();
        let err = TransactionalDriver
            .run(&mut session, &["set vlans uplink vlan-id 100".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Session(SessionError::PromptTimeout(_))
        ));
        let sent = sent.lock().unwrap();
        assert!(sent.contains(&"rollback 0".to_string()));
        assert_eq!(
            sent.last().map(String::as_str),
            Some("exit configuration-mode")
        );
    }

    #[tokio::test]
    async fn test_exit_failure_after_commit_is_not_a_task_failure() {
        use crate::error::TransportError;
        use std::time::Duration;

        let transport = junos_transport()
            .then_reply("configure private\n[edit]\nadmin@mx480#")
            .then_reply("set vlans uplink vlan-id 100\n[edit]\nadmin@mx480#")
            .then_reply("show | compare\n+ vlans uplink\n[edit]\nadmin@mx480#")
            .then_reply("commit\ncommit complete\n[edit]\nadmin@mx480#")
            .then_fail(TransportError::Timeout(Duration::from_secs(20)));
        let connector = ScriptedConnector::new(vec![Ok(transport)]);

        let mut session = Session::open(&connector, &junos_descriptor()).await.unwrap();
        let output = TransactionalDriver
            .run(&mut session, &["set vlans uplink vlan-id 100".to_string()])
            .await
            .unwrap();

        assert!(output.contains("commit complete"));
    }

    #[tokio::test]
    async fn test_rejected_set_line_abandons_candidate() {
        let transport = junos_transport()
            .then_reply("configure private\n[edit]\nadmin@mx480#")
            .then_reply("set vlans bogus\nsyntax error, expecting <statement>\n[edit]\nadmin@mx480#")
            .then_reply("rollback 0\nload complete\n[edit]\nadmin@mx480#")
            .then_reply("exit configuration-mode\nadmin@mx480>");
        let connector = ScriptedConnector::new(vec![Ok(transport)]);

        let mut session = Session::open(&connector, &junos_descriptor()).await.unwrap();
        let err = TransactionalDriver
            .run(&mut session, &["set vlans bogus".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Driver(DriverError::CommandFailed { .. })
        ));
    }
}
