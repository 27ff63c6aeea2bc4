//! Session health checks and reconnection with bounded backoff.

use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

use crate::config::EngineConfig;
use crate::descriptor::DeviceDescriptor;
use crate::error::{DriverError, Result, SessionError};
use crate::session::Session;
use crate::transport::Connector;

/// Per-reconnection-sequence bookkeeping; discarded once the sequence ends.
#[derive(Debug, Default)]
struct RetryState {
    attempts: u32,
    last_error: Option<String>,
}

impl RetryState {
    fn record(&mut self, error: impl Into<String>) {
        self.attempts += 1;
        self.last_error = Some(error.into());
    }
}

/// Whether the session is usable: transport present and a non-empty prompt
/// readable within the health timeout.
///
/// Deliberately cheap (no round-trip command) because it runs before every
/// risky operation.
pub async fn is_healthy<T: crate::transport::Transport>(session: &mut Session<T>) -> bool {
    if !session.is_open() {
        return false;
    }
    match session.probe_prompt().await {
        Ok(prompt) => !prompt.trim().is_empty(),
        Err(e) => {
            debug!("Health probe failed: {e}");
            false
        }
    }
}

/// Make the session healthy, reconnecting up to the configured attempt budget
/// with `2^attempt` seconds of backoff (attempt 0 is immediate).
///
/// A healthy session short-circuits. Terminal errors from a reconnect are
/// surfaced immediately: they will not improve with retries, and burning the
/// backoff budget on them produces misleading exhaustion messages. No new
/// attempt (or backoff sleep) starts once `deadline` has passed.
pub async fn ensure_healthy<C: Connector>(
    session: &mut Session<C::Transport>,
    connector: &C,
    descriptor: &DeviceDescriptor,
    config: &EngineConfig,
    deadline: Option<Instant>,
) -> Result<()> {
    if is_healthy(session).await {
        return Ok(());
    }

    warn!("Session to {} is unhealthy, reconnecting", descriptor.host);
    let mut retry = RetryState::default();

    for attempt in 0..config.max_reconnect_attempts {
        if attempt > 0 {
            if past(deadline) {
                return Err(DriverError::DeadlineExceeded.into());
            }
            let backoff = Duration::from_secs(1u64 << attempt);
            debug!(
                "Reconnect attempt {} to {} in {:?}",
                attempt + 1,
                descriptor.host,
                backoff
            );
            tokio::time::sleep(backoff).await;
            if past(deadline) {
                return Err(DriverError::DeadlineExceeded.into());
            }
        }

        match session.reopen(connector, descriptor).await {
            Ok(()) => {
                if is_healthy(session).await {
                    debug!(
                        "Reconnected to {} on attempt {}",
                        descriptor.host,
                        attempt + 1
                    );
                    return Ok(());
                }
                retry.record("reopened session failed health probe");
            }
            Err(e) if e.is_transient() => {
                warn!("Reconnect attempt {} failed: {e}", attempt + 1);
                retry.record(e.to_string());
            }
            Err(e) => return Err(e),
        }
    }

    Err(SessionError::ReconnectExhausted {
        attempts: config.max_reconnect_attempts,
        last_error: retry
            .last_error
            .unwrap_or_else(|| "no attempt recorded".to_string()),
    }
    .into())
}

fn past(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}
