//! Engine configuration.
//!
//! All tuning knobs live in one explicit struct passed to the dispatcher at
//! construction time. There is no global mutable state.

use std::time::Duration;

use crate::dialect::Dialect;

/// Tuning knobs for batch execution, pacing, and recovery.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of commands per chunk when a batch is executed chunked.
    pub chunk_size: usize,

    /// Maximum reconnection attempts before giving up.
    pub max_reconnect_attempts: u32,

    /// Base pause between chunks.
    pub inter_chunk_delay: Duration,

    /// Extra pause added per failed chunk so far (capped at
    /// `max_failure_penalty`), to let a struggling device recover.
    pub failure_penalty: Duration,

    /// Cap on the accumulated failure penalty.
    pub max_failure_penalty: Duration,

    /// Proactive health check runs every this many chunks.
    pub health_check_interval: usize,

    /// Multiplier applied to the pacing delay after commands that switch the
    /// device's command context (interface, protocol, address-family
    /// sub-modes), which are slower on real hardware.
    pub context_switch_multiplier: u32,

    /// Markers that identify a confirmation prompt in device output, matched
    /// case-insensitively. Kept as data rather than logic: the list is
    /// English-only and fragile against localized firmware, so deployments
    /// can extend it.
    pub confirmation_tokens: Vec<String>,

    /// Reply sent when a confirmation prompt is detected.
    pub confirmation_reply: String,

    /// Maximum confirmation exchanges per command (guards against a chain of
    /// nested confirmations looping forever).
    pub max_confirmations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 8,
            max_reconnect_attempts: 3,
            inter_chunk_delay: Duration::from_millis(500),
            failure_penalty: Duration::from_millis(500),
            max_failure_penalty: Duration::from_secs(3),
            health_check_interval: 5,
            context_switch_multiplier: 4,
            confirmation_tokens: vec![
                "[y/n]".to_string(),
                "y/n".to_string(),
                "confirm".to_string(),
                "are you sure".to_string(),
                "continue?".to_string(),
                "overwrite".to_string(),
            ],
            confirmation_reply: "y".to_string(),
            max_confirmations: 3,
        }
    }
}

impl EngineConfig {
    /// Whether `output` contains a confirmation prompt marker. Both sides are
    /// lowercased, so user-supplied tokens may carry any case.
    pub fn has_confirmation_prompt(&self, output: &str) -> bool {
        let lower = output.to_lowercase();
        self.confirmation_tokens
            .iter()
            .any(|t| lower.contains(&t.to_lowercase()))
    }

    /// Pause before the next chunk, given how many chunks have failed so far.
    pub fn chunk_pause(&self, failed_so_far: usize) -> Duration {
        let penalty = self
            .failure_penalty
            .saturating_mul(failed_so_far as u32)
            .min(self.max_failure_penalty);
        self.inter_chunk_delay + penalty
    }
}

/// Per-device timing profile.
///
/// Defaults come from [`TimingProfile::for_dialect`]; callers can override
/// individual fields on the descriptor. Huawei VRP gets more conservative
/// pacing than Cisco IOS, which tolerates a faster CLI.
#[derive(Debug, Clone)]
pub struct TimingProfile {
    /// Bound on transport establishment; `open` fails fast rather than hang.
    pub connect_timeout: Duration,

    /// How long a single send waits for the prompt to reappear.
    pub read_timeout: Duration,

    /// Short bound used by health checks, which must stay cheap.
    pub health_timeout: Duration,

    /// Pacing delay between successive commands.
    pub command_delay: Duration,
}

impl Default for TimingProfile {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(12),
            read_timeout: Duration::from_secs(20),
            health_timeout: Duration::from_secs(3),
            command_delay: Duration::from_millis(300),
        }
    }
}

impl TimingProfile {
    /// Recommended timing for a dialect.
    ///
    /// Cisco IOS/IOS-XE tolerate an aggressive CLI; Huawei VRP needs more
    /// headroom between commands or it drops characters under load. JUNOS
    /// keeps the defaults since commits dominate its wall-clock time anyway.
    pub fn for_dialect(dialect: Dialect) -> Self {
        match dialect {
            Dialect::CiscoIos | Dialect::CiscoXe => Self {
                read_timeout: Duration::from_secs(15),
                command_delay: Duration::from_millis(150),
                ..Self::default()
            },
            Dialect::HuaweiVrp => Self {
                read_timeout: Duration::from_secs(18),
                command_delay: Duration::from_millis(240),
                ..Self::default()
            },
            Dialect::Junos => Self::default(),
        }
    }
}
