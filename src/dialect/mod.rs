//! Vendor dialect definitions.
//!
//! A [`Dialect`] classifies how a device is configured — line-mode CLI,
//! transactional CLI, or a declarative candidate configuration — and resolves
//! to a static [`DialectSpec`] carrying the literal tokens for entering and
//! exiting configuration mode, committing, and saving. All vendor branching
//! in the engine goes through the spec; nothing string-matches a device-type
//! name.

mod cisco;
mod huawei;
mod junos;

use std::fmt;

/// Configuration protocol family a dialect follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigProtocol {
    /// Interactive CLI where each line takes effect immediately
    /// (Cisco IOS/IOS-XE `configure terminal`).
    LineMode,

    /// Interactive CLI with an explicit commit and save step after the batch
    /// (Huawei VRP `system-view` + `commit` + `save`).
    TransactionalCli,

    /// Declarative candidate configuration with diff and atomic commit
    /// (Juniper JUNOS).
    Declarative,
}

/// Supported device dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Cisco IOS.
    CiscoIos,
    /// Cisco IOS-XE.
    CiscoXe,
    /// Huawei VRP.
    HuaweiVrp,
    /// Juniper JUNOS.
    Junos,
}

impl Dialect {
    /// Resolve the static behavior descriptor for this dialect.
    pub fn spec(&self) -> &'static DialectSpec {
        match self {
            Dialect::CiscoIos => &cisco::IOS,
            Dialect::CiscoXe => &cisco::XE,
            Dialect::HuaweiVrp => &huawei::VRP,
            Dialect::Junos => &junos::JUNOS,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().name)
    }
}

/// Static behavior descriptor for one dialect.
///
/// Everything in here is literal protocol vocabulary; timing lives in
/// [`TimingProfile`](crate::config::TimingProfile) and detection heuristics
/// in [`EngineConfig`](crate::config::EngineConfig).
pub struct DialectSpec {
    /// Dialect name (e.g. "cisco_ios", "huawei_vrp").
    pub name: &'static str,

    /// Protocol family, used by the dispatcher to pick the driver.
    pub protocol: ConfigProtocol,

    /// Token that enters configuration mode.
    pub enter_config: &'static str,

    /// Token that exits configuration mode.
    pub exit_config: &'static str,

    /// Explicit commit token, for dialects that stage configuration.
    pub commit: Option<&'static str>,

    /// Save/persist token, for dialects where commit alone does not survive
    /// a reboot.
    pub save: Option<&'static str>,

    /// Token that renders the pending diff against the running configuration
    /// (declarative dialects only).
    pub diff: Option<&'static str>,

    /// Token that discards the pending candidate configuration
    /// (declarative dialects only).
    pub rollback: Option<&'static str>,

    /// Commands sent right after login (and after every reconnect, since the
    /// state they set lives in the discarded transport): pagination disable
    /// and friends.
    pub priming_commands: &'static [&'static str],

    /// Regex source matching any of this dialect's prompts.
    pub prompt_pattern: &'static str,

    /// Command prefixes that switch the device into a sub-context
    /// (interface, routing protocol, address family). These transitions are
    /// slower on real hardware and get a longer pacing delay.
    pub context_prefixes: &'static [&'static str],

    /// Output fragments the device uses to report a rejected command.
    pub failure_markers: &'static [&'static str],

    pub(crate) is_config_prompt: fn(&str) -> bool,
}

impl DialectSpec {
    /// Whether `prompt` has this dialect's "inside configuration mode" shape.
    pub fn in_config_mode(&self, prompt: &str) -> bool {
        (self.is_config_prompt)(prompt)
    }

    /// Whether `command` switches the device's command context.
    pub fn is_context_switch(&self, command: &str) -> bool {
        let trimmed = command.trim_start();
        self.context_prefixes.iter().any(|p| trimmed.starts_with(p))
    }

    /// First failure marker present in `output`, if any.
    pub fn detect_failure<'a>(&self, output: &'a str) -> Option<&'static str> {
        let lower = output.to_lowercase();
        self.failure_markers
            .iter()
            .copied()
            .find(|m| lower.contains(m))
    }
}

impl fmt::Debug for DialectSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialectSpec")
            .field("name", &self.name)
            .field("protocol", &self.protocol)
            .field("enter_config", &self.enter_config)
            .field("exit_config", &self.exit_config)
            .field("commit", &self.commit)
            .field("save", &self.save)
            .finish()
    }
}
