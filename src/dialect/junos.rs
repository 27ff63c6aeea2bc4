//! Juniper JUNOS dialect definition.
//!
//! JUNOS is declarative: `configure private` opens a private candidate
//! configuration, `set` lines accumulate without touching the running state,
//! `show | compare` renders the pending diff, and `commit` activates the
//! candidate atomically. A rejected commit is rolled back with `rollback 0`
//! and leaves the device untouched.
//!
//! # Prompt examples
//!
//! ```text
//! user@router>              # operational mode
//! user@router#              # configuration mode
//! [edit]
//! user@router#              # configuration mode with edit banner
//! ```

use super::{ConfigProtocol, DialectSpec};

/// Matches both operational (`>`) and configuration (`#`) prompts, with the
/// optional `[edit ...]` banner line JUNOS prints above the config prompt.
const PROMPT: &str = r"(?m)^(\[edit[^\]]*\]\r?\n)?[\w.\-@]{1,63}[>#]\s*$";

pub(super) static JUNOS: DialectSpec = DialectSpec {
    name: "junos",
    protocol: ConfigProtocol::Declarative,
    enter_config: "configure private",
    exit_config: "exit configuration-mode",
    commit: Some("commit"),
    save: None,
    diff: Some("show | compare"),
    rollback: Some("rollback 0"),
    priming_commands: &["set cli screen-length 0", "set cli screen-width 511"],
    prompt_pattern: PROMPT,
    // Candidate-config dialects do not walk sub-contexts command by command;
    // every `set` line carries its full path.
    context_prefixes: &[],
    failure_markers: &[
        "syntax error",
        "unknown command",
        "missing argument",
        "is ambiguous",
        "error:",
    ],
    is_config_prompt,
};

fn is_config_prompt(prompt: &str) -> bool {
    let trimmed = prompt.trim_end();
    trimmed.ends_with('#') || prompt.contains("[edit")
}
