//! Cisco IOS and IOS-XE dialect definitions.
//!
//! Both speak the classic line-mode CLI: `configure terminal` opens a
//! `(config)` bracket, each line takes effect immediately, `end` leaves, and
//! `write memory` persists. IOS-XE differs only in name here — the prompt
//! grammar and mode tokens are identical.
//!
//! # Prompt examples
//!
//! ```text
//! switch>                   # user exec
//! switch#                   # privileged exec
//! switch(config)#           # global configuration
//! switch(config-if)#        # interface sub-context
//! switch(config-router)#    # routing protocol sub-context
//! ```

use super::{ConfigProtocol, DialectSpec};

/// Matches exec, privileged, and any `(config...)` prompt.
const PROMPT: &str = r"(?m)^[\w.\-@/:]{1,63}(\([\w.\-]{0,32}\))?[>#]\s*$";

const CONTEXT_PREFIXES: &[&str] = &[
    "interface ",
    "router ",
    "address-family ",
    "vlan ",
    "line ",
    "ip vrf ",
    "vrf definition ",
];

const FAILURE_MARKERS: &[&str] = &[
    "% invalid input",
    "% incomplete command",
    "% ambiguous command",
    "% unknown command",
];

pub(super) static IOS: DialectSpec = DialectSpec {
    name: "cisco_ios",
    protocol: ConfigProtocol::LineMode,
    enter_config: "configure terminal",
    exit_config: "end",
    commit: None,
    save: Some("write memory"),
    diff: None,
    rollback: None,
    priming_commands: &["terminal length 0", "terminal width 511"],
    prompt_pattern: PROMPT,
    context_prefixes: CONTEXT_PREFIXES,
    failure_markers: FAILURE_MARKERS,
    is_config_prompt,
};

pub(super) static XE: DialectSpec = DialectSpec {
    name: "cisco_xe",
    protocol: ConfigProtocol::LineMode,
    enter_config: "configure terminal",
    exit_config: "end",
    commit: None,
    save: Some("write memory"),
    diff: None,
    rollback: None,
    priming_commands: &["terminal length 0", "terminal width 511"],
    prompt_pattern: PROMPT,
    context_prefixes: CONTEXT_PREFIXES,
    failure_markers: FAILURE_MARKERS,
    is_config_prompt,
};

fn is_config_prompt(prompt: &str) -> bool {
    prompt.contains("(config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_prompt_shapes() {
        assert!(is_config_prompt("switch(config)#"));
        assert!(is_config_prompt("switch(config-if)#"));
        assert!(is_config_prompt("core-rtr1(config-router)#"));
        assert!(!is_config_prompt("switch#"));
        assert!(!is_config_prompt("switch>"));
    }

    #[test]
    fn test_prompt_pattern() {
        let re = regex::bytes::Regex::new(PROMPT).unwrap();
        assert!(re.is_match(b"switch>"));
        assert!(re.is_match(b"switch# "));
        assert!(re.is_match(b"switch(config)#"));
        assert!(re.is_match(b"core-rtr1(config-if)# "));
        assert!(re.is_match(b"output line\nswitch#"));
        assert!(!re.is_match(b"building configuration..."));
    }

    #[test]
    fn test_context_switch_detection() {
        assert!(IOS.is_context_switch("interface GigabitEthernet0/1"));
        assert!(IOS.is_context_switch("router bgp 65000"));
        assert!(IOS.is_context_switch("address-family ipv4 vrf CUST"));
        assert!(!IOS.is_context_switch("no shutdown"));
        assert!(!IOS.is_context_switch("description uplink"));
    }

    #[test]
    fn test_failure_markers() {
        assert_eq!(
            IOS.detect_failure("% Invalid input detected at '^' marker."),
            Some("% invalid input")
        );
        assert!(IOS.detect_failure("VLAN 100 created").is_none());
    }
}
