//! Huawei VRP dialect definition.
//!
//! VRP is a transactional CLI: `system-view` opens configuration mode, the
//! prompt flips from angle brackets to square brackets, and after the batch
//! an explicit `commit` activates the configuration followed by `save` to
//! persist it. `save` routinely asks for a `[Y/N]` confirmation.
//!
//! # Prompt examples
//!
//! ```text
//! <CE6850>                  # user view
//! [CE6850]                  # system view
//! [CE6850-GigabitEthernet0/0/1]   # interface view
//! [CE6850-bgp]              # protocol view
//! ```

use super::{ConfigProtocol, DialectSpec};

/// Matches both the `<...>` user view and the `[...]` system view prompts.
const PROMPT: &str = r"(?m)^[<\[][\w.\-/]{1,63}[>\]]\s*$";

pub(super) static VRP: DialectSpec = DialectSpec {
    name: "huawei_vrp",
    protocol: ConfigProtocol::TransactionalCli,
    enter_config: "system-view",
    exit_config: "quit",
    commit: Some("commit"),
    save: Some("save"),
    diff: None,
    rollback: None,
    priming_commands: &["screen-length 0 temporary"],
    prompt_pattern: PROMPT,
    context_prefixes: &[
        "interface ",
        "bgp ",
        "ospf ",
        "vlan ",
        "bridge-domain ",
        "ip vpn-instance ",
        "evpn vpn-instance ",
        "ipv4-family",
        "l2vpn-family",
        "area ",
    ],
    failure_markers: &[
        "error:",
        "unrecognized command",
        "incomplete command",
        "wrong parameter",
    ],
    is_config_prompt,
};

/// System view and every sub-view render the prompt in square brackets.
fn is_config_prompt(prompt: &str) -> bool {
    let trimmed = prompt.trim();
    trimmed.starts_with('[') && trimmed.ends_with(']')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_prompt_shapes() {
        assert!(is_config_prompt("[CE6850]"));
        assert!(is_config_prompt("[CE6850-GigabitEthernet0/0/1]"));
        assert!(is_config_prompt("[CE6850-bgp] "));
        assert!(!is_config_prompt("<CE6850>"));
        assert!(!is_config_prompt("<CE6850> "));
    }

    #[test]
    fn test_prompt_pattern() {
        let re = regex::bytes::Regex::new(PROMPT).unwrap();
        assert!(re.is_match(b"<CE6850>"));
        assert!(re.is_match(b"[CE6850]"));
        assert!(re.is_match(b"[CE6850-Vbdif100] "));
        assert!(re.is_match(b"Info: command executed\n[CE6850]"));
        assert!(!re.is_match(b"Warning: The current configuration"));
    }

    #[test]
    fn test_context_switch_detection() {
        assert!(VRP.is_context_switch("interface Vbdif100"));
        assert!(VRP.is_context_switch("bgp 65000"));
        assert!(VRP.is_context_switch("ipv4-family vpn-instance CUST"));
        assert!(VRP.is_context_switch("l2vpn-family evpn"));
        assert!(!VRP.is_context_switch("undo shutdown"));
        assert!(!VRP.is_context_switch("quit"));
    }

    #[test]
    fn test_failure_markers() {
        assert_eq!(
            VRP.detect_failure("Error: Unrecognized command found at '^' position."),
            Some("error:")
        );
        assert!(VRP.detect_failure("Info: VLAN 100 created").is_none());
    }
}
