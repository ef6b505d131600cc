//! Direct-rule text generation
//!
//! Turns a [`RuleDescriptor`] plus an action and an address family into the
//! argument string `firewall-cmd --direct` expects, for example:
//!
//! ```text
//! ipv4 filter INPUT 1 -s 1.2.3.4/32 -d 5.6.7.8/32 -i lo -p tcp -m tcp -m state --state NEW -m comment --comment 'hello' -j DROP
//! ```
//!
//! Clause order matters to the engine and to the existence check, which
//! matches compiled text against the engine's rule dump. The output for a
//! given descriptor, action and family never varies.

use std::fmt::Write;

use crate::core::error::{Error, Result};
use crate::core::family::AddressFamily;
use crate::core::rule::{ActionKind, Protocol, RuleDescriptor};

/// Table every compiled rule is addressed to
const TABLE: &str = "filter";

/// Chain used when no direction is given
const FORWARD_CHAIN: &str = "FORWARD";

/// Compiles one rule for one family.
///
/// A descriptor carrying `raw` text compiles to that text, trimmed, whatever
/// the action and family.
///
/// # Errors
///
/// Returns `Error::InvalidArgument` if:
/// - `action` is `Remove`, which has no target
/// - `action` is `Redirect` and the descriptor has no `redirect_port`
pub fn compile(
    descriptor: &RuleDescriptor,
    action: ActionKind,
    family: AddressFamily,
) -> Result<String> {
    if let Some(raw) = &descriptor.raw {
        return Ok(raw.trim().to_string());
    }

    let target = action.target().ok_or_else(|| {
        Error::InvalidArgument(format!("'{action}' has no target and cannot be compiled"))
    })?;

    let redirect_port = match (action, descriptor.redirect_port) {
        (ActionKind::Redirect, None) => {
            return Err(Error::InvalidArgument(
                "redirect_port is required for a redirect rule".to_string(),
            ));
        }
        (ActionKind::Redirect, port) => port,
        _ => None,
    };

    let mut out = String::with_capacity(128);

    let chain = descriptor.direction.map_or(FORWARD_CHAIN, |d| d.chain());
    let _ = write!(out, "{family} {TABLE} {chain} {} ", descriptor.position);

    if descriptor.direction.is_some_and(|d| d.is_nat()) {
        out.push_str("-t nat ");
    }

    if let Some(source) = descriptor.effective_source() {
        let _ = write!(out, "-s {source} ");
    }
    if let Some(destination) = descriptor.effective_destination() {
        let _ = write!(out, "-d {destination} ");
    }

    if let Some(interface) = &descriptor.interface {
        let _ = write!(out, "-i {interface} ");
    }
    if let Some(interface) = &descriptor.dest_interface {
        let _ = write!(out, "-o {interface} ");
    }

    if let Some(protocol) = &descriptor.protocol {
        let _ = write!(out, "-p {protocol} ");
        if *protocol == Protocol::Tcp {
            out.push_str("-m tcp ");
        }
    }

    // multiport for single ports too, so every port clause has one shape
    if let Some(ports) = &descriptor.source_port {
        let _ = write!(out, "-m multiport --sports {ports} ");
    }
    if let Some(ports) = descriptor.dest_ports() {
        let _ = write!(out, "-m multiport --dports {ports} ");
    }

    if let Some(states) = &descriptor.stateful {
        let _ = write!(out, "-m state --state {states} ");
    }

    let description = descriptor.description.as_deref().unwrap_or_default();
    let _ = write!(out, "-m comment --comment '{description}' ");

    let _ = write!(out, "-j {target} ");

    if let Some(port) = redirect_port {
        let _ = write!(out, "--to-ports {port} ");
    }

    out.truncate(out.trim_end().len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rule::{ConnState, Direction, PortEntry, PortSpec, StateSpec};
    use proptest::prelude::*;

    fn tcp_rule() -> RuleDescriptor {
        RuleDescriptor {
            protocol: Some(Protocol::Tcp),
            ..RuleDescriptor::default()
        }
    }

    #[test]
    fn test_minimal_rule() {
        let rule = compile(
            &RuleDescriptor::default(),
            ActionKind::Allow,
            AddressFamily::V4,
        )
        .unwrap();
        assert_eq!(
            rule,
            "ipv4 filter FORWARD 1 -m comment --comment '' -j ACCEPT"
        );
    }

    #[test]
    fn test_full_clause_order() {
        let descriptor = RuleDescriptor {
            direction: Some(Direction::In),
            position: 5,
            source: Some("1.2.3.4/32".into()),
            destination: Some("5.6.7.8/32".into()),
            interface: Some("lo".into()),
            dest_interface: Some("eth0".into()),
            protocol: Some(Protocol::Tcp),
            source_port: Some(PortSpec::single(1024)),
            port: Some("443,80".parse().unwrap()),
            stateful: Some(StateSpec::new(vec![ConnState::New, ConnState::Established])),
            description: Some("hello".into()),
            ..RuleDescriptor::default()
        };

        let rule = compile(&descriptor, ActionKind::Deny, AddressFamily::V4).unwrap();
        assert_eq!(
            rule,
            "ipv4 filter INPUT 5 -s 1.2.3.4/32 -d 5.6.7.8/32 -i lo -o eth0 -p tcp -m tcp \
             -m multiport --sports 1024 -m multiport --dports 80,443 \
             -m state --state NEW,ESTABLISHED -m comment --comment 'hello' -j DROP"
        );
    }

    #[test]
    fn test_prerouting_uses_nat_flag() {
        let descriptor = RuleDescriptor {
            direction: Some(Direction::Pre),
            ..RuleDescriptor::default()
        };
        let rule = compile(&descriptor, ActionKind::Allow, AddressFamily::V4).unwrap();
        assert!(rule.starts_with("ipv4 filter PREROUTING 1 -t nat "));

        let descriptor = RuleDescriptor {
            direction: Some(Direction::Post),
            ..RuleDescriptor::default()
        };
        let rule = compile(&descriptor, ActionKind::Masquerade, AddressFamily::V4).unwrap();
        assert!(rule.contains("POSTROUTING 1 -t nat "));
        assert!(rule.ends_with("-j MASQUERADE"));
    }

    #[test]
    fn test_forward_without_direction() {
        let rule = compile(&tcp_rule(), ActionKind::Allow, AddressFamily::V6).unwrap();
        assert!(rule.starts_with("ipv6 filter FORWARD 1 "));
        assert!(!rule.contains("-t nat"));
    }

    #[test]
    fn test_redirect_target() {
        let descriptor = RuleDescriptor {
            redirect_port: Some(8080),
            ..tcp_rule()
        };
        let rule = compile(&descriptor, ActionKind::Redirect, AddressFamily::V4).unwrap();
        assert!(rule.ends_with("-j REDIRECT --to-ports 8080"));
        assert_eq!(rule.matches("-m tcp").count(), 1);
    }

    #[test]
    fn test_redirect_port_ignored_for_other_actions() {
        let descriptor = RuleDescriptor {
            redirect_port: Some(8080),
            ..tcp_rule()
        };
        let rule = compile(&descriptor, ActionKind::Allow, AddressFamily::V4).unwrap();
        assert!(!rule.contains("--to-ports"));
    }

    #[test]
    fn test_redirect_without_port() {
        let result = compile(&tcp_rule(), ActionKind::Redirect, AddressFamily::V4);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_remove_is_not_compilable() {
        let result = compile(&tcp_rule(), ActionKind::Remove, AddressFamily::V4);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_log_target() {
        let rule = compile(&tcp_rule(), ActionKind::Log, AddressFamily::V4).unwrap();
        assert!(rule.ends_with("-j LOG --log-prefix 'iptables: ' --log-level 7"));
    }

    #[test]
    fn test_udp_has_no_match_module() {
        let descriptor = RuleDescriptor {
            protocol: Some(Protocol::Udp),
            port: Some(PortSpec::single(53)),
            ..RuleDescriptor::default()
        };
        let rule = compile(&descriptor, ActionKind::Allow, AddressFamily::V4).unwrap();
        assert!(rule.contains("-p udp -m multiport --dports 53 "));
        assert!(!rule.contains("-m tcp"));
    }

    #[test]
    fn test_any_source_omitted() {
        let descriptor = RuleDescriptor {
            source: Some("0.0.0.0/0".into()),
            ..RuleDescriptor::default()
        };
        let rule = compile(&descriptor, ActionKind::Allow, AddressFamily::V4).unwrap();
        assert!(!rule.contains("-s "));
    }

    #[test]
    fn test_dest_port_beats_port() {
        let descriptor = RuleDescriptor {
            dest_port: Some(PortSpec::single(22)),
            port: Some(PortSpec::single(80)),
            ..tcp_rule()
        };
        let rule = compile(&descriptor, ActionKind::Allow, AddressFamily::V4).unwrap();
        assert!(rule.contains("--dports 22 "));
        assert!(!rule.contains("--dports 80"));
    }

    #[test]
    fn test_raw_override() {
        let descriptor = RuleDescriptor {
            raw: Some("  ipv4 filter INPUT 1 -j ACCEPT \n".into()),
            protocol: Some(Protocol::Udp),
            ..RuleDescriptor::default()
        };
        for action in [ActionKind::Deny, ActionKind::Remove, ActionKind::Redirect] {
            for family in [AddressFamily::V4, AddressFamily::V6] {
                assert_eq!(
                    compile(&descriptor, action, family).unwrap(),
                    "ipv4 filter INPUT 1 -j ACCEPT"
                );
            }
        }
    }

    #[test]
    fn test_tcp_match_only_for_exact_token() {
        for (token, expected) in [
            ("tcp", "-p tcp -m tcp -m comment"),
            ("TCP", "-p TCP -m comment"),
            ("47", "-p 47 -m comment"),
        ] {
            let descriptor = RuleDescriptor {
                protocol: Some(token.parse().unwrap()),
                ..RuleDescriptor::default()
            };
            let rule = compile(&descriptor, ActionKind::Allow, AddressFamily::V4).unwrap();
            assert!(rule.contains(expected), "{token}: {rule}");
        }
    }

    proptest! {
        #[test]
        fn prop_compile_is_deterministic(
            position in 1u32..1000,
            port in 1u16..,
            description in "[a-zA-Z0-9 ]{0,20}",
            tcp in any::<bool>(),
        ) {
            let descriptor = RuleDescriptor {
                position,
                port: Some(PortSpec::single(port)),
                description: Some(description),
                protocol: Some(if tcp { Protocol::Tcp } else { Protocol::Udp }),
                ..RuleDescriptor::default()
            };
            let first = compile(&descriptor, ActionKind::Reject, AddressFamily::V4).unwrap();
            let second = compile(&descriptor, ActionKind::Reject, AddressFamily::V4).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert!(first.ends_with("-j REJECT"));
            prop_assert_eq!(first.trim_end(), first.as_str());
        }

        #[test]
        fn prop_port_order_does_not_change_rule(ports in proptest::collection::vec(1u16.., 1..8)) {
            let forward = PortSpec::new(ports.iter().copied().map(PortEntry::Single).collect());
            let reversed = PortSpec::new(ports.iter().rev().copied().map(PortEntry::Single).collect());

            let a = RuleDescriptor { port: Some(forward), ..RuleDescriptor::default() };
            let b = RuleDescriptor { port: Some(reversed), ..RuleDescriptor::default() };
            prop_assert_eq!(
                compile(&a, ActionKind::Allow, AddressFamily::V6).unwrap(),
                compile(&b, ActionKind::Allow, AddressFamily::V6).unwrap()
            );
        }
    }
}
