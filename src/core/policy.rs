//! Unrestricted-access policy classification
//!
//! The policy this tool enforces: no rule may allow unrestricted inbound
//! access, except on the administrative port. A rule violates iff all of:
//!
//! - `action == ALLOW`
//! - `direction == IN`
//! - the source is one of the two "any address" literals
//! - the destination does not whole-word-match the administrative port
//!
//! DENY rules and OUT-direction rules can never grant unrestricted inbound
//! access, so they are outside the cleanup's threat model entirely.
//!
//! The whole-word port match accepts the literal port number with an optional
//! protocol suffix (`22`, `22/tcp`, `22/udp`) but never a numeric substring
//! (`220`, `5522`). A destination like `22,8080/tcp` still counts as the
//! administrative port because `22` appears as an isolated token.

use crate::core::rule::{Action, Direction, Rule};
use regex::Regex;

/// The two source literals ufw uses for "any address" (IPv4 and IPv6)
pub const ANYWHERE_SOURCES: [&str; 2] = ["Anywhere", "Anywhere (v6)"];

/// A rule scheduled for deletion, from one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub index: u32,
    pub destination: String,
    pub source: String,
    /// Destination matches the configured "should never be open" list.
    /// Advisory only: flagged rules are still deleted.
    pub flagged: bool,
}

/// Compiled form of the cleanup policy
#[derive(Debug, Clone)]
pub struct Policy {
    admin_port: u16,
    admin_pattern: Regex,
    flagged: Vec<(u16, Regex)>,
}

impl Policy {
    /// Builds a policy exempting `admin_port` and flagging `flagged_ports`.
    pub fn new(admin_port: u16, flagged_ports: &[u16]) -> Self {
        Self {
            admin_port,
            admin_pattern: port_pattern(admin_port),
            flagged: flagged_ports
                .iter()
                .map(|&port| (port, port_pattern(port)))
                .collect(),
        }
    }

    pub fn admin_port(&self) -> u16 {
        self.admin_port
    }

    /// Classifies a snapshot, returning the violating rules in discovery
    /// order (ascending by index, since the listing is ordered). Callers
    /// re-order descending before deletion.
    pub fn violations(&self, rules: &[Rule]) -> Vec<Violation> {
        rules
            .iter()
            .filter(|rule| self.is_violation(rule))
            .map(|rule| Violation {
                index: rule.index,
                destination: rule.destination.clone(),
                source: rule.source.clone(),
                flagged: self.flagged_port(&rule.destination).is_some(),
            })
            .collect()
    }

    fn is_violation(&self, rule: &Rule) -> bool {
        rule.action == Action::Allow
            && rule.direction == Direction::In
            && ANYWHERE_SOURCES.contains(&rule.source.as_str())
            && !self.admin_pattern.is_match(&rule.destination)
    }

    /// Returns the first configured "never open" port the destination
    /// whole-word-matches, if any.
    pub fn flagged_port(&self, destination: &str) -> Option<u16> {
        self.flagged
            .iter()
            .find(|(_, pattern)| pattern.is_match(destination))
            .map(|&(port, _)| port)
    }
}

/// Whole-word match for a port, optionally followed by a protocol suffix
fn port_pattern(port: u16) -> Regex {
    Regex::new(&format!(r"\b{port}(/(tcp|udp))?\b")).expect("port pattern is valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_helpers::rule;

    fn default_policy() -> Policy {
        Policy::new(22, &[23, 445, 3389])
    }

    #[test]
    fn test_anywhere_allow_in_violates() {
        let rules = [
            rule(1, "22/tcp", Action::Allow, Direction::In, "Anywhere"),
            rule(2, "8080/tcp", Action::Allow, Direction::In, "Anywhere"),
        ];
        let violations = default_policy().violations(&rules);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].index, 2);
    }

    #[test]
    fn test_ipv6_anywhere_violates() {
        let rules = [
            rule(1, "80/tcp", Action::Allow, Direction::In, "Anywhere"),
            rule(2, "443/tcp", Action::Allow, Direction::In, "Anywhere (v6)"),
        ];
        let violations = default_policy().violations(&rules);
        let indices: Vec<u32> = violations.iter().map(|v| v.index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn test_deny_rules_never_violate() {
        let rules = [rule(1, "8080/tcp", Action::Deny, Direction::In, "Anywhere")];
        assert!(default_policy().violations(&rules).is_empty());
    }

    #[test]
    fn test_out_rules_never_violate() {
        let rules = [rule(1, "8080/tcp", Action::Allow, Direction::Out, "Anywhere")];
        assert!(default_policy().violations(&rules).is_empty());
    }

    #[test]
    fn test_restricted_source_never_violates() {
        let rules = [
            rule(1, "8080/tcp", Action::Allow, Direction::In, "192.168.1.0/24"),
            rule(2, "8080/tcp", Action::Allow, Direction::In, "Anywhere on eth0"),
        ];
        assert!(default_policy().violations(&rules).is_empty());
    }

    #[test]
    fn test_admin_port_whole_word_match() {
        let policy = default_policy();
        let exempt = |dest: &str| {
            policy
                .violations(&[rule(1, dest, Action::Allow, Direction::In, "Anywhere")])
                .is_empty()
        };

        assert!(exempt("22/tcp"));
        assert!(exempt("22"));
        assert!(exempt("22/udp"));
        // 22 as an isolated token inside a combined field still exempts
        assert!(exempt("22,8080/tcp"));

        // Numeric substrings must not exempt
        assert!(!exempt("220/tcp"));
        assert!(!exempt("5522"));
        assert!(!exempt("2200/tcp"));
    }

    #[test]
    fn test_custom_admin_port() {
        let policy = Policy::new(2222, &[]);
        let rules = [
            rule(1, "2222/tcp", Action::Allow, Direction::In, "Anywhere"),
            rule(2, "22/tcp", Action::Allow, Direction::In, "Anywhere"),
        ];
        let violations = policy.violations(&rules);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].index, 2);
    }

    #[test]
    fn test_flagged_ports_are_annotated_but_still_violations() {
        let rules = [
            rule(1, "445/tcp", Action::Allow, Direction::In, "Anywhere"),
            rule(2, "8080/tcp", Action::Allow, Direction::In, "Anywhere"),
        ];
        let violations = default_policy().violations(&rules);
        assert_eq!(violations.len(), 2);
        assert!(violations[0].flagged);
        assert!(!violations[1].flagged);
    }

    #[test]
    fn test_flagged_port_lookup() {
        let policy = default_policy();
        assert_eq!(policy.flagged_port("3389/tcp"), Some(3389));
        assert_eq!(policy.flagged_port("33890/tcp"), None);
        assert_eq!(policy.flagged_port("80/tcp"), None);
    }

    #[test]
    fn test_admin_port_accessor() {
        assert_eq!(default_policy().admin_port(), 22);
    }
}
