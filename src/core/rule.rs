//! Rule records and the numbered-listing parser
//!
//! This module defines the structured view of one entry in the live ufw rule
//! table and the parser that produces it from the textual output of
//! `ufw status numbered`.
//!
//! # Listing grammar
//!
//! Each rule line has the shape
//!
//! ```text
//! [ 3] 8080/tcp                   ALLOW IN    Anywhere
//! ```
//!
//! i.e. `[ <index> ] <destination> <ACTION> <DIRECTION> <source>`, where the
//! destination may contain internal whitespace (service names, `(v6)`
//! annotations) and is captured lazily up to the action keyword. Header,
//! separator, and blank lines do not match the grammar and are skipped
//! silently.
//!
//! # Index lifetime
//!
//! A [`Rule`]'s `index` is only meaningful within the snapshot it was parsed
//! from: deleting any rule renumbers everything after it. Rules are read,
//! classified, and discarded within a single pass.

use regex::Regex;
use std::sync::LazyLock;

static RULE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\[\s*(?P<idx>\d+)\]\s+(?P<to>.+?)\s+(?P<action>ALLOW|DENY)\s+(?P<dir>IN|OUT)\s+(?P<from>.+)$",
    )
    .expect("rule line pattern is valid")
});

/// What a matching packet is subjected to
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr)]
pub enum Action {
    /// Traffic is permitted
    #[strum(serialize = "ALLOW")]
    Allow,
    /// Traffic is rejected or dropped
    #[strum(serialize = "DENY")]
    Deny,
}

/// Traffic direction the rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr)]
pub enum Direction {
    /// Inbound traffic
    #[strum(serialize = "IN")]
    In,
    /// Outbound traffic
    #[strum(serialize = "OUT")]
    Out,
}

/// One entry in the live, numbered ufw rule table
///
/// Ephemeral: reconstructed on every poll, never persisted, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Current position in the ordered rule table (1-based). Shifts whenever
    /// a rule at a lower index is deleted.
    pub index: u32,
    /// Free-text protected resource, e.g. `22/tcp`, `8080`, `Samba`
    pub destination: String,
    pub action: Action,
    pub direction: Direction,
    /// Free-text permitted origin, e.g. `Anywhere`, `Anywhere (v6)`, a CIDR
    pub source: String,
}

/// Parses the full output of `ufw status numbered` into rule records,
/// in listing order. Lines that do not match the grammar are ignored.
pub fn parse_listing(output: &str) -> Vec<Rule> {
    output.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<Rule> {
    let caps = RULE_LINE.captures(line.trim())?;
    Some(Rule {
        index: caps["idx"].parse().ok()?,
        destination: caps["to"].trim().to_string(),
        action: caps["action"].parse().ok()?,
        direction: caps["dir"].parse().ok()?,
        source: caps["from"].trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE_LISTING: &str = "\
Status: active

     To                         Action      From
     --                         ------      ----
[ 1] 22/tcp                     ALLOW IN    Anywhere
[ 2] 8080/tcp                   ALLOW IN    Anywhere
[ 3] 80/tcp                     ALLOW IN    192.168.1.0/24
[ 4] 22/tcp (v6)                ALLOW IN    Anywhere (v6)
[ 5] 53                         ALLOW OUT   Anywhere
[ 6] 23/tcp                     DENY IN     Anywhere
";

    #[test]
    fn test_parse_sample_listing() {
        let rules = parse_listing(SAMPLE_LISTING);
        assert_eq!(rules.len(), 6);

        assert_eq!(rules[0].index, 1);
        assert_eq!(rules[0].destination, "22/tcp");
        assert_eq!(rules[0].action, Action::Allow);
        assert_eq!(rules[0].direction, Direction::In);
        assert_eq!(rules[0].source, "Anywhere");

        assert_eq!(rules[3].destination, "22/tcp (v6)");
        assert_eq!(rules[3].source, "Anywhere (v6)");

        assert_eq!(rules[4].direction, Direction::Out);
        assert_eq!(rules[5].action, Action::Deny);
    }

    #[test]
    fn test_headers_and_blanks_are_skipped() {
        let rules = parse_listing("Status: active\n\n     To    Action    From\n");
        assert!(rules.is_empty());
    }

    #[test]
    fn test_index_padding_is_tolerated() {
        let rules = parse_listing("[12] 443/tcp ALLOW IN Anywhere\n[ 3] 80 ALLOW IN Anywhere");
        assert_eq!(rules[0].index, 12);
        assert_eq!(rules[1].index, 3);
    }

    #[test]
    fn test_destination_with_internal_whitespace() {
        let rules = parse_listing("[ 1] OpenSSH (v6)  ALLOW IN  Anywhere (v6)");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].destination, "OpenSSH (v6)");
        assert_eq!(rules[0].source, "Anywhere (v6)");
    }

    #[test]
    fn test_unparsable_lines_are_not_an_error() {
        let listing = "[ 1] 22/tcp ALLOW IN Anywhere\ngarbage line\n[x] bad index ALLOW IN Anywhere";
        let rules = parse_listing(listing);
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_unknown_action_keyword_is_skipped() {
        let rules = parse_listing("[ 1] 22/tcp LIMIT IN Anywhere");
        assert!(rules.is_empty());
    }

    #[test]
    fn test_action_direction_wire_tokens() {
        assert_eq!(Action::Allow.to_string(), "ALLOW");
        assert_eq!(Direction::In.as_ref(), "IN");
        assert_eq!("DENY".parse::<Action>().unwrap(), Action::Deny);
        assert_eq!("OUT".parse::<Direction>().unwrap(), Direction::Out);
    }

    proptest! {
        // Arbitrary input is noise at worst: the parser must skip it, not panic.
        #[test]
        fn parser_never_panics(input in "\\PC*") {
            let _ = parse_listing(&input);
        }
    }
}
