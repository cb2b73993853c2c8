//! Duration grammar: decimal integer + optional unit suffix `s|m|h|d`.
//!
//! Internally everything is plain seconds; the suffix only affects the
//! textual form. An empty string parses to zero seconds.

use crate::error::RuleError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Parse a duration literal into seconds.
///
/// `allow_negative` gates whether a negative leading integer is accepted;
/// callers that don't need negative durations should pass `false` so a
/// stray `-5s` in config is rejected rather than silently applied.
pub fn parse(s: &str, allow_negative: bool) -> Result<i64, RuleError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(0);
    }

    let split_at = s
        .find(|c: char| !(c.is_ascii_digit() || c == '-' || c == '+'))
        .unwrap_or(s.len());
    let (num_part, unit) = s.split_at(split_at);

    let num: i64 = num_part
        .parse()
        .map_err(|_| RuleError::BadDuration(s.to_string()))?;
    if num < 0 && !allow_negative {
        return Err(RuleError::BadDuration(s.to_string()));
    }

    let multiplier = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        _ => return Err(RuleError::BadDuration(s.to_string())),
    };
    Ok(num * multiplier)
}

/// Format seconds back into the canonical duration literal: the largest
/// unit that divides evenly, or a bare integer, or "" for zero.
pub fn format(n: i64) -> String {
    if n == 0 {
        return String::new();
    }
    if n % 86_400 == 0 {
        format!("{}d", n / 86_400)
    } else if n % 3600 == 0 {
        format!("{}h", n / 3600)
    } else if n % 60 == 0 {
        format!("{}m", n / 60)
    } else {
        n.to_string()
    }
}

/// A duration value that round-trips through the `s|m|h|d` textual grammar
/// when (de)serialized, for use in config structs that want a human-typed
/// field instead of a bare integer count of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Seconds(pub i64);

impl Seconds {
    pub fn as_secs(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format(self.0))
    }
}

impl FromStr for Seconds {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s, false).map(Seconds)
    }
}

impl Serialize for Seconds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Seconds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Seconds::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_zero() {
        assert_eq!(parse("", false).unwrap(), 0);
    }

    #[test]
    fn bare_seconds() {
        assert_eq!(parse("90", false).unwrap(), 90);
    }

    #[test]
    fn suffixed_units() {
        assert_eq!(parse("2h", false).unwrap(), 7200);
        assert_eq!(parse("1d", false).unwrap(), 86_400);
        assert_eq!(parse("5m", false).unwrap(), 300);
        assert_eq!(parse("5s", false).unwrap(), 5);
    }

    #[test]
    fn negative_rejected_by_default() {
        assert!(parse("-5s", false).is_err());
    }

    #[test]
    fn negative_allowed_when_opted_in() {
        assert_eq!(parse("-5s", true).unwrap(), -5);
    }

    #[test]
    fn unknown_unit_errors() {
        assert!(parse("5x", false).is_err());
    }

    #[test]
    fn bad_integer_errors() {
        assert!(parse("abc", false).is_err());
    }

    #[test]
    fn format_picks_largest_exact_unit() {
        assert_eq!(format(0), "");
        assert_eq!(format(90), "90");
        assert_eq!(format(3600), "1h");
        assert_eq!(format(86_400), "1d");
        assert_eq!(format(120), "2m");
        assert_eq!(format(61), "61");
    }

    proptest::proptest! {
        #[test]
        fn roundtrip_nonnegative_seconds(n in 0i64..10_000_000) {
            let printed = format(n);
            let reparsed = parse(&printed, false).unwrap();
            prop_assert_eq!(reparsed, n);
        }
    }
}
