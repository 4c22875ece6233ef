//! Input parsing helpers: `If-Match` grammar, UUID parsing, timestamp
//! normalization.

use chrono::{SecondsFormat, Utc};

use crate::error::LedgerError;

/// Parses an `If-Match` header value into the expected current
/// `aggregate_version`.
///
/// Grammar: optional `W/` prefix, optional surrounding double quotes,
/// then a decimal integer body. Anything else is `BadRequest`.
pub fn parse_if_match(header: &str) -> Result<u64, LedgerError> {
    let mut value = header.trim();
    if let Some(rest) = value.strip_prefix("W/") {
        value = rest;
    }
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        value = &value[1..value.len() - 1];
    }
    value
        .parse::<u64>()
        .map_err(|_| LedgerError::BadRequest("If-Match".to_string()))
}

/// Current instant as UTC ISO-8601 with a trailing `Z` (never `+00:00`) —
/// this exact string form enters the canonical hash input.
pub fn utc_now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_integer() {
        assert_eq!(parse_if_match("0").unwrap(), 0);
        assert_eq!(parse_if_match("42").unwrap(), 42);
    }

    #[test]
    fn parses_quoted_integer() {
        assert_eq!(parse_if_match("\"1\"").unwrap(), 1);
    }

    #[test]
    fn parses_weak_validator_prefix() {
        assert_eq!(parse_if_match("W/\"7\"").unwrap(), 7);
        assert_eq!(parse_if_match("W/7").unwrap(), 7);
    }

    #[test]
    fn rejects_non_decimal_body() {
        assert!(parse_if_match("abc").is_err());
        assert!(parse_if_match("1.5").is_err());
        assert!(parse_if_match("").is_err());
    }

    #[test]
    fn utc_now_iso_ends_with_z() {
        let ts = utc_now_iso();
        assert!(ts.ends_with('Z'));
        assert!(!ts.contains("+00:00"));
    }
}
