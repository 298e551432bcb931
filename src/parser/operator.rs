//! Operator parsing for SecRule, with a perfect-hash name table.

use crate::error::{Error, Result};
use phf::phf_map;

/// An operator specification in a SecRule.
#[derive(Debug, Clone)]
pub struct OperatorSpec {
    /// Whether the operator is negated (`!` prefix).
    pub negated: bool,
    /// The operator name.
    pub name: OperatorName,
    /// The literal argument string (may contain macros).
    pub argument: String,
}

/// The closed set of operator names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorName {
    /// Regular expression match.
    Rx,
    /// Multi-phrase match (Aho-Corasick).
    Pm,
    /// Multi-phrase match loaded from a file.
    PmFromFile,

    /// Exact string equality.
    StrEq,
    /// Substring containment.
    Contains,
    /// Whole-word containment.
    ContainsWord,
    /// Prefix match.
    BeginsWith,
    /// Suffix match.
    EndsWith,
    /// Value contained within the argument list.
    Within,

    /// Numeric equality.
    Eq,
    /// Numeric inequality.
    Ne,
    /// Numeric greater-than.
    Gt,
    /// Numeric greater-or-equal.
    Ge,
    /// Numeric less-than.
    Lt,
    /// Numeric less-or-equal.
    Le,

    /// SQL injection heuristic.
    DetectSqli,
    /// XSS heuristic.
    DetectXss,

    /// Reject malformed percent-encoding.
    ValidateUrlEncoding,
    /// Reject invalid or overlong UTF-8.
    ValidateUtf8Encoding,
    /// Reject bytes outside an allowed set.
    ValidateByteRange,
    /// Reject numbers outside an allowed range.
    ValidateNumericRange,
    /// Luhn-checked credit card detection.
    VerifyCc,

    /// IP/CIDR list match.
    IpMatch,
    /// IP/CIDR list match loaded from a file.
    IpMatchFromFile,
    /// DNS block-list lookup.
    Rbl,
    /// Geographic lookup of the value as an address.
    GeoLookup,

    /// Always false.
    NoMatch,
    /// Always true.
    UnconditionalMatch,
}

/// Perfect hash map for O(1) operator name lookup (keys lowercased).
static OPERATOR_MAP: phf::Map<&'static str, OperatorName> = phf_map! {
    "rx" => OperatorName::Rx,
    "pm" => OperatorName::Pm,
    "pmfromfile" => OperatorName::PmFromFile,
    "pmf" => OperatorName::PmFromFile,
    "streq" => OperatorName::StrEq,
    "contains" => OperatorName::Contains,
    "containsword" => OperatorName::ContainsWord,
    "beginswith" => OperatorName::BeginsWith,
    "endswith" => OperatorName::EndsWith,
    "within" => OperatorName::Within,
    "eq" => OperatorName::Eq,
    "ne" => OperatorName::Ne,
    "gt" => OperatorName::Gt,
    "ge" => OperatorName::Ge,
    "lt" => OperatorName::Lt,
    "le" => OperatorName::Le,
    "detectsqli" => OperatorName::DetectSqli,
    "detectxss" => OperatorName::DetectXss,
    "validateurlencoding" => OperatorName::ValidateUrlEncoding,
    "validateutf8encoding" => OperatorName::ValidateUtf8Encoding,
    "validatebyterange" => OperatorName::ValidateByteRange,
    "validatenumericrange" => OperatorName::ValidateNumericRange,
    "verifycc" => OperatorName::VerifyCc,
    "ipmatch" => OperatorName::IpMatch,
    "ipmatchfromfile" => OperatorName::IpMatchFromFile,
    "ipmatchf" => OperatorName::IpMatchFromFile,
    "rbl" => OperatorName::Rbl,
    "geolookup" => OperatorName::GeoLookup,
    "nomatch" => OperatorName::NoMatch,
    "unconditionalmatch" => OperatorName::UnconditionalMatch,
};

impl OperatorName {
    /// Parse an operator name, case-insensitively.
    #[inline]
    pub fn from_name(s: &str) -> Option<Self> {
        if s.bytes().all(|b| b.is_ascii_lowercase()) {
            return OPERATOR_MAP.get(s).copied();
        }
        if s.len() > 32 {
            return None;
        }
        let mut buf = [0u8; 32];
        for (i, b) in s.bytes().enumerate() {
            buf[i] = b.to_ascii_lowercase();
        }
        let lower = std::str::from_utf8(&buf[..s.len()]).ok()?;
        OPERATOR_MAP.get(lower).copied()
    }
}

/// Parse an operator specification.
///
/// A bare pattern without an `@name` prefix means `@rx`, matching the
/// shorthand every published rule set leans on.
pub fn parse_operator(input: &str) -> Result<OperatorSpec> {
    let input = input.trim();

    let (negated, input) = match input.strip_prefix('!') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, input),
    };

    if let Some(rest) = input.strip_prefix('@') {
        let (name_str, argument) = match rest.find(|c: char| c.is_ascii_whitespace()) {
            Some(pos) => (&rest[..pos], rest[pos..].trim_start().to_string()),
            None => (rest, String::new()),
        };

        let name = OperatorName::from_name(name_str).ok_or_else(|| Error::UnknownOperator {
            name: name_str.to_string(),
        })?;

        Ok(OperatorSpec {
            negated,
            name,
            argument,
        })
    } else {
        Ok(OperatorSpec {
            negated,
            name: OperatorName::Rx,
            argument: input.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_explicit_rx() {
        let op = parse_operator("@rx ^/user/(\\d+)$").unwrap();
        assert_eq!(op.name, OperatorName::Rx);
        assert_eq!(op.argument, "^/user/(\\d+)$");
        assert!(!op.negated);
    }

    #[test]
    fn test_parse_implicit_rx() {
        let op = parse_operator("attack.*payload").unwrap();
        assert_eq!(op.name, OperatorName::Rx);
        assert_eq!(op.argument, "attack.*payload");
    }

    #[test]
    fn test_parse_negated() {
        let op = parse_operator("!@streq admin").unwrap();
        assert!(op.negated);
        assert_eq!(op.name, OperatorName::StrEq);
    }

    #[test]
    fn test_parse_no_argument() {
        let op = parse_operator("@detectSQLi").unwrap();
        assert_eq!(op.name, OperatorName::DetectSqli);
        assert!(op.argument.is_empty());
    }

    #[test]
    fn test_name_lookup_case_insensitive() {
        assert_eq!(OperatorName::from_name("ge"), Some(OperatorName::Ge));
        assert_eq!(OperatorName::from_name("GE"), Some(OperatorName::Ge));
        assert_eq!(
            OperatorName::from_name("detectXSS"),
            Some(OperatorName::DetectXss)
        );
        assert_eq!(OperatorName::from_name("nosuchop"), None);
    }

    #[test]
    fn test_unknown_operator_is_error() {
        assert!(matches!(
            parse_operator("@frobnicate x"),
            Err(Error::UnknownOperator { .. })
        ));
    }
}
