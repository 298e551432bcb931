//! Validation operators: they match when the value is *invalid*.

use super::traits::{Operator, OperatorResult};
use crate::engine::Transaction;
use crate::error::{Error, Result};
use regex::Regex;

/// @validateUrlEncoding: match on malformed percent-encoding.
pub struct ValidateUrlEncodingOperator;

impl Operator for ValidateUrlEncodingOperator {
    fn evaluate(&self, _tx: &Transaction, value: &str) -> OperatorResult {
        if valid_url_encoding(value) {
            OperatorResult::no_match()
        } else {
            OperatorResult::matched(value)
        }
    }

    fn name(&self) -> &'static str {
        "validateUrlEncoding"
    }
}

fn valid_url_encoding(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let ok = matches!(
                (bytes.get(i + 1), bytes.get(i + 2)),
                (Some(a), Some(b)) if a.is_ascii_hexdigit() && b.is_ascii_hexdigit()
            );
            if !ok {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

/// @validateUtf8Encoding: match on byte sequences a correct UTF-8 decoder
/// would reject (overlong forms, invalid lead bytes, embedded NUL).
pub struct ValidateUtf8EncodingOperator;

impl Operator for ValidateUtf8EncodingOperator {
    fn evaluate(&self, _tx: &Transaction, value: &str) -> OperatorResult {
        if valid_utf8_bytes(value.as_bytes()) {
            OperatorResult::no_match()
        } else {
            OperatorResult::matched(value)
        }
    }

    fn name(&self) -> &'static str {
        "validateUtf8Encoding"
    }
}

fn valid_utf8_bytes(bytes: &[u8]) -> bool {
    for &b in bytes {
        // 0xC0/0xC1 lead bytes always encode overlong forms; 0xF5..0xFF are
        // outside the Unicode range.
        if b == 0 || b == 0xC0 || b == 0xC1 || b >= 0xF5 {
            return false;
        }
    }
    true
}

/// @validateByteRange: match when any byte falls outside the allowed set.
///
/// Argument syntax: `"0-255"`, `"32-126,10,13"`, etc.
pub struct ValidateByteRangeOperator {
    allowed: [bool; 256],
}

impl ValidateByteRangeOperator {
    pub fn new(ranges: &str) -> Result<Self> {
        let mut allowed = [false; 256];

        for part in ranges.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (lo, hi) = match part.split_once('-') {
                Some((lo, hi)) => (parse_byte(lo)?, parse_byte(hi)?),
                None => {
                    let b = parse_byte(part)?;
                    (b, b)
                }
            };
            if lo > hi {
                return Err(Error::config(format!("invalid byte range '{part}'")));
            }
            for b in lo..=hi {
                allowed[b as usize] = true;
            }
        }

        Ok(Self { allowed })
    }
}

fn parse_byte(s: &str) -> Result<u16> {
    let n: u16 = s
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("invalid byte value '{s}'")))?;
    if n > 255 {
        return Err(Error::config(format!("byte value {n} out of range")));
    }
    Ok(n)
}

impl Operator for ValidateByteRangeOperator {
    fn evaluate(&self, _tx: &Transaction, value: &str) -> OperatorResult {
        for &b in value.as_bytes() {
            if !self.allowed[b as usize] {
                return OperatorResult::matched(format!("{b}"));
            }
        }
        OperatorResult::no_match()
    }

    fn name(&self) -> &'static str {
        "validateByteRange"
    }
}

/// @validateNumericRange: match when the value, parsed as a number, falls
/// outside `min-max` (a single number means an exact bound).
pub struct ValidateNumericRangeOperator {
    min: f64,
    max: f64,
}

impl ValidateNumericRangeOperator {
    pub fn new(range: &str) -> Result<Self> {
        let range = range.trim();
        let (min, max) = match range.split_once('-') {
            Some((lo, hi)) => (parse_float(lo)?, parse_float(hi)?),
            None => {
                let n = parse_float(range)?;
                (n, n)
            }
        };
        if min > max {
            return Err(Error::config(format!("invalid numeric range '{range}'")));
        }
        Ok(Self { min, max })
    }
}

fn parse_float(s: &str) -> Result<f64> {
    s.trim()
        .parse()
        .map_err(|_| Error::config(format!("invalid number '{s}'")))
}

impl Operator for ValidateNumericRangeOperator {
    fn evaluate(&self, _tx: &Transaction, value: &str) -> OperatorResult {
        // Unparseable input counts as zero, as for comparison operators.
        let n: f64 = value.trim().parse().unwrap_or(0.0);
        if n < self.min || n > self.max {
            OperatorResult::matched(value)
        } else {
            OperatorResult::no_match()
        }
    }

    fn name(&self) -> &'static str {
        "validateNumericRange"
    }
}

/// @verifyCC: regex candidates filtered through the Luhn checksum.
pub struct VerifyCcOperator {
    pattern: Regex,
}

impl VerifyCcOperator {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = if pattern.is_empty() {
            // Common PAN shapes: 13-16 digits with optional separators.
            r"\b(?:\d[ -]?){12,15}\d\b"
        } else {
            pattern
        };
        let regex = Regex::new(pattern).map_err(|e| Error::RegexCompile {
            pattern: pattern.to_string(),
            source: e,
        })?;
        Ok(Self { pattern: regex })
    }
}

impl Operator for VerifyCcOperator {
    fn evaluate(&self, _tx: &Transaction, value: &str) -> OperatorResult {
        for m in self.pattern.find_iter(value) {
            let digits: Vec<u32> = m
                .as_str()
                .chars()
                .filter_map(|c| c.to_digit(10))
                .collect();
            if digits.len() >= 13 && luhn_valid(&digits) {
                return OperatorResult::matched(m.as_str());
            }
        }
        OperatorResult::no_match()
    }

    fn name(&self) -> &'static str {
        "verifyCC"
    }
}

fn luhn_valid(digits: &[u32]) -> bool {
    let mut sum = 0;
    for (i, &d) in digits.iter().rev().enumerate() {
        let mut d = d;
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Waf;

    fn tx() -> Transaction {
        Waf::from_directives("").unwrap().new_transaction()
    }

    #[test]
    fn test_url_encoding_validation() {
        let op = ValidateUrlEncodingOperator;
        assert!(!op.evaluate(&tx(), "hello%20world").matched);
        assert!(op.evaluate(&tx(), "hello%2").matched);
        assert!(op.evaluate(&tx(), "hello%GG").matched);
    }

    #[test]
    fn test_byte_range() {
        let op = ValidateByteRangeOperator::new("32-126").unwrap();
        assert!(!op.evaluate(&tx(), "printable text").matched);
        assert!(op.evaluate(&tx(), "tab\there").matched);

        let op = ValidateByteRangeOperator::new("32-126,9,10,13").unwrap();
        assert!(!op.evaluate(&tx(), "tab\there\n").matched);
    }

    #[test]
    fn test_byte_range_rejects_bad_config() {
        assert!(ValidateByteRangeOperator::new("300").is_err());
        assert!(ValidateByteRangeOperator::new("9-5").is_err());
    }

    #[test]
    fn test_numeric_range() {
        let op = ValidateNumericRangeOperator::new("1-65535").unwrap();
        assert!(!op.evaluate(&tx(), "8080").matched);
        assert!(op.evaluate(&tx(), "0").matched);
        assert!(op.evaluate(&tx(), "70000").matched);
        // Unparseable becomes 0, which is out of range here.
        assert!(op.evaluate(&tx(), "junk").matched);
    }

    #[test]
    fn test_verify_cc_luhn() {
        let op = VerifyCcOperator::new("").unwrap();
        // 4111111111111111 passes Luhn; flipping the last digit fails it.
        assert!(op.evaluate(&tx(), "card: 4111 1111 1111 1111").matched);
        assert!(!op.evaluate(&tx(), "card: 4111 1111 1111 1112").matched);
        assert!(!op.evaluate(&tx(), "just some digits 1234").matched);
    }
}
