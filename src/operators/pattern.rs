//! Pattern matching operators (@rx, @pm, @pmFromFile).

use super::traits::{Operator, OperatorResult};
use crate::engine::Transaction;
use crate::error::{Error, Result};
use aho_corasick::AhoCorasick;
use regex::Regex;

/// Maximum number of capture slots (TX:0 through TX:9).
const CAPTURE_SLOTS: usize = 10;

/// Regex operator (@rx).
pub struct RxOperator {
    pattern: Regex,
}

impl RxOperator {
    /// Compile the pattern; compilation failure is a configuration error.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| Error::RegexCompile {
            pattern: pattern.to_string(),
            source: e,
        })?;
        Ok(Self { pattern: regex })
    }
}

impl Operator for RxOperator {
    fn evaluate(&self, _tx: &Transaction, value: &str) -> OperatorResult {
        match self.pattern.captures(value) {
            Some(caps) => {
                let full = caps.get(0).map_or("", |m| m.as_str()).to_string();
                let captures: Vec<String> = caps
                    .iter()
                    .take(CAPTURE_SLOTS)
                    .map(|c| c.map_or_else(String::new, |m| m.as_str().to_string()))
                    .collect();
                OperatorResult::matched_with_captures(full, captures)
            }
            None => OperatorResult::no_match(),
        }
    }

    fn name(&self) -> &'static str {
        "rx"
    }

    fn supports_capture(&self) -> bool {
        true
    }
}

/// Multi-phrase operator (@pm, @pmFromFile).
pub struct PmOperator {
    automaton: AhoCorasick,
    phrases: Vec<String>,
}

impl PmOperator {
    /// Build from whitespace-separated phrases.
    pub fn new(phrases_str: &str) -> Result<Self> {
        Self::from_phrases(phrases_str.split_whitespace().map(str::to_string).collect())
    }

    /// Build from a phrase file: one phrase per line, `#` comments skipped.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileLoad {
            path: path.into(),
            source: e,
        })?;

        let phrases = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect();

        Self::from_phrases(phrases)
    }

    fn from_phrases(phrases: Vec<String>) -> Result<Self> {
        if phrases.is_empty() {
            return Err(Error::PatternSet {
                message: "empty phrase list".to_string(),
            });
        }

        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&phrases)
            .map_err(|e| Error::PatternSet {
                message: e.to_string(),
            })?;

        Ok(Self { automaton, phrases })
    }
}

impl Operator for PmOperator {
    fn evaluate(&self, _tx: &Transaction, value: &str) -> OperatorResult {
        match self.automaton.find(value) {
            Some(hit) => OperatorResult::matched(self.phrases[hit.pattern().as_usize()].clone()),
            None => OperatorResult::no_match(),
        }
    }

    fn name(&self) -> &'static str {
        "pm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Waf;

    fn tx() -> Transaction {
        Waf::from_directives("").unwrap().new_transaction()
    }

    #[test]
    fn test_rx_match() {
        let op = RxOperator::new(r"^/admin").unwrap();
        assert!(op.evaluate(&tx(), "/admin/users").matched);
        assert!(!op.evaluate(&tx(), "/users/admin").matched);
    }

    #[test]
    fn test_rx_captures_full_match_in_slot_zero() {
        let op = RxOperator::new(r"^/user/(\d+)$").unwrap();
        let result = op.evaluate(&tx(), "/user/42");
        assert!(result.matched);
        assert_eq!(result.captures, vec!["/user/42", "42"]);
    }

    #[test]
    fn test_rx_caps_at_ten_slots() {
        let op = RxOperator::new(r"(a)(b)(c)(d)(e)(f)(g)(h)(i)(j)(k)").unwrap();
        let result = op.evaluate(&tx(), "abcdefghijk");
        assert_eq!(result.captures.len(), 10);
        assert_eq!(result.captures[9], "i");
    }

    #[test]
    fn test_rx_invalid_pattern_is_config_error() {
        assert!(matches!(
            RxOperator::new("(unclosed"),
            Err(Error::RegexCompile { .. })
        ));
    }

    #[test]
    fn test_pm_case_insensitive() {
        let op = PmOperator::new("admin root SUPERUSER").unwrap();
        assert!(op.evaluate(&tx(), "the Admin user").matched);
        assert!(op.evaluate(&tx(), "superuser here").matched);
        assert!(!op.evaluate(&tx(), "guest").matched);
    }

    #[test]
    fn test_pm_reports_phrase() {
        let op = PmOperator::new("alpha beta").unwrap();
        let result = op.evaluate(&tx(), "xx beta yy");
        assert_eq!(result.matched_value.as_deref(), Some("beta"));
    }

    #[test]
    fn test_pm_empty_list_rejected() {
        assert!(PmOperator::new("  ").is_err());
    }
}
