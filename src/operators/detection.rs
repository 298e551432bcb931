//! Payload detection operators (@detectSQLi, @detectXSS).

use super::traits::{Operator, OperatorResult};
use crate::engine::Transaction;
use crate::injection;

/// SQL injection detection operator (@detectSQLi).
pub struct DetectSqliOperator;

impl Operator for DetectSqliOperator {
    fn evaluate(&self, _tx: &Transaction, value: &str) -> OperatorResult {
        let detection = injection::sqli::detect(value);
        if detection.is_injection {
            OperatorResult::matched(detection.fingerprint.unwrap_or_default())
        } else {
            OperatorResult::no_match()
        }
    }

    fn name(&self) -> &'static str {
        "detectSQLi"
    }
}

/// XSS detection operator (@detectXSS).
pub struct DetectXssOperator;

impl Operator for DetectXssOperator {
    fn evaluate(&self, _tx: &Transaction, value: &str) -> OperatorResult {
        let detection = injection::xss::detect(value);
        if detection.is_injection {
            OperatorResult::matched(detection.fingerprint.unwrap_or_default())
        } else {
            OperatorResult::no_match()
        }
    }

    fn name(&self) -> &'static str {
        "detectXSS"
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
    fn test_detect_sqli_operator() {
        let op = DetectSqliOperator;
        assert!(op.evaluate(&tx(), "1' OR '1'='1").matched);
        assert!(!op.evaluate(&tx(), "plain text").matched);
    }

    #[test]
    fn test_detect_xss_operator() {
        let op = DetectXssOperator;
        let result = op.evaluate(&tx(), "<script>alert(1)</script>");
        assert!(result.matched);
        assert_eq!(result.matched_value.as_deref(), Some("tag"));
        assert!(!op.evaluate(&tx(), "plain text").matched);
    }
}
