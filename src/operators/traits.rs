//! Operator trait definition.

use crate::engine::Transaction;

/// Result of operator evaluation.
#[derive(Debug, Clone, Default)]
pub struct OperatorResult {
    /// Whether the operator matched.
    pub matched: bool,
    /// Capture groups: slot 0 is the full match, 1..9 the regex groups.
    /// Only populated by capture-capable operators.
    pub captures: Vec<String>,
    /// The value (or fragment) that matched, for logging.
    pub matched_value: Option<String>,
}

impl OperatorResult {
    /// A non-match.
    pub fn no_match() -> Self {
        Self::default()
    }

    /// A match without captures.
    pub fn matched(value: impl Into<String>) -> Self {
        Self {
            matched: true,
            captures: Vec::new(),
            matched_value: Some(value.into()),
        }
    }

    /// A match carrying capture slots.
    pub fn matched_with_captures(value: impl Into<String>, captures: Vec<String>) -> Self {
        Self {
            matched: true,
            captures,
            matched_value: Some(value.into()),
        }
    }
}

/// A compiled operator: a predicate over (transaction, value).
///
/// Operators hold no per-transaction state after construction and are
/// shared across concurrent transactions; the transaction reference exists
/// for macro-expanded arguments and nothing else.
pub trait Operator: Send + Sync {
    /// Evaluate the operator against a single resolved value.
    fn evaluate(&self, tx: &Transaction, value: &str) -> OperatorResult;

    /// The canonical operator name.
    fn name(&self) -> &'static str;

    /// Whether this operator can populate capture slots.
    fn supports_capture(&self) -> bool {
        false
    }
}
