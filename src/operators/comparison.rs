//! String and numeric comparison operators.
//!
//! Arguments may carry macros (`@ge %{tx.threshold}`), expanded per
//! evaluation. Numeric operators parse both sides as floats and treat an
//! unparseable side as 0, which published rule sets rely on.

use super::traits::{Operator, OperatorResult};
use crate::engine::Transaction;
use crate::error::Result;
use crate::macros::Macro;

/// Substring operator (@contains).
pub struct ContainsOperator {
    needle: Macro,
}

impl ContainsOperator {
    pub fn new(needle: &str) -> Result<Self> {
        Ok(Self {
            needle: Macro::compile(needle)?,
        })
    }
}

impl Operator for ContainsOperator {
    fn evaluate(&self, tx: &Transaction, value: &str) -> OperatorResult {
        let needle = self.needle.expand(tx);
        if !needle.is_empty() && value.contains(&needle) {
            OperatorResult::matched(needle)
        } else {
            OperatorResult::no_match()
        }
    }

    fn name(&self) -> &'static str {
        "contains"
    }
}

/// Whole-word substring operator (@containsWord).
pub struct ContainsWordOperator {
    word: Macro,
}

impl ContainsWordOperator {
    pub fn new(word: &str) -> Result<Self> {
        Ok(Self {
            word: Macro::compile(word)?,
        })
    }
}

impl Operator for ContainsWordOperator {
    fn evaluate(&self, tx: &Transaction, value: &str) -> OperatorResult {
        let word = self.word.expand(tx);
        if word.is_empty() {
            return OperatorResult::no_match();
        }

        let bytes = value.as_bytes();
        for (pos, _) in value.match_indices(&word) {
            let before_ok = pos == 0 || !bytes[pos - 1].is_ascii_alphanumeric();
            let end = pos + word.len();
            let after_ok = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
            if before_ok && after_ok {
                return OperatorResult::matched(word);
            }
        }
        OperatorResult::no_match()
    }

    fn name(&self) -> &'static str {
        "containsWord"
    }
}

/// Prefix operator (@beginsWith).
pub struct BeginsWithOperator {
    prefix: Macro,
}

impl BeginsWithOperator {
    pub fn new(prefix: &str) -> Result<Self> {
        Ok(Self {
            prefix: Macro::compile(prefix)?,
        })
    }
}

impl Operator for BeginsWithOperator {
    fn evaluate(&self, tx: &Transaction, value: &str) -> OperatorResult {
        let prefix = self.prefix.expand(tx);
        if value.starts_with(&prefix) {
            OperatorResult::matched(prefix)
        } else {
            OperatorResult::no_match()
        }
    }

    fn name(&self) -> &'static str {
        "beginsWith"
    }
}

/// Suffix operator (@endsWith).
pub struct EndsWithOperator {
    suffix: Macro,
}

impl EndsWithOperator {
    pub fn new(suffix: &str) -> Result<Self> {
        Ok(Self {
            suffix: Macro::compile(suffix)?,
        })
    }
}

impl Operator for EndsWithOperator {
    fn evaluate(&self, tx: &Transaction, value: &str) -> OperatorResult {
        let suffix = self.suffix.expand(tx);
        if value.ends_with(&suffix) {
            OperatorResult::matched(suffix)
        } else {
            OperatorResult::no_match()
        }
    }

    fn name(&self) -> &'static str {
        "endsWith"
    }
}

/// Exact equality operator (@streq).
pub struct StrEqOperator {
    expected: Macro,
}

impl StrEqOperator {
    pub fn new(expected: &str) -> Result<Self> {
        Ok(Self {
            expected: Macro::compile(expected)?,
        })
    }
}

impl Operator for StrEqOperator {
    fn evaluate(&self, tx: &Transaction, value: &str) -> OperatorResult {
        if value == self.expected.expand(tx) {
            OperatorResult::matched(value)
        } else {
            OperatorResult::no_match()
        }
    }

    fn name(&self) -> &'static str {
        "streq"
    }
}

/// List membership operator (@within): the value must appear in the
/// argument's whitespace-separated list.
pub struct WithinOperator {
    list: Macro,
}

impl WithinOperator {
    pub fn new(list: &str) -> Result<Self> {
        Ok(Self {
            list: Macro::compile(list)?,
        })
    }
}

impl Operator for WithinOperator {
    fn evaluate(&self, tx: &Transaction, value: &str) -> OperatorResult {
        if value.is_empty() {
            return OperatorResult::no_match();
        }
        let list = self.list.expand(tx);
        if list.split_whitespace().any(|item| item == value) {
            OperatorResult::matched(value)
        } else {
            OperatorResult::no_match()
        }
    }

    fn name(&self) -> &'static str {
        "within"
    }
}

/// Numeric comparison relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericRelation {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl NumericRelation {
    fn holds(self, left: f64, right: f64) -> bool {
        match self {
            Self::Eq => left == right,
            Self::Ne => left != right,
            Self::Gt => left > right,
            Self::Ge => left >= right,
            Self::Lt => left < right,
            Self::Le => left <= right,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
        }
    }
}

/// Numeric comparison operator (@eq, @ne, @gt, @ge, @lt, @le).
pub struct NumericOperator {
    relation: NumericRelation,
    argument: Macro,
}

impl NumericOperator {
    pub fn new(relation: NumericRelation, argument: &str) -> Result<Self> {
        Ok(Self {
            relation,
            argument: Macro::compile(argument)?,
        })
    }
}

/// Unparseable numbers count as zero.
fn to_number(s: &str) -> f64 {
    s.trim().parse().unwrap_or(0.0)
}

impl Operator for NumericOperator {
    fn evaluate(&self, tx: &Transaction, value: &str) -> OperatorResult {
        let left = to_number(value);
        let right = to_number(&self.argument.expand(tx));
        if self.relation.holds(left, right) {
            OperatorResult::matched(value)
        } else {
            OperatorResult::no_match()
        }
    }

    fn name(&self) -> &'static str {
        self.relation.name()
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
    fn test_contains() {
        let op = ContainsOperator::new("admin").unwrap();
        assert!(op.evaluate(&tx(), "/admin/users").matched);
        assert!(!op.evaluate(&tx(), "/users").matched);
    }

    #[test]
    fn test_contains_word_boundaries() {
        let op = ContainsWordOperator::new("cat").unwrap();
        assert!(op.evaluate(&tx(), "a cat sat").matched);
        assert!(op.evaluate(&tx(), "cat").matched);
        assert!(!op.evaluate(&tx(), "concatenate").matched);
        assert!(!op.evaluate(&tx(), "cats").matched);
    }

    #[test]
    fn test_begins_ends_with() {
        assert!(BeginsWithOperator::new("/admin")
            .unwrap()
            .evaluate(&tx(), "/admin/x")
            .matched);
        assert!(EndsWithOperator::new(".php")
            .unwrap()
            .evaluate(&tx(), "index.php")
            .matched);
    }

    #[test]
    fn test_streq_exact() {
        let op = StrEqOperator::new("admin").unwrap();
        assert!(op.evaluate(&tx(), "admin").matched);
        assert!(!op.evaluate(&tx(), "Admin").matched);
    }

    #[test]
    fn test_streq_macro_argument() {
        let op = StrEqOperator::new("%{TX.expected}").unwrap();
        let mut t = tx();
        t.tx_data_mut().set("expected", "42");
        assert!(op.evaluate(&t, "42").matched);
        assert!(!op.evaluate(&t, "41").matched);
    }

    #[test]
    fn test_within() {
        let op = WithinOperator::new("GET HEAD POST").unwrap();
        assert!(op.evaluate(&tx(), "GET").matched);
        assert!(!op.evaluate(&tx(), "DELETE").matched);
        assert!(!op.evaluate(&tx(), "").matched);
    }

    #[test]
    fn test_ge_spec_values() {
        let op = NumericOperator::new(NumericRelation::Ge, "2500").unwrap();
        assert!(op.evaluate(&tx(), "2800").matched);
        assert!(op.evaluate(&tx(), "2500").matched);
        assert!(!op.evaluate(&tx(), "2400").matched);
    }

    #[test]
    fn test_numeric_unparseable_is_zero() {
        let op = NumericOperator::new(NumericRelation::Lt, "1").unwrap();
        // "abc" parses as 0, and 0 < 1.
        assert!(op.evaluate(&tx(), "abc").matched);

        let op = NumericOperator::new(NumericRelation::Eq, "junk").unwrap();
        assert!(op.evaluate(&tx(), "0").matched);
    }

    #[test]
    fn test_numeric_floats() {
        let op = NumericOperator::new(NumericRelation::Gt, "1.5").unwrap();
        assert!(op.evaluate(&tx(), "1.6").matched);
        assert!(!op.evaluate(&tx(), "1.4").matched);
    }
}
