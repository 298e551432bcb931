//! Operator registry.

mod comparison;
mod detection;
mod network;
mod pattern;
mod traits;
mod validation;

pub use comparison::{
    BeginsWithOperator, ContainsOperator, ContainsWordOperator, EndsWithOperator, NumericOperator,
    NumericRelation, StrEqOperator, WithinOperator,
};
pub use detection::{DetectSqliOperator, DetectXssOperator};
pub use network::{GeoLookupOperator, IpMatchOperator, RblOperator};
pub use pattern::{PmOperator, RxOperator};
pub use traits::{Operator, OperatorResult};
pub use validation::{
    ValidateByteRangeOperator, ValidateNumericRangeOperator, ValidateUrlEncodingOperator,
    ValidateUtf8EncodingOperator, VerifyCcOperator,
};

use crate::engine::Transaction;
use crate::error::Result;
use crate::parser::{OperatorName, OperatorSpec};
use std::sync::Arc;

/// Compile an operator specification into an executable operator.
///
/// Every compilation failure (bad regex, bad CIDR, unreadable data file)
/// is a configuration error surfaced before the WAF starts.
pub fn compile_operator(spec: &OperatorSpec) -> Result<Arc<dyn Operator>> {
    let arg = spec.argument.as_str();
    let op: Arc<dyn Operator> = match spec.name {
        OperatorName::Rx => Arc::new(RxOperator::new(arg)?),
        OperatorName::Pm => Arc::new(PmOperator::new(arg)?),
        OperatorName::PmFromFile => Arc::new(PmOperator::from_file(arg)?),

        OperatorName::StrEq => Arc::new(StrEqOperator::new(arg)?),
        OperatorName::Contains => Arc::new(ContainsOperator::new(arg)?),
        OperatorName::ContainsWord => Arc::new(ContainsWordOperator::new(arg)?),
        OperatorName::BeginsWith => Arc::new(BeginsWithOperator::new(arg)?),
        OperatorName::EndsWith => Arc::new(EndsWithOperator::new(arg)?),
        OperatorName::Within => Arc::new(WithinOperator::new(arg)?),

        OperatorName::Eq => Arc::new(NumericOperator::new(NumericRelation::Eq, arg)?),
        OperatorName::Ne => Arc::new(NumericOperator::new(NumericRelation::Ne, arg)?),
        OperatorName::Gt => Arc::new(NumericOperator::new(NumericRelation::Gt, arg)?),
        OperatorName::Ge => Arc::new(NumericOperator::new(NumericRelation::Ge, arg)?),
        OperatorName::Lt => Arc::new(NumericOperator::new(NumericRelation::Lt, arg)?),
        OperatorName::Le => Arc::new(NumericOperator::new(NumericRelation::Le, arg)?),

        OperatorName::DetectSqli => Arc::new(DetectSqliOperator),
        OperatorName::DetectXss => Arc::new(DetectXssOperator),

        OperatorName::ValidateUrlEncoding => Arc::new(ValidateUrlEncodingOperator),
        OperatorName::ValidateUtf8Encoding => Arc::new(ValidateUtf8EncodingOperator),
        OperatorName::ValidateByteRange => Arc::new(ValidateByteRangeOperator::new(arg)?),
        OperatorName::ValidateNumericRange => Arc::new(ValidateNumericRangeOperator::new(arg)?),
        OperatorName::VerifyCc => Arc::new(VerifyCcOperator::new(arg)?),

        OperatorName::IpMatch => Arc::new(IpMatchOperator::new(arg)?),
        OperatorName::IpMatchFromFile => Arc::new(IpMatchOperator::from_file(arg)?),
        OperatorName::Rbl => Arc::new(RblOperator::new(arg)?),
        OperatorName::GeoLookup => Arc::new(GeoLookupOperator),

        OperatorName::NoMatch => Arc::new(NoMatchOperator),
        OperatorName::UnconditionalMatch => Arc::new(UnconditionalMatchOperator),
    };
    Ok(op)
}

/// Operator that never matches (@noMatch).
pub struct NoMatchOperator;

impl Operator for NoMatchOperator {
    fn evaluate(&self, _tx: &Transaction, _value: &str) -> OperatorResult {
        OperatorResult::no_match()
    }

    fn name(&self) -> &'static str {
        "noMatch"
    }
}

/// Operator that always matches (@unconditionalMatch, SecAction).
pub struct UnconditionalMatchOperator;

impl Operator for UnconditionalMatchOperator {
    fn evaluate(&self, _tx: &Transaction, value: &str) -> OperatorResult {
        OperatorResult::matched(value)
    }

    fn name(&self) -> &'static str {
        "unconditionalMatch"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Waf;
    use crate::parser::parse_operator;

    #[test]
    fn test_compile_every_inline_operator() {
        let tx = Waf::from_directives("").unwrap().new_transaction();
        for spec in [
            "@rx ^a",
            "@pm a b c",
            "@streq x",
            "@contains x",
            "@containsWord x",
            "@beginsWith x",
            "@endsWith x",
            "@within a b",
            "@eq 1",
            "@ne 1",
            "@gt 1",
            "@ge 1",
            "@lt 1",
            "@le 1",
            "@detectSQLi",
            "@detectXSS",
            "@validateUrlEncoding",
            "@validateUtf8Encoding",
            "@validateByteRange 32-126",
            "@validateNumericRange 1-100",
            "@verifyCC",
            "@ipMatch 10.0.0.0/8",
            "@rbl bl.example.org",
            "@geoLookup",
            "@noMatch",
            "@unconditionalMatch",
        ] {
            let parsed = parse_operator(spec).unwrap();
            let op = compile_operator(&parsed).unwrap();
            // Smoke-run each compiled operator; rbl would hit DNS, skip it.
            if parsed.name != crate::parser::OperatorName::Rbl {
                let _ = op.evaluate(&tx, "probe");
            }
        }
    }

    #[test]
    fn test_unconditional_and_no_match() {
        let tx = Waf::from_directives("").unwrap().new_transaction();
        assert!(UnconditionalMatchOperator.evaluate(&tx, "x").matched);
        assert!(!NoMatchOperator.evaluate(&tx, "x").matched);
    }
}
