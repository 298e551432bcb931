//! Ordered transformation pipelines.

use super::{create_transformation, Transformation};
use crate::error::Result;
use std::borrow::Cow;
use std::sync::Arc;

/// An ordered list of transformations compiled from `t:` actions.
///
/// `t:none,t:lowercase,t:trim` applies `trim(lowercase(x))`: declaration
/// order is application order, and `none` drops everything declared before
/// it.
#[derive(Clone, Default)]
pub struct TransformationPipeline {
    steps: Vec<Arc<dyn Transformation>>,
}

impl TransformationPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a pipeline from transformation names, honoring `none`.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut steps: Vec<Arc<dyn Transformation>> = Vec::with_capacity(names.len());

        for name in names {
            let name = name.as_ref();
            if name.eq_ignore_ascii_case("none") {
                steps.clear();
                continue;
            }
            steps.push(create_transformation(name)?);
        }

        Ok(Self { steps })
    }

    /// Apply the whole pipeline.
    pub fn apply<'a>(&self, input: &'a str) -> Cow<'a, str> {
        let mut current: Cow<'a, str> = Cow::Borrowed(input);
        for step in &self.steps {
            current = match current {
                Cow::Borrowed(s) => step.transform(s),
                Cow::Owned(s) => Cow::Owned(step.transform(&s).into_owned()),
            };
        }
        current
    }

    /// Apply step by step, yielding each intermediate value.
    ///
    /// Used by multiMatch: the operator runs against the untransformed value
    /// and after every step. Skips intermediates identical to their
    /// predecessor so an idempotent step does not double-test a value.
    pub fn apply_stepwise(&self, input: &str) -> Vec<String> {
        let mut out = Vec::with_capacity(self.steps.len());
        let mut current = input.to_string();
        for step in &self.steps {
            let next = step.transform(&current).into_owned();
            if next != current {
                out.push(next.clone());
                current = next;
            }
        }
        out
    }

    /// Whether the pipeline has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

impl std::fmt::Debug for TransformationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformationPipeline")
            .field(
                "steps",
                &self.steps.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pipeline_is_identity() {
        let p = TransformationPipeline::new();
        assert_eq!(p.apply("UnChanged"), "UnChanged");
    }

    #[test]
    fn test_declaration_order() {
        let p = TransformationPipeline::from_names(&["urlDecode", "lowercase"]).unwrap();
        assert_eq!(p.apply("HELLO%20World"), "hello world");
    }

    #[test]
    fn test_none_resets() {
        let p = TransformationPipeline::from_names(&["lowercase", "none", "uppercase"]).unwrap();
        assert_eq!(p.len(), 1);
        assert_eq!(p.apply("hello"), "HELLO");
    }

    #[test]
    fn test_stepwise_intermediates() {
        let p = TransformationPipeline::from_names(&["urlDecode", "lowercase", "trim"]).unwrap();
        let steps = p.apply_stepwise(" %41BC ");
        assert_eq!(steps, vec![" ABC ", " abc ", "abc"]);
    }

    #[test]
    fn test_stepwise_skips_no_ops() {
        let p = TransformationPipeline::from_names(&["lowercase", "lowercase"]).unwrap();
        assert_eq!(p.apply_stepwise("abc"), Vec::<String>::new());
    }
}
