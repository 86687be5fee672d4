pub mod expression_based;

pub use expression_based::*;

use crate::model::{RuleResult, TypologyExpression};

pub trait Scorer: Send + Sync {
    /// Scores one typology. Matched rule results get their weight filled in.
    fn score(&self, definition: &TypologyExpression, rule_results: &mut [RuleResult]) -> Evaluation;
}
