use std::collections::HashMap;

use crate::{
    model::{ExpressionNode, RuleResult, RuleValue, TypologyExpression},
    scorers::Scorer,
};

/// Result of reducing a typology expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: f64,
    /// Term tokens that matched no weight and were not numeric literals.
    pub unresolved_terms: Vec<String>,
}

impl Evaluation {
    /// False when the score had to fall back on unresolved terms or is not finite.
    pub fn is_numeric(&self) -> bool {
        self.value.is_finite() && self.unresolved_terms.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionBasedScorer;

impl ExpressionBasedScorer {
    pub fn new() -> Self {
        Self
    }
}

impl Scorer for ExpressionBasedScorer {
    fn score(&self, definition: &TypologyExpression, rule_results: &mut [RuleResult]) -> Evaluation {
        evaluate_expression(&definition.rules, rule_results, &definition.expression)
    }
}

/// Reduces `expression` with term references replaced by rule weights.
///
/// Weights are looked up by `(rule id, cfg, sub-rule ref)`. A term with no
/// weight passes through as a literal when the token itself is a finite
/// number, otherwise it counts as zero and is listed in
/// [`Evaluation::unresolved_terms`].
pub fn evaluate_expression(
    rule_values: &[RuleValue],
    rule_results: &mut [RuleResult],
    expression: &ExpressionNode,
) -> Evaluation {
    let term_weights = resolve_term_weights(rule_values, rule_results);
    let mut unresolved_terms = Vec::new();
    let value = reduce(expression, &term_weights, &mut unresolved_terms);

    Evaluation {
        value,
        unresolved_terms,
    }
}

fn resolve_term_weights(
    rule_values: &[RuleValue],
    rule_results: &mut [RuleResult],
) -> HashMap<String, f64> {
    let lookup: HashMap<(&str, &str, &str), (&str, f64)> = rule_values
        .iter()
        .flat_map(|value| {
            value.wghts.iter().map(move |weight| {
                (
                    (value.id.as_str(), value.cfg.as_str(), weight.reference.as_str()),
                    (value.term_id.as_str(), weight.wght),
                )
            })
        })
        .collect();

    let mut term_weights = HashMap::new();
    for rule_result in rule_results.iter_mut() {
        let key = (
            rule_result.id.as_str(),
            rule_result.cfg.as_str(),
            rule_result.sub_rule_ref.as_str(),
        );
        let matched = lookup.get(&key).copied();

        if let Some((term_id, weight)) = matched {
            rule_result.weight = Some(weight);
            term_weights.insert(term_id.to_string(), weight);
        } else {
            tracing::debug!(
                rule = %rule_result.id,
                sub_rule_ref = %rule_result.sub_rule_ref,
                "No weight configured for rule result"
            );
        }
    }

    term_weights
}

fn reduce(
    node: &ExpressionNode,
    term_weights: &HashMap<String, f64>,
    unresolved_terms: &mut Vec<String>,
) -> f64 {
    match node {
        ExpressionNode::Literal(value) => *value,
        ExpressionNode::TermRef(term) => match term_weights.get(term) {
            Some(weight) => *weight,
            None => match term.trim().parse::<f64>() {
                Ok(literal) if literal.is_finite() => literal,
                _ => {
                    unresolved_terms.push(term.clone());
                    0.0
                }
            },
        },
        ExpressionNode::Op { operator, operands } => {
            let mut values = operands
                .iter()
                .map(|operand| reduce(operand, term_weights, unresolved_terms));

            match values.next() {
                Some(first) => values.fold(first, |acc, value| operator.apply(acc, value)),
                None => 0.0,
            }
        }
    }
}
