use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
pub enum Operator {
    #[strum(to_string = "+")]
    Add,
    #[strum(to_string = "-")]
    Subtract,
    #[strum(to_string = "*")]
    Multiply,
    #[strum(to_string = "/")]
    Divide,
}

impl Operator {
    /// Applies the operator to a running value. Dividing by zero keeps the
    /// running value as it is.
    pub fn apply(self, acc: f64, operand: f64) -> f64 {
        match self {
            Operator::Add => acc + operand,
            Operator::Subtract => acc - operand,
            Operator::Multiply => acc * operand,
            Operator::Divide if operand == 0.0 => acc,
            Operator::Divide => acc / operand,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionParseError {
    #[error("expression {0} has no operator")]
    MissingOperator(String),
}

/// Typology scoring expression.
///
/// On the wire this is a prefix-notation array such as
/// `["+", "term_a", ["*", "term_b", 2]]`: the first operator token names the
/// operation, every other element is an operand in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExpression", into = "RawExpression")]
pub enum ExpressionNode {
    Literal(f64),
    TermRef(String),
    Op {
        operator: Operator,
        operands: Vec<ExpressionNode>,
    },
}

impl ExpressionNode {
    pub fn op(operator: Operator, operands: Vec<ExpressionNode>) -> Self {
        ExpressionNode::Op { operator, operands }
    }

    pub fn term(term: impl Into<String>) -> Self {
        ExpressionNode::TermRef(term.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawExpression {
    Number(f64),
    Token(String),
    Nested(Vec<RawExpression>),
}

impl TryFrom<RawExpression> for ExpressionNode {
    type Error = ExpressionParseError;

    fn try_from(raw: RawExpression) -> Result<Self, Self::Error> {
        match raw {
            RawExpression::Number(value) => Ok(ExpressionNode::Literal(value)),
            RawExpression::Token(token) => Ok(ExpressionNode::TermRef(token)),
            RawExpression::Nested(mut elements) => {
                let position = elements
                    .iter()
                    .position(|element| matches!(element, RawExpression::Token(t) if t.parse::<Operator>().is_ok()))
                    .ok_or_else(|| ExpressionParseError::MissingOperator(format!("{:?}", elements)))?;

                let operator = match elements.remove(position) {
                    RawExpression::Token(token) => token
                        .parse::<Operator>()
                        .map_err(|_| ExpressionParseError::MissingOperator(token))?,
                    other => return Err(ExpressionParseError::MissingOperator(format!("{:?}", other))),
                };

                let operands = elements
                    .into_iter()
                    .map(ExpressionNode::try_from)
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(ExpressionNode::Op { operator, operands })
            }
        }
    }
}

impl From<ExpressionNode> for RawExpression {
    fn from(node: ExpressionNode) -> Self {
        match node {
            ExpressionNode::Literal(value) => RawExpression::Number(value),
            ExpressionNode::TermRef(term) => RawExpression::Token(term),
            ExpressionNode::Op { operator, operands } => {
                let mut elements = Vec::with_capacity(operands.len() + 1);
                elements.push(RawExpression::Token(operator.to_string()));
                elements.extend(operands.into_iter().map(RawExpression::from));
                RawExpression::Nested(elements)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weight {
    #[serde(rename = "ref")]
    pub reference: String,
    pub wght: f64,
}

/// Weight table entry: maps a rule's sub-rule references to weights under a term id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleValue {
    pub id: String,
    pub cfg: String,
    pub term_id: String,
    pub wghts: Vec<Weight>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interdiction_threshold: Option<f64>,
}

/// Scoring definition of one typology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypologyExpression {
    pub id: String,
    pub cfg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    pub rules: Vec<RuleValue>,
    pub expression: ExpressionNode,
    pub workflow: Workflow,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_prefix_array() {
        let node: ExpressionNode =
            serde_json::from_value(json!(["+", "a", ["*", "b", 2], 3])).unwrap();

        assert_eq!(
            node,
            ExpressionNode::op(
                Operator::Add,
                vec![
                    ExpressionNode::term("a"),
                    ExpressionNode::op(
                        Operator::Multiply,
                        vec![ExpressionNode::term("b"), ExpressionNode::Literal(2.0)]
                    ),
                    ExpressionNode::Literal(3.0),
                ]
            )
        );
    }

    #[test]
    fn operator_is_first_operator_token() {
        let node: ExpressionNode = serde_json::from_value(json!(["a", "/", "b"])).unwrap();
        assert_eq!(
            node,
            ExpressionNode::op(
                Operator::Divide,
                vec![ExpressionNode::term("a"), ExpressionNode::term("b")]
            )
        );
    }

    #[test]
    fn array_without_operator_is_rejected() {
        let res = serde_json::from_value::<ExpressionNode>(json!(["a", "b"]));
        assert!(res.is_err());
    }

    #[test]
    fn serializes_back_to_prefix_array() {
        let node = ExpressionNode::op(
            Operator::Subtract,
            vec![ExpressionNode::term("a"), ExpressionNode::Literal(1.5)],
        );
        assert_eq!(serde_json::to_value(&node).unwrap(), json!(["-", "a", 1.5]));
    }

    #[test]
    fn division_by_zero_keeps_running_value() {
        assert_eq!(Operator::Divide.apply(12.0, 0.0), 12.0);
        assert_eq!(Operator::Divide.apply(12.0, 4.0), 3.0);
    }

    #[test]
    fn parses_typology_definition() {
        let definition: TypologyExpression = serde_json::from_value(json!({
            "id": "typology-processor@1.0.0",
            "cfg": "001@1.0.0",
            "desc": "Layering",
            "rules": [
                { "id": "001@1.0.0", "cfg": "1.0.0", "termId": "v001at100at100", "wghts": [
                    { "ref": ".err", "wght": 0 },
                    { "ref": ".01", "wght": 100 }
                ] }
            ],
            "expression": ["+", "v001at100at100"],
            "workflow": { "alertThreshold": 200 }
        }))
        .unwrap();

        assert_eq!(definition.rules[0].wghts[1].wght, 100.0);
        assert_eq!(definition.workflow.alert_threshold, Some(200.0));
        assert_eq!(definition.workflow.interdiction_threshold, None);
    }
}
