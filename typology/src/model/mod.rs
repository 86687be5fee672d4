use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::error::Error;

// Submodules for the typology definition and the network map
pub mod expression;
pub mod network_map;

pub use expression::{ExpressionNode, Operator, RuleValue, TypologyExpression, Weight, Workflow};
pub use network_map::{Channel, Message, NetworkMap, Rule, Typology};

pub type GenericError = Box<dyn Error + Send + Sync>;

/// Prefix of the accumulator key holding a transaction's interim rule results.
pub const CACHE_KEY_PREFIX: &str = "TP_";

/// Sentinel for a typology result (or threshold) that has not been scored yet.
pub const UNSCORED: f64 = -1.0;

/// Outcome of one rule evaluation for one transaction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResult {
    pub id: String,
    pub cfg: String,
    pub sub_rule_ref: String,
    #[serde(default)]
    pub result: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prcg_tm: Option<u64>,
    /// Contribution of this result to a typology score, filled in by the scorer.
    #[serde(rename = "wght", default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl RuleResult {
    pub fn new(id: impl Into<String>, cfg: impl Into<String>, sub_rule_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cfg: cfg.into(),
            sub_rule_ref: sub_rule_ref.into(),
            ..Default::default()
        }
    }
}

/// Number of distinct rule ids in `results`.
pub fn distinct_rule_count(results: &[RuleResult]) -> usize {
    results.iter().map(|r| r.id.as_str()).collect::<HashSet<_>>().len()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultWorkflow {
    pub alert_threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interdiction_threshold: Option<f64>,
}

impl Default for ResultWorkflow {
    fn default() -> Self {
        Self {
            alert_threshold: UNSCORED,
            interdiction_threshold: None,
        }
    }
}

/// Per-typology output record sent downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypologyResult {
    pub id: String,
    pub cfg: String,
    pub result: f64,
    pub rule_results: Vec<RuleResult>,
    #[serde(default)]
    pub review: bool,
    pub workflow: ResultWorkflow,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prcg_tm: Option<u64>,
}

impl TypologyResult {
    pub fn unscored(typology: &Typology, rule_results: Vec<RuleResult>) -> Self {
        Self {
            id: typology.id.clone(),
            cfg: typology.cfg.clone(),
            result: UNSCORED,
            rule_results,
            review: false,
            workflow: ResultWorkflow::default(),
            prcg_tm: None,
        }
    }

    pub fn is_scored(&self) -> bool {
        self.result != UNSCORED
    }

    pub fn gathered_rule_count(&self) -> usize {
        distinct_rule_count(&self.rule_results)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupHeader {
    #[serde(rename = "MsgId")]
    pub msg_id: String,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PaymentStatus {
    #[serde(rename = "GrpHdr")]
    pub group_header: GroupHeader,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

/// The transaction under evaluation.
///
/// Only the transaction type and message id are read here; every other field
/// is carried through to downstream payloads untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "TxTp")]
    pub tx_tp: String,
    #[serde(rename = "FIToFIPmtSts")]
    pub payment_status: PaymentStatus,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Transaction {
    pub fn message_id(&self) -> &str {
        &self.payment_status.group_header.msg_id
    }

    pub fn cache_key(&self) -> String {
        format!("{}{}", CACHE_KEY_PREFIX, self.message_id())
    }

    /// Projection keeping only the transaction type and message id.
    pub fn minimal(&self) -> Self {
        Self {
            tx_tp: self.tx_tp.clone(),
            payment_status: PaymentStatus {
                group_header: GroupHeader {
                    msg_id: self.message_id().to_string(),
                    body: Map::new(),
                },
                body: Map::new(),
            },
            body: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_parent: Option<String>,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

/// One inbound rule outcome, as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypologyEvent {
    pub network_map: NetworkMap,
    pub rule_result: RuleResult,
    pub transaction: Transaction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<MetaData>,
}

/// Outbound payload for the downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPayload {
    pub typology_result: TypologyResult,
    pub transaction: Transaction,
    pub network_map: NetworkMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<MetaData>,
}
