#![allow(dead_code)]

pub use common::init_test_tracing;

use async_trait::async_trait;
use mockall::mock;
use serde_json::{Value, json};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use typology::{
    dispatch::Dispatcher,
    model::*,
    processor::TypologyProcessor,
    scorers::ExpressionBasedScorer,
    storage::{AccumulatorStore, InMemoryAccumulator, InMemoryTypologyRepository, TypologyRepository},
};

pub const TYPOLOGY_ID: &str = "typology-processor@1.0.0";
pub const RULE_CFG: &str = "1.0.0";
pub const INTERDICTION_CHANNEL: &str = "cms";

// Mock TypologyRepository using mockall
mock! {
    pub TypologyRepository {}

    #[async_trait]
    impl TypologyRepository for TypologyRepository {
        async fn get_definition(
            &self,
            id: &str,
            cfg: &str,
        ) -> Result<Option<TypologyExpression>, GenericError>;
    }
}

// Mock Dispatcher using mockall
mock! {
    pub Dispatcher {}

    #[async_trait]
    impl Dispatcher for Dispatcher {
        async fn send(&self, payload: ResultPayload, channels: Vec<String>) -> Result<(), GenericError>;
    }
}

/// Dispatcher double that records every send attempt.
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<(ResultPayload, Vec<String>)>>,
    failing_channel: Option<String>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every send to `channel`; an empty name means the default channel.
    pub fn failing_on(channel: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing_channel: Some(channel.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<(ResultPayload, Vec<String>)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to_default(&self) -> Vec<ResultPayload> {
        self.sent()
            .into_iter()
            .filter(|(_, channels)| channels.is_empty())
            .map(|(payload, _)| payload)
            .collect()
    }

    pub fn sent_to(&self, channel: &str) -> Vec<ResultPayload> {
        self.sent()
            .into_iter()
            .filter(|(_, channels)| channels.iter().any(|c| c == channel))
            .map(|(payload, _)| payload)
            .collect()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn send(&self, payload: ResultPayload, channels: Vec<String>) -> Result<(), GenericError> {
        let destination = channels.first().cloned().unwrap_or_default();
        self.sent.lock().unwrap().push((payload, channels));
        match &self.failing_channel {
            Some(failing) if *failing == destination => Err(format!("{} unavailable", failing).into()),
            _ => Ok(()),
        }
    }
}

/// Store double that answers with no record set.
pub struct NoRecordStore;

#[async_trait]
impl AccumulatorStore for NoRecordStore {
    async fn append_and_list(&self, _key: &str, _value: Value) -> Result<Option<Vec<Value>>, GenericError> {
        Ok(None)
    }

    async fn delete(&self, _key: &str) -> Result<(), GenericError> {
        Ok(())
    }
}

/// Store double that is unreachable.
pub struct UnavailableStore;

#[async_trait]
impl AccumulatorStore for UnavailableStore {
    async fn append_and_list(&self, _key: &str, _value: Value) -> Result<Option<Vec<Value>>, GenericError> {
        Err("connection refused".into())
    }

    async fn delete(&self, _key: &str) -> Result<(), GenericError> {
        Err("connection refused".into())
    }
}

/// In-memory store that counts deletions.
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryAccumulator,
    deletes: AtomicUsize,
}

impl CountingStore {
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccumulatorStore for CountingStore {
    async fn append_and_list(&self, key: &str, value: Value) -> Result<Option<Vec<Value>>, GenericError> {
        self.inner.append_and_list(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), GenericError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }
}

pub fn rule_result(id: &str, sub_rule_ref: &str) -> RuleResult {
    RuleResult {
        result: true,
        ..RuleResult::new(id, RULE_CFG, sub_rule_ref)
    }
}

/// Network map with one message and one channel holding `typologies`,
/// given as `(typology cfg, required rule ids)`.
pub fn network_map(typologies: &[(&str, &[&str])]) -> NetworkMap {
    let typologies: Vec<Value> = typologies
        .iter()
        .map(|(cfg, rules)| {
            json!({
                "id": TYPOLOGY_ID,
                "cfg": cfg,
                "rules": rules.iter().map(|id| json!({ "id": id, "cfg": RULE_CFG })).collect::<Vec<_>>(),
            })
        })
        .collect();

    serde_json::from_value(json!({
        "active": true,
        "cfg": "1.0.0",
        "messages": [{
            "id": "004@1.0.0",
            "cfg": "1.0.0",
            "txTp": "pacs.002.001.12",
            "channels": [{ "id": "001@1.0.0", "cfg": "1.0.0", "typologies": typologies }]
        }]
    }))
    .unwrap()
}

pub fn transaction(msg_id: &str) -> Transaction {
    serde_json::from_value(json!({
        "TxTp": "pacs.002.001.12",
        "FIToFIPmtSts": {
            "GrpHdr": { "MsgId": msg_id, "CreDtTm": "2024-03-01T10:00:00.000Z" },
            "TxInfAndSts": { "OrgnlInstrId": "5ab4fc7355de4ef8a75b78b00a681ed2", "TxSts": "ACCC" }
        }
    }))
    .unwrap()
}

/// Typology definition. `weights` are `(rule id, term id, sub-rule ref, weight)`.
pub fn definition(
    cfg: &str,
    weights: &[(&str, &str, &str, f64)],
    expression: Value,
    alert_threshold: Option<f64>,
    interdiction_threshold: Option<f64>,
) -> TypologyExpression {
    let rules: Vec<RuleValue> = weights
        .iter()
        .map(|(rule_id, term_id, reference, wght)| RuleValue {
            id: rule_id.to_string(),
            cfg: RULE_CFG.to_string(),
            term_id: term_id.to_string(),
            wghts: vec![Weight {
                reference: reference.to_string(),
                wght: *wght,
            }],
        })
        .collect();

    TypologyExpression {
        id: TYPOLOGY_ID.to_string(),
        cfg: cfg.to_string(),
        desc: None,
        rules,
        expression: serde_json::from_value(expression).unwrap(),
        workflow: Workflow {
            alert_threshold,
            interdiction_threshold,
        },
    }
}

/// Definition for a typology over rules A and B, scored as `A + B`.
pub fn sum_definition(cfg: &str, alert: Option<f64>, interdiction: Option<f64>) -> TypologyExpression {
    definition(
        cfg,
        &[("A", "termA", ".01", 100.0), ("B", "termB", ".01", 150.0)],
        json!(["+", "termA", "termB"]),
        alert,
        interdiction,
    )
}

pub fn event(network_map: &NetworkMap, rule_result: RuleResult, transaction: &Transaction) -> TypologyEvent {
    TypologyEvent {
        network_map: network_map.clone(),
        rule_result,
        transaction: transaction.clone(),
        meta_data: Some(MetaData {
            trace_parent: Some("00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01".to_string()),
            ..Default::default()
        }),
    }
}

pub fn processor_with(
    store: Arc<dyn AccumulatorStore>,
    definitions: Vec<TypologyExpression>,
    dispatcher: Arc<dyn Dispatcher>,
) -> TypologyProcessor<ExpressionBasedScorer> {
    TypologyProcessor::new(
        ExpressionBasedScorer::new(),
        store,
        Arc::new(InMemoryTypologyRepository::new(definitions)),
        dispatcher,
        INTERDICTION_CHANNEL,
    )
}
