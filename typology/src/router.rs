use metrics::{counter, histogram};
use serde::Serialize;
use std::{sync::Arc, time::Instant};
use tracing::{debug, error, info, warn};

use crate::{
    dispatch::Dispatcher,
    model::{
        MetaData, NetworkMap, ResultPayload, Transaction, TypologyExpression, TypologyResult,
        Workflow,
    },
    scorers::Scorer,
    storage::TypologyRepository,
};

/// Rule result counts for the transaction as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCounts {
    /// Distinct rule ids accumulated so far.
    pub stored_rules: usize,
    /// Distinct rule ids required across the network map.
    pub total_rules: usize,
}

impl RuleCounts {
    pub fn is_complete(&self) -> bool {
        self.stored_rules >= self.total_rules
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdDecision {
    Interdiction,
    Alert,
    Clear,
}

impl ThresholdDecision {
    pub fn requires_review(self) -> bool {
        self != ThresholdDecision::Clear
    }

    /// Counters a decision increments. Every reviewed result is an alert.
    pub fn counters(self) -> &'static [&'static str] {
        match self {
            ThresholdDecision::Interdiction => &["typology_alerts_total", "typology_interdictions_total"],
            ThresholdDecision::Alert => &["typology_alerts_total"],
            ThresholdDecision::Clear => &[],
        }
    }
}

pub fn classify(score: f64, workflow: &Workflow) -> ThresholdDecision {
    if workflow.interdiction_threshold.is_some_and(|threshold| score >= threshold) {
        ThresholdDecision::Interdiction
    } else if workflow.alert_threshold.is_some_and(|threshold| score >= threshold) {
        ThresholdDecision::Alert
    } else {
        ThresholdDecision::Clear
    }
}

pub struct ThresholdRouter<S: Scorer> {
    scorer: S,
    repository: Arc<dyn TypologyRepository>,
    dispatcher: Arc<dyn Dispatcher>,
    interdiction_channel: String,
}

impl<S: Scorer> ThresholdRouter<S> {
    pub fn new(
        scorer: S,
        repository: Arc<dyn TypologyRepository>,
        dispatcher: Arc<dyn Dispatcher>,
        interdiction_channel: impl Into<String>,
    ) -> Self {
        Self {
            scorer,
            repository,
            dispatcher,
            interdiction_channel: interdiction_channel.into(),
        }
    }

    /// Scores every ready typology and sends the results downstream.
    ///
    /// Returns the last payload handed to the default channel, if any.
    pub async fn route(
        &self,
        typology_results: Vec<TypologyResult>,
        network_map: &NetworkMap,
        transaction: &Transaction,
        meta_data: Option<&MetaData>,
        cache_key: &str,
        rule_counts: RuleCounts,
    ) -> Option<ResultPayload> {
        let mut last_payload = None;

        for mut typology_result in typology_results {
            let required = network_map
                .required_rule_ids(&typology_result.id, &typology_result.cfg)
                .len();
            let gathered = typology_result.gathered_rule_count();
            if gathered < required {
                debug!(
                    cache_key,
                    typology = %typology_result.cfg,
                    gathered,
                    required,
                    "Waiting for more rule results"
                );
                continue;
            }

            let started = Instant::now();

            let Some(definition) = self.find_definition(&typology_result).await else {
                typology_result.prcg_tm = Some(started.elapsed().as_nanos() as u64);
                let payload = ResultPayload {
                    typology_result,
                    transaction: transaction.clone(),
                    network_map: network_map.clone(),
                    meta_data: meta_data.cloned(),
                };
                self.dispatch(payload.clone(), Vec::new(), cache_key).await;
                last_payload = Some(payload);
                continue;
            };

            let decision = self.score(&mut typology_result, &definition, cache_key);

            let elapsed = started.elapsed();
            typology_result.prcg_tm = Some(elapsed.as_nanos() as u64);
            histogram!("typology_evaluation_seconds").record(elapsed.as_secs_f64());

            let full_payload = ResultPayload {
                typology_result,
                transaction: transaction.clone(),
                network_map: network_map.clone(),
                meta_data: meta_data.cloned(),
            };

            let mut default_payload = full_payload.clone();
            if !rule_counts.is_complete() {
                default_payload.transaction = transaction.minimal();
            }

            let default_send = self.dispatch(default_payload.clone(), Vec::new(), cache_key);
            if decision == ThresholdDecision::Interdiction {
                let interdiction_send = self.dispatch(
                    full_payload,
                    vec![self.interdiction_channel.clone()],
                    cache_key,
                );
                futures::future::join(interdiction_send, default_send).await;
            } else {
                default_send.await;
            }

            last_payload = Some(default_payload);
        }

        last_payload
    }

    async fn find_definition(&self, typology_result: &TypologyResult) -> Option<TypologyExpression> {
        match self
            .repository
            .get_definition(&typology_result.id, &typology_result.cfg)
            .await
        {
            Ok(Some(definition)) => Some(definition),
            Ok(None) => {
                warn!(typology = %typology_result.cfg, "No typology expression found for typology");
                None
            }
            Err(e) => {
                error!(typology = %typology_result.cfg, error = %e, "Failed to load typology expression");
                None
            }
        }
    }

    fn score(
        &self,
        typology_result: &mut TypologyResult,
        definition: &TypologyExpression,
        cache_key: &str,
    ) -> ThresholdDecision {
        let evaluation = self
            .scorer
            .score(definition, &mut typology_result.rule_results);
        if !evaluation.is_numeric() {
            warn!(
                cache_key,
                typology = %typology_result.cfg,
                value = evaluation.value,
                unresolved_terms = ?evaluation.unresolved_terms,
                "Typology expression did not evaluate to a number"
            );
        }

        let score = evaluation.value;
        typology_result.result = score;

        let workflow = &definition.workflow;
        typology_result.workflow.interdiction_threshold = workflow.interdiction_threshold;
        match workflow.alert_threshold {
            Some(threshold) => typology_result.workflow.alert_threshold = threshold,
            None => error!(typology = %typology_result.cfg, "Typology config missing alert threshold"),
        }

        let decision = classify(score, workflow);
        typology_result.review = decision.requires_review();
        for name in decision.counters() {
            counter!(*name).increment(1);
        }
        match decision {
            ThresholdDecision::Interdiction => {
                info!(cache_key, typology = %typology_result.cfg, score, "Typology interdicting transaction");
            }
            ThresholdDecision::Alert => {
                info!(cache_key, typology = %typology_result.cfg, score, "Typology alerting on transaction");
            }
            ThresholdDecision::Clear => {
                debug!(cache_key, typology = %typology_result.cfg, score, "Typology below alert threshold");
            }
        }

        decision
    }

    async fn dispatch(&self, payload: ResultPayload, channels: Vec<String>, cache_key: &str) -> bool {
        let typology = payload.typology_result.cfg.clone();
        let destination = if channels.is_empty() {
            "default".to_string()
        } else {
            channels.join(",")
        };

        match self.dispatcher.send(payload, channels).await {
            Ok(()) => {
                debug!(cache_key, typology = %typology, destination = %destination, "Sent typology result");
                true
            }
            Err(e) => {
                counter!("typology_dispatch_failures_total").increment(1);
                error!(
                    cache_key,
                    typology = %typology,
                    destination = %destination,
                    error = %e,
                    "Error while sending typology result"
                );
                false
            }
        }
    }
}
