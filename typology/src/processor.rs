use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    aggregator::{Aggregation, aggregate},
    dispatch::Dispatcher,
    model::{ResultPayload, TypologyEvent, distinct_rule_count},
    router::{RuleCounts, ThresholdRouter},
    scorers::Scorer,
    storage::{AccumulatorGateway, AccumulatorStore, TypologyRepository},
};

/// What a single pass did with one inbound event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOutcome {
    pub cache_key: String,
    /// `None` when the pass was aborted before aggregation.
    pub rule_counts: Option<RuleCounts>,
    pub typologies_emitted: usize,
    pub last_payload: Option<ResultPayload>,
    pub cleaned_up: bool,
}

impl ProcessingOutcome {
    fn aborted(cache_key: String) -> Self {
        Self {
            cache_key,
            rule_counts: None,
            typologies_emitted: 0,
            last_payload: None,
            cleaned_up: false,
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.rule_counts.is_none()
    }
}

pub struct TypologyProcessor<S: Scorer> {
    gateway: AccumulatorGateway,
    router: ThresholdRouter<S>,
}

impl<S> TypologyProcessor<S>
where
    S: Scorer,
{
    pub fn new(
        scorer: S,
        store: Arc<dyn AccumulatorStore>,
        repository: Arc<dyn TypologyRepository>,
        dispatcher: Arc<dyn Dispatcher>,
        interdiction_channel: impl Into<String>,
    ) -> Self {
        info!("Initializing new TypologyProcessor");
        Self {
            gateway: AccumulatorGateway::new(store),
            router: ThresholdRouter::new(scorer, repository, dispatcher, interdiction_channel),
        }
    }

    /// Runs one inbound rule result through accumulation, aggregation,
    /// scoring and cleanup. Failures are logged, never returned.
    pub async fn process(&self, event: TypologyEvent) -> ProcessingOutcome {
        let TypologyEvent {
            network_map,
            rule_result,
            transaction,
            meta_data,
        } = event;

        let cache_key = transaction.cache_key();
        debug!(
            cache_key = %cache_key,
            trace_parent = ?meta_data.as_ref().and_then(|m| m.trace_parent.as_deref()),
            rule = %rule_result.id,
            "Handling rule result"
        );

        let stored = match self.gateway.save_and_get_all(&cache_key, &rule_result).await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                error!(cache_key = %cache_key, "Accumulator returned no records for transaction");
                return ProcessingOutcome::aborted(cache_key);
            }
            Err(e) => {
                error!(cache_key = %cache_key, error = %e, "Failed to accumulate rule result");
                return ProcessingOutcome::aborted(cache_key);
            }
        };

        let Aggregation {
            typology_results,
            rule_count,
        } = aggregate(&network_map, &stored, &rule_result);

        let rule_counts = RuleCounts {
            stored_rules: distinct_rule_count(&stored),
            total_rules: rule_count,
        };
        let typologies_emitted = typology_results.len();
        debug!(
            cache_key = %cache_key,
            typologies = typologies_emitted,
            stored_rules = rule_counts.stored_rules,
            total_rules = rule_counts.total_rules,
            "Aggregated rule results"
        );

        let last_payload = self
            .router
            .route(
                typology_results,
                &network_map,
                &transaction,
                meta_data.as_ref(),
                &cache_key,
                rule_counts,
            )
            .await;

        let cleaned_up = rule_counts.is_complete() && self.clean_up(&cache_key).await;

        ProcessingOutcome {
            cache_key,
            rule_counts: Some(rule_counts),
            typologies_emitted,
            last_payload,
            cleaned_up,
        }
    }

    async fn clean_up(&self, cache_key: &str) -> bool {
        match self.gateway.remove(cache_key).await {
            Ok(()) => {
                counter!("typology_cache_cleanups_total").increment(1);
                info!(cache_key, "Deleted typology interim cache key");
                true
            }
            Err(e) => {
                error!(cache_key, error = %e, "Failed to delete typology interim cache key");
                false
            }
        }
    }
}
