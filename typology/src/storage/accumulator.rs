use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::{
    error::TypologyError,
    model::{GenericError, RuleResult},
};

/// Key-value store holding interim rule results per transaction.
///
/// `append_and_list` must be atomic per key: the returned list always
/// contains the value just appended and everything appended before it.
#[async_trait]
pub trait AccumulatorStore: Send + Sync {
    async fn append_and_list(
        &self,
        key: &str,
        value: Value,
    ) -> Result<Option<Vec<Value>>, GenericError>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), GenericError>;
}

struct Entry {
    created: Instant,
    values: Vec<Value>,
}

// In-memory implementation
#[derive(Default)]
pub struct InMemoryAccumulator {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Option<Duration>,
}

impl InMemoryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries older than `ttl` are dropped on the next append, so
    /// transactions that never complete do not pile up.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::default(),
            ttl: Some(ttl),
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains_key(key)
    }

    pub async fn entry_len(&self, key: &str) -> usize {
        self.entries.lock().await.get(key).map_or(0, |entry| entry.values.len())
    }
}

#[async_trait]
impl AccumulatorStore for InMemoryAccumulator {
    async fn append_and_list(
        &self,
        key: &str,
        value: Value,
    ) -> Result<Option<Vec<Value>>, GenericError> {
        let mut entries = self.entries.lock().await;

        if let Some(ttl) = self.ttl {
            let before = entries.len();
            entries.retain(|_, entry| entry.created.elapsed() < ttl);
            let expired = before - entries.len();
            if expired > 0 {
                tracing::debug!(expired, "Evicted expired accumulator entries");
            }
        }

        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            created: Instant::now(),
            values: Vec::new(),
        });
        entry.values.push(value);
        Ok(Some(entry.values.clone()))
    }

    async fn delete(&self, key: &str) -> Result<(), GenericError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredRuleResult {
    #[serde(rename = "ruleResult")]
    rule_result: RuleResult,
}

/// Typed access to the accumulator: rule results in, rule results out.
#[derive(Clone)]
pub struct AccumulatorGateway {
    store: Arc<dyn AccumulatorStore>,
}

impl AccumulatorGateway {
    pub fn new(store: Arc<dyn AccumulatorStore>) -> Self {
        Self { store }
    }

    /// Appends `rule_result` under `cache_key` and returns every rule result
    /// stored for that key so far. `None` means the store had no record set.
    pub async fn save_and_get_all(
        &self,
        cache_key: &str,
        rule_result: &RuleResult,
    ) -> Result<Option<Vec<RuleResult>>, TypologyError> {
        let record = serde_json::to_value(StoredRuleResult {
            rule_result: rule_result.clone(),
        })?;

        let stored = self
            .store
            .append_and_list(cache_key, record)
            .await
            .map_err(|e| TypologyError::Accumulator(e.to_string()))?;

        let Some(stored) = stored else {
            return Ok(None);
        };

        let rule_results = stored
            .into_iter()
            .map(|value| serde_json::from_value::<StoredRuleResult>(value).map(|s| s.rule_result))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(rule_results))
    }

    pub async fn remove(&self, cache_key: &str) -> Result<(), TypologyError> {
        self.store
            .delete(cache_key)
            .await
            .map_err(|e| TypologyError::Accumulator(e.to_string()))
    }
}
