use std::collections::HashSet;

use crate::model::{NetworkMap, RuleResult, TypologyResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Typologies touched by the newly arrived rule result, each with the
    /// accumulated results relevant to it. None of them is scored yet.
    pub typology_results: Vec<TypologyResult>,
    /// Distinct rule ids required across the whole network map.
    pub rule_count: usize,
}

/// Groups accumulated rule results per typology.
///
/// Only typologies that require `new_result` (same id and cfg) are emitted,
/// and only when at least one accumulated result matches one of their rules
/// by id. A typology listed in several channels is emitted once, with the
/// rules of every listing.
pub fn aggregate(
    network_map: &NetworkMap,
    rule_results: &[RuleResult],
    new_result: &RuleResult,
) -> Aggregation {
    let mut typology_results = Vec::new();
    let mut emitted = HashSet::new();

    for typology in network_map.typologies() {
        if !typology.requires(new_result) {
            continue;
        }
        if !emitted.insert((typology.id.as_str(), typology.cfg.as_str())) {
            continue;
        }

        let required = network_map.required_rule_ids(&typology.id, &typology.cfg);
        let relevant: Vec<RuleResult> = rule_results
            .iter()
            .filter(|rule_result| required.contains(rule_result.id.as_str()))
            .cloned()
            .collect();

        if relevant.is_empty() {
            tracing::debug!(typology = %typology.cfg, "No accumulated rule results for typology");
            continue;
        }

        typology_results.push(TypologyResult::unscored(typology, relevant));
    }

    Aggregation {
        typology_results,
        rule_count: network_map.distinct_rule_count(),
    }
}
