use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::RuleResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub cfg: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Typology {
    pub id: String,
    pub cfg: String,
    pub rules: Vec<Rule>,
}

impl Typology {
    /// Whether `rule_result` is one of the rules this typology waits for.
    pub fn requires(&self, rule_result: &RuleResult) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.id == rule_result.id && rule.cfg == rule_result.cfg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub cfg: String,
    pub typologies: Vec<Typology>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub cfg: String,
    #[serde(rename = "txTp", default)]
    pub tx_tp: String,
    pub channels: Vec<Channel>,
}

/// Which typologies apply to a transaction and which rules each one needs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkMap {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub cfg: String,
    pub messages: Vec<Message>,
}

impl NetworkMap {
    pub fn typologies(&self) -> impl Iterator<Item = &Typology> {
        self.messages
            .iter()
            .flat_map(|message| message.channels.iter())
            .flat_map(|channel| channel.typologies.iter())
    }

    pub fn find_typology(&self, id: &str, cfg: &str) -> Option<&Typology> {
        self.typologies()
            .find(|typology| typology.id == id && typology.cfg == cfg)
    }

    /// Distinct rule ids required by typology `(id, cfg)`, merged over every
    /// channel that lists it.
    pub fn required_rule_ids(&self, id: &str, cfg: &str) -> HashSet<&str> {
        self.typologies()
            .filter(|typology| typology.id == id && typology.cfg == cfg)
            .flat_map(|typology| typology.rules.iter())
            .map(|rule| rule.id.as_str())
            .collect()
    }

    /// Distinct rule ids required across every typology in the map.
    pub fn distinct_rule_count(&self) -> usize {
        self.typologies()
            .flat_map(|typology| typology.rules.iter())
            .map(|rule| rule.id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}
