use async_trait::async_trait;
use std::{collections::HashMap, fs, path::Path};

use crate::{
    error::TypologyError,
    model::{GenericError, TypologyExpression},
};

/// Resolves a typology id and cfg to its scoring definition.
#[async_trait]
pub trait TypologyRepository: Send + Sync {
    async fn get_definition(
        &self,
        id: &str,
        cfg: &str,
    ) -> Result<Option<TypologyExpression>, GenericError>;
}

pub struct InMemoryTypologyRepository {
    definitions: HashMap<(String, String), TypologyExpression>,
}

impl InMemoryTypologyRepository {
    pub fn new(definitions: Vec<TypologyExpression>) -> Self {
        let definitions = definitions
            .into_iter()
            .map(|definition| ((definition.id.clone(), definition.cfg.clone()), definition))
            .collect();
        Self { definitions }
    }

    /// Loads a list of definitions from a `.json` file, or yaml otherwise.
    pub fn from_file(path: &Path) -> Result<Self, TypologyError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| TypologyError::Config(format!("failed to read {:?}: {}", path, e)))?;

        let definitions: Vec<TypologyExpression> =
            if path.extension().is_some_and(|ext| ext == "json") {
                serde_json::from_str(&contents)?
            } else {
                serde_yml::from_str(&contents)
                    .map_err(|e| TypologyError::Config(format!("invalid {:?}: {}", path, e)))?
            };

        tracing::info!(count = definitions.len(), path = ?path, "Loaded typology definitions");
        Ok(Self::new(definitions))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[async_trait]
impl TypologyRepository for InMemoryTypologyRepository {
    async fn get_definition(
        &self,
        id: &str,
        cfg: &str,
    ) -> Result<Option<TypologyExpression>, GenericError> {
        Ok(self
            .definitions
            .get(&(id.to_string(), cfg.to_string()))
            .cloned())
    }
}
