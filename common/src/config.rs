use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::yaml_include::{YamlIncludeError, load_yaml_string_with_includes};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Include(#[from] YamlIncludeError),

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yml::Error),
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CommonConfig {
    pub project_name: String,
}

/// Downstream destinations for typology results.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChannelConfig {
    pub default_url: String,
    #[serde(default = "default_interdiction_name")]
    pub interdiction_name: String,
    pub interdiction_url: String,
}

fn default_interdiction_name() -> String {
    "cms".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProcessorConfig {
    pub server_address: String,
    pub log_level: String,
    pub typologies_path: String,
    #[serde(default)]
    pub metrics_address: Option<String>,
    /// Seconds an incomplete transaction's rule results are kept in memory.
    #[serde(default)]
    pub accumulator_ttl_secs: Option<u64>,
    pub channels: ChannelConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub common: CommonConfig,
    pub processor: ProcessorConfig,
}

impl Config {
    pub fn load(config_path: &str) -> Result<Self, ConfigError> {
        let contents = load_yaml_string_with_includes(Path::new(config_path))?;
        let config = serde_yml::from_str(&contents)?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{create_temp_dir, write_temp_file, write_temp_file_in};

    const FULL_CONFIG: &str = "common:
  project_name: typology-processor
processor:
  server_address: 127.0.0.1:3000
  log_level: info
  typologies_path: config/typologies.yaml
  channels:
    default_url: http://localhost:4000/tadp
    interdiction_url: http://localhost:4001/cms
";

    #[test]
    fn loads_full_config() {
        let path = write_temp_file("config.yaml", FULL_CONFIG);
        let config = Config::load(path.to_str().unwrap()).unwrap();

        assert_eq!(config.common.project_name, "typology-processor");
        assert_eq!(config.processor.server_address, "127.0.0.1:3000");
        assert_eq!(config.processor.channels.interdiction_name, "cms");
        assert!(config.processor.metrics_address.is_none());
        assert!(config.processor.accumulator_ttl_secs.is_none());
    }

    #[test]
    fn include_provides_defaults() {
        let dir = create_temp_dir();
        write_temp_file_in(&dir, "base.yaml", FULL_CONFIG);
        let path = write_temp_file_in(
            &dir,
            "prod.yaml",
            "!include base.yaml\nprocessor:\n  log_level: warn\n  metrics_address: 0.0.0.0:9000\n  accumulator_ttl_secs: 600\n",
        );

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.processor.log_level, "warn");
        assert_eq!(config.processor.metrics_address.as_deref(), Some("0.0.0.0:9000"));
        assert_eq!(config.processor.typologies_path, "config/typologies.yaml");
        assert_eq!(config.processor.accumulator_ttl_secs, Some(600));
    }

    #[test]
    fn missing_section_is_a_parse_error() {
        let path = write_temp_file("partial.yaml", "common:\n  project_name: x\n");
        let err = Config::load(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
