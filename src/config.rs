use crate::constants;
use crate::error::{Result, TransformError};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub visma: VismaConfig,
}

#[derive(Debug, Deserialize)]
pub struct VismaConfig {
    pub guid_group: String,
    #[serde(default = "default_item_url")]
    pub item_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_item_url() -> String {
    constants::ASSIGNMENT_ITEM_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    constants::DEFAULT_TIMEOUT_SECONDS
}

fn default_concurrency() -> usize {
    constants::DEFAULT_CONCURRENCY
}

impl Default for VismaConfig {
    fn default() -> Self {
        Self {
            guid_group: String::new(),
            item_url: default_item_url(),
            timeout_seconds: default_timeout_seconds(),
            concurrency: default_concurrency(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        if !std::path::Path::new(config_path).exists() {
            return Ok(Self {
                visma: VismaConfig::default(),
            });
        }
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            TransformError::Config(format!("Failed to read config file '{config_path}': {e}"))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visma_defaults_fill_missing_keys() {
        let config: Config = toml::from_str(
            r#"
            [visma]
            guid_group = "16fb545c-0894-4ae8-82bd-c991d98caaf8"
            "#,
        )
        .unwrap();
        assert_eq!(config.visma.guid_group, "16fb545c-0894-4ae8-82bd-c991d98caaf8");
        assert_eq!(config.visma.item_url, constants::ASSIGNMENT_ITEM_URL);
        assert_eq!(config.visma.timeout_seconds, constants::DEFAULT_TIMEOUT_SECONDS);
        assert_eq!(config.visma.concurrency, constants::DEFAULT_CONCURRENCY);
    }
}
