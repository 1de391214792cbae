//! CLI configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// ReplyGuard CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Rule set file (JSON or YAML)
    #[serde(default = "default_rules_path")]
    pub rules_path: PathBuf,

    /// Characters per chunk in streaming mode
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Use rules sent inline with a request instead of the rules file
    #[serde(default)]
    pub prefer_inline_rules: bool,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,
}

impl CliConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &crate::Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(rules) = &cli.rules {
            config.rules_path = PathBuf::from(rules);
        }

        if let crate::Command::Stream {
            chunk_size: Some(size),
            ..
        } = &cli.command
        {
            config.chunk_size = *size;
        }

        if config.chunk_size == 0 {
            anyhow::bail!(replyguard_core::Error::config("chunk_size must be at least 1"));
        }

        Ok(config)
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            rules_path: default_rules_path(),
            chunk_size: default_chunk_size(),
            prefer_inline_rules: false,
            log_format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

fn default_rules_path() -> PathBuf {
    PathBuf::from("rules.json")
}

fn default_chunk_size() -> usize {
    16
}
