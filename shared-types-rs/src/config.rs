// shared-types-rs/src/config.rs
// Configuration loader for graceful degradation and conflict resolution

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

static RESILIENCE_CONFIG: OnceCell<Arc<ResilienceConfig>> = OnceCell::new();

pub const CONFIG_PATH_ENV: &str = "RESILIENCE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "./config/resilience.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration not initialized")]
    NotInitialized,

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub logging: LoggingSettings,
    pub degradation: DegradationSettings,
    pub conflict: ConflictSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json_format: bool,
    pub service_name: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            service_name: "graceful-degradation".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DegradationSettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
    pub circuit_failure_threshold: u32,
    pub circuit_reset_timeout_ms: u64,
    /// Substrings of an error message that mark it as worth retrying
    pub transient_patterns: Vec<String>,
    pub direct_response_sentinel: String,
    /// Agent id -> ordered substitutes, ending with the sentinel
    pub fallback_chains: BTreeMap<String, Vec<String>>,
    /// Phase used for escalations when the task state has none
    pub default_phase: u8,
}

impl Default for DegradationSettings {
    fn default() -> Self {
        let sentinel = "direct-response".to_string();
        let mut fallback_chains = BTreeMap::new();
        fallback_chains.insert(
            "opus-complex-agent".to_string(),
            vec![
                "sonnet-standard-agent".to_string(),
                "haiku-fast-agent".to_string(),
                sentinel.clone(),
            ],
        );
        fallback_chains.insert(
            "sonnet-standard-agent".to_string(),
            vec!["haiku-fast-agent".to_string(), sentinel.clone()],
        );
        fallback_chains.insert("haiku-fast-agent".to_string(), vec![sentinel.clone()]);

        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 30_000,
            circuit_failure_threshold: 3,
            circuit_reset_timeout_ms: 60_000,
            transient_patterns: ["rate_limit", "timeout", "transient", "ECONNRESET", "ETIMEDOUT"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            direct_response_sentinel: sentinel,
            fallback_chains,
            default_phase: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConflictSettings {
    /// Confidence spread below which recommendations count as a tie
    pub tie_confidence_spread: f64,
    /// Alignment-score margin below which a priority conflict goes to a human
    pub hitl_score_margin: f64,
    pub history_capacity: usize,
    pub model_confidence: f64,
    pub approach_confidence: f64,
    pub tie_confidence: f64,
}

impl Default for ConflictSettings {
    fn default() -> Self {
        Self {
            tie_confidence_spread: 10.0,
            hitl_score_margin: 5.0,
            history_capacity: 1000,
            model_confidence: 95.0,
            approach_confidence: 85.0,
            tie_confidence: 50.0,
        }
    }
}

impl ResilienceConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ResilienceConfig =
            toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a file on disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Load configuration from file
    pub fn load() -> Result<Arc<ResilienceConfig>, ConfigError> {
        // Check if already loaded
        if let Some(config) = RESILIENCE_CONFIG.get() {
            return Ok(Arc::clone(config));
        }

        let config_path =
            env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let config = Self::from_path(PathBuf::from(&config_path))?;

        tracing::info!(path = %config_path, "Loaded resilience configuration");

        // Store in global static
        let config_arc = Arc::new(config);
        RESILIENCE_CONFIG
            .set(Arc::clone(&config_arc))
            .map_err(|_| ConfigError::InvalidValue("Config already initialized".to_string()))?;

        Ok(config_arc)
    }

    /// Get the global configuration instance
    pub fn get() -> Result<Arc<ResilienceConfig>, ConfigError> {
        RESILIENCE_CONFIG
            .get()
            .map(Arc::clone)
            .ok_or(ConfigError::NotInitialized)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let degradation = &self.degradation;
        if degradation.circuit_failure_threshold == 0 {
            return Err(ConfigError::InvalidValue(
                "degradation.circuit_failure_threshold must be at least 1".to_string(),
            ));
        }
        if degradation.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue(format!(
                "degradation.backoff_multiplier must be >= 1.0, got {}",
                degradation.backoff_multiplier
            )));
        }
        if degradation.max_delay_ms < degradation.base_delay_ms {
            return Err(ConfigError::InvalidValue(format!(
                "degradation.max_delay_ms ({}) is below base_delay_ms ({})",
                degradation.max_delay_ms, degradation.base_delay_ms
            )));
        }
        if self.conflict.history_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "conflict.history_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_policy() {
        let config = ResilienceConfig::default();
        assert_eq!(config.degradation.max_retries, 3);
        assert_eq!(config.degradation.base_delay_ms, 1000);
        assert_eq!(config.degradation.max_delay_ms, 30_000);
        assert_eq!(config.degradation.circuit_failure_threshold, 3);
        assert_eq!(config.degradation.transient_patterns.len(), 5);
        assert_eq!(
            config.degradation.fallback_chains["haiku-fast-agent"],
            vec!["direct-response".to_string()]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ResilienceConfig::from_toml_str(
            r#"
            [degradation]
            max_retries = 5

            [conflict]
            history_capacity = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.degradation.max_retries, 5);
        assert_eq!(config.degradation.base_delay_ms, 1000);
        assert_eq!(config.conflict.history_capacity, 10);
        assert_eq!(config.conflict.tie_confidence_spread, 10.0);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let result = ResilienceConfig::from_toml_str("[degradation]\ncircuit_failure_threshold = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));

        let result = ResilienceConfig::from_toml_str(
            "[degradation]\nbase_delay_ms = 5000\nmax_delay_ms = 100\n",
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));

        let result = ResilienceConfig::from_toml_str("[conflict]\nhistory_capacity = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_parse_error() {
        let result = ResilienceConfig::from_toml_str("[degradation\nmax_retries = ");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[degradation.fallback_chains]\nplanner = [\"backup-planner\", \"direct-response\"]"
        )
        .unwrap();

        let config = ResilienceConfig::from_path(file.path()).unwrap();
        assert_eq!(
            config.degradation.fallback_chains["planner"],
            vec!["backup-planner".to_string(), "direct-response".to_string()]
        );

        let missing = ResilienceConfig::from_path("/definitely/not/here.toml");
        assert!(matches!(missing, Err(ConfigError::FileNotFound(_))));
    }
}
