//! # Structured Logging
//!
//! Subscriber setup and severity-aware logging of recovery decisions.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::failure::RecoveryAction;
use crate::state::DegradationLevel;
use crate::types::{Error, ErrorKind, Result};

// Flag to track if logging has been initialized
static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Configuration for the logging system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// The log level to use (trace, debug, info, warn, error)
    pub level: String,
    /// The service name for identification
    pub service_name: String,
    /// Whether to use JSON formatting
    pub json_format: bool,
    /// Whether to include the event target
    pub include_targets: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            service_name: "graceful-degradation".to_string(),
            json_format: true,
            include_targets: true,
        }
    }
}

impl From<&shared_types_rs::LoggingSettings> for LoggingConfig {
    fn from(settings: &shared_types_rs::LoggingSettings) -> Self {
        Self {
            level: settings.level.clone(),
            service_name: settings.service_name.clone(),
            json_format: settings.json_format,
            ..Default::default()
        }
    }
}

/// Initializes the structured logging system
pub fn init_logging(config: Option<LoggingConfig>) -> Result<()> {
    // Don't re-initialize if already done
    if LOGGING_INITIALIZED.load(Ordering::SeqCst) {
        return Ok(());
    }

    let config = config.unwrap_or_default();

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},warn", config.level)));

    let subscriber = Registry::default().with(filter);

    // JSON and text layers have distinct types, so each branch installs its own
    let installed = if config.json_format {
        let json_layer = fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_target(config.include_targets);

        tracing::subscriber::set_global_default(subscriber.with(json_layer))
    } else {
        let text_layer = fmt::layer()
            .with_target(config.include_targets)
            .with_thread_ids(true);

        tracing::subscriber::set_global_default(subscriber.with(text_layer))
    };

    installed.map_err(|e| {
        Error::new(
            ErrorKind::Initialization,
            format!("Failed to set global subscriber: {}", e),
        )
    })?;

    LOGGING_INITIALIZED.store(true, Ordering::SeqCst);

    tracing::info!(
        service = %config.service_name,
        level = %config.level,
        json = %config.json_format,
        "Structured logging initialized"
    );

    Ok(())
}

/// Returns true once `init_logging` has installed a subscriber
pub fn is_initialized() -> bool {
    LOGGING_INITIALIZED.load(Ordering::SeqCst)
}

/// Logs a recovery decision at a level matching how far the task has degraded
pub fn log_recovery(level: DegradationLevel, action: &RecoveryAction) {
    use tracing::{error, info, warn};

    match level {
        DegradationLevel::SystemDown | DegradationLevel::OrchestratorBypass => {
            error!(
                level = level.as_u8(),
                outcome = %action.outcome,
                component = %action.component,
                degraded = action.degraded,
                message = %action.message,
                "Severe degradation"
            );
        }
        DegradationLevel::PartialExecution | DegradationLevel::Heuristic => {
            warn!(
                level = level.as_u8(),
                outcome = %action.outcome,
                component = %action.component,
                degraded = action.degraded,
                message = %action.message,
                "Workflow degraded"
            );
        }
        DegradationLevel::AgentFallback | DegradationLevel::Normal => {
            info!(
                level = level.as_u8(),
                outcome = %action.outcome,
                component = %action.component,
                degraded = action.degraded,
                message = %action.message,
                "Recovered from failure"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings() {
        let settings = shared_types_rs::LoggingSettings {
            level: "debug".to_string(),
            json_format: false,
            service_name: "planner".to_string(),
        };

        let config = LoggingConfig::from(&settings);
        assert_eq!(config.level, "debug");
        assert_eq!(config.service_name, "planner");
        assert!(!config.json_format);
        assert!(config.include_targets);
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig {
            json_format: false,
            ..Default::default()
        };

        // Another test binary may already own the global subscriber
        if init_logging(Some(config.clone())).is_ok() {
            assert!(is_initialized());
            assert!(init_logging(Some(config)).is_ok());
        }
    }
}
