//! # Graceful Degradation
//!
//! Keeps a multi-agent workflow producing output while its parts fail.
//! Failures are classified by origin and escalated along a fixed ladder:
//!
//! - agent failures are retried with exponential backoff, guarded by
//!   per-component circuit breakers, then handed to a fallback chain
//! - phase failures are replaced by deterministic heuristics
//! - orchestrator failures fall back to partial results or a direct answer
//! - system failures are reported as total failure
//!
//! Each step raises a monotonic degradation level (0-5) kept in a
//! [`DegradationContext`], which is mirrored into the task-state store.

pub mod types;
pub mod logging;
pub mod failure;
pub mod state;
pub mod circuit_breaker;
pub mod retry;
pub mod fallback;
pub mod heuristics;
pub mod context;
pub mod report;
pub mod coordinator;

// Re-export commonly used types
pub use types::{Error, ErrorKind, Result};
pub use logging::{init_logging, log_recovery, LoggingConfig};
pub use failure::{FailureEvent, FailureOrigin, RecoveryAction, RecoveryOutcome};
pub use state::{DegradationLevel, DegradationState};
pub use circuit_breaker::{CircuitBreakerRegistry, CircuitBreakerState, CircuitState};
pub use retry::RetryPolicy;
pub use fallback::{AgentInvoker, FallbackChains, SimulatedInvoker};
pub use heuristics::{FnHeuristic, HeuristicRegistry, PhaseHeuristic};
pub use context::{DegradationContext, DegradationSnapshot};
pub use coordinator::GracefulDegradation;

/// Initializes logging from `config` and builds a coordinator with its
/// degradation settings
pub fn init_with_config(config: &shared_types_rs::ResilienceConfig) -> Result<GracefulDegradation> {
    config.validate()?;
    init_logging(Some(LoggingConfig::from(&config.logging)))?;
    Ok(GracefulDegradation::from_config(config))
}

/// Loads the global configuration file and initializes from it
pub fn init() -> Result<GracefulDegradation> {
    let config = shared_types_rs::ResilienceConfig::load()?;
    init_with_config(&config)
}
