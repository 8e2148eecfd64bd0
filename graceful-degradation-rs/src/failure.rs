//! # Failure Events and Recovery Actions
//!
//! The input and output shapes of the degradation coordinator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a failure was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureOrigin {
    Agent,
    Phase,
    Orchestrator,
    System,
    /// Any origin this version does not recognise
    #[serde(other)]
    Unknown,
}

impl fmt::Display for FailureOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureOrigin::Agent => write!(f, "agent"),
            FailureOrigin::Phase => write!(f, "phase"),
            FailureOrigin::Orchestrator => write!(f, "orchestrator"),
            FailureOrigin::System => write!(f, "system"),
            FailureOrigin::Unknown => write!(f, "unknown"),
        }
    }
}

/// A failure reported by the workflow.
///
/// Built by the caller when the failure is observed and consumed once by
/// `GracefulDegradation::handle_failure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEvent {
    #[serde(rename = "type")]
    pub origin: FailureOrigin,
    /// Agent id, phase number, or other component identifier
    pub component: String,
    pub error: String,
    #[serde(default)]
    pub context: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub retryable: bool,
}

impl FailureEvent {
    pub fn new<C, E>(origin: FailureOrigin, component: C, error: E) -> Self
    where
        C: Into<String>,
        E: Into<String>,
    {
        Self {
            origin,
            component: component.into(),
            error: error.into(),
            context: Map::new(),
            timestamp: Utc::now(),
            retryable: false,
        }
    }

    pub fn agent<C: Into<String>, E: Into<String>>(agent_id: C, error: E) -> Self {
        Self::new(FailureOrigin::Agent, agent_id, error)
    }

    pub fn phase<E: Into<String>>(phase: u8, error: E) -> Self {
        Self::new(FailureOrigin::Phase, phase.to_string(), error)
    }

    pub fn orchestrator<E: Into<String>>(error: E) -> Self {
        Self::new(FailureOrigin::Orchestrator, "orchestrator", error)
    }

    pub fn system<E: Into<String>>(error: E) -> Self {
        Self::new(FailureOrigin::System, "system", error)
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn context<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Serialize,
    {
        if let Ok(value) = serde_json::to_value(value) {
            self.context.insert(key.into(), value);
        }
        self
    }

    /// Phase number carried by a phase failure's component id
    pub fn phase_number(&self) -> Option<u8> {
        self.component
            .trim()
            .trim_start_matches("phase-")
            .parse()
            .ok()
    }
}

/// What the coordinator did about a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryOutcome {
    Retry,
    FallbackSuccess,
    PhaseSkippedWithHeuristic,
    PartialExecution,
    BypassOrchestrator,
    TotalFailure,
}

impl fmt::Display for RecoveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryOutcome::Retry => write!(f, "retry"),
            RecoveryOutcome::FallbackSuccess => write!(f, "fallback_success"),
            RecoveryOutcome::PhaseSkippedWithHeuristic => write!(f, "phase_skipped_with_heuristic"),
            RecoveryOutcome::PartialExecution => write!(f, "partial_execution"),
            RecoveryOutcome::BypassOrchestrator => write!(f, "bypass_orchestrator"),
            RecoveryOutcome::TotalFailure => write!(f, "total_failure"),
        }
    }
}

/// Result of handling one failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryAction {
    #[serde(rename = "action")]
    pub outcome: RecoveryOutcome,
    /// Component the action applies to
    pub component: String,
    pub result: Option<Value>,
    pub degraded: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_steps: Vec<String>,
}

impl RecoveryAction {
    pub fn new<C, M>(outcome: RecoveryOutcome, component: C, message: M) -> Self
    where
        C: Into<String>,
        M: Into<String>,
    {
        Self {
            outcome,
            component: component.into(),
            result: None,
            degraded: true,
            message: message.into(),
            next_steps: Vec::new(),
        }
    }

    pub fn result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    pub fn degraded(mut self, degraded: bool) -> Self {
        self.degraded = degraded;
        self
    }

    pub fn next_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.next_steps = steps.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_origin_deserializes() {
        let event: FailureEvent = serde_json::from_value(serde_json::json!({
            "type": "network",
            "component": "gateway",
            "error": "boom",
            "timestamp": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(event.origin, FailureOrigin::Unknown);
        assert!(!event.retryable);
        assert!(event.context.is_empty());
    }

    #[test]
    fn test_phase_number() {
        assert_eq!(FailureEvent::phase(3, "x").phase_number(), Some(3));
        assert_eq!(
            FailureEvent::new(FailureOrigin::Phase, "phase-5", "x").phase_number(),
            Some(5)
        );
        assert_eq!(FailureEvent::agent("planner", "x").phase_number(), None);
    }

    #[test]
    fn test_action_serializes_with_snake_case_outcome() {
        let action = RecoveryAction::new(RecoveryOutcome::BypassOrchestrator, "orchestrator", "down")
            .next_steps(["respond directly"]);
        let value = serde_json::to_value(&action).unwrap();

        assert_eq!(value["action"], "bypass_orchestrator");
        assert_eq!(value["degraded"], true);
        assert_eq!(value["next_steps"][0], "respond directly");
    }
}
