//! # Degradation State
//!
//! The severity ladder and the per-task record of how far a task has
//! degraded.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity ladder, ordered from normal operation to total failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum DegradationLevel {
    /// Normal operation
    Normal = 0,
    /// An agent failed and a substitute answered
    AgentFallback = 1,
    /// A phase was replaced by a heuristic
    Heuristic = 2,
    /// Only some phases completed
    PartialExecution = 3,
    /// The orchestrator was bypassed entirely
    OrchestratorBypass = 4,
    /// Nothing can run
    SystemDown = 5,
}

impl DegradationLevel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            DegradationLevel::Normal => "Normal operation",
            DegradationLevel::AgentFallback => "Agent fallback",
            DegradationLevel::Heuristic => "Heuristic fallback",
            DegradationLevel::PartialExecution => "Partial execution",
            DegradationLevel::OrchestratorBypass => "Orchestrator bypass",
            DegradationLevel::SystemDown => "System failure",
        }
    }

    /// Canned guidance shown in the degradation report
    pub fn recommendation(self) -> &'static str {
        match self {
            DegradationLevel::Normal => "No action needed.",
            DegradationLevel::AgentFallback => {
                "Results came from a fallback agent. Review output quality before relying on it."
            }
            DegradationLevel::Heuristic => {
                "One or more phases used heuristic fallbacks. Verify the output manually."
            }
            DegradationLevel::PartialExecution => {
                "Only some phases completed. Re-run the failed phases once the cause is fixed."
            }
            DegradationLevel::OrchestratorBypass => {
                "The orchestrator was bypassed. Treat the response as a direct, unvalidated answer."
            }
            DegradationLevel::SystemDown => {
                "The system is unavailable. Retry later or escalate to an operator."
            }
        }
    }
}

impl fmt::Display for DegradationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_u8(), self.label())
    }
}

impl From<DegradationLevel> for u8 {
    fn from(level: DegradationLevel) -> Self {
        level.as_u8()
    }
}

impl TryFrom<u8> for DegradationLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DegradationLevel::Normal),
            1 => Ok(DegradationLevel::AgentFallback),
            2 => Ok(DegradationLevel::Heuristic),
            3 => Ok(DegradationLevel::PartialExecution),
            4 => Ok(DegradationLevel::OrchestratorBypass),
            5 => Ok(DegradationLevel::SystemDown),
            other => Err(format!("degradation level out of range: {}", other)),
        }
    }
}

impl Default for DegradationLevel {
    fn default() -> Self {
        DegradationLevel::Normal
    }
}

/// Per-task degradation record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DegradationState {
    /// Highest level reached; never decreases within a task
    pub level: DegradationLevel,
    pub failed_components: Vec<String>,
    pub working_components: Vec<String>,
    pub quality_degraded: bool,
    /// Retry attempts made per component
    pub recovery_attempts: HashMap<String, u32>,
}

impl DegradationState {
    /// Raises the level; lower requests are ignored.
    /// Returns true if the level changed.
    pub(crate) fn raise(&mut self, level: DegradationLevel) -> bool {
        if level > self.level {
            self.level = level;
            true
        } else {
            false
        }
    }

    pub(crate) fn mark_failed(&mut self, component: &str) {
        if !self.failed_components.iter().any(|c| c == component) {
            self.failed_components.push(component.to_string());
        }
    }

    pub(crate) fn mark_working(&mut self, component: &str) {
        if !self.working_components.iter().any(|c| c == component) {
            self.working_components.push(component.to_string());
        }
    }

    /// Moves a component from the failed list to the working list
    pub(crate) fn mark_recovered(&mut self, component: &str) {
        self.failed_components.retain(|c| c != component);
        self.mark_working(component);
    }

    pub(crate) fn add_attempts(&mut self, component: &str, attempts: u32) {
        *self.recovery_attempts.entry(component.to_string()).or_insert(0) += attempts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(DegradationLevel::Normal < DegradationLevel::AgentFallback);
        assert!(DegradationLevel::OrchestratorBypass < DegradationLevel::SystemDown);
        assert_eq!(DegradationLevel::PartialExecution.as_u8(), 3);
        assert_eq!(DegradationLevel::try_from(4), Ok(DegradationLevel::OrchestratorBypass));
        assert!(DegradationLevel::try_from(6).is_err());
    }

    #[test]
    fn test_raise_never_lowers() {
        let mut state = DegradationState::default();
        assert!(state.raise(DegradationLevel::Heuristic));
        assert!(!state.raise(DegradationLevel::AgentFallback));
        assert_eq!(state.level, DegradationLevel::Heuristic);
    }

    #[test]
    fn test_component_lists_deduplicate() {
        let mut state = DegradationState::default();
        state.mark_failed("planner");
        state.mark_failed("planner");
        state.mark_working("backup");
        state.add_attempts("planner", 2);
        state.add_attempts("planner", 3);

        assert_eq!(state.failed_components, vec!["planner".to_string()]);
        assert_eq!(state.working_components, vec!["backup".to_string()]);
        assert_eq!(state.recovery_attempts["planner"], 5);
    }

    #[test]
    fn test_level_serializes_as_number() {
        let value = serde_json::to_value(DegradationLevel::Heuristic).unwrap();
        assert_eq!(value, serde_json::json!(2));
    }
}
