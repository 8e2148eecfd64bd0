//! # Degradation Context
//!
//! Everything the coordinator mutates while handling failures. One context
//! is created per task and passed into every `handle_failure` call; the
//! circuit breakers it holds survive `reset()` so sustained failures keep
//! counting across tasks.

use std::sync::Arc;

use metrics::gauge;
use serde::Serialize;
use shared_types_rs::{DegradationSettings, TaskStateStore};
use tracing::{debug, info};

use crate::circuit_breaker::{CircuitBreakerRegistry, CircuitBreakerState};
use crate::failure::FailureEvent;
use crate::state::{DegradationLevel, DegradationState};

/// Mutable state for one stream of tasks
pub struct DegradationContext {
    state: DegradationState,
    event_log: Vec<FailureEvent>,
    circuit_breakers: CircuitBreakerRegistry,
    task_state: Arc<dyn TaskStateStore>,
}

impl std::fmt::Debug for DegradationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DegradationContext")
            .field("state", &self.state)
            .field("events", &self.event_log.len())
            .field("circuit_breakers", &self.circuit_breakers.len())
            .finish()
    }
}

/// Serializable view of a context, for reporting
#[derive(Debug, Clone, Serialize)]
pub struct DegradationSnapshot {
    pub state: DegradationState,
    pub events: Vec<FailureEvent>,
    pub circuit_breakers: Vec<(String, CircuitBreakerState)>,
}

impl DegradationContext {
    pub fn new(task_state: Arc<dyn TaskStateStore>, circuit_breakers: CircuitBreakerRegistry) -> Self {
        Self {
            state: DegradationState::default(),
            event_log: Vec::new(),
            circuit_breakers,
            task_state,
        }
    }

    pub fn from_settings(task_state: Arc<dyn TaskStateStore>, settings: &DegradationSettings) -> Self {
        Self::new(task_state, CircuitBreakerRegistry::from_settings(settings))
    }

    pub fn state(&self) -> &DegradationState {
        &self.state
    }

    pub fn level(&self) -> DegradationLevel {
        self.state.level
    }

    pub fn event_log(&self) -> &[FailureEvent] {
        &self.event_log
    }

    pub fn circuit_breaker(&self, component: &str) -> Option<&CircuitBreakerState> {
        self.circuit_breakers.get(component)
    }

    pub fn circuit_breakers(&self) -> &CircuitBreakerRegistry {
        &self.circuit_breakers
    }

    pub fn circuit_breakers_mut(&mut self) -> &mut CircuitBreakerRegistry {
        &mut self.circuit_breakers
    }

    pub fn task_state(&self) -> &Arc<dyn TaskStateStore> {
        &self.task_state
    }

    pub(crate) fn state_mut(&mut self) -> &mut DegradationState {
        &mut self.state
    }

    pub(crate) fn record_event(&mut self, failure: FailureEvent) {
        self.event_log.push(failure);
    }

    /// Raises the level to at least `level` and mirrors it into task state
    pub fn set_level(&mut self, level: DegradationLevel) {
        if self.state.raise(level) {
            info!(level = %self.state.level, "Degradation level raised");
            self.task_state.set_degradation_level(self.state.level.as_u8());
            gauge!("degradation.level", self.state.level.as_u8() as f64);
        } else {
            debug!(
                current = %self.state.level,
                requested = %level,
                "Degradation level unchanged"
            );
        }
    }

    /// Starts a new task. Circuit breakers are kept.
    pub fn reset(&mut self) {
        self.state = DegradationState::default();
        self.event_log.clear();
        self.task_state.set_degradation_level(DegradationLevel::Normal.as_u8());
        gauge!("degradation.level", 0.0);
        debug!(breakers = self.circuit_breakers.len(), "Degradation state reset for new task");
    }

    /// Full reset, circuit breakers included
    pub fn reset_all(&mut self) {
        self.reset();
        self.circuit_breakers.clear();
    }

    pub fn snapshot(&self) -> DegradationSnapshot {
        let mut circuit_breakers: Vec<_> = self
            .circuit_breakers
            .iter()
            .map(|(component, circuit)| (component.clone(), circuit.clone()))
            .collect();
        circuit_breakers.sort_by(|a, b| a.0.cmp(&b.0));

        DegradationSnapshot {
            state: self.state.clone(),
            events: self.event_log.clone(),
            circuit_breakers,
        }
    }

    /// Human-readable summary; empty when nothing degraded
    pub fn generate_report(&self) -> String {
        crate::report::render(&self.state)
    }
}
