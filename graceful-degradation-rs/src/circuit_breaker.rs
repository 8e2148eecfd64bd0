//! # Circuit Breakers
//!
//! Per-component breakers that outlive a single task so sustained failure
//! patterns keep tripping them.
//!
//! - A breaker opens once its failure count reaches the threshold
//! - Only an explicit success resets the count and closes the breaker
//! - Nothing expires on its own; `sweep_expired` is the opt-in way to move
//!   long-open breakers to half-open

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Normal operation, calls allowed
    Closed,
    /// Failing, calls skipped
    Open,
    /// One trial call allowed
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF-OPEN"),
        }
    }
}

/// Breaker record for a single component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerState {
    pub state: CircuitState,
    pub failure_count: u32,
    pub threshold: u32,
    pub reset_timeout: Duration,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
}

impl CircuitBreakerState {
    pub fn new(threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            threshold,
            reset_timeout,
            last_failure: None,
            last_success: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == CircuitState::Open
    }
}

/// All breakers known to one degradation context
#[derive(Debug, Clone)]
pub struct CircuitBreakerRegistry {
    threshold: u32,
    reset_timeout: Duration,
    circuits: HashMap<String, CircuitBreakerState>,
}

impl CircuitBreakerRegistry {
    pub fn new(threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            reset_timeout,
            circuits: HashMap::new(),
        }
    }

    pub fn from_settings(settings: &shared_types_rs::DegradationSettings) -> Self {
        Self::new(
            settings.circuit_failure_threshold,
            Duration::from_millis(settings.circuit_reset_timeout_ms),
        )
    }

    pub fn get(&self, component: &str) -> Option<&CircuitBreakerState> {
        self.circuits.get(component)
    }

    pub fn is_open(&self, component: &str) -> bool {
        self.circuits
            .get(component)
            .map_or(false, CircuitBreakerState::is_open)
    }

    pub fn len(&self) -> usize {
        self.circuits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CircuitBreakerState)> {
        self.circuits.iter()
    }

    /// Forgets every breaker
    pub fn clear(&mut self) {
        self.circuits.clear();
    }

    fn entry(&mut self, component: &str) -> &mut CircuitBreakerState {
        let (threshold, reset_timeout) = (self.threshold, self.reset_timeout);
        self.circuits
            .entry(component.to_string())
            .or_insert_with(|| CircuitBreakerState::new(threshold, reset_timeout))
    }

    /// Counts a failure; returns the state afterwards
    pub fn record_failure(&mut self, component: &str) -> CircuitState {
        let circuit = self.entry(component);
        circuit.failure_count += 1;
        circuit.last_failure = Some(Utc::now());

        let previous = circuit.state;
        // A failed half-open trial re-opens straight away
        if circuit.state == CircuitState::HalfOpen || circuit.failure_count >= circuit.threshold {
            circuit.state = CircuitState::Open;
        }

        if previous != CircuitState::Open && circuit.state == CircuitState::Open {
            warn!(
                component = %component,
                failures = circuit.failure_count,
                threshold = circuit.threshold,
                "Circuit breaker opened"
            );
            counter!("degradation.circuit_opened", 1, "component" => component.to_string());
        } else {
            debug!(
                component = %component,
                failures = circuit.failure_count,
                state = %circuit.state,
                "Circuit breaker failure recorded"
            );
        }

        circuit.state
    }

    /// Resets the failure count and closes the breaker
    pub fn record_success(&mut self, component: &str) {
        let circuit = self.entry(component);
        let previous = circuit.state;

        circuit.failure_count = 0;
        circuit.state = CircuitState::Closed;
        circuit.last_success = Some(Utc::now());

        if previous != CircuitState::Closed {
            info!(component = %component, from = %previous, "Circuit breaker closed");
        }
    }

    /// Moves breakers open for longer than their reset timeout to half-open.
    ///
    /// Failure counts are left untouched. Returns the components moved.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let mut moved = Vec::new();

        for (component, circuit) in self.circuits.iter_mut() {
            if circuit.state != CircuitState::Open {
                continue;
            }
            let Some(last_failure) = circuit.last_failure else {
                continue;
            };
            let elapsed = (now - last_failure).to_std().unwrap_or_default();
            if elapsed >= circuit.reset_timeout {
                circuit.state = CircuitState::HalfOpen;
                moved.push(component.clone());
            }
        }

        if !moved.is_empty() {
            info!(components = ?moved, "Circuit breakers moved to half-open");
        }
        moved
    }
}
