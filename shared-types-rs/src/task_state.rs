// shared-types-rs/src/task_state.rs
// Task-state store shared by the degradation coordinator and the conflict resolver

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::RwLock;
use tracing::debug;

/// Severity attached to a warning recorded in task state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningSeverity {
    Low,
    Medium,
    High,
}

impl fmt::Display for WarningSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningSeverity::Low => write!(f, "low"),
            WarningSeverity::Medium => write!(f, "medium"),
            WarningSeverity::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub phase: u8,
    pub severity: WarningSeverity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Warning {
    pub fn new<S: Into<String>>(phase: u8, severity: WarningSeverity, message: S) -> Self {
        Self {
            phase,
            severity,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// An option that lost a decision, with the reason it lost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedAlternative {
    pub option: String,
    pub reason: String,
}

/// A decision logged into task state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub phase: u8,
    pub decision_type: String,
    pub selected: String,
    pub alternatives: Vec<RejectedAlternative>,
    pub reason: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new<T, S, R>(phase: u8, decision_type: T, selected: S, reason: R, confidence: f64) -> Self
    where
        T: Into<String>,
        S: Into<String>,
        R: Into<String>,
    {
        Self {
            phase,
            decision_type: decision_type.into(),
            selected: selected.into(),
            alternatives: Vec::new(),
            reason: reason.into(),
            confidence,
            timestamp: Utc::now(),
        }
    }

    pub fn alternative<O: Into<String>, R: Into<String>>(mut self, option: O, reason: R) -> Self {
        self.alternatives.push(RejectedAlternative {
            option: option.into(),
            reason: reason.into(),
        });
        self
    }
}

/// Completion metrics for a single workflow phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseMetrics {
    pub completed: bool,
    pub duration_ms: Option<u64>,
}

/// The task-state collaborator consumed by both components.
///
/// Implementations use interior mutability so a single store can be
/// shared behind an `Arc` by every component working on the same task.
#[cfg_attr(test, mockall::automock)]
pub trait TaskStateStore: Send + Sync {
    /// Phase the workflow is currently executing, if any
    fn current_phase(&self) -> Option<u8>;

    fn add_warning(&self, warning: Warning);

    fn add_decision(&self, decision: DecisionRecord);

    fn set_degradation_level(&self, level: u8);

    /// Read-only view of per-phase completion metrics
    fn phase_metrics(&self) -> BTreeMap<u8, PhaseMetrics>;
}

/// Phases reported as complete by the store, in ascending order
pub fn completed_phases(store: &dyn TaskStateStore) -> Vec<u8> {
    store
        .phase_metrics()
        .into_iter()
        .filter(|(_, metrics)| metrics.completed)
        .map(|(phase, _)| phase)
        .collect()
}

/// Phases the store knows about that did not complete
pub fn incomplete_phases(store: &dyn TaskStateStore) -> Vec<u8> {
    store
        .phase_metrics()
        .into_iter()
        .filter(|(_, metrics)| !metrics.completed)
        .map(|(phase, _)| phase)
        .collect()
}

#[derive(Debug, Default)]
struct TaskStateInner {
    current_phase: Option<u8>,
    warnings: Vec<Warning>,
    decisions: Vec<DecisionRecord>,
    degradation_level: u8,
    phase_metrics: BTreeMap<u8, PhaseMetrics>,
}

/// In-memory task state, one per task
#[derive(Debug, Default)]
pub struct InMemoryTaskState {
    inner: RwLock<TaskStateInner>,
}

impl InMemoryTaskState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current_phase(&self, phase: u8) {
        if let Ok(mut inner) = self.inner.write() {
            inner.current_phase = Some(phase);
        }
    }

    pub fn mark_phase_complete(&self, phase: u8, duration_ms: Option<u64>) {
        if let Ok(mut inner) = self.inner.write() {
            inner.phase_metrics.insert(
                phase,
                PhaseMetrics {
                    completed: true,
                    duration_ms,
                },
            );
        }
    }

    pub fn mark_phase_failed(&self, phase: u8) {
        if let Ok(mut inner) = self.inner.write() {
            inner.phase_metrics.entry(phase).or_default().completed = false;
        }
    }

    pub fn warnings(&self) -> Vec<Warning> {
        self.inner
            .read()
            .map(|inner| inner.warnings.clone())
            .unwrap_or_default()
    }

    pub fn decisions(&self) -> Vec<DecisionRecord> {
        self.inner
            .read()
            .map(|inner| inner.decisions.clone())
            .unwrap_or_default()
    }

    pub fn degradation_level(&self) -> u8 {
        self.inner
            .read()
            .map(|inner| inner.degradation_level)
            .unwrap_or_default()
    }
}

impl TaskStateStore for InMemoryTaskState {
    fn current_phase(&self) -> Option<u8> {
        self.inner.read().ok().and_then(|inner| inner.current_phase)
    }

    fn add_warning(&self, warning: Warning) {
        debug!(phase = warning.phase, severity = %warning.severity, "Recording task warning");
        if let Ok(mut inner) = self.inner.write() {
            inner.warnings.push(warning);
        }
    }

    fn add_decision(&self, decision: DecisionRecord) {
        debug!(
            phase = decision.phase,
            decision_type = %decision.decision_type,
            selected = %decision.selected,
            "Recording task decision"
        );
        if let Ok(mut inner) = self.inner.write() {
            inner.decisions.push(decision);
        }
    }

    fn set_degradation_level(&self, level: u8) {
        if let Ok(mut inner) = self.inner.write() {
            inner.degradation_level = level;
        }
    }

    fn phase_metrics(&self) -> BTreeMap<u8, PhaseMetrics> {
        self.inner
            .read()
            .map(|inner| inner.phase_metrics.clone())
            .unwrap_or_default()
    }
}
