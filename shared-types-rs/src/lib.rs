pub mod config;
pub mod task_state;

pub use config::{
    ConfigError, ConflictSettings, DegradationSettings, LoggingSettings, ResilienceConfig,
};
pub use task_state::{
    completed_phases, incomplete_phases, DecisionRecord, InMemoryTaskState, PhaseMetrics,
    RejectedAlternative, TaskStateStore, Warning, WarningSeverity,
};
