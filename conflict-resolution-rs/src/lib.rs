//! # Conflict Resolution
//!
//! Settles disagreements between agents. A set of recommendations is
//! classified as a model, approach, priority, tie or critical conflict,
//! and one fixed rule per class picks a winner or defers to a human:
//!
//! | conflict | rule                                   | confidence |
//! |----------|----------------------------------------|------------|
//! | model    | most capable tier wins                 | 95         |
//! | approach | smallest change wins                   | 85         |
//! | priority | best objective alignment, unless close | score      |
//! | tie      | human decides                          | 50         |
//! | critical | human decides                          | 0          |

pub mod types;
pub mod detect;
pub mod alignment;
pub mod rules;
pub mod hitl;
pub mod resolver;

pub use types::{
    AgentRecommendation, Approach, ConflictResolution, ConflictType, ModelTier, Resolution,
    ResolutionStrategy, RiskLevel,
};
pub use detect::{detect_conflict_type, DEFAULT_TIE_SPREAD};
pub use alignment::alignment_score;
pub use rules::{
    resolve_approach_conflict, resolve_critical, resolve_model_conflict,
    resolve_priority_conflict, resolve_tie,
};
pub use hitl::{generate_hitl_question, HitlOption, HitlQuestion};
pub use resolver::{ConflictResolver, ResolverContext, ResolverError};
