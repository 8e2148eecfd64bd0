//! # Conflict Resolver
//!
//! Classifies a set of recommendations, applies the matching rule and
//! records the outcome. History lives in a [`ResolverContext`] owned by
//! the caller; it is bounded, evicting the oldest entries first.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use shared_types_rs::{ConflictSettings, DecisionRecord, ResilienceConfig, TaskStateStore};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::detect::detect_conflict_type_with_spread;
use crate::rules::{
    resolve_approach_conflict, resolve_critical, resolve_model_conflict,
    resolve_priority_conflict, resolve_tie,
};
use crate::types::{AgentRecommendation, ConflictResolution, ConflictType, Resolution};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolverError {
    #[error("Conflict not found: {0}")]
    ConflictNotFound(String),
}

/// Resolution history for one stream of tasks
pub struct ResolverContext {
    history: VecDeque<ConflictResolution>,
    capacity: usize,
    task_state: Arc<dyn TaskStateStore>,
}

impl std::fmt::Debug for ResolverContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverContext")
            .field("history", &self.history.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl ResolverContext {
    pub fn new(task_state: Arc<dyn TaskStateStore>, capacity: usize) -> Self {
        Self {
            history: VecDeque::new(),
            capacity: capacity.max(1),
            task_state,
        }
    }

    pub fn from_settings(task_state: Arc<dyn TaskStateStore>, settings: &ConflictSettings) -> Self {
        Self::new(task_state, settings.history_capacity)
    }

    /// Oldest first
    pub fn resolution_history(&self) -> &VecDeque<ConflictResolution> {
        &self.history
    }

    /// Conflicts still waiting for a human
    pub fn hitl_conflicts(&self) -> Vec<&ConflictResolution> {
        self.history
            .iter()
            .filter(|conflict| conflict.resolution.requires_hitl)
            .collect()
    }

    pub fn find(&self, id: &str) -> Option<&ConflictResolution> {
        self.history.iter().find(|conflict| conflict.id == id)
    }

    pub fn task_state(&self) -> &Arc<dyn TaskStateStore> {
        &self.task_state
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    fn push(&mut self, conflict: ConflictResolution) {
        self.history.push_back(conflict);
        while self.history.len() > self.capacity {
            if let Some(evicted) = self.history.pop_front() {
                debug!(conflict_id = %evicted.id, "Evicted oldest conflict from history");
            }
        }
    }
}

/// Stateless rule engine; all history goes through the context
#[derive(Debug, Clone, Default)]
pub struct ConflictResolver {
    settings: ConflictSettings,
}

impl ConflictResolver {
    pub fn new(settings: ConflictSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self::new(config.conflict.clone())
    }

    pub fn settings(&self) -> &ConflictSettings {
        &self.settings
    }

    pub fn new_context(&self, task_state: Arc<dyn TaskStateStore>) -> ResolverContext {
        ResolverContext::from_settings(task_state, &self.settings)
    }

    pub fn detect_conflict_type(&self, recommendations: &[AgentRecommendation]) -> ConflictType {
        detect_conflict_type_with_spread(recommendations, self.settings.tie_confidence_spread)
    }

    /// Classifies and resolves `recommendations`, appends the outcome to
    /// history and logs it as a decision in task state.
    pub fn resolve_conflict(
        &self,
        ctx: &mut ResolverContext,
        recommendations: Vec<AgentRecommendation>,
        objective: &str,
    ) -> ConflictResolution {
        let conflict_type = self.detect_conflict_type(&recommendations);
        debug!(
            conflict_type = %conflict_type,
            recommendations = recommendations.len(),
            "Conflict classified"
        );

        let resolution = self.apply_rule(conflict_type, &recommendations, objective);

        let conflict = ConflictResolution {
            id: format!("conflict-{}", Uuid::new_v4()),
            conflict_type,
            agents: recommendations.iter().map(|rec| rec.agent_id.clone()).collect(),
            recommendations,
            resolution,
            created_at: Utc::now(),
        };

        counter!("conflict.resolved", 1, "type" => conflict_type.to_string());
        if conflict.resolution.requires_hitl {
            counter!("conflict.hitl_required", 1);
            warn!(
                conflict_id = %conflict.id,
                conflict_type = %conflict_type,
                reason = %conflict.resolution.reason,
                "Conflict requires human input"
            );
        } else {
            info!(
                conflict_id = %conflict.id,
                conflict_type = %conflict_type,
                strategy = %conflict.resolution.strategy,
                winner = conflict.resolution.winner.as_ref().map(|w| w.agent_id.as_str()),
                confidence = conflict.resolution.confidence,
                "Conflict resolved"
            );
        }

        ctx.task_state
            .add_decision(decision_for(ctx.task_state.as_ref(), &conflict, "conflict_resolution"));
        ctx.push(conflict.clone());
        conflict
    }

    fn apply_rule(
        &self,
        conflict_type: ConflictType,
        recommendations: &[AgentRecommendation],
        objective: &str,
    ) -> Resolution {
        match conflict_type {
            ConflictType::Model => resolve_model_conflict(recommendations, &self.settings),
            ConflictType::Approach => resolve_approach_conflict(recommendations, &self.settings),
            ConflictType::Priority => {
                resolve_priority_conflict(recommendations, objective, &self.settings)
            }
            ConflictType::Tie => resolve_tie(recommendations, &self.settings),
            ConflictType::Critical => resolve_critical(recommendations),
        }
    }

    /// Records a human's choice for a conflict in history
    pub fn resolve_with_user_input<'a>(
        &self,
        ctx: &'a mut ResolverContext,
        conflict_id: &str,
        selection: AgentRecommendation,
    ) -> Result<&'a ConflictResolution, ResolverError> {
        let index = ctx
            .history
            .iter()
            .position(|conflict| conflict.id == conflict_id)
            .ok_or_else(|| ResolverError::ConflictNotFound(conflict_id.to_string()))?;

        let task_state = Arc::clone(&ctx.task_state);
        let conflict = &mut ctx.history[index];

        conflict.resolution.reason.push_str(" (resolved by user input)");
        conflict.resolution.requires_hitl = false;
        conflict.resolution.winner = Some(selection);

        info!(
            conflict_id = %conflict.id,
            selected = conflict.resolution.winner.as_ref().map(|w| w.agent_id.as_str()),
            "Conflict resolved by user"
        );
        task_state.add_decision(decision_for(task_state.as_ref(), conflict, "user_resolution"));

        Ok(&ctx.history[index])
    }
}

fn decision_for(
    task_state: &dyn TaskStateStore,
    conflict: &ConflictResolution,
    decision_type: &str,
) -> DecisionRecord {
    let resolution = &conflict.resolution;
    let selected = resolution
        .winner
        .as_ref()
        .map_or_else(|| "pending human input".to_string(), |w| w.recommendation.clone());
    let winner_id = resolution.winner.as_ref().map(|w| w.agent_id.as_str());

    let decision = DecisionRecord::new(
        task_state.current_phase().unwrap_or(0),
        decision_type,
        selected,
        resolution.reason.clone(),
        resolution.confidence,
    );

    conflict
        .recommendations
        .iter()
        .filter(|rec| Some(rec.agent_id.as_str()) != winner_id)
        .fold(decision, |decision, rec| {
            decision.alternative(
                rec.recommendation.clone(),
                format!("Not selected by {} ({})", resolution.strategy, rec.agent_id),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Approach, ModelTier, ResolutionStrategy, RiskLevel};
    use shared_types_rs::InMemoryTaskState;

    fn setup(capacity: usize) -> (Arc<InMemoryTaskState>, ConflictResolver, ResolverContext) {
        let task_state = Arc::new(InMemoryTaskState::new());
        let resolver = ConflictResolver::new(ConflictSettings {
            history_capacity: capacity,
            ..ConflictSettings::default()
        });
        let ctx = resolver.new_context(task_state.clone());
        (task_state, resolver, ctx)
    }

    fn model_conflict() -> Vec<AgentRecommendation> {
        vec![
            AgentRecommendation::new("fast", "quick pass", 80.0).model(ModelTier::Haiku),
            AgentRecommendation::new("deep", "thorough pass", 70.0).model(ModelTier::Opus),
        ]
    }

    #[test]
    fn test_resolution_is_recorded() {
        let (task_state, resolver, mut ctx) = setup(10);
        task_state.set_current_phase(4);

        let conflict = resolver.resolve_conflict(&mut ctx, model_conflict(), "review the code");

        assert!(conflict.id.starts_with("conflict-"));
        assert_eq!(conflict.conflict_type, ConflictType::Model);
        assert_eq!(conflict.agents, vec!["fast".to_string(), "deep".to_string()]);
        assert_eq!(ctx.find(&conflict.id), Some(&conflict));

        let decisions = task_state.decisions();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].phase, 4);
        assert_eq!(decisions[0].decision_type, "conflict_resolution");
        assert_eq!(decisions[0].selected, "thorough pass");
        assert_eq!(decisions[0].alternatives.len(), 1);
        assert_eq!(decisions[0].alternatives[0].option, "quick pass");
    }

    #[test]
    fn test_history_is_bounded() {
        let (_, resolver, mut ctx) = setup(2);

        let first = resolver.resolve_conflict(&mut ctx, model_conflict(), "");
        resolver.resolve_conflict(&mut ctx, model_conflict(), "");
        resolver.resolve_conflict(&mut ctx, model_conflict(), "");

        assert_eq!(ctx.len(), 2);
        assert!(ctx.find(&first.id).is_none());

        ctx.clear();
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_hitl_conflicts_and_user_input() {
        let (task_state, resolver, mut ctx) = setup(10);
        let recs = vec![
            AgentRecommendation::new("a", "delete the cache", 70.0)
                .approach(Approach::Delete)
                .risk(RiskLevel::Critical)
                .rationale("drops user sessions"),
            AgentRecommendation::new("b", "extend the cache", 72.0).approach(Approach::Extend),
        ];

        let conflict = resolver.resolve_conflict(&mut ctx, recs.clone(), "");
        assert_eq!(conflict.resolution.strategy, ResolutionStrategy::CriticalEscalation);
        assert_eq!(ctx.hitl_conflicts().len(), 1);

        let resolved = resolver
            .resolve_with_user_input(&mut ctx, &conflict.id, recs[1].clone())
            .unwrap();
        assert!(!resolved.resolution.requires_hitl);
        assert_eq!(resolved.resolution.winner.as_ref(), Some(&recs[1]));
        assert!(resolved.resolution.reason.ends_with("(resolved by user input)"));
        assert!(ctx.hitl_conflicts().is_empty());

        let decisions = task_state.decisions();
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0].selected, "pending human input");
        assert_eq!(decisions[1].decision_type, "user_resolution");
        assert_eq!(decisions[1].selected, "extend the cache");
    }

    #[test]
    fn test_unknown_conflict_id() {
        let (_, resolver, mut ctx) = setup(10);
        let err = resolver
            .resolve_with_user_input(&mut ctx, "conflict-missing", model_conflict()[0].clone())
            .unwrap_err();
        assert_eq!(err, ResolverError::ConflictNotFound("conflict-missing".to_string()));
        assert_eq!(err.to_string(), "Conflict not found: conflict-missing");
    }
}
