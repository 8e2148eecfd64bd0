//! # Recommendation and Resolution Types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Model tiers, ordered by capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Haiku,
    Sonnet,
    Opus,
}

impl ModelTier {
    pub fn ordinal(self) -> u8 {
        match self {
            ModelTier::Haiku => 1,
            ModelTier::Sonnet => 2,
            ModelTier::Opus => 3,
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelTier::Haiku => write!(f, "haiku"),
            ModelTier::Sonnet => write!(f, "sonnet"),
            ModelTier::Opus => write!(f, "opus"),
        }
    }
}

/// Kinds of change, ordered by size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Approach {
    Delete,
    Modify,
    Extend,
    Create,
}

impl Approach {
    pub fn change_size(self) -> u8 {
        match self {
            Approach::Delete => 1,
            Approach::Modify => 2,
            Approach::Extend => 3,
            Approach::Create => 4,
        }
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Approach::Delete => write!(f, "delete"),
            Approach::Modify => write!(f, "modify"),
            Approach::Extend => write!(f, "extend"),
            Approach::Create => write!(f, "create"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Low
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

/// One agent's proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecommendation {
    pub agent_id: String,
    /// The proposal itself, as free text
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approach: Option<Approach>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// Self-reported confidence, 0-100
    pub confidence: f64,
    #[serde(default)]
    pub risk: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration_secs: Option<u64>,
    #[serde(default)]
    pub rationale: String,
}

impl AgentRecommendation {
    pub fn new<A, R>(agent_id: A, recommendation: R, confidence: f64) -> Self
    where
        A: Into<String>,
        R: Into<String>,
    {
        Self {
            agent_id: agent_id.into(),
            recommendation: recommendation.into(),
            model: None,
            approach: None,
            priority: None,
            confidence,
            risk: RiskLevel::Low,
            estimated_cost: None,
            estimated_duration_secs: None,
            rationale: String::new(),
        }
    }

    pub fn model(mut self, model: ModelTier) -> Self {
        self.model = Some(model);
        self
    }

    pub fn approach(mut self, approach: Approach) -> Self {
        self.approach = Some(approach);
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn risk(mut self, risk: RiskLevel) -> Self {
        self.risk = risk;
        self
    }

    pub fn estimated_cost(mut self, cost: f64) -> Self {
        self.estimated_cost = Some(cost);
        self
    }

    pub fn estimated_duration_secs(mut self, secs: u64) -> Self {
        self.estimated_duration_secs = Some(secs);
        self
    }

    pub fn rationale<S: Into<String>>(mut self, rationale: S) -> Self {
        self.rationale = rationale.into();
        self
    }

    pub fn is_critical(&self) -> bool {
        self.risk == RiskLevel::Critical
    }
}

/// The nature of a disagreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    Model,
    Approach,
    Priority,
    Tie,
    Critical,
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictType::Model => write!(f, "model"),
            ConflictType::Approach => write!(f, "approach"),
            ConflictType::Priority => write!(f, "priority"),
            ConflictType::Tie => write!(f, "tie"),
            ConflictType::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    QualityOverSpeed,
    MinimalChange,
    ObjectiveAlignment,
    HumanInTheLoop,
    CriticalEscalation,
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStrategy::QualityOverSpeed => write!(f, "quality_over_speed"),
            ResolutionStrategy::MinimalChange => write!(f, "minimal_change"),
            ResolutionStrategy::ObjectiveAlignment => write!(f, "objective_alignment"),
            ResolutionStrategy::HumanInTheLoop => write!(f, "human_in_the_loop"),
            ResolutionStrategy::CriticalEscalation => write!(f, "critical_escalation"),
        }
    }
}

/// Outcome of applying a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub strategy: ResolutionStrategy,
    /// `None` until a human picks one when `requires_hitl` is set
    pub winner: Option<AgentRecommendation>,
    pub reason: String,
    pub confidence: f64,
    pub requires_hitl: bool,
}

impl Resolution {
    pub(crate) fn decided<R: Into<String>>(
        strategy: ResolutionStrategy,
        winner: Option<AgentRecommendation>,
        reason: R,
        confidence: f64,
    ) -> Self {
        Self {
            strategy,
            winner,
            reason: reason.into(),
            confidence,
            requires_hitl: false,
        }
    }

    pub(crate) fn escalated<R: Into<String>>(
        strategy: ResolutionStrategy,
        reason: R,
        confidence: f64,
    ) -> Self {
        Self {
            strategy,
            winner: None,
            reason: reason.into(),
            confidence,
            requires_hitl: true,
        }
    }
}

/// A resolved (or escalated) conflict, as kept in history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub id: String,
    pub conflict_type: ConflictType,
    /// Ids of the agents involved, in input order
    pub agents: Vec<String>,
    pub recommendations: Vec<AgentRecommendation>,
    pub resolution: Resolution,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals() {
        assert!(ModelTier::Opus.ordinal() > ModelTier::Sonnet.ordinal());
        assert!(ModelTier::Sonnet.ordinal() > ModelTier::Haiku.ordinal());
        assert!(Approach::Delete.change_size() < Approach::Modify.change_size());
        assert!(Approach::Extend.change_size() < Approach::Create.change_size());
    }

    #[test]
    fn test_recommendation_deserializes_with_defaults() {
        let rec: AgentRecommendation = serde_json::from_value(serde_json::json!({
            "agent_id": "planner",
            "recommendation": "split the module",
            "model": "sonnet",
            "confidence": 70.0
        }))
        .unwrap();

        assert_eq!(rec.model, Some(ModelTier::Sonnet));
        assert_eq!(rec.approach, None);
        assert_eq!(rec.risk, RiskLevel::Low);
        assert!(rec.rationale.is_empty());
    }

    #[test]
    fn test_builder() {
        let rec = AgentRecommendation::new("reviewer", "drop the table", 80.0)
            .approach(Approach::Delete)
            .risk(RiskLevel::Critical)
            .estimated_cost(0.4)
            .rationale("irreversible");

        assert!(rec.is_critical());
        assert_eq!(rec.approach, Some(Approach::Delete));
        assert_eq!(rec.estimated_cost, Some(0.4));
        assert_eq!(serde_json::to_value(&rec).unwrap()["risk"], "critical");
    }
}
