//! Conflict classification.

use std::collections::HashSet;

use crate::types::{AgentRecommendation, ConflictType};

/// Confidence spread below which recommendations count as a tie
pub const DEFAULT_TIE_SPREAD: f64 = 10.0;

/// Classifies a set of recommendations using the default tie spread
pub fn detect_conflict_type(recommendations: &[AgentRecommendation]) -> ConflictType {
    detect_conflict_type_with_spread(recommendations, DEFAULT_TIE_SPREAD)
}

/// Classification checks run in a fixed order; the first match wins.
/// A critical risk anywhere overrides every other difference.
pub fn detect_conflict_type_with_spread(
    recommendations: &[AgentRecommendation],
    tie_spread: f64,
) -> ConflictType {
    if recommendations.len() < 2 {
        return ConflictType::Tie;
    }
    if recommendations.iter().any(AgentRecommendation::is_critical) {
        return ConflictType::Critical;
    }

    let models: HashSet<_> = recommendations.iter().filter_map(|r| r.model).collect();
    if models.len() > 1 {
        return ConflictType::Model;
    }

    let approaches: HashSet<_> = recommendations.iter().filter_map(|r| r.approach).collect();
    if approaches.len() > 1 {
        return ConflictType::Approach;
    }

    if confidence_spread(recommendations) < tie_spread {
        ConflictType::Tie
    } else {
        ConflictType::Priority
    }
}

/// Max minus min confidence; 0 for an empty slice
pub fn confidence_spread(recommendations: &[AgentRecommendation]) -> f64 {
    let mut confidences = recommendations.iter().map(|r| r.confidence);
    let Some(first) = confidences.next() else {
        return 0.0;
    };
    let (min, max) = confidences.fold((first, first), |(min, max), c| (min.min(c), max.max(c)));
    max - min
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Approach, ModelTier, RiskLevel};

    fn rec(agent: &str, confidence: f64) -> AgentRecommendation {
        AgentRecommendation::new(agent, format!("{} plan", agent), confidence)
    }

    #[test]
    fn test_fewer_than_two_is_tie() {
        assert_eq!(detect_conflict_type(&[]), ConflictType::Tie);
        assert_eq!(detect_conflict_type(&[rec("a", 90.0)]), ConflictType::Tie);
    }

    #[test]
    fn test_critical_overrides_everything() {
        let recs = vec![
            rec("a", 90.0).model(ModelTier::Opus).approach(Approach::Modify),
            rec("b", 20.0)
                .model(ModelTier::Opus)
                .approach(Approach::Modify)
                .risk(RiskLevel::Critical),
        ];
        assert_eq!(detect_conflict_type(&recs), ConflictType::Critical);

        let differing = vec![
            rec("a", 90.0).model(ModelTier::Haiku),
            rec("b", 20.0).model(ModelTier::Opus).risk(RiskLevel::Critical),
        ];
        assert_eq!(detect_conflict_type(&differing), ConflictType::Critical);
    }

    #[test]
    fn test_model_before_approach() {
        let recs = vec![
            rec("a", 80.0).model(ModelTier::Haiku).approach(Approach::Create),
            rec("b", 80.0).model(ModelTier::Opus).approach(Approach::Delete),
        ];
        assert_eq!(detect_conflict_type(&recs), ConflictType::Model);
    }

    #[test]
    fn test_approach_when_models_agree() {
        let recs = vec![
            rec("a", 80.0).model(ModelTier::Sonnet).approach(Approach::Create),
            rec("b", 82.0).model(ModelTier::Sonnet).approach(Approach::Delete),
        ];
        assert_eq!(detect_conflict_type(&recs), ConflictType::Approach);
    }

    #[test]
    fn test_spread_decides_tie_or_priority() {
        assert_eq!(
            detect_conflict_type(&[rec("a", 70.0), rec("b", 79.0)]),
            ConflictType::Tie
        );
        assert_eq!(
            detect_conflict_type(&[rec("a", 70.0), rec("b", 80.0)]),
            ConflictType::Priority
        );
        assert_eq!(
            detect_conflict_type_with_spread(&[rec("a", 70.0), rec("b", 80.0)], 20.0),
            ConflictType::Tie
        );
    }
}
