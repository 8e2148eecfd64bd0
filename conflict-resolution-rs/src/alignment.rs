//! # Objective Alignment
//!
//! Scores how well a recommendation serves the user's stated objective.
//! The score is out of 100:
//!
//! - 20 points flat
//! - up to 50 points for objective words (longer than three characters)
//!   that also appear in the recommendation or its rationale, scaled by
//!   the share of objective words matched
//! - up to 30 points scaled from the recommendation's own confidence
//! - minus 10 for high risk, 30 for critical risk

use std::collections::BTreeSet;

use crate::types::{AgentRecommendation, RiskLevel};

const BASE_SCORE: f64 = 20.0;
const KEYWORD_WEIGHT: f64 = 50.0;
const CONFIDENCE_WEIGHT: f64 = 0.3;
const MIN_WORD_LEN: usize = 4;

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

/// Distinct lowercase objective words of at least four characters
pub fn objective_words(objective: &str) -> BTreeSet<String> {
    words(objective)
        .filter(|word| word.chars().count() >= MIN_WORD_LEN)
        .collect()
}

fn risk_penalty(risk: RiskLevel) -> f64 {
    match risk {
        RiskLevel::High => 10.0,
        RiskLevel::Critical => 30.0,
        RiskLevel::Low | RiskLevel::Medium => 0.0,
    }
}

pub fn alignment_score(recommendation: &AgentRecommendation, objective: &str) -> f64 {
    let wanted = objective_words(objective);

    let keyword_points = if wanted.is_empty() {
        0.0
    } else {
        let offered: BTreeSet<String> = words(&recommendation.recommendation)
            .chain(words(&recommendation.rationale))
            .collect();
        let matched = wanted.intersection(&offered).count();
        KEYWORD_WEIGHT * matched as f64 / wanted.len() as f64
    };

    let confidence_points = recommendation.confidence.clamp(0.0, 100.0) * CONFIDENCE_WEIGHT;

    (BASE_SCORE + keyword_points + confidence_points - risk_penalty(recommendation.risk))
        .clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objective_words_skip_short_words() {
        let words = objective_words("Implement X fully, and FULLY test it");
        let words: Vec<_> = words.iter().map(String::as_str).collect();
        assert_eq!(words, vec!["fully", "implement", "test"]);
    }

    #[test]
    fn test_matching_rationale_scores_higher() {
        let objective = "implement X fully";
        let aligned = AgentRecommendation::new("a", "X", 90.0).rationale("matches objective fully");
        let unrelated = AgentRecommendation::new("b", "Y", 40.0).rationale("unrelated");

        // 20 + 25 + 27
        assert!((alignment_score(&aligned, objective) - 72.0).abs() < 1e-9);
        // 20 + 0 + 12
        assert!((alignment_score(&unrelated, objective) - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_risk_penalty_and_clamp() {
        let risky = AgentRecommendation::new("a", "nothing relevant", 0.0).risk(RiskLevel::Critical);
        assert_eq!(alignment_score(&risky, "rewrite billing"), 0.0);

        let high = AgentRecommendation::new("a", "rewrite billing", 100.0).risk(RiskLevel::High);
        // 20 + 50 + 30 - 10
        assert!((alignment_score(&high, "rewrite billing") - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_objective_uses_confidence_only() {
        let rec = AgentRecommendation::new("a", "anything", 50.0);
        assert!((alignment_score(&rec, "do it") - 35.0).abs() < 1e-9);
    }
}
