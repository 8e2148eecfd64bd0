//! # Resolution Rules
//!
//! One fixed rule per conflict type. Rules never fail; when no safe
//! automatic choice exists they return a resolution with
//! `requires_hitl` set and no winner.

use std::cmp::Ordering;

use shared_types_rs::ConflictSettings;

use crate::alignment::alignment_score;
use crate::types::{AgentRecommendation, Resolution, ResolutionStrategy};

/// Picks the most capable model tier
pub fn resolve_model_conflict(
    recommendations: &[AgentRecommendation],
    settings: &ConflictSettings,
) -> Resolution {
    let mut ranked: Vec<&AgentRecommendation> = recommendations.iter().collect();
    // Stable, so equal tiers keep input order
    ranked.sort_by(|a, b| tier(b).cmp(&tier(a)));

    let winner = ranked.first().map(|rec| (*rec).clone());
    let reason = match &winner {
        Some(rec) => format!(
            "Quality over speed: {} recommends {}, the most capable model",
            rec.agent_id,
            rec.model.map_or_else(|| "no model".to_string(), |m| m.to_string())
        ),
        None => "Quality over speed: no recommendations to choose from".to_string(),
    };

    Resolution::decided(
        ResolutionStrategy::QualityOverSpeed,
        winner,
        reason,
        settings.model_confidence,
    )
}

fn tier(rec: &AgentRecommendation) -> u8 {
    rec.model.map_or(0, |m| m.ordinal())
}

/// Picks the smallest change; recommendations without an approach rank last
pub fn resolve_approach_conflict(
    recommendations: &[AgentRecommendation],
    settings: &ConflictSettings,
) -> Resolution {
    let mut ranked: Vec<&AgentRecommendation> = recommendations.iter().collect();
    ranked.sort_by_key(|rec| rec.approach.map_or(u8::MAX, |a| a.change_size()));

    let winner = ranked.first().map(|rec| (*rec).clone());
    let reason = match &winner {
        Some(rec) => format!(
            "Prefer minimal change: {} proposes to {}",
            rec.agent_id,
            rec.approach.map_or_else(|| "change nothing specific".to_string(), |a| a.to_string())
        ),
        None => "Prefer minimal change: no recommendations to choose from".to_string(),
    };

    Resolution::decided(
        ResolutionStrategy::MinimalChange,
        winner,
        reason,
        settings.approach_confidence,
    )
}

/// Ranks by alignment with the objective. A close race goes to a human.
pub fn resolve_priority_conflict(
    recommendations: &[AgentRecommendation],
    objective: &str,
    settings: &ConflictSettings,
) -> Resolution {
    let mut scored: Vec<(&AgentRecommendation, f64)> = recommendations
        .iter()
        .map(|rec| (rec, alignment_score(rec, objective)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    match scored.as_slice() {
        [] => Resolution::escalated(
            ResolutionStrategy::HumanInTheLoop,
            "No recommendations to align with the objective",
            0.0,
        ),
        [(first, first_score), (second, second_score), ..]
            if first_score - second_score < settings.hitl_score_margin =>
        {
            Resolution::escalated(
                ResolutionStrategy::HumanInTheLoop,
                format!(
                    "Alignment scores too close to call: {} scored {:.1}, {} scored {:.1}",
                    first.agent_id, first_score, second.agent_id, second_score
                ),
                *first_score,
            )
        }
        [(first, first_score), ..] => Resolution::decided(
            ResolutionStrategy::ObjectiveAlignment,
            Some((*first).clone()),
            format!(
                "Best aligned with the objective: {} scored {:.1}",
                first.agent_id, first_score
            ),
            *first_score,
        ),
    }
}

/// Always defers to a human
pub fn resolve_tie(recommendations: &[AgentRecommendation], settings: &ConflictSettings) -> Resolution {
    let reason = if recommendations.len() < 2 {
        "Fewer than two recommendations; a human should confirm the choice".to_string()
    } else {
        format!(
            "{} recommendations are equally viable; a human should choose",
            recommendations.len()
        )
    };

    Resolution::escalated(ResolutionStrategy::HumanInTheLoop, reason, settings.tie_confidence)
}

/// Always escalates, listing every critical rationale
pub fn resolve_critical(recommendations: &[AgentRecommendation]) -> Resolution {
    let rationales: Vec<String> = recommendations
        .iter()
        .filter(|rec| rec.is_critical())
        .map(|rec| {
            if rec.rationale.is_empty() {
                format!("{}: {}", rec.agent_id, rec.recommendation)
            } else {
                format!("{}: {}", rec.agent_id, rec.rationale)
            }
        })
        .collect();

    Resolution::escalated(
        ResolutionStrategy::CriticalEscalation,
        format!("Critical risk flagged. {}", rationales.join("; ")),
        0.0,
    )
}
