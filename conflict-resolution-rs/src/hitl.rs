//! Human-in-the-loop question generation.

use serde::{Deserialize, Serialize};

use crate::types::{ConflictResolution, ConflictType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitlOption {
    /// Agent id of the recommendation this option selects
    pub id: String,
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitlQuestion {
    pub question: String,
    pub options: Vec<HitlOption>,
}

/// Builds the question to put to a human, one option per recommendation
pub fn generate_hitl_question(conflict: &ConflictResolution) -> HitlQuestion {
    let question = match conflict.conflict_type {
        ConflictType::Tie => {
            "Multiple agents proposed equally viable options. Which one should be used?".to_string()
        }
        ConflictType::Critical => format!(
            "A critical risk was flagged: {}. How should we proceed?",
            conflict.resolution.reason
        ),
        other => format!(
            "Agents disagree on a {} decision: {}. Which recommendation should be followed?",
            other, conflict.resolution.reason
        ),
    };

    let options = conflict
        .recommendations
        .iter()
        .map(|rec| HitlOption {
            id: rec.agent_id.clone(),
            label: rec.recommendation.clone(),
            description: format!(
                "{} (confidence: {}%, risk: {})",
                rec.rationale, rec.confidence, rec.risk
            ),
        })
        .collect();

    HitlQuestion { question, options }
}
