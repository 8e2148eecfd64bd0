//! Fixed-format degradation report for human observers.

use std::fmt::Write;

use crate::state::{DegradationLevel, DegradationState};

fn join_or_none(components: &[String]) -> String {
    if components.is_empty() {
        "none".to_string()
    } else {
        components.join(", ")
    }
}

/// Renders the report for `state`; empty string at level 0
pub fn render(state: &DegradationState) -> String {
    if state.level == DegradationLevel::Normal {
        return String::new();
    }

    let mut report = String::new();
    let _ = writeln!(report, "=== Graceful Degradation Report ===");
    let _ = writeln!(report, "Level: {}/5 ({})", state.level.as_u8(), state.level.label());
    let _ = writeln!(report, "Failed components: {}", join_or_none(&state.failed_components));
    let _ = writeln!(report, "Working components: {}", join_or_none(&state.working_components));
    let _ = writeln!(
        report,
        "Quality degraded: {}",
        if state.quality_degraded { "yes" } else { "no" }
    );
    let _ = write!(report, "Recommendation: {}", state.level.recommendation());
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_at_normal_level() {
        assert_eq!(render(&DegradationState::default()), "");
    }

    #[test]
    fn test_report_lists_components() {
        let state = DegradationState {
            level: DegradationLevel::Heuristic,
            failed_components: vec!["opus-complex-agent".to_string(), "phase-2".to_string()],
            working_components: vec!["phase-2-heuristic".to_string()],
            quality_degraded: true,
            ..Default::default()
        };

        let report = render(&state);
        assert!(report.starts_with("=== Graceful Degradation Report ==="));
        assert!(report.contains("Level: 2/5 (Heuristic fallback)"));
        assert!(report.contains("Failed components: opus-complex-agent, phase-2"));
        assert!(report.contains("Working components: phase-2-heuristic"));
        assert!(report.contains("Quality degraded: yes"));
        assert!(report.contains(DegradationLevel::Heuristic.recommendation()));
    }

    #[test]
    fn test_recommendation_follows_level() {
        let state = DegradationState {
            level: DegradationLevel::SystemDown,
            ..Default::default()
        };

        let report = render(&state);
        assert!(report.contains("Working components: none"));
        assert!(report.contains("Quality degraded: no"));
        assert!(report.contains("Retry later"));
    }
}
