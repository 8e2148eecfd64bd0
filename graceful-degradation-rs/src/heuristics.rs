//! # Phase Heuristics
//!
//! Deterministic stand-ins for each workflow phase, used when the phase
//! itself fails. Each one reads the failure's context map and produces a
//! rough answer without calling a model.
//!
//! | phase | heuristic |
//! |-------|-----------|
//! | 1 | keyword intent detection |
//! | 2 | complexity from input length |
//! | 3 | task split on punctuation |
//! | 4 | agent selection by intent |
//! | 5 | sequential execution plan |
//! | 6 | validation skipped, non-empty check |
//! | 7 | synthesis by concatenation |

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::types::{Error, ErrorKind, Result};

/// A fallback computation for one phase
pub trait PhaseHeuristic: Send + Sync {
    fn phase(&self) -> u8;

    fn name(&self) -> &str;

    fn apply(&self, context: &Map<String, Value>) -> Result<Value>;
}

/// Heuristic backed by a plain function
#[derive(Clone, Copy)]
pub struct FnHeuristic {
    phase: u8,
    name: &'static str,
    apply: fn(&Map<String, Value>) -> Result<Value>,
}

impl FnHeuristic {
    pub const fn new(
        phase: u8,
        name: &'static str,
        apply: fn(&Map<String, Value>) -> Result<Value>,
    ) -> Self {
        Self { phase, name, apply }
    }
}

impl fmt::Debug for FnHeuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHeuristic")
            .field("phase", &self.phase)
            .field("name", &self.name)
            .finish()
    }
}

impl PhaseHeuristic for FnHeuristic {
    fn phase(&self) -> u8 {
        self.phase
    }

    fn name(&self) -> &str {
        self.name
    }

    fn apply(&self, context: &Map<String, Value>) -> Result<Value> {
        (self.apply)(context)
    }
}

/// Heuristics keyed by phase number
#[derive(Clone, Default)]
pub struct HeuristicRegistry {
    heuristics: HashMap<u8, Arc<dyn PhaseHeuristic>>,
}

impl fmt::Debug for HeuristicRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut phases: Vec<_> = self.heuristics.keys().copied().collect();
        phases.sort_unstable();
        f.debug_struct("HeuristicRegistry").field("phases", &phases).finish()
    }
}

impl HeuristicRegistry {
    /// A registry with no heuristics; every phase failure escalates
    pub fn empty() -> Self {
        Self::default()
    }

    /// The seven builtin phase heuristics
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for heuristic in BUILTIN_HEURISTICS {
            registry.register(Arc::new(heuristic));
        }
        registry
    }

    /// Registers a heuristic, replacing any existing one for its phase
    pub fn register(&mut self, heuristic: Arc<dyn PhaseHeuristic>) {
        self.heuristics.insert(heuristic.phase(), heuristic);
    }

    pub fn get(&self, phase: u8) -> Option<Arc<dyn PhaseHeuristic>> {
        self.heuristics.get(&phase).cloned()
    }

    pub fn contains(&self, phase: u8) -> bool {
        self.heuristics.contains_key(&phase)
    }
}

const BUILTIN_HEURISTICS: [FnHeuristic; 7] = [
    FnHeuristic::new(1, "keyword-intent-detection", detect_intent),
    FnHeuristic::new(2, "length-complexity-assessment", assess_complexity),
    FnHeuristic::new(3, "punctuation-task-split", split_tasks),
    FnHeuristic::new(4, "intent-agent-selection", select_agent),
    FnHeuristic::new(5, "sequential-plan", plan_sequentially),
    FnHeuristic::new(6, "skip-validation", skip_validation),
    FnHeuristic::new(7, "concatenate-results", synthesize),
];

static INTENT_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("fix", r"(?i)\b(fix|bug|error|broken|crash(es|ed)?|fail(s|ing|ed)?)\b"),
        ("refactor", r"(?i)\b(refactor|clean ?up|restructure|simplify|rename)\b"),
        ("test", r"(?i)\b(tests?|coverage|unit test)\b"),
        ("review", r"(?i)\b(review|audit|inspect)\b"),
        ("create", r"(?i)\b(create|add|build|implement|new|generate|write)\b"),
        ("explain", r"(?i)\b(explain|what|why|how|describe)\b"),
    ]
    .into_iter()
    .filter_map(|(intent, pattern)| Regex::new(pattern).ok().map(|re| (intent, re)))
    .collect()
});

static TASK_SEPARATOR: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)[.;!?\n]+|\bthen\b").ok());

fn user_input(context: &Map<String, Value>) -> Option<&str> {
    context
        .get("user_input")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

fn require_user_input<'a>(context: &'a Map<String, Value>, phase: u8) -> Result<&'a str> {
    user_input(context).ok_or_else(|| {
        Error::new(ErrorKind::Heuristic, "No user_input available for heuristic")
            .component(format!("phase-{}", phase))
    })
}

fn intent_of(text: &str) -> &'static str {
    INTENT_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(intent, _)| *intent)
        .unwrap_or("unknown")
}

fn task_list(text: &str) -> Vec<String> {
    let pieces: Vec<String> = match TASK_SEPARATOR.as_ref() {
        Some(separator) => separator
            .split(text)
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    };

    if pieces.is_empty() {
        vec![text.trim().to_string()]
    } else {
        pieces
    }
}

fn detect_intent(context: &Map<String, Value>) -> Result<Value> {
    let text = require_user_input(context, 1)?;
    let intent = intent_of(text);
    let confidence = if intent == "unknown" { 0.3 } else { 0.6 };

    Ok(json!({
        "intent": intent,
        "confidence": confidence,
        "method": "keyword",
    }))
}

fn assess_complexity(context: &Map<String, Value>) -> Result<Value> {
    let words = user_input(context)
        .map(|text| text.split_whitespace().count())
        .unwrap_or(0);
    let file_count = context.get("file_count").and_then(Value::as_u64).unwrap_or(0);

    let (complexity, model) = if words >= 80 || file_count > 5 {
        ("complex", "opus")
    } else if words >= 20 || file_count > 1 {
        ("moderate", "sonnet")
    } else {
        ("simple", "haiku")
    };

    Ok(json!({
        "complexity": complexity,
        "suggested_model": model,
        "word_count": words,
        "method": "length",
    }))
}

fn split_tasks(context: &Map<String, Value>) -> Result<Value> {
    let text = require_user_input(context, 3)?;
    let tasks: Vec<Value> = task_list(text)
        .into_iter()
        .enumerate()
        .map(|(index, description)| json!({ "id": index + 1, "description": description }))
        .collect();

    Ok(json!({
        "tasks": tasks,
        "method": "punctuation",
    }))
}

fn select_agent(context: &Map<String, Value>) -> Result<Value> {
    let intent = context
        .get("intent")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| user_input(context).map(|text| intent_of(text).to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    let agent = match intent.as_str() {
        "fix" => "debugger",
        "create" => "code-writer",
        "refactor" => "refactorer",
        "test" => "test-writer",
        "review" => "code-reviewer",
        _ => "general-purpose",
    };

    Ok(json!({
        "agent": agent,
        "intent": intent,
        "method": "intent-table",
    }))
}

fn plan_sequentially(context: &Map<String, Value>) -> Result<Value> {
    let tasks: Vec<String> = match context.get("tasks").and_then(Value::as_array) {
        Some(tasks) => tasks
            .iter()
            .filter_map(|task| {
                task.as_str()
                    .or_else(|| task.get("description").and_then(Value::as_str))
                    .map(str::to_string)
            })
            .collect(),
        None => user_input(context).map(task_list).unwrap_or_default(),
    };

    let steps: Vec<Value> = tasks
        .iter()
        .enumerate()
        .map(|(index, task)| {
            let depends_on = if index == 0 { Value::Null } else { json!(index) };
            json!({ "step": index + 1, "task": task, "depends_on": depends_on })
        })
        .collect();

    Ok(json!({
        "steps": steps,
        "parallel": false,
        "method": "sequential",
    }))
}

fn skip_validation(context: &Map<String, Value>) -> Result<Value> {
    let has_output = context
        .get("output")
        .and_then(Value::as_str)
        .map_or(false, |output| !output.trim().is_empty());

    Ok(json!({
        "validated": false,
        "skipped": true,
        "basic_check_passed": has_output,
    }))
}

fn synthesize(context: &Map<String, Value>) -> Result<Value> {
    let parts: Vec<String> = context
        .get("partial_results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .map(|result| match result.as_str() {
                    Some(text) => text.to_string(),
                    None => result.to_string(),
                })
                .filter(|text| !text.trim().is_empty())
                .collect()
        })
        .unwrap_or_default();

    let summary = if parts.is_empty() {
        "No results were produced before the failure.".to_string()
    } else {
        parts.join("\n\n")
    };

    Ok(json!({
        "summary": summary,
        "sources": parts.len(),
        "method": "concatenation",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_builtin_registry_covers_all_phases() {
        let registry = HeuristicRegistry::builtin();
        for phase in 1..=7 {
            assert!(registry.contains(phase), "missing phase {}", phase);
            assert_eq!(registry.get(phase).unwrap().phase(), phase);
        }
        assert!(!registry.contains(8));
        assert!(!HeuristicRegistry::empty().contains(1));
    }

    #[test]
    fn test_intent_detection() {
        let result = detect_intent(&context(json!({ "user_input": "Fix the login crash" }))).unwrap();
        assert_eq!(result["intent"], "fix");

        let result = detect_intent(&context(json!({ "user_input": "Add a settings page" }))).unwrap();
        assert_eq!(result["intent"], "create");

        let result = detect_intent(&context(json!({ "user_input": "hello there" }))).unwrap();
        assert_eq!(result["intent"], "unknown");
        assert_eq!(result["confidence"], 0.3);
    }

    #[test]
    fn test_intent_detection_requires_input() {
        let err = detect_intent(&Map::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Heuristic);
        assert_eq!(err.component.as_deref(), Some("phase-1"));
    }

    #[test]
    fn test_complexity_tiers() {
        let short = assess_complexity(&context(json!({ "user_input": "rename a variable" }))).unwrap();
        assert_eq!(short["suggested_model"], "haiku");

        let many_files = assess_complexity(&context(json!({ "file_count": 9 }))).unwrap();
        assert_eq!(many_files["complexity"], "complex");
        assert_eq!(many_files["suggested_model"], "opus");
    }

    #[test]
    fn test_task_split() {
        let result = split_tasks(&context(json!({
            "user_input": "Read the config. Update the parser; then write tests"
        })))
        .unwrap();

        let tasks = result["tasks"].as_array().unwrap();
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0]["description"], "Read the config");
        assert_eq!(tasks[1]["description"], "Update the parser");
        assert_eq!(tasks[2]["description"], "write tests");
        assert_eq!(tasks[2]["id"], 3);
    }

    #[test]
    fn test_task_split_without_separators() {
        let result = split_tasks(&context(json!({ "user_input": "just one thing" }))).unwrap();
        assert_eq!(result["tasks"][0]["description"], "just one thing");
    }

    #[test]
    fn test_agent_selection_prefers_explicit_intent() {
        let result = select_agent(&context(json!({
            "intent": "review",
            "user_input": "fix the bug"
        })))
        .unwrap();
        assert_eq!(result["agent"], "code-reviewer");

        let result = select_agent(&context(json!({ "user_input": "fix the bug" }))).unwrap();
        assert_eq!(result["agent"], "debugger");

        let result = select_agent(&Map::new()).unwrap();
        assert_eq!(result["agent"], "general-purpose");
    }

    #[test]
    fn test_sequential_plan() {
        let result = plan_sequentially(&context(json!({
            "tasks": ["parse", { "description": "transform" }, "emit"]
        })))
        .unwrap();

        let steps = result["steps"].as_array().unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0]["depends_on"], Value::Null);
        assert_eq!(steps[1]["task"], "transform");
        assert_eq!(steps[2]["depends_on"], 2);
    }

    #[test]
    fn test_validation_and_synthesis() {
        let validation = skip_validation(&context(json!({ "output": "  " }))).unwrap();
        assert_eq!(validation["skipped"], true);
        assert_eq!(validation["basic_check_passed"], false);

        let summary = synthesize(&context(json!({
            "partial_results": ["first", "", { "lines": 3 }]
        })))
        .unwrap();
        assert_eq!(summary["sources"], 2);
        assert_eq!(summary["summary"], "first\n\n{\"lines\":3}");

        let empty = synthesize(&Map::new()).unwrap();
        assert_eq!(empty["sources"], 0);
    }
}
