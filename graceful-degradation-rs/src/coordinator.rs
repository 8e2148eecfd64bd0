//! # Degradation Coordinator
//!
//! Turns a failure event into a recovery action without ever failing the
//! workflow. Agent failures go through retry, circuit breaking and the
//! fallback chain; anything left over escalates up the ladder
//! phase -> orchestrator, raising the context's level as it goes.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde_json::json;
use shared_types_rs::{
    completed_phases, incomplete_phases, DegradationSettings, ResilienceConfig, TaskStateStore,
    Warning, WarningSeverity,
};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::circuit_breaker::CircuitBreakerRegistry;
use crate::context::DegradationContext;
use crate::failure::{FailureEvent, FailureOrigin, RecoveryAction, RecoveryOutcome};
use crate::fallback::{AgentInvoker, FallbackChains, SimulatedInvoker};
use crate::heuristics::{HeuristicRegistry, PhaseHeuristic};
use crate::logging::log_recovery;
use crate::retry::RetryPolicy;
use crate::state::DegradationLevel;

/// Failure-handling policy. Immutable; all per-task state lives in the
/// `DegradationContext` passed to each call.
#[derive(Clone)]
pub struct GracefulDegradation {
    retry_policy: RetryPolicy,
    fallback_chains: FallbackChains,
    heuristics: HeuristicRegistry,
    invoker: Arc<dyn AgentInvoker>,
    circuit_threshold: u32,
    circuit_reset_timeout: Duration,
    default_phase: u8,
}

impl std::fmt::Debug for GracefulDegradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GracefulDegradation")
            .field("retry_policy", &self.retry_policy)
            .field("fallback_chains", &self.fallback_chains)
            .field("heuristics", &self.heuristics)
            .field("circuit_threshold", &self.circuit_threshold)
            .finish()
    }
}

impl Default for GracefulDegradation {
    fn default() -> Self {
        Self::from_settings(&DegradationSettings::default())
    }
}

impl GracefulDegradation {
    pub fn from_settings(settings: &DegradationSettings) -> Self {
        Self {
            retry_policy: RetryPolicy::from_settings(settings),
            fallback_chains: FallbackChains::from_settings(settings),
            heuristics: HeuristicRegistry::builtin(),
            invoker: Arc::new(SimulatedInvoker),
            circuit_threshold: settings.circuit_failure_threshold,
            circuit_reset_timeout: Duration::from_millis(settings.circuit_reset_timeout_ms),
            default_phase: settings.default_phase,
        }
    }

    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self::from_settings(&config.degradation)
    }

    /// Replaces the capability used for retries and fallback agents
    pub fn with_invoker(mut self, invoker: Arc<dyn AgentInvoker>) -> Self {
        self.invoker = invoker;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_fallback_chains(mut self, fallback_chains: FallbackChains) -> Self {
        self.fallback_chains = fallback_chains;
        self
    }

    pub fn with_heuristics(mut self, heuristics: HeuristicRegistry) -> Self {
        self.heuristics = heuristics;
        self
    }

    /// Adds or replaces the heuristic for one phase
    pub fn with_heuristic(mut self, heuristic: Arc<dyn PhaseHeuristic>) -> Self {
        self.heuristics.register(heuristic);
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn fallback_chains(&self) -> &FallbackChains {
        &self.fallback_chains
    }

    /// A fresh context whose breakers use this policy's threshold
    pub fn new_context(&self, task_state: Arc<dyn TaskStateStore>) -> DegradationContext {
        DegradationContext::new(
            task_state,
            CircuitBreakerRegistry::new(self.circuit_threshold, self.circuit_reset_timeout),
        )
    }

    /// Handles one failure. Never fails; severity is reported through the
    /// context's level and the returned action.
    pub async fn handle_failure(
        &self,
        ctx: &mut DegradationContext,
        failure: FailureEvent,
    ) -> RecoveryAction {
        counter!("degradation.failures_handled", 1, "origin" => failure.origin.to_string());
        debug!(
            origin = %failure.origin,
            component = %failure.component,
            retryable = failure.retryable,
            error = %failure.error,
            "Handling failure"
        );

        let action = match failure.origin {
            FailureOrigin::Agent => self.handle_agent_failure(ctx, failure).await,
            FailureOrigin::Phase => self.handle_phase_failure(ctx, failure),
            FailureOrigin::Orchestrator => self.handle_orchestrator_failure(ctx, failure),
            FailureOrigin::System => self.handle_system_failure(ctx, failure),
            FailureOrigin::Unknown => self.handle_unknown_failure(ctx, failure),
        };

        log_recovery(ctx.level(), &action);
        action
    }

    async fn handle_agent_failure(
        &self,
        ctx: &mut DegradationContext,
        failure: FailureEvent,
    ) -> RecoveryAction {
        ctx.record_event(failure.clone());
        ctx.set_level(DegradationLevel::AgentFallback);
        ctx.state_mut().mark_failed(&failure.component);

        if ctx.circuit_breakers().is_open(&failure.component) {
            warn!(
                component = %failure.component,
                "Circuit breaker open, skipping retries"
            );
            return self.run_fallback_chain(ctx, failure).await;
        }

        if self.retry_policy.should_retry(failure.retryable, &failure.error) {
            if let Some(action) = self.retry_agent(ctx, &failure).await {
                return action;
            }
            ctx.circuit_breakers_mut().record_failure(&failure.component);
        } else {
            debug!(
                component = %failure.component,
                retryable = failure.retryable,
                "Failure not eligible for retry"
            );
        }

        self.run_fallback_chain(ctx, failure).await
    }

    /// Runs the retry schedule; `None` once every attempt has failed
    async fn retry_agent(
        &self,
        ctx: &mut DegradationContext,
        failure: &FailureEvent,
    ) -> Option<RecoveryAction> {
        for attempt in 0..self.retry_policy.max_retries {
            let delay = self.retry_policy.backoff_for(attempt);
            debug!(
                component = %failure.component,
                attempt = attempt + 1,
                max_retries = self.retry_policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                "Retrying agent after backoff"
            );
            sleep(delay).await;

            ctx.state_mut().add_attempts(&failure.component, 1);
            counter!("degradation.retry_attempts", 1);

            match self.invoker.retry(failure).await {
                Ok(result) => {
                    ctx.circuit_breakers_mut().record_success(&failure.component);
                    ctx.state_mut().mark_recovered(&failure.component);
                    info!(
                        component = %failure.component,
                        attempt = attempt + 1,
                        "Agent recovered on retry"
                    );
                    return Some(
                        RecoveryAction::new(
                            RecoveryOutcome::Retry,
                            failure.component.clone(),
                            format!(
                                "Agent {} succeeded on retry {} of {}",
                                failure.component,
                                attempt + 1,
                                self.retry_policy.max_retries
                            ),
                        )
                        .result(result)
                        .degraded(false),
                    );
                }
                Err(err) => {
                    warn!(
                        component = %failure.component,
                        attempt = attempt + 1,
                        error = %err,
                        "Retry attempt failed"
                    );
                }
            }
        }

        None
    }

    async fn run_fallback_chain(
        &self,
        ctx: &mut DegradationContext,
        failure: FailureEvent,
    ) -> RecoveryAction {
        for candidate in self.fallback_chains.chain_for(&failure.component) {
            if self.fallback_chains.is_sentinel(&candidate) {
                break;
            }
            if ctx.circuit_breakers().is_open(&candidate) {
                debug!(candidate = %candidate, "Skipping fallback with open circuit");
                continue;
            }

            match self.invoker.invoke_fallback(&candidate, &failure).await {
                Ok(result) => {
                    ctx.circuit_breakers_mut().record_success(&candidate);
                    ctx.state_mut().mark_working(&candidate);
                    counter!("degradation.fallback_used", 1, "agent" => candidate.clone());

                    let message = format!(
                        "Agent {} failed; fallback agent {} answered instead",
                        failure.component, candidate
                    );
                    return RecoveryAction::new(RecoveryOutcome::FallbackSuccess, candidate, message)
                        .result(result);
                }
                Err(err) => {
                    warn!(
                        component = %failure.component,
                        candidate = %candidate,
                        error = %err,
                        "Fallback agent failed, trying next"
                    );
                    ctx.circuit_breakers_mut().record_failure(&candidate);
                }
            }
        }

        let phase = ctx
            .task_state()
            .current_phase()
            .unwrap_or(self.default_phase);
        warn!(
            component = %failure.component,
            phase,
            sentinel = %self.fallback_chains.sentinel(),
            "Fallback chain exhausted, escalating to phase handling"
        );

        let mut escalated = FailureEvent::phase(
            phase,
            format!(
                "All fallbacks exhausted for agent {}: {}",
                failure.component, failure.error
            ),
        );
        escalated.context = failure.context;
        self.handle_phase_failure(ctx, escalated)
    }

    fn handle_phase_failure(
        &self,
        ctx: &mut DegradationContext,
        failure: FailureEvent,
    ) -> RecoveryAction {
        ctx.record_event(failure.clone());
        ctx.set_level(DegradationLevel::Heuristic);
        ctx.state_mut().quality_degraded = true;

        let Some(phase) = failure.phase_number() else {
            warn!(component = %failure.component, "Phase failure without a phase number");
            return self.escalate_to_orchestrator(ctx, &failure, failure.error.clone());
        };
        let component = format!("phase-{}", phase);
        ctx.state_mut().mark_failed(&component);

        let Some(heuristic) = self.heuristics.get(phase) else {
            warn!(phase, "No heuristic registered for phase");
            return self.escalate_to_orchestrator(ctx, &failure, failure.error.clone());
        };

        match heuristic.apply(&failure.context) {
            Ok(result) => {
                let message = format!(
                    "Phase {} failed ({}); continued with heuristic {}",
                    phase,
                    failure.error,
                    heuristic.name()
                );
                ctx.task_state()
                    .add_warning(Warning::new(phase, WarningSeverity::High, message.clone()));
                ctx.state_mut().mark_working(&format!("{}-heuristic", component));

                RecoveryAction::new(RecoveryOutcome::PhaseSkippedWithHeuristic, component, message)
                    .result(result)
            }
            Err(err) => {
                warn!(
                    phase,
                    heuristic = %heuristic.name(),
                    error = %err,
                    "Heuristic failed"
                );
                let error = format!("Heuristic for phase {} failed: {}", phase, err);
                self.escalate_to_orchestrator(ctx, &failure, error)
            }
        }
    }

    fn escalate_to_orchestrator(
        &self,
        ctx: &mut DegradationContext,
        cause: &FailureEvent,
        error: String,
    ) -> RecoveryAction {
        let mut escalated = FailureEvent::orchestrator(error);
        escalated.context = cause.context.clone();
        self.handle_orchestrator_failure(ctx, escalated)
    }

    fn handle_orchestrator_failure(
        &self,
        ctx: &mut DegradationContext,
        failure: FailureEvent,
    ) -> RecoveryAction {
        ctx.record_event(failure.clone());
        ctx.state_mut().quality_degraded = true;
        ctx.state_mut().mark_failed(&failure.component);

        let completed = completed_phases(ctx.task_state().as_ref());
        if !completed.is_empty() {
            ctx.set_level(DegradationLevel::PartialExecution);
            let failed = incomplete_phases(ctx.task_state().as_ref());

            return RecoveryAction::new(
                RecoveryOutcome::PartialExecution,
                failure.component.clone(),
                format!(
                    "Orchestrator failed after completing {} phase(s): {}",
                    completed.len(),
                    failure.error
                ),
            )
            .result(json!({
                "completed_phases": completed,
                "failed_phases": failed,
                "error": failure.error,
            }))
            .next_steps([
                "Return the results of the completed phases",
                "Mark the remaining phases as not run",
            ]);
        }

        ctx.set_level(DegradationLevel::OrchestratorBypass);
        RecoveryAction::new(
            RecoveryOutcome::BypassOrchestrator,
            failure.component.clone(),
            format!(
                "Orchestrator failed before any phase completed: {}",
                failure.error
            ),
        )
        .next_steps([
            "Bypass the orchestrator",
            "Answer the request directly without the multi-phase workflow",
            "Tell the user the response was not validated",
        ])
    }

    fn handle_system_failure(
        &self,
        ctx: &mut DegradationContext,
        failure: FailureEvent,
    ) -> RecoveryAction {
        ctx.record_event(failure.clone());
        ctx.set_level(DegradationLevel::SystemDown);
        ctx.state_mut().quality_degraded = true;
        ctx.state_mut().mark_failed(&failure.component);

        RecoveryAction::new(
            RecoveryOutcome::TotalFailure,
            failure.component,
            format!("System failure: {}. Please try again later.", failure.error),
        )
        .next_steps(["Retry later", "Escalate to an operator if the failure persists"])
    }

    fn handle_unknown_failure(
        &self,
        ctx: &mut DegradationContext,
        failure: FailureEvent,
    ) -> RecoveryAction {
        ctx.record_event(failure.clone());
        ctx.set_level(DegradationLevel::Heuristic);
        ctx.state_mut().quality_degraded = true;

        RecoveryAction::new(
            RecoveryOutcome::PhaseSkippedWithHeuristic,
            failure.component.clone(),
            format!(
                "Unrecognised failure from {} handled with generic degradation: {}",
                failure.component, failure.error
            ),
        )
    }
}
