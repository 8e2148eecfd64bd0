//! # Fallback Chains
//!
//! Ordered substitutes for each agent, and the injected capability that
//! actually re-invokes an agent or calls a substitute.
//!
//! Chains run toward progressively cheaper substitutes and end with the
//! `direct-response` sentinel, which means "no agent left to try".

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::failure::FailureEvent;
use crate::types::{Error, ErrorKind, Result};

/// Something that can re-run a failed agent or run one of its substitutes
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    /// Re-invokes the agent that produced `failure`
    async fn retry(&self, failure: &FailureEvent) -> Result<Value>;

    /// Invokes `agent_id` in place of the agent that produced `failure`
    async fn invoke_fallback(&self, agent_id: &str, failure: &FailureEvent) -> Result<Value>;
}

/// Invoker that performs no real calls.
///
/// Retries always fail with a transient error; every fallback candidate
/// answers with a simulated payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedInvoker;

#[async_trait]
impl AgentInvoker for SimulatedInvoker {
    async fn retry(&self, failure: &FailureEvent) -> Result<Value> {
        Err(Error::new(
            ErrorKind::Transient,
            format!("Simulated retry of {} failed", failure.component),
        )
        .component(failure.component.clone()))
    }

    async fn invoke_fallback(&self, agent_id: &str, failure: &FailureEvent) -> Result<Value> {
        Ok(json!({
            "agent": agent_id,
            "replaces": failure.component,
            "simulated": true,
        }))
    }
}

/// Lookup table from agent id to its ordered substitutes
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackChains {
    chains: BTreeMap<String, Vec<String>>,
    sentinel: String,
}

impl Default for FallbackChains {
    fn default() -> Self {
        Self::from_settings(&shared_types_rs::DegradationSettings::default())
    }
}

impl FallbackChains {
    pub fn new<S: Into<String>>(sentinel: S) -> Self {
        Self {
            chains: BTreeMap::new(),
            sentinel: sentinel.into(),
        }
    }

    pub fn from_settings(settings: &shared_types_rs::DegradationSettings) -> Self {
        Self {
            chains: settings.fallback_chains.clone(),
            sentinel: settings.direct_response_sentinel.clone(),
        }
    }

    /// Registers or replaces the chain for an agent
    pub fn with_chain<A, I, S>(mut self, agent_id: A, substitutes: I) -> Self
    where
        A: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chains
            .insert(agent_id.into(), substitutes.into_iter().map(Into::into).collect());
        self
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    pub fn is_sentinel(&self, agent_id: &str) -> bool {
        agent_id == self.sentinel
    }

    /// Substitutes for `agent_id`, always terminated by the sentinel.
    /// Unlisted agents fall straight through to the sentinel.
    pub fn chain_for(&self, agent_id: &str) -> Vec<String> {
        let mut chain = self.chains.get(agent_id).cloned().unwrap_or_default();
        if chain.last().map(String::as_str) != Some(self.sentinel.as_str()) {
            chain.push(self.sentinel.clone());
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chains_end_with_sentinel() {
        let chains = FallbackChains::default();
        assert_eq!(
            chains.chain_for("opus-complex-agent"),
            vec!["sonnet-standard-agent", "haiku-fast-agent", "direct-response"]
        );
        assert_eq!(chains.chain_for("unlisted-agent"), vec!["direct-response"]);
        assert!(chains.is_sentinel("direct-response"));
    }

    #[test]
    fn test_custom_chain_gets_sentinel_appended() {
        let chains = FallbackChains::new("direct-response").with_chain("planner", ["backup-planner"]);
        assert_eq!(
            chains.chain_for("planner"),
            vec!["backup-planner", "direct-response"]
        );
    }

    #[tokio::test]
    async fn test_simulated_invoker() {
        let invoker = SimulatedInvoker;
        let failure = FailureEvent::agent("planner", "timeout");

        let retry = invoker.retry(&failure).await;
        assert!(retry.unwrap_err().is_transient());

        let fallback = invoker.invoke_fallback("backup", &failure).await.unwrap();
        assert_eq!(fallback["agent"], "backup");
        assert_eq!(fallback["simulated"], true);
    }
}
