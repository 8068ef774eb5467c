//! Dynamic Creation Flow (spec.md §4.6, §6 — component C6): asks an
//! external reasoner for a new option when a task hits an impasse, then
//! registers the proposal into the enhanced registry in shadow mode.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sterling_core::error::Result;
use sterling_core::{OptionId, TaskId};
use sterling_leaves::Provenance;

use crate::impasse::{ImpasseCheck, ImpasseConfig, ImpasseTracker};
use crate::option::ShadowConfig;
use crate::registry::EnhancedRegistry;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProposalArtifact {
    pub name: String,
    pub version: String,
    pub description: String,
    pub bt_dsl: Value,
    pub confidence: f64,
    pub estimated_success_rate: f64,
    pub reasoning: String,
}

/// `propose(currentTask, recentFailures, ctx) -> proposal` (spec.md §6).
/// The core treats the reasoner as an RPC; `sterling-sim` supplies a
/// deterministic in-memory stub.
#[async_trait]
pub trait ReasonerClient: Send + Sync {
    async fn propose(
        &self,
        task_id: &TaskId,
        recent_failures: &[String],
    ) -> std::result::Result<ProposalArtifact, String>;
}

#[derive(Clone, Debug)]
pub struct ProposalHistoryEntry {
    pub proposal: ProposalArtifact,
    pub outcome: Option<String>,
    pub ts: i64,
}

/// Glues [`ImpasseTracker`] to a [`ReasonerClient`] and an
/// [`EnhancedRegistry`]. Impasse state stays partitioned by `taskId`
/// ([`ImpasseTracker`]'s own invariant); proposal history is appended here.
pub struct DynamicCreationFlow {
    impasse: ImpasseTracker,
    history: BTreeMap<TaskId, Vec<ProposalHistoryEntry>>,
}

impl DynamicCreationFlow {
    pub fn new(config: ImpasseConfig) -> Self {
        Self {
            impasse: ImpasseTracker::new(config),
            history: BTreeMap::new(),
        }
    }

    pub fn check_impasse(&mut self, task_id: &TaskId, now_ms: i64) -> ImpasseCheck {
        self.impasse.check_impasse(task_id, now_ms)
    }

    pub fn record_success(&mut self, task_id: &TaskId) {
        self.impasse.record_success(task_id);
    }

    /// Read-only: would requesting a proposal right now be suppressed by
    /// the debounce window? Lets callers (the executor's idle governor)
    /// distinguish a lease-cooldown tick from an hourly-cap tick without
    /// mutating tracker state.
    pub fn is_debounced(&self, task_id: &TaskId, now_ms: i64) -> bool {
        self.impasse.is_debounced(task_id, now_ms)
    }

    /// Read-only: has the hourly proposal budget for `task_id` already been
    /// spent?
    pub fn is_hourly_capped(&self, task_id: &TaskId, now_ms: i64) -> bool {
        self.impasse.is_hourly_capped(task_id, now_ms)
    }

    /// `requestOptionProposal(taskId, ctx, currentTask, recentFailures) ->
    /// proposal?`. Returns `None` when the impasse isn't real yet, or the
    /// debounce/rate-limit suppressed it.
    pub async fn request_option_proposal(
        &mut self,
        task_id: &TaskId,
        now_ms: i64,
        recent_failures: &[String],
        reasoner: &dyn ReasonerClient,
    ) -> std::result::Result<Option<ProposalArtifact>, String> {
        let check = self.impasse.check_impasse(task_id, now_ms);
        if !check.is_impasse {
            return Ok(None);
        }
        if !self.impasse.try_reserve_proposal(task_id, now_ms) {
            return Ok(None);
        }

        let proposal = reasoner.propose(task_id, recent_failures).await?;
        self.history.entry(task_id.clone()).or_default().push(ProposalHistoryEntry {
            proposal: proposal.clone(),
            outcome: None,
            ts: now_ms,
        });
        Ok(Some(proposal))
    }

    /// `registerProposedOption(proposal, author) -> {success, optionId}`:
    /// compiles the proposal's BT-DSL and inserts it into the registry in
    /// shadow mode, same as a hand-authored option.
    pub fn register_proposed_option(
        &mut self,
        registry: &mut EnhancedRegistry,
        task_id: &TaskId,
        proposal: &ProposalArtifact,
        author: &str,
        now_ms: i64,
    ) -> Result<OptionId> {
        let mut provenance = Provenance::new(author, format!("{:x}", md5ish(&proposal.bt_dsl)), now_ms);
        provenance.metadata = Some(serde_json::json!({
            "confidence": proposal.confidence,
            "estimatedSuccessRate": proposal.estimated_success_rate,
            "reasoning": proposal.reasoning,
        }));
        let id = registry.register_option(&proposal.bt_dsl, provenance, ShadowConfig::default())?;

        if let Some(entries) = self.history.get_mut(task_id) {
            if let Some(last) = entries.last_mut() {
                last.outcome = Some("registered".to_string());
            }
        }
        Ok(id)
    }

    pub fn get_proposal_history(&self, task_id: &TaskId) -> &[ProposalHistoryEntry] {
        self.history.get(task_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Cheap content fingerprint for provenance, not a security hash — actual
/// leaf code hashing is the caller's responsibility for hand-authored
/// options (spec.md §3 `Provenance.codeHash`).
fn md5ish(value: &Value) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    value.to_string().hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct StubReasoner;
    #[async_trait]
    impl ReasonerClient for StubReasoner {
        async fn propose(
            &self,
            _task_id: &TaskId,
            _recent_failures: &[String],
        ) -> std::result::Result<ProposalArtifact, String> {
            Ok(ProposalArtifact {
                name: "improvised-dig".to_string(),
                version: "1.0.0".to_string(),
                description: "generated fallback".to_string(),
                bt_dsl: serde_json::json!({
                    "name": "improvised-dig",
                    "version": "1.0.0",
                    "root": {"type": "Leaf", "leafName": "wait"}
                }),
                confidence: 0.6,
                estimated_success_rate: 0.5,
                reasoning: "movement timed out three times in a row".to_string(),
            })
        }
    }

    struct DenyingReasoner;
    #[async_trait]
    impl ReasonerClient for DenyingReasoner {
        async fn propose(
            &self,
            _task_id: &TaskId,
            _recent_failures: &[String],
        ) -> std::result::Result<ProposalArtifact, String> {
            panic!("must not be called when suppressed")
        }
    }

    #[tokio::test]
    async fn proposal_is_requested_only_after_impasse_threshold() {
        let mut flow = DynamicCreationFlow::new(ImpasseConfig::default());
        let task = TaskId::new("task-A");
        let failures = vec!["movement.timeout".to_string()];

        assert!(flow
            .request_option_proposal(&task, 0, &failures, &DenyingReasoner)
            .await
            .unwrap()
            .is_none());
        assert!(flow
            .request_option_proposal(&task, 1_000, &failures, &DenyingReasoner)
            .await
            .unwrap()
            .is_none());
        let proposal = flow
            .request_option_proposal(&task, 2_000, &failures, &StubReasoner)
            .await
            .unwrap();
        assert!(proposal.is_some());
    }

    #[tokio::test]
    async fn debounce_window_suppresses_repeat_proposals() {
        let mut flow = DynamicCreationFlow::new(ImpasseConfig::default());
        let task = TaskId::new("task-A");
        let failures = vec!["movement.timeout".to_string()];
        flow.request_option_proposal(&task, 0, &failures, &DenyingReasoner).await.unwrap();
        flow.request_option_proposal(&task, 1_000, &failures, &DenyingReasoner).await.unwrap();
        let first = flow
            .request_option_proposal(&task, 2_000, &failures, &StubReasoner)
            .await
            .unwrap();
        assert!(first.is_some());

        let second = flow
            .request_option_proposal(&task, 2_500, &failures, &DenyingReasoner)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn registering_a_proposal_marks_history_and_inserts_shadow_option() {
        use crate::registry::EnhancedRegistry;
        use sterling_leaves::{Leaf, LeafMetrics, LeafResult};
        use sterling_leaves::LeafContext;

        struct NoopLeaf;
        #[async_trait]
        impl Leaf for NoopLeaf {
            fn name(&self) -> &str {
                "wait"
            }
            fn version(&self) -> &str {
                "1.0.0"
            }
            fn input_schema(&self) -> Value {
                serde_json::json!({"type": "object"})
            }
            fn permissions(&self) -> &[sterling_leaves::Permission] {
                &[]
            }
            fn timeout_ms(&self) -> u64 {
                1_000
            }
            async fn run(&self, _ctx: &dyn LeafContext, args: Value) -> LeafResult {
                LeafResult::success(args, LeafMetrics::default())
            }
        }

        let mut registry = EnhancedRegistry::new();
        registry.register_leaf(Arc::new(NoopLeaf), None).unwrap();

        let mut flow = DynamicCreationFlow::new(ImpasseConfig::default());
        let task = TaskId::new("task-A");
        let failures = vec!["movement.timeout".to_string()];
        flow.request_option_proposal(&task, 0, &failures, &DenyingReasoner).await.unwrap();
        flow.request_option_proposal(&task, 1_000, &failures, &DenyingReasoner).await.unwrap();
        let proposal = flow
            .request_option_proposal(&task, 2_000, &failures, &StubReasoner)
            .await
            .unwrap()
            .unwrap();

        flow.register_proposed_option(&mut registry, &task, &proposal, "reasoner", 2_000)
            .unwrap();

        let history = flow.get_proposal_history(&task);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].outcome.as_deref(), Some("registered"));
    }
}
