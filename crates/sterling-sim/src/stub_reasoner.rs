//! Deterministic `ReasonerClient` stand-in (SPEC_FULL.md §6), modeled on
//! `operator::mock_provider::MockProvider`: a queue of canned responses
//! consumed in order, falling back to a default once exhausted.

use async_trait::async_trait;
use sterling_core::TaskId;
use sterling_registry::{ProposalArtifact, ReasonerClient};
use tokio::sync::Mutex;

/// Either a canned proposal or a canned failure, consumed in order.
#[derive(Clone, Debug)]
pub enum StubOutcome {
    Propose(ProposalArtifact),
    Deny(String),
}

pub struct StubReasoner {
    queue: Mutex<Vec<StubOutcome>>,
    default: StubOutcome,
    calls: Mutex<usize>,
}

impl StubReasoner {
    pub fn constant(outcome: StubOutcome) -> Self {
        Self {
            queue: Mutex::new(Vec::new()),
            default: outcome,
            calls: Mutex::new(0),
        }
    }

    pub fn sequence(outcomes: Vec<StubOutcome>) -> Self {
        Self {
            queue: Mutex::new(outcomes),
            default: StubOutcome::Deny("sequence exhausted".to_string()),
            calls: Mutex::new(0),
        }
    }

    /// A reasoner that always proposes a trivial `wait`-leaf option, useful
    /// for exercising the shadow-registration path without hand-authoring a
    /// BT-DSL document at every call site.
    pub fn always_proposes_wait_leaf() -> Self {
        Self::constant(StubOutcome::Propose(ProposalArtifact {
            name: "improvised-wait".to_string(),
            version: "1.0.0".to_string(),
            description: "sim-generated fallback option".to_string(),
            bt_dsl: serde_json::json!({
                "name": "improvised-wait",
                "version": "1.0.0",
                "root": {"type": "Leaf", "leafName": "wait"}
            }),
            confidence: 0.5,
            estimated_success_rate: 0.5,
            reasoning: "stub reasoner default proposal".to_string(),
        }))
    }

    pub async fn call_count(&self) -> usize {
        *self.calls.lock().await
    }
}

#[async_trait]
impl ReasonerClient for StubReasoner {
    async fn propose(
        &self,
        _task_id: &TaskId,
        _recent_failures: &[String],
    ) -> std::result::Result<ProposalArtifact, String> {
        let mut calls = self.calls.lock().await;
        *calls += 1;

        let mut queue = self.queue.lock().await;
        let outcome = if queue.is_empty() {
            self.default.clone()
        } else {
            queue.remove(0)
        };
        match outcome {
            StubOutcome::Propose(proposal) => Ok(proposal),
            StubOutcome::Deny(reason) => Err(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_proposal_is_a_valid_bt_dsl_document() {
        let reasoner = StubReasoner::always_proposes_wait_leaf();
        let task = TaskId::new("t1");
        let proposal = reasoner.propose(&task, &[]).await.unwrap();
        assert_eq!(proposal.name, "improvised-wait");
        assert_eq!(reasoner.call_count().await, 1);
    }

    #[tokio::test]
    async fn sequence_is_consumed_in_order_then_falls_back() {
        let reasoner = StubReasoner::sequence(vec![StubOutcome::Deny("no idea yet".to_string())]);
        let task = TaskId::new("t1");
        assert!(reasoner.propose(&task, &[]).await.is_err());
        let second = reasoner.propose(&task, &[]).await.unwrap_err();
        assert_eq!(second, "sequence exhausted");
    }
}
