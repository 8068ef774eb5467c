//! Deterministic `ExpansionClient` stand-in (SPEC_FULL.md §6), used to drive
//! `pending_planning` tasks through the expansion-retry scheduler in tests
//! and the CLI demo without a real planning service attached. Same
//! canned-queue-with-fallback shape as [`crate::stub_reasoner::StubReasoner`].

use async_trait::async_trait;
use sterling_tasks::scheduler::ExpansionClient;
use sterling_tasks::{Step, StepMeta, Task};
use tokio::sync::Mutex;

#[derive(Clone, Debug)]
pub enum StubExpansionOutcome {
    Expand(Vec<StepMeta>),
    Deny(String),
}

pub struct StubExpansionClient {
    queue: Mutex<Vec<StubExpansionOutcome>>,
    default: StubExpansionOutcome,
}

impl StubExpansionClient {
    pub fn constant(outcome: StubExpansionOutcome) -> Self {
        Self {
            queue: Mutex::new(Vec::new()),
            default: outcome,
        }
    }

    pub fn sequence(outcomes: Vec<StubExpansionOutcome>) -> Self {
        Self {
            queue: Mutex::new(outcomes),
            default: StubExpansionOutcome::Deny("no planning service configured".to_string()),
        }
    }

    /// Always succeeds by handing back a single step executing `leaf_name`
    /// with empty args — the common case for wiring up the CLI demo loop.
    pub fn always_expands_to(leaf_name: impl Into<String>) -> Self {
        Self::constant(StubExpansionOutcome::Expand(vec![StepMeta {
            leaf: leaf_name.into(),
            args: serde_json::json!({}),
            executable: true,
        }]))
    }
}

#[async_trait]
impl ExpansionClient for StubExpansionClient {
    async fn expand(&self, _task: &Task) -> std::result::Result<Vec<Step>, String> {
        let mut queue = self.queue.lock().await;
        let outcome = if queue.is_empty() {
            self.default.clone()
        } else {
            queue.remove(0)
        };
        match outcome {
            StubExpansionOutcome::Expand(metas) => Ok(metas
                .into_iter()
                .enumerate()
                .map(|(order, meta)| Step {
                    order: order as u32,
                    done: false,
                    meta,
                })
                .collect()),
            StubExpansionOutcome::Deny(reason) => Err(reason),
        }
    }
}
