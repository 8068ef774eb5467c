//! Task types (spec.md §3).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sterling_core::TaskId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    PendingPlanning,
    Active,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Abandoned,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepMeta {
    pub leaf: String,
    #[serde(default)]
    pub args: Value,
    #[serde(default = "default_true")]
    pub executable: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Step {
    pub order: u32,
    pub done: bool,
    pub meta: StepMeta,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub blocked_reason: Option<String>,
    #[serde(default)]
    pub blocked_at: Option<i64>,
    #[serde(default)]
    pub next_eligible_at: Option<i64>,
    #[serde(default)]
    pub original_blocked_reason: Option<String>,
    #[serde(default)]
    pub expansion_retry_count: u32,
    #[serde(default)]
    pub reasoner_artifact: Option<Value>,
    #[serde(default)]
    pub validation_errors: Option<Vec<String>>,
}

fn default_max_retries() -> u32 {
    3
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub priority: u32,
    pub urgency: u32,
    #[serde(default)]
    pub progress: f64,
    pub status: TaskStatus,
    #[serde(default)]
    pub steps: Vec<Step>,
    pub metadata: TaskMetadata,
}

impl Task {
    pub fn new(id: TaskId, title: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            task_type: "generic".to_string(),
            priority: 0,
            urgency: 0,
            progress: 0.0,
            status: TaskStatus::Pending,
            steps: Vec::new(),
            metadata: TaskMetadata {
                created_at: now_ms,
                updated_at: now_ms,
                max_retries: default_max_retries(),
                ..Default::default()
            },
        }
    }

    pub fn clear_block(&mut self) {
        self.metadata.blocked_reason = None;
        self.metadata.blocked_at = None;
        self.metadata.next_eligible_at = None;
        self.metadata.original_blocked_reason = None;
    }
}
