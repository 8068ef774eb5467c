//! Golden-run report (spec.md §3, §7): structured audit of one
//! idle-to-dispatch round, emitted to an external sink.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    Skipped,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDiagnostics {
    pub duration_ms: u64,
    pub retries: u32,
    pub timeouts: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepResult {
    pub tool_diagnostics: Option<ToolDiagnostics>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatchedStep {
    pub result: StepResult,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Execution {
    pub dispatched_steps: Vec<DispatchedStep>,
    pub verification: Option<VerificationStatus>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Expansion {
    pub status: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskRef {
    pub task_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoopEpisode {
    pub leaf: String,
    pub failure_code: String,
    pub occurrences: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GoldenRunReport {
    pub idle_episode: Option<Value>,
    pub expansion: Expansion,
    pub task: TaskRef,
    pub execution: Execution,
    pub loop_breaker_evaluated: bool,
    pub loop_episodes: Vec<LoopEpisode>,
}

impl GoldenRunReport {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            idle_episode: None,
            expansion: Expansion { status: "none".to_string() },
            task: TaskRef { task_id: task_id.into() },
            execution: Execution {
                dispatched_steps: Vec::new(),
                verification: None,
            },
            loop_breaker_evaluated: false,
            loop_episodes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_report_has_no_verification_until_set() {
        let report = GoldenRunReport::new("t1");
        assert!(report.execution.verification.is_none());
        assert!(!report.loop_breaker_evaluated);
    }

    #[test]
    fn report_round_trips_through_json() {
        let mut report = GoldenRunReport::new("t1");
        report.execution.verification = Some(VerificationStatus::Verified);
        let raw = serde_json::to_string(&report).unwrap();
        let back: GoldenRunReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.task.task_id, "t1");
        assert_eq!(back.execution.verification, Some(VerificationStatus::Verified));
    }
}
