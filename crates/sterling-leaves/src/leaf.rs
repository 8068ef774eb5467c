//! The `Leaf` contract (spec.md §3, §4.1): a typed primitive operation with
//! input/output schemas, permissions, timeouts, retries, and a `run`
//! function that never throws across the boundary — modeled on
//! `agenticlaw_tools::registry::Tool`, generalized from "tool an LLM calls"
//! to "primitive operation a behavior tree calls".

use crate::context::LeafContext;
use crate::permissions::Permission;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sterling_core::LeafErrorCode;

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct LeafMetrics {
    pub duration_ms: u64,
    pub retries: u32,
    pub timeouts: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeafError {
    pub code: LeafErrorCode,
    pub retryable: bool,
    pub detail: Option<String>,
}

impl LeafError {
    pub fn new(code: LeafErrorCode, detail: impl Into<Option<String>>) -> Self {
        let retryable = code.default_retryable();
        Self {
            code,
            retryable,
            detail: detail.into(),
        }
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

/// Tagged union result of running a leaf (spec.md §3). Never propagated as a
/// Rust panic or exception — the registry converts any panic caught during
/// dispatch into a `Failure` with `error.code = internal.panic`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LeafResult {
    Success { result: Value, metrics: LeafMetrics },
    Failure { error: LeafError, metrics: LeafMetrics },
}

impl LeafResult {
    pub fn success(result: Value, metrics: LeafMetrics) -> Self {
        Self::Success { result, metrics }
    }

    pub fn failure(error: LeafError, metrics: LeafMetrics) -> Self {
        Self::Failure { error, metrics }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// `false` for successes — only failures carry a retryability verdict.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Success { .. } => false,
            Self::Failure { error, .. } => error.retryable,
        }
    }

    pub fn metrics(&self) -> &LeafMetrics {
        match self {
            Self::Success { metrics, .. } | Self::Failure { metrics, .. } => metrics,
        }
    }
}

/// A registered primitive operation. `(name, version)` is the registry key
/// — two distinct versions of the same leaf coexist (spec.md §3 invariant).
#[async_trait::async_trait]
pub trait Leaf: Send + Sync {
    fn name(&self) -> &str;
    /// Semver-shaped version string, e.g. `"1.0.0"`.
    fn version(&self) -> &str;
    fn description(&self) -> &str {
        ""
    }
    fn input_schema(&self) -> Value;
    fn output_schema(&self) -> Value {
        serde_json::json!({})
    }
    fn permissions(&self) -> &[Permission];
    fn timeout_ms(&self) -> u64 {
        30_000
    }
    fn retries(&self) -> u32 {
        0
    }

    async fn run(&self, ctx: &dyn LeafContext, args: Value) -> LeafResult;
}
