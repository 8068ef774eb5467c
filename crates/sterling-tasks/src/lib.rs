//! Task model, blocked-reason registry, and lifecycle/scheduling rules
//! (spec.md §3, §4.4, §4.5 — components C4 and C5).

pub mod blocked_reason;
pub mod lifecycle;
pub mod scheduler;
pub mod task;

pub use blocked_reason::{
    contract_broken_reasons, is_known, lookup, normalize_blocked_reason, transient_reasons,
    BlockedReasonEntry, Classification, NormalizedReason, TtlPolicy,
};
pub use lifecycle::{evaluate_task_block_state, is_task_eligible, BlockState, DEFAULT_TTL_MS};
pub use scheduler::{
    apply_ttl, backoff_delay_ms, default_retry_budget, retry_expansion, ExpansionClient,
    MAX_EXPANSION_RETRIES,
};
pub use task::{Step, StepMeta, Task, TaskMetadata, TaskStatus};
