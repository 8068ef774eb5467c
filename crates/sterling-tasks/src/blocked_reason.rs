//! Blocked-Reason Registry (spec.md §4.4 — component C4): the sole source
//! of truth for what a blocked reason means and how long a task may sit in
//! it before something acts.

use std::collections::BTreeMap;
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Transient,
    ContractBroken,
    Terminal,
    Executor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TtlPolicy {
    /// Never auto-failed by a timer; retried externally via `nextEligibleAt`.
    Exempt,
    /// Falls back to the scheduler's `defaultTtlMs`.
    Default,
    /// Fast-fail after this many milliseconds.
    Millis(u64),
}

#[derive(Clone, Debug)]
pub struct BlockedReasonEntry {
    pub classification: Classification,
    pub ttl_policy: TtlPolicy,
    pub description: &'static str,
}

/// `blocked_*` reasons the core knows about out of the box. Anything else
/// routes through [`normalize_blocked_reason`].
fn registry() -> &'static BTreeMap<&'static str, BlockedReasonEntry> {
    static REGISTRY: OnceLock<BTreeMap<&'static str, BlockedReasonEntry>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map = BTreeMap::new();
        map.insert(
            "blocked_executor_unavailable",
            BlockedReasonEntry {
                classification: Classification::Transient,
                ttl_policy: TtlPolicy::Exempt,
                description: "executor temporarily unavailable, retried externally",
            },
        );
        map.insert(
            "blocked_executor_error",
            BlockedReasonEntry {
                classification: Classification::Transient,
                ttl_policy: TtlPolicy::Exempt,
                description: "unprefixed unknown failure, treated as retryable",
            },
        );
        map.insert(
            "blocked_missing_digest",
            BlockedReasonEntry {
                classification: Classification::ContractBroken,
                ttl_policy: TtlPolicy::Millis(30_000),
                description: "proposal or bundle missing a required content digest",
            },
        );
        map.insert(
            "blocked_invalid_steps_bundle",
            BlockedReasonEntry {
                classification: Classification::ContractBroken,
                ttl_policy: TtlPolicy::Millis(30_000),
                description: "normalization target for unrecognized blocked_* reasons",
            },
        );
        map.insert(
            "blocked_intent_resolution_disabled",
            BlockedReasonEntry {
                classification: Classification::ContractBroken,
                ttl_policy: TtlPolicy::Millis(60_000),
                description: "STERLING_INTENT_RESOLVE=0 — expansion retry disabled",
            },
        );
        map.insert(
            "expansion_retries_exhausted",
            BlockedReasonEntry {
                classification: Classification::Terminal,
                ttl_policy: TtlPolicy::Exempt,
                description: "expansionRetryCount reached MAX_EXPANSION_RETRIES",
            },
        );
        map.insert(
            "blocked_infra_error_tripped",
            BlockedReasonEntry {
                classification: Classification::Executor,
                ttl_policy: TtlPolicy::Exempt,
                description: "loop breaker tripped on a recurring (task, leaf, code) triple",
            },
        );
        map
    })
}

pub fn lookup(reason: &str) -> Option<&'static BlockedReasonEntry> {
    registry().get(reason)
}

pub fn is_known(reason: &str) -> bool {
    registry().contains_key(reason)
}

pub fn transient_reasons() -> Vec<&'static str> {
    registry()
        .iter()
        .filter(|(_, entry)| entry.classification == Classification::Transient)
        .map(|(name, _)| *name)
        .collect()
}

pub fn contract_broken_reasons() -> Vec<&'static str> {
    registry()
        .iter()
        .filter(|(_, entry)| entry.classification == Classification::ContractBroken)
        .map(|(name, _)| *name)
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedReason {
    pub reason: String,
    pub original_reason: Option<String>,
}

/// `normalizeBlockedReason(raw) -> {reason, originalReason?}` (spec.md §4.4).
/// A known reason passes through unchanged. An unknown reason prefixed with
/// `blocked_` maps to `blocked_invalid_steps_bundle` (contract-broken, fast
/// fail) so new solver-side failure modes don't linger unbounded. An
/// unprefixed unknown reason maps to `blocked_executor_error` (transient,
/// retried externally) — this spec's resolution of an ambiguity the source
/// left inconsistent across test fixtures.
pub fn normalize_blocked_reason(raw: &str) -> NormalizedReason {
    if is_known(raw) {
        return NormalizedReason {
            reason: raw.to_string(),
            original_reason: None,
        };
    }
    let reason = if raw.starts_with("blocked_") {
        "blocked_invalid_steps_bundle"
    } else {
        "blocked_executor_error"
    };
    NormalizedReason {
        reason: reason.to_string(),
        original_reason: Some(raw.to_string()),
    }
}
