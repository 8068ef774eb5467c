//! Enhanced Registry (spec.md §4.6 — component C6): options in shadow mode,
//! promotion/retirement, and per-option quotas. Delegates leaf registration
//! to [`sterling_leaves::LeafRegistry`] and BT compilation to
//! [`sterling_bt::parse`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use sterling_bt::LeafFactory;
use sterling_core::error::{Result, SterlingError};
use sterling_core::OptionId;
use sterling_leaves::{Leaf, LeafRegistry, Provenance};

use crate::option::{OptionState, Quota, RegisteredOption, ShadowConfig, ShadowStats};

pub struct RetirementEval {
    pub should_retire: bool,
    pub total_runs: u32,
    pub reason: Option<String>,
}

#[derive(Default)]
pub struct EnhancedRegistry {
    leaves: LeafRegistry,
    options: BTreeMap<OptionId, RegisteredOption>,
    quotas: BTreeMap<OptionId, Quota>,
}

impl EnhancedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `registerLeaf(leaf, provenance) -> {ok, id}` — delegates to the leaf
    /// registry.
    pub fn register_leaf(&mut self, leaf: Arc<dyn Leaf>, provenance: Option<Provenance>) -> Result<String> {
        self.leaves.register_leaf(leaf, provenance)
    }

    pub fn leaves(&self) -> &LeafRegistry {
        &self.leaves
    }

    /// `registerOption(btDsl, provenance, shadowConfig) -> {ok, id}`: parses
    /// and compiles `bt_dsl` against the leaf registry, then stores the
    /// result in `shadow` state.
    pub fn register_option(
        &mut self,
        bt_dsl: &Value,
        provenance: Provenance,
        shadow_config: ShadowConfig,
    ) -> Result<OptionId> {
        let factory: &dyn LeafFactory = &self.leaves;
        let output = sterling_bt::parse(bt_dsl, factory);
        let compiled = output
            .compiled
            .ok_or_else(|| SterlingError::CompileError(output.errors.unwrap_or_default().join("; ")))?;

        let id = OptionId::compose(&compiled.name, &compiled.version);
        self.options.insert(
            id.clone(),
            RegisteredOption {
                id: id.clone(),
                compiled,
                provenance,
                shadow_config,
                state: OptionState::Shadow,
                stats: ShadowStats::default(),
            },
        );
        Ok(id)
    }

    pub fn get_option(&self, id: &OptionId) -> Option<&RegisteredOption> {
        self.options.get(id)
    }

    /// `recordShadowRun(optionId, success)`. Promotion and auto-retirement
    /// are evaluated as a side effect, mirroring the way the dynamic flow
    /// updates state synchronously with the run that triggers it.
    pub fn record_shadow_run(&mut self, id: &OptionId, success: bool, now_ms: i64) -> Result<()> {
        let option = self
            .options
            .get_mut(id)
            .ok_or_else(|| SterlingError::OptionNotFound(id.to_string()))?;
        option.stats.record(success, now_ms);

        if option.state == OptionState::Shadow {
            let stats = option.stats;
            let config = option.shadow_config;
            if stats.total_runs >= config.max_shadow_runs
                && stats.success_rate() >= config.promotion_threshold
            {
                option.state = OptionState::Active;
            }
        }
        Ok(())
    }

    pub fn get_shadow_stats(&self, id: &OptionId) -> Option<ShadowStats> {
        self.options.get(id).map(|o| o.stats)
    }

    pub fn set_quota(&mut self, id: OptionId, limit: u32, window_ms: i64, now_ms: i64) {
        self.quotas.insert(id, Quota::new(limit, window_ms, now_ms));
    }

    /// `checkQuota(optionId) -> boolean`. Options with no configured quota
    /// are unthrottled.
    pub fn check_quota(&mut self, id: &OptionId, now_ms: i64) -> bool {
        match self.quotas.get_mut(id) {
            Some(quota) => quota.check_and_consume(now_ms),
            None => true,
        }
    }

    /// `evaluateRetirement(optionId) -> {shouldRetire, totalRuns, reason?}`.
    /// Grace period is measured from `lastRun` — a retirement check right
    /// after the disqualifying run never fires, giving operators a window
    /// to intervene.
    pub fn evaluate_retirement(&mut self, id: &OptionId, now_ms: i64) -> Result<RetirementEval> {
        let option = self
            .options
            .get_mut(id)
            .ok_or_else(|| SterlingError::OptionNotFound(id.to_string()))?;

        if option.state != OptionState::Active && option.state != OptionState::Shadow {
            return Ok(RetirementEval {
                should_retire: false,
                total_runs: option.stats.total_runs,
                reason: None,
            });
        }

        let config = option.shadow_config;
        let stats = option.stats;
        let grace_elapsed = stats
            .last_run
            .map(|last| now_ms >= last + config.grace_period_ms)
            .unwrap_or(false);

        let should_retire = stats.total_runs >= config.min_runs_before_retirement
            && stats.success_rate() <= config.auto_retirement_threshold
            && grace_elapsed;

        if should_retire {
            option.state = OptionState::Retired;
        }

        Ok(RetirementEval {
            should_retire,
            total_runs: stats.total_runs,
            reason: should_retire.then(|| {
                format!(
                    "success_rate {:.2} <= threshold {:.2} over {} runs",
                    stats.success_rate(),
                    config.auto_retirement_threshold,
                    stats.total_runs
                )
            }),
        })
    }
}
