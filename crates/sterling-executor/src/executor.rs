//! Reactive Executor + Idle Governor (spec.md §4.7, §5 — component C7): one
//! tick applies TTL evaluation, expansion retry, then dispatches the
//! highest-priority eligible task's next step, in that strict order.

use std::collections::HashMap;

use sterling_core::error::Result;
use sterling_core::{LeafErrorCode, TaskId};
use sterling_leaves::{LeafContext, LeafRegistry, LeafResult};
use sterling_registry::{DynamicCreationFlow, EnhancedRegistry, ReasonerClient};
use sterling_tasks::scheduler::{apply_ttl, retry_expansion, ExpansionClient};
use sterling_tasks::{lifecycle, Task, TaskStatus};

use crate::decision::DecisionCode;
use crate::loop_breaker::LoopBreaker;
use crate::postcondition::PostconditionRegistry;
use crate::report::{DispatchedStep, GoldenRunReport, LoopEpisode, StepResult, ToolDiagnostics, VerificationStatus};

pub struct TickOutcome {
    pub decision: DecisionCode,
    pub report: GoldenRunReport,
}

/// Minimum gap between two dispatches of the same task — models a lease
/// held briefly after a dispatch so a retried selection in the same wall
/// clock tick doesn't double-fire while a prior attempt's effects are still
/// settling (spec.md §4.7's `suppressed_lease_cooldown`, generalized beyond
/// just the impasse-proposal debounce case below).
const DISPATCH_LEASE_MS: i64 = 50;

pub struct Executor {
    loop_breaker: LoopBreaker,
    dynamic: DynamicCreationFlow,
    leases: HashMap<TaskId, i64>,
    expansion_retry_budget: usize,
    default_ttl_ms: i64,
}

impl Default for Executor {
    fn default() -> Self {
        Self {
            loop_breaker: LoopBreaker::new(),
            dynamic: DynamicCreationFlow::new(sterling_registry::ImpasseConfig::default()),
            leases: HashMap::new(),
            expansion_retry_budget: sterling_tasks::scheduler::default_retry_budget(),
            default_ttl_ms: lifecycle::DEFAULT_TTL_MS,
        }
    }
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    /// One tick of the ordering rule from spec.md §5: TTL evaluation, then
    /// expansion retry, then eligible-task selection and dispatch.
    #[allow(clippy::too_many_arguments)]
    pub async fn tick(
        &mut self,
        tasks: &mut [Task],
        leaves: &LeafRegistry,
        postconditions: &PostconditionRegistry,
        expansion_client: &dyn ExpansionClient,
        reasoner: &dyn ReasonerClient,
        options: &mut EnhancedRegistry,
        ctx: &dyn LeafContext,
        now_ms: i64,
    ) -> TickOutcome {
        for task in tasks.iter_mut() {
            if task.metadata.blocked_reason.is_some() {
                apply_ttl(task, now_ms, self.default_ttl_ms);
            }
        }

        retry_expansion(tasks, expansion_client, now_ms, self.expansion_retry_budget).await;

        let eligible_idx = tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| lifecycle::is_task_eligible(t, now_ms))
            .filter(|(_, t)| {
                self.leases
                    .get(&t.id)
                    .map(|until| now_ms >= *until)
                    .unwrap_or(true)
            })
            .max_by_key(|(_, t)| t.priority)
            .map(|(i, _)| i);

        let Some(idx) = eligible_idx else {
            return TickOutcome {
                decision: self.idle_decision(tasks, now_ms),
                report: GoldenRunReport::new(""),
            };
        };

        self.leases.insert(tasks[idx].id.clone(), now_ms + DISPATCH_LEASE_MS);
        let outcome = self
            .dispatch(&mut tasks[idx], leaves, postconditions, ctx, now_ms)
            .await;

        if outcome.decision == DecisionCode::EmittedBlocked
            && tasks[idx].metadata.blocked_reason.as_deref() == Some("blocked_infra_error_tripped")
        {
            self.try_request_proposal(&tasks[idx].id, reasoner, options, now_ms).await;
        }

        outcome
    }

    /// No eligible task was found this tick — pick the most specific
    /// suppression code available (spec.md §4.7). Checked in order from
    /// most to least specific: a task sitting on a lease-cooldown debounce
    /// after a recent proposal request, a task whose dynamic-flow hourly
    /// proposal budget is spent, any `pending_planning` task still waiting
    /// on expansion, else the generic "nothing to do" code.
    fn idle_decision(&self, tasks: &[Task], now_ms: i64) -> DecisionCode {
        let tripped = tasks
            .iter()
            .filter(|t| t.metadata.blocked_reason.as_deref() == Some("blocked_infra_error_tripped"));
        for task in tripped {
            if self.dynamic.is_debounced(&task.id, now_ms) {
                return DecisionCode::SuppressedLeaseCooldown;
            }
            if self.dynamic.is_hourly_capped(&task.id, now_ms) {
                return DecisionCode::SuppressedHourlyCap;
            }
        }
        if self.leases.values().any(|until| now_ms < *until) {
            return DecisionCode::SuppressedLeaseCooldown;
        }
        if tasks.iter().any(|t| t.status == TaskStatus::PendingPlanning) {
            return DecisionCode::SuppressedPendingPlanning;
        }
        DecisionCode::SuppressedInFlight
    }

    /// Consecutive-failure impasse on `task_id` asks the reasoner for a new
    /// option and registers it in shadow mode (spec.md §4.6's dynamic
    /// creation flow, triggered here per §2's data-flow narrative: "on
    /// consecutive failures, Dynamic Flow may request a proposal"). Errors
    /// are logged, never propagated — a failed proposal request must not
    /// crash the executor loop.
    async fn try_request_proposal(
        &mut self,
        task_id: &TaskId,
        reasoner: &dyn ReasonerClient,
        options: &mut EnhancedRegistry,
        now_ms: i64,
    ) {
        let recent_failures = vec!["blocked_infra_error_tripped".to_string()];
        match self
            .dynamic
            .request_option_proposal(task_id, now_ms, &recent_failures, reasoner)
            .await
        {
            Ok(Some(proposal)) => {
                match self
                    .dynamic
                    .register_proposed_option(options, task_id, &proposal, "reasoner", now_ms)
                {
                    Ok(id) => tracing::info!(task_id = %task_id, option_id = %id, "registered proposed option in shadow mode"),
                    Err(err) => tracing::warn!(task_id = %task_id, %err, "failed to register proposed option"),
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(task_id = %task_id, %err, "reasoner failed to produce a proposal"),
        }
    }

    async fn dispatch(
        &mut self,
        task: &mut Task,
        leaves: &LeafRegistry,
        postconditions: &PostconditionRegistry,
        ctx: &dyn LeafContext,
        now_ms: i64,
    ) -> TickOutcome {
        let mut report = GoldenRunReport::new(task.id.as_str());

        let Some(step) = task.steps.iter_mut().find(|s| !s.done && s.meta.executable) else {
            task.status = TaskStatus::Completed;
            task.metadata.updated_at = now_ms;
            return TickOutcome {
                decision: DecisionCode::EmittedExecutable,
                report,
            };
        };

        let leaf_name = step.meta.leaf.clone();
        let args = step.meta.args.clone();

        let dispatch_result = leaves.dispatch(&leaf_name, None, ctx, args.clone()).await;

        let decision = match dispatch_result {
            Err(err) => {
                task.status = TaskStatus::Failed;
                task.metadata.updated_at = now_ms;
                report.execution.dispatched_steps.push(DispatchedStep {
                    result: StepResult { tool_diagnostics: None },
                });
                let outcome = self.loop_breaker.record_failure(&task.id, &leaf_name, &err.to_string());
                report.loop_breaker_evaluated = true;
                if outcome.tripped {
                    report.loop_episodes.push(LoopEpisode {
                        leaf: leaf_name.clone(),
                        failure_code: err.to_string(),
                        occurrences: outcome.occurrences,
                    });
                }
                DecisionCode::EmittedError
            }
            Ok(LeafResult::Success { metrics, .. }) => {
                report.execution.dispatched_steps.push(DispatchedStep {
                    result: StepResult {
                        tool_diagnostics: Some(ToolDiagnostics {
                            duration_ms: metrics.duration_ms,
                            retries: metrics.retries,
                            timeouts: metrics.timeouts,
                        }),
                    },
                });

                match postconditions.verify(&leaf_name, ctx, &args).await {
                    Ok(()) => {
                        report.execution.verification = Some(VerificationStatus::Verified);
                        step.done = true;
                        let total = task.steps.len().max(1) as f64;
                        let completed = task.steps.iter().filter(|s| s.done).count() as f64;
                        task.progress = completed / total;
                        if task.steps.iter().all(|s| s.done) {
                            task.status = TaskStatus::Completed;
                        }
                        task.metadata.updated_at = now_ms;
                        DecisionCode::EmittedExecutable
                    }
                    Err(op) => {
                        report.execution.verification = Some(VerificationStatus::Failed);
                        let code = LeafErrorCode::postcondition_failed(op).code();
                        task.status = TaskStatus::Failed;
                        task.metadata
                            .validation_errors
                            .get_or_insert_with(Vec::new)
                            .push(code.clone());
                        task.metadata.updated_at = now_ms;
                        let outcome = self.loop_breaker.record_failure(&task.id, &leaf_name, &code);
                        report.loop_breaker_evaluated = true;
                        if outcome.tripped {
                            report.loop_episodes.push(LoopEpisode {
                                leaf: leaf_name.clone(),
                                failure_code: code.clone(),
                                occurrences: outcome.occurrences,
                            });
                        }
                        DecisionCode::EmittedError
                    }
                }
            }
            Ok(LeafResult::Failure { error, metrics }) => {
                report.execution.dispatched_steps.push(DispatchedStep {
                    result: StepResult {
                        tool_diagnostics: Some(ToolDiagnostics {
                            duration_ms: metrics.duration_ms,
                            retries: metrics.retries,
                            timeouts: metrics.timeouts,
                        }),
                    },
                });

                let outcome = self.loop_breaker.record_failure(&task.id, &leaf_name, &error.code.code());
                report.loop_breaker_evaluated = true;

                if outcome.tripped {
                    report.loop_episodes.push(LoopEpisode {
                        leaf: leaf_name.clone(),
                        failure_code: error.code.code(),
                        occurrences: outcome.occurrences,
                    });
                    task.metadata.blocked_reason = Some("blocked_infra_error_tripped".to_string());
                    task.metadata.blocked_at = Some(now_ms);
                    task.metadata.updated_at = now_ms;
                    DecisionCode::EmittedBlocked
                } else if error.retryable && task.metadata.retry_count < task.metadata.max_retries {
                    task.metadata.retry_count += 1;
                    let delay = sterling_tasks::scheduler::backoff_delay_ms(task.metadata.retry_count);
                    task.metadata.next_eligible_at = Some(now_ms + delay);
                    task.metadata.updated_at = now_ms;
                    DecisionCode::EmittedBlocked
                } else {
                    task.status = TaskStatus::Failed;
                    task.metadata.validation_errors.get_or_insert_with(Vec::new).push(
                        if error.retryable {
                            "max_retries_exceeded".to_string()
                        } else {
                            error.code.code()
                        },
                    );
                    task.metadata.updated_at = now_ms;
                    DecisionCode::EmittedError
                }
            }
        };

        TickOutcome { decision, report }
    }
}
