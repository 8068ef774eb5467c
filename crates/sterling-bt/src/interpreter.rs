//! Recursive BT interpreter (spec.md §4.3 — component C3).
//!
//! Modeled on the teacher's `Executor::execute_node` boxed-future recursion:
//! Rust can't express a naive recursive `async fn`, so each node's execution
//! future is pinned and boxed, with children awaited by recursive calls
//! through the same boxed-future return type.

use crate::compiler::{CompiledNode, CompiledTree};
use crate::condition::ConditionRegistry;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use sterling_leaves::{LeafContext, LeafError, LeafRegistry, LeafResult};

/// Internal node status. `Running` only ever appears inside the
/// `Repeat.Until` loop body — it never escapes to [`ExecutionOutcome`]
/// (spec.md §4.3: "RUNNING is internal-only").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeStatus {
    Success,
    Failure,
    Running,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionMetrics {
    pub leaf_executions: u32,
    pub nodes_visited: u32,
    pub duration_ms: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalStatus {
    Success,
    Failure,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionOutcome {
    pub status: TerminalStatus,
    pub error: Option<LeafError>,
    pub metrics: ExecutionMetrics,
}

struct ExecState {
    leaf_executions: u32,
    nodes_visited: u32,
    last_error: Option<LeafError>,
}

impl ExecState {
    fn new() -> Self {
        Self {
            leaf_executions: 0,
            nodes_visited: 0,
            last_error: None,
        }
    }
}

pub struct Interpreter<'a> {
    pub leaves: &'a LeafRegistry,
    pub conditions: &'a dyn ConditionRegistry,
}

impl<'a> Interpreter<'a> {
    pub fn new(leaves: &'a LeafRegistry, conditions: &'a dyn ConditionRegistry) -> Self {
        Self { leaves, conditions }
    }

    pub async fn execute(&self, compiled: &CompiledTree, ctx: &dyn LeafContext) -> ExecutionOutcome {
        let start = ctx.now_ms();
        let mut state = ExecState::new();
        let status = self.run_node(&compiled.root, ctx, &mut state).await;
        let duration_ms = ctx.now_ms() - start;

        let terminal = match status {
            NodeStatus::Success => TerminalStatus::Success,
            // A tree whose root is still Running when execution returns
            // (only possible if a Repeat.Until root exhausts maxIterations
            // without the condition ever becoming true) surfaces as Failure
            // — there is no "still running" terminal state.
            NodeStatus::Failure | NodeStatus::Running => TerminalStatus::Failure,
        };

        ExecutionOutcome {
            status: terminal,
            error: state.last_error,
            metrics: ExecutionMetrics {
                leaf_executions: state.leaf_executions,
                nodes_visited: state.nodes_visited,
                duration_ms,
            },
        }
    }

    fn run_node<'b>(
        &'b self,
        node: &'b CompiledNode,
        ctx: &'b dyn LeafContext,
        state: &'b mut ExecState,
    ) -> Pin<Box<dyn Future<Output = NodeStatus> + Send + 'b>> {
        Box::pin(async move {
            state.nodes_visited += 1;
            match node {
                CompiledNode::Leaf { leaf_name, args } => {
                    self.run_leaf(leaf_name, args, ctx, state).await
                }
                CompiledNode::Sequence { children } => {
                    for child in children {
                        if self.run_node(child, ctx, state).await != NodeStatus::Success {
                            return NodeStatus::Failure;
                        }
                    }
                    NodeStatus::Success
                }
                CompiledNode::Selector { children } => {
                    for child in children {
                        if self.run_node(child, ctx, state).await == NodeStatus::Success {
                            return NodeStatus::Success;
                        }
                    }
                    NodeStatus::Failure
                }
                CompiledNode::RepeatUntil {
                    child,
                    condition,
                    max_iterations,
                } => {
                    // A failing child just means "not done yet" and is
                    // retried; only the condition becoming true, the child
                    // succeeding, or exhausting maxIterations ends the loop
                    // (spec.md §4.3).
                    for _ in 0..*max_iterations {
                        if self.conditions.evaluate(&condition.name, &condition.params, ctx).await {
                            return NodeStatus::Success;
                        }
                        if self.run_node(child, ctx, state).await == NodeStatus::Success {
                            return NodeStatus::Success;
                        }
                    }
                    NodeStatus::Failure
                }
                CompiledNode::DecoratorTimeout { child, timeout_ms } => {
                    let deadline = Duration::from_millis(*timeout_ms);
                    match tokio::time::timeout(deadline, self.run_node(child, ctx, state)).await {
                        Ok(status) => status,
                        Err(_) => {
                            // One abort signal per tree execution: a timeout
                            // trips the same token external cancellation uses.
                            ctx.cancel_token().cancel();
                            state.last_error = Some(LeafError::new(
                                sterling_core::LeafErrorCode::MovementTimeout,
                                Some(format!("Decorator.Timeout elapsed after {timeout_ms}ms")),
                            ));
                            NodeStatus::Failure
                        }
                    }
                }
                CompiledNode::DecoratorFailOnTrue { child, condition } => {
                    let status = self.run_node(child, ctx, state).await;
                    if status != NodeStatus::Success {
                        return status;
                    }
                    if self.conditions.evaluate(&condition.name, &condition.params, ctx).await {
                        NodeStatus::Failure
                    } else {
                        NodeStatus::Success
                    }
                }
            }
        })
    }

    async fn run_leaf(
        &self,
        leaf_name: &str,
        args: &Value,
        ctx: &dyn LeafContext,
        state: &mut ExecState,
    ) -> NodeStatus {
        state.leaf_executions += 1;
        match self.leaves.dispatch(leaf_name, None, ctx, args.clone()).await {
            Ok(LeafResult::Success { .. }) => NodeStatus::Success,
            Ok(LeafResult::Failure { error, .. }) => {
                state.last_error = Some(error);
                NodeStatus::Failure
            }
            Err(err) => {
                state.last_error = Some(LeafError::new(
                    sterling_core::LeafErrorCode::Unknown(err.to_string()),
                    Some(err.to_string()),
                ));
                NodeStatus::Failure
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parse;
    use crate::condition::{ConditionPredicate, SimpleConditionRegistry};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
    use sterling_core::LeafErrorCode;
    use sterling_leaves::{ActuatorResult, Leaf, LeafMetrics, LeafRegistry};
    use sterling_leaves::world::{BlockPos, Control, EntitySnapshot, FaceVec, Hand, InventoryItem, Position};
    use tokio_util::sync::CancellationToken;

    struct CountingCtx {
        clock: AtomicI64,
        token: CancellationToken,
    }

    impl CountingCtx {
        fn new() -> Self {
            Self {
                clock: AtomicI64::new(0),
                token: CancellationToken::new(),
            }
        }
    }

    #[async_trait]
    impl LeafContext for CountingCtx {
        fn now_ms(&self) -> i64 {
            self.clock.fetch_add(1, Ordering::SeqCst)
        }
        fn cancel_token(&self) -> CancellationToken {
            self.token.clone()
        }
        fn record_metric(&self, _name: &str, _value: f64) {}
        fn record_error(&self, _detail: &str) {}
        async fn position(&self) -> Position {
            Position::default()
        }
        async fn inventory(&self) -> Vec<InventoryItem> {
            vec![]
        }
        async fn held_item(&self, _hand: Hand) -> Option<InventoryItem> {
            None
        }
        async fn block_at(&self, _pos: BlockPos) -> Option<String> {
            None
        }
        async fn light_level(&self, _pos: BlockPos) -> u8 {
            15
        }
        async fn entities(&self) -> Vec<EntitySnapshot> {
            vec![]
        }
        async fn time_of_day(&self) -> u64 {
            0
        }
        async fn has_line_of_sight(&self, _target: Position) -> bool {
            true
        }
        async fn look_at(&self, _pos: Position) -> ActuatorResult<()> {
            Ok(())
        }
        async fn set_control(&self, _control: Control, _active: bool) -> ActuatorResult<()> {
            Ok(())
        }
        async fn attack(&self, _entity_id: &str) -> ActuatorResult<()> {
            Ok(())
        }
        async fn dig(&self, _pos: BlockPos) -> ActuatorResult<()> {
            Ok(())
        }
        async fn place_block(&self, _ref_block: BlockPos, _face: FaceVec) -> ActuatorResult<()> {
            Ok(())
        }
        async fn equip(&self, _item: &str, _slot: Hand) -> ActuatorResult<()> {
            Ok(())
        }
        async fn activate_item(&self, _main_hand: bool) -> ActuatorResult<()> {
            Ok(())
        }
        async fn activate_block(&self, _pos: BlockPos) -> ActuatorResult<()> {
            Ok(())
        }
        async fn chat(&self, _message: &str) -> ActuatorResult<()> {
            Ok(())
        }
        async fn sleep(&self, _bed: BlockPos) -> ActuatorResult<()> {
            Ok(())
        }
    }

    struct ScriptedLeaf {
        name: String,
        succeed_after: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Leaf for ScriptedLeaf {
        fn name(&self) -> &str {
            &self.name
        }
        fn version(&self) -> &str {
            "1.0.0"
        }
        fn input_schema(&self) -> Value {
            json!({})
        }
        fn permissions(&self) -> &[sterling_leaves::Permission] {
            &[]
        }
        async fn run(&self, _ctx: &dyn LeafContext, _args: Value) -> sterling_leaves::LeafResult {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n >= self.succeed_after {
                sterling_leaves::LeafResult::success(json!({}), LeafMetrics::default())
            } else {
                sterling_leaves::LeafResult::failure(
                    LeafError::new(LeafErrorCode::PathStuck, None),
                    LeafMetrics::default(),
                )
            }
        }
    }

    struct AlwaysTrue;

    #[async_trait]
    impl ConditionPredicate for AlwaysTrue {
        async fn evaluate(&self, _params: &Value, _ctx: &dyn LeafContext) -> bool {
            true
        }
    }

    struct CountToTrue {
        threshold: u32,
        seen: AtomicU32,
    }

    #[async_trait]
    impl ConditionPredicate for CountToTrue {
        async fn evaluate(&self, _params: &Value, _ctx: &dyn LeafContext) -> bool {
            self.seen.fetch_add(1, Ordering::SeqCst) >= self.threshold
        }
    }

    #[tokio::test]
    async fn sequence_short_circuits_on_failure() {
        let mut registry = LeafRegistry::default();
        registry
            .register_leaf(
                std::sync::Arc::new(ScriptedLeaf {
                    name: "ok".to_string(),
                    succeed_after: 0,
                    calls: AtomicU32::new(0),
                }),
                None,
            )
            .unwrap();
        registry
            .register_leaf(
                std::sync::Arc::new(ScriptedLeaf {
                    name: "never".to_string(),
                    succeed_after: 999,
                    calls: AtomicU32::new(0),
                }),
                None,
            )
            .unwrap();

        let dsl = json!({
            "name": "t", "version": "1.0.0",
            "root": {"type": "Sequence", "children": [
                {"type": "Leaf", "leafName": "ok"},
                {"type": "Leaf", "leafName": "never"},
            ]}
        });
        let compiled = parse(&dsl, &registry).compiled.unwrap();
        let conditions = SimpleConditionRegistry::new();
        let interpreter = Interpreter::new(&registry, &conditions);
        let ctx = CountingCtx::new();
        let outcome = interpreter.execute(&compiled, &ctx).await;
        assert_eq!(outcome.status, TerminalStatus::Failure);
        assert_eq!(outcome.metrics.leaf_executions, 2);
    }

    #[tokio::test]
    async fn selector_returns_success_on_first_match() {
        let mut registry = LeafRegistry::default();
        registry
            .register_leaf(
                std::sync::Arc::new(ScriptedLeaf {
                    name: "fails".to_string(),
                    succeed_after: 999,
                    calls: AtomicU32::new(0),
                }),
                None,
            )
            .unwrap();
        registry
            .register_leaf(
                std::sync::Arc::new(ScriptedLeaf {
                    name: "ok".to_string(),
                    succeed_after: 0,
                    calls: AtomicU32::new(0),
                }),
                None,
            )
            .unwrap();

        let dsl = json!({
            "name": "t", "version": "1.0.0",
            "root": {"type": "Selector", "children": [
                {"type": "Leaf", "leafName": "fails"},
                {"type": "Leaf", "leafName": "ok"},
            ]}
        });
        let compiled = parse(&dsl, &registry).compiled.unwrap();
        let conditions = SimpleConditionRegistry::new();
        let interpreter = Interpreter::new(&registry, &conditions);
        let ctx = CountingCtx::new();
        let outcome = interpreter.execute(&compiled, &ctx).await;
        assert_eq!(outcome.status, TerminalStatus::Success);
    }

    #[tokio::test]
    async fn repeat_until_stops_when_condition_becomes_true() {
        let mut registry = LeafRegistry::default();
        registry
            .register_leaf(
                std::sync::Arc::new(ScriptedLeaf {
                    name: "tick".to_string(),
                    succeed_after: 999,
                    calls: AtomicU32::new(0),
                }),
                None,
            )
            .unwrap();

        let dsl = json!({
            "name": "t", "version": "1.0.0",
            "root": {"type": "Repeat.Until", "child": {"type": "Leaf", "leafName": "tick"},
                     "condition": {"name": "done"}, "maxIterations": 10}
        });
        let compiled = parse(&dsl, &registry).compiled.unwrap();
        let mut conditions = SimpleConditionRegistry::new();
        conditions.register(
            "done",
            Box::new(CountToTrue {
                threshold: 2,
                seen: AtomicU32::new(0),
            }),
        );
        let interpreter = Interpreter::new(&registry, &conditions);
        let ctx = CountingCtx::new();
        let outcome = interpreter.execute(&compiled, &ctx).await;
        assert_eq!(outcome.status, TerminalStatus::Success);
        assert_eq!(outcome.metrics.leaf_executions, 2);
    }

    #[tokio::test]
    async fn decorator_timeout_trips_cancel_token() {
        struct SlowLeaf;
        #[async_trait]
        impl Leaf for SlowLeaf {
            fn name(&self) -> &str {
                "slow"
            }
            fn version(&self) -> &str {
                "1.0.0"
            }
            fn input_schema(&self) -> Value {
                json!({})
            }
            fn permissions(&self) -> &[sterling_leaves::Permission] {
                &[]
            }
            fn timeout_ms(&self) -> u64 {
                60_000
            }
            async fn run(&self, _ctx: &dyn LeafContext, _args: Value) -> sterling_leaves::LeafResult {
                tokio::time::sleep(Duration::from_millis(200)).await;
                sterling_leaves::LeafResult::success(json!({}), LeafMetrics::default())
            }
        }

        let mut registry = LeafRegistry::default();
        registry
            .register_leaf(std::sync::Arc::new(SlowLeaf), None)
            .unwrap();

        let dsl = json!({
            "name": "t", "version": "1.0.0",
            "root": {"type": "Decorator.Timeout", "child": {"type": "Leaf", "leafName": "slow"}, "timeoutMs": 10}
        });
        let compiled = parse(&dsl, &registry).compiled.unwrap();
        let conditions = SimpleConditionRegistry::new();
        let interpreter = Interpreter::new(&registry, &conditions);
        let ctx = CountingCtx::new();
        let outcome = interpreter.execute(&compiled, &ctx).await;
        assert_eq!(outcome.status, TerminalStatus::Failure);
        assert!(ctx.cancel_token().is_cancelled());
    }

    #[tokio::test]
    async fn fail_on_true_overrides_child_success() {
        let mut registry = LeafRegistry::default();
        registry
            .register_leaf(
                std::sync::Arc::new(ScriptedLeaf {
                    name: "ok".to_string(),
                    succeed_after: 0,
                    calls: AtomicU32::new(0),
                }),
                None,
            )
            .unwrap();

        let dsl = json!({
            "name": "t", "version": "1.0.0",
            "root": {"type": "Decorator.FailOnTrue", "child": {"type": "Leaf", "leafName": "ok"},
                     "condition": {"name": "abort"}}
        });
        let compiled = parse(&dsl, &registry).compiled.unwrap();
        let mut conditions = SimpleConditionRegistry::new();
        conditions.register("abort", Box::new(AlwaysTrue));
        let interpreter = Interpreter::new(&registry, &conditions);
        let ctx = CountingCtx::new();
        let outcome = interpreter.execute(&compiled, &ctx).await;
        assert_eq!(outcome.status, TerminalStatus::Failure);
    }
}
