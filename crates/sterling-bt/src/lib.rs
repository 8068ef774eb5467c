//! Behavior-Tree DSL, compiler, and interpreter (spec.md §3, §4.2, §4.3 —
//! components C2 and C3).

pub mod compiler;
pub mod condition;
pub mod dsl;
pub mod interpreter;

pub use compiler::{parse, CompiledNode, CompiledTree, LeafFactory, ParseOutput};
pub use condition::{ConditionPredicate, ConditionRegistry, SimpleConditionRegistry};
pub use dsl::{BehaviorTreeDsl, Condition, DslNode, TreeMetadata};
pub use interpreter::{ExecutionMetrics, ExecutionOutcome, Interpreter, NodeStatus, TerminalStatus};
