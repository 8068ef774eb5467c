//! Condition predicates consulted by `Repeat.Until` and `Decorator.FailOnTrue`
//! (spec.md §3, §4.3). Conditions are named, parameterized booleans evaluated
//! against live `LeafContext` state — they never mutate the world.

use async_trait::async_trait;
use serde_json::Value;
use sterling_leaves::LeafContext;
use std::collections::HashMap;

#[async_trait]
pub trait ConditionPredicate: Send + Sync {
    async fn evaluate(&self, params: &Value, ctx: &dyn LeafContext) -> bool;
}

#[async_trait]
pub trait ConditionRegistry: Send + Sync {
    async fn evaluate(&self, name: &str, params: &Value, ctx: &dyn LeafContext) -> bool;
}

/// HashMap-backed registry, modeled on `sterling_leaves::LeafRegistry`'s
/// lookup-and-dispatch shape. An unknown condition name logs a warning and
/// evaluates `false` rather than failing the tree outright — a condition is
/// advisory, not a hard dependency like a leaf.
#[derive(Default)]
pub struct SimpleConditionRegistry {
    predicates: HashMap<String, Box<dyn ConditionPredicate>>,
}

impl SimpleConditionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, predicate: Box<dyn ConditionPredicate>) {
        self.predicates.insert(name.into(), predicate);
    }
}

#[async_trait]
impl ConditionRegistry for SimpleConditionRegistry {
    async fn evaluate(&self, name: &str, params: &Value, ctx: &dyn LeafContext) -> bool {
        match self.predicates.get(name) {
            Some(predicate) => predicate.evaluate(params, ctx).await,
            None => {
                tracing::warn!(condition = name, "unknown condition, defaulting to false");
                false
            }
        }
    }
}
