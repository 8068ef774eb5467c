//! Behavior-Tree DSL input document (spec.md §3). This is the untrusted,
//! author-facing shape; [`crate::compiler::parse`] validates a raw
//! `serde_json::Value` against this grammar and produces a
//! [`crate::compiler::CompiledTree`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TreeMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    #[serde(default)]
    pub params: Value,
}

/// The closed set of node variants (spec.md §3). A `type` value outside this
/// set fails structural validation with "must be equal to constant"
/// (spec.md §4.2, step 1).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DslNode {
    Leaf {
        #[serde(rename = "leafName")]
        leaf_name: String,
        #[serde(default)]
        args: Option<Value>,
    },
    Sequence {
        children: Vec<DslNode>,
    },
    Selector {
        children: Vec<DslNode>,
    },
    #[serde(rename = "Repeat.Until")]
    RepeatUntil {
        child: Box<DslNode>,
        condition: Condition,
        #[serde(rename = "maxIterations")]
        max_iterations: u32,
    },
    #[serde(rename = "Decorator.Timeout")]
    DecoratorTimeout {
        child: Box<DslNode>,
        #[serde(rename = "timeoutMs")]
        timeout_ms: u64,
    },
    #[serde(rename = "Decorator.FailOnTrue")]
    DecoratorFailOnTrue {
        child: Box<DslNode>,
        condition: Condition,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BehaviorTreeDsl {
    #[serde(flatten)]
    pub metadata: TreeMetadata,
    pub root: DslNode,
}
