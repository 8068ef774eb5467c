//! BT-DSL parser/compiler (spec.md §4.2 — component C2).
//!
//! Validates a raw `serde_json::Value` against the fixed grammar, resolves
//! every `Leaf.leafName` against a caller-supplied factory, inlines argument
//! defaults from each leaf's input schema, and computes the canonical tree
//! hash (spec.md §3's `CompiledTree.treeHash`).

use crate::dsl::Condition;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use sterling_leaves::LeafRegistry;

/// What the parser needs to know about the leaf catalog. Implemented for
/// `sterling_leaves::LeafRegistry` downstream; kept abstract here so the
/// compiler doesn't need to depend on the concrete dispatch machinery.
pub trait LeafFactory {
    fn has_leaf(&self, name: &str) -> bool;
    /// JSON Schema for the leaf's input, used to inline `args` defaults
    /// (spec.md §4.2 step 3). `None` if the leaf isn't registered.
    fn input_schema(&self, name: &str) -> Option<Value>;
}

impl LeafFactory for LeafRegistry {
    fn has_leaf(&self, name: &str) -> bool {
        self.get_leaf(name, None).is_some()
    }

    fn input_schema(&self, name: &str) -> Option<Value> {
        self.get_leaf(name, None).map(|leaf| leaf.input_schema())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CompiledNode {
    Leaf {
        leaf_name: String,
        args: Value,
    },
    Sequence {
        children: Vec<CompiledNode>,
    },
    Selector {
        children: Vec<CompiledNode>,
    },
    RepeatUntil {
        child: Box<CompiledNode>,
        condition: Condition,
        max_iterations: u32,
    },
    DecoratorTimeout {
        child: Box<CompiledNode>,
        timeout_ms: u64,
    },
    DecoratorFailOnTrue {
        child: Box<CompiledNode>,
        condition: Condition,
    },
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params
    }
}

#[derive(Clone, Debug)]
pub struct CompiledTree {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub root: CompiledNode,
    /// Canonical identity: excludes `name`/`description` so logically
    /// identical trees from different authors hash equal (spec.md §3).
    pub tree_hash: String,
}

#[derive(Clone, Debug, Default)]
pub struct ParseOutput {
    pub valid: bool,
    pub compiled: Option<CompiledTree>,
    pub tree_hash: Option<String>,
    pub errors: Option<Vec<String>>,
}

/// `parse(dsl, leafFactory) -> {valid, compiled?, treeHash?, errors?}`
/// (spec.md §4.2).
pub fn parse(dsl: &Value, factory: &dyn LeafFactory) -> ParseOutput {
    let mut errors = Vec::new();
    let mut missing_leaves = BTreeSet::new();

    let name = dsl.get("name").and_then(Value::as_str).map(str::to_string);
    if name.is_none() {
        errors.push("must have required property 'name'".to_string());
    }
    let version = dsl
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string);
    if version.is_none() {
        errors.push("must have required property 'version'".to_string());
    }
    let description = dsl
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    let root_value = dsl.get("root");
    if root_value.is_none() {
        errors.push("must have required property 'root'".to_string());
    }

    let compiled_root = root_value.and_then(|root| {
        compile_node(root, factory, &mut errors, &mut missing_leaves)
    });

    if !missing_leaves.is_empty() {
        let csv = missing_leaves.into_iter().collect::<Vec<_>>().join(",");
        errors.push(format!("Missing leaves: {csv}"));
    }

    if !errors.is_empty() {
        return ParseOutput {
            valid: false,
            compiled: None,
            tree_hash: None,
            errors: Some(errors),
        };
    }

    let root = compiled_root.expect("no errors implies a compiled root");
    let tree_hash = compute_tree_hash(&root);

    ParseOutput {
        valid: true,
        compiled: Some(CompiledTree {
            name: name.unwrap(),
            version: version.unwrap(),
            description,
            root,
            tree_hash: tree_hash.clone(),
        }),
        tree_hash: Some(tree_hash),
        errors: None,
    }
}

fn compile_node(
    value: &Value,
    factory: &dyn LeafFactory,
    errors: &mut Vec<String>,
    missing_leaves: &mut BTreeSet<String>,
) -> Option<CompiledNode> {
    let Some(node_type) = value.get("type").and_then(Value::as_str) else {
        errors.push("must have required property 'type'".to_string());
        return None;
    };

    match node_type {
        "Leaf" => {
            let Some(leaf_name) = value.get("leafName").and_then(Value::as_str) else {
                errors.push("Leaf node must have required property 'leafName'".to_string());
                return None;
            };
            if !factory.has_leaf(leaf_name) {
                missing_leaves.insert(leaf_name.to_string());
            }
            let provided_args = value.get("args").cloned().unwrap_or_else(|| Value::Object(Default::default()));
            let args = match factory.input_schema(leaf_name) {
                Some(schema) => merge_defaults(&schema, provided_args),
                None => provided_args,
            };
            Some(CompiledNode::Leaf {
                leaf_name: leaf_name.to_string(),
                args,
            })
        }
        "Sequence" | "Selector" => {
            let Some(children) = value.get("children").and_then(Value::as_array) else {
                errors.push(format!("{node_type} node must have required property 'children'"));
                return None;
            };
            let compiled: Vec<CompiledNode> = children
                .iter()
                .filter_map(|child| compile_node(child, factory, errors, missing_leaves))
                .collect();
            if compiled.len() != children.len() {
                return None;
            }
            if node_type == "Sequence" {
                Some(CompiledNode::Sequence { children: compiled })
            } else {
                Some(CompiledNode::Selector { children: compiled })
            }
        }
        "Repeat.Until" => {
            let child_value = value.get("child")?;
            let child = compile_node(child_value, factory, errors, missing_leaves)?;
            let condition = compile_condition(value.get("condition"), errors)?;
            let Some(max_iterations) = value.get("maxIterations").and_then(Value::as_u64) else {
                errors.push("Repeat.Until node must have required property 'maxIterations'".to_string());
                return None;
            };
            Some(CompiledNode::RepeatUntil {
                child: Box::new(child),
                condition,
                max_iterations: max_iterations as u32,
            })
        }
        "Decorator.Timeout" => {
            let child_value = value.get("child")?;
            let child = compile_node(child_value, factory, errors, missing_leaves)?;
            let Some(timeout_ms) = value.get("timeoutMs").and_then(Value::as_u64) else {
                errors.push("Decorator.Timeout node must have required property 'timeoutMs'".to_string());
                return None;
            };
            Some(CompiledNode::DecoratorTimeout {
                child: Box::new(child),
                timeout_ms,
            })
        }
        "Decorator.FailOnTrue" => {
            let child_value = value.get("child")?;
            let child = compile_node(child_value, factory, errors, missing_leaves)?;
            let condition = compile_condition(value.get("condition"), errors)?;
            Some(CompiledNode::DecoratorFailOnTrue {
                child: Box::new(child),
                condition,
            })
        }
        _ => {
            errors.push("must be equal to constant".to_string());
            None
        }
    }
}

fn compile_condition(value: Option<&Value>, errors: &mut Vec<String>) -> Option<Condition> {
    let Some(value) = value else {
        errors.push("node must have required property 'condition'".to_string());
        return None;
    };
    let Some(name) = value.get("name").and_then(Value::as_str) else {
        errors.push("condition must have required property 'name'".to_string());
        return None;
    };
    let params = value.get("params").cloned().unwrap_or_else(|| Value::Object(Default::default()));
    Some(Condition {
        name: name.to_string(),
        params,
    })
}

/// Inline `args` defaults declared in the leaf's input schema
/// (`properties.<key>.default`) for any key the caller didn't supply.
fn merge_defaults(schema: &Value, provided: Value) -> Value {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return provided;
    };
    let mut merged = match provided {
        Value::Object(map) => map,
        other => {
            // Non-object args (rare) pass through untouched — defaults only
            // apply to object-shaped argument bundles.
            return other;
        }
    };
    for (key, property_schema) in properties {
        if merged.contains_key(key) {
            continue;
        }
        if let Some(default) = property_schema.get("default") {
            merged.insert(key.clone(), default.clone());
        }
    }
    Value::Object(merged)
}

/// Canonicalize `{type, sortedKeys, childHashes, args}` per node, excluding
/// `name`/`description`, and hash with SHA-256. `serde_json::Value`'s
/// default `Map` is a `BTreeMap` (no `preserve_order` feature enabled
/// anywhere in this workspace), so `serde_json::to_string` already emits
/// object keys in sorted order — canonicalization falls out of building the
/// `Value` tree and serializing it.
pub fn compute_tree_hash(root: &CompiledNode) -> String {
    let canonical = canonical_value(root);
    let serialized = serde_json::to_string(&canonical).expect("canonical value always serializes");
    let digest = Sha256::digest(serialized.as_bytes());
    hex::encode(digest)
}

fn canonical_value(node: &CompiledNode) -> Value {
    match node {
        CompiledNode::Leaf { leaf_name, args } => serde_json::json!({
            "type": "Leaf",
            "leafName": leaf_name,
            "args": args,
        }),
        CompiledNode::Sequence { children } => serde_json::json!({
            "type": "Sequence",
            "children": children.iter().map(canonical_value).collect::<Vec<_>>(),
        }),
        CompiledNode::Selector { children } => serde_json::json!({
            "type": "Selector",
            "children": children.iter().map(canonical_value).collect::<Vec<_>>(),
        }),
        CompiledNode::RepeatUntil {
            child,
            condition,
            max_iterations,
        } => serde_json::json!({
            "type": "Repeat.Until",
            "child": canonical_value(child),
            "condition": canonical_condition(condition),
            "maxIterations": max_iterations,
        }),
        CompiledNode::DecoratorTimeout { child, timeout_ms } => serde_json::json!({
            "type": "Decorator.Timeout",
            "child": canonical_value(child),
            "timeoutMs": timeout_ms,
        }),
        CompiledNode::DecoratorFailOnTrue { child, condition } => serde_json::json!({
            "type": "Decorator.FailOnTrue",
            "child": canonical_value(child),
            "condition": canonical_condition(condition),
        }),
    }
}

fn canonical_condition(condition: &Condition) -> Value {
    serde_json::json!({"name": condition.name, "params": condition.params})
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FakeFactory {
        known: Vec<&'static str>,
    }

    impl LeafFactory for FakeFactory {
        fn has_leaf(&self, name: &str) -> bool {
            self.known.contains(&name)
        }
        fn input_schema(&self, name: &str) -> Option<Value> {
            if name == "dig" {
                Some(json!({
                    "type": "object",
                    "properties": {"depth": {"type": "integer", "default": 1}}
                }))
            } else {
                None
            }
        }
    }

    fn factory() -> FakeFactory {
        FakeFactory {
            known: vec!["dig", "walk"],
        }
    }

    #[test]
    fn rejects_unknown_type() {
        let dsl = json!({"name": "t", "version": "1.0.0", "root": {"type": "Nonsense"}});
        let out = parse(&dsl, &factory());
        assert!(!out.valid);
        assert!(out.errors.unwrap().iter().any(|e| e.contains("must be equal to constant")));
    }

    #[test]
    fn rejects_unresolved_leaf() {
        let dsl = json!({"name": "t", "version": "1.0.0", "root": {"type": "Leaf", "leafName": "fly"}});
        let out = parse(&dsl, &factory());
        assert!(!out.valid);
        let errors = out.errors.unwrap();
        assert!(errors.iter().any(|e| e == "Missing leaves: fly"));
    }

    #[test]
    fn inlines_schema_defaults() {
        let dsl = json!({"name": "t", "version": "1.0.0", "root": {"type": "Leaf", "leafName": "dig"}});
        let out = parse(&dsl, &factory());
        assert!(out.valid);
        let compiled = out.compiled.unwrap();
        match compiled.root {
            CompiledNode::Leaf { args, .. } => assert_eq!(args["depth"], json!(1)),
            _ => panic!("expected leaf"),
        }
    }

    #[test]
    fn hash_excludes_name_and_description() {
        let a = json!({"name": "a", "version": "1.0.0", "root": {"type": "Leaf", "leafName": "walk"}});
        let b = json!({"name": "b", "version": "9.9.9", "description": "other", "root": {"type": "Leaf", "leafName": "walk"}});
        let ha = parse(&a, &factory()).tree_hash.unwrap();
        let hb = parse(&b, &factory()).tree_hash.unwrap();
        assert_eq!(ha, hb);
    }

    #[test]
    fn hash_differs_by_node_kind() {
        let seq = json!({"name": "a", "version": "1.0.0", "root": {"type": "Sequence", "children": [{"type": "Leaf", "leafName": "walk"}]}});
        let sel = json!({"name": "a", "version": "1.0.0", "root": {"type": "Selector", "children": [{"type": "Leaf", "leafName": "walk"}]}});
        let hseq = parse(&seq, &factory()).tree_hash.unwrap();
        let hsel = parse(&sel, &factory()).tree_hash.unwrap();
        assert_ne!(hseq, hsel);
    }

    #[test]
    fn hash_differs_by_args() {
        let a = json!({"name": "a", "version": "1.0.0", "root": {"type": "Leaf", "leafName": "dig", "args": {"depth": 1}}});
        let b = json!({"name": "a", "version": "1.0.0", "root": {"type": "Leaf", "leafName": "dig", "args": {"depth": 2}}});
        let ha = parse(&a, &factory()).tree_hash.unwrap();
        let hb = parse(&b, &factory()).tree_hash.unwrap();
        assert_ne!(ha, hb);
    }

    #[test]
    fn parse_is_pure_across_runs() {
        let dsl = json!({"name": "a", "version": "1.0.0", "root": {"type": "Leaf", "leafName": "walk"}});
        let h1 = parse(&dsl, &factory()).tree_hash.unwrap();
        let h2 = parse(&dsl, &factory()).tree_hash.unwrap();
        assert_eq!(h1, h2);
    }
}
