//! Postcondition checks run after a leaf reports success, to catch a state
//! desync the leaf itself didn't notice (spec.md §4.7, §7). Modeled on
//! `sterling-bt`'s `ConditionRegistry` — a named-predicate registry keyed
//! by leaf, not by condition name, since the postcondition is a property
//! of the *step*, not of an author-chosen condition.

use async_trait::async_trait;
use serde_json::Value;
use sterling_leaves::LeafContext;

/// `true` means the postcondition held; `Err` names the failed operation
/// for `postcondition_failed:<op>` (spec.md §7 — always non-retryable).
#[async_trait]
pub trait PostconditionCheck: Send + Sync {
    async fn verify(&self, ctx: &dyn LeafContext, args: &Value) -> Result<(), String>;
}

/// Registry of per-leaf postcondition checks. Leaves with no registered
/// check are assumed to need none (most sensing/chat leaves have nothing
/// externally observable to verify).
#[derive(Default)]
pub struct PostconditionRegistry {
    checks: std::collections::HashMap<String, Box<dyn PostconditionCheck>>,
}

impl PostconditionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, leaf_name: impl Into<String>, check: Box<dyn PostconditionCheck>) {
        self.checks.insert(leaf_name.into(), check);
    }

    /// Returns `Ok(())` when there's nothing to verify, or the check
    /// passed. Returns `Err(op)` (the operation name for
    /// `postcondition_failed:<op>`) when registered and failed.
    pub async fn verify(&self, leaf_name: &str, ctx: &dyn LeafContext, args: &Value) -> Result<(), String> {
        match self.checks.get(leaf_name) {
            Some(check) => check.verify(ctx, args).await.map_err(|_| leaf_name.to_string()),
            None => Ok(()),
        }
    }
}

/// Verifies `equip`'s postcondition: the held item in the requested hand
/// matches `args.item` (spec.md §4.7's own example, `:equip_tool`).
pub struct EquipToolPostcondition;

#[async_trait]
impl PostconditionCheck for EquipToolPostcondition {
    async fn verify(&self, ctx: &dyn LeafContext, args: &Value) -> Result<(), String> {
        let wanted = args.get("item").and_then(Value::as_str).ok_or("equip_tool")?;
        let slot: sterling_leaves::world::Hand = match args.get("slot").and_then(Value::as_str) {
            Some("off_hand") => sterling_leaves::world::Hand::OffHand,
            _ => sterling_leaves::world::Hand::MainHand,
        };
        match ctx.held_item(slot).await {
            Some(item) if item.name == wanted => Ok(()),
            _ => Err("equip_tool".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, Ordering};
    use sterling_leaves::world::{BlockPos, Control, EntitySnapshot, FaceVec, Hand, InventoryItem, Position};
    use sterling_leaves::ActuatorResult;
    use tokio_util::sync::CancellationToken;

    struct FixedCtx {
        clock: AtomicI64,
        token: CancellationToken,
        held: Option<InventoryItem>,
    }

    #[async_trait]
    impl LeafContext for FixedCtx {
        fn now_ms(&self) -> i64 {
            self.clock.load(Ordering::SeqCst)
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
            self.held.iter().cloned().collect()
        }
        async fn held_item(&self, _hand: Hand) -> Option<InventoryItem> {
            self.held.clone()
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

    #[tokio::test]
    async fn matching_held_item_passes() {
        let ctx = FixedCtx {
            clock: AtomicI64::new(0),
            token: CancellationToken::new(),
            held: Some(InventoryItem {
                name: "diamond_pickaxe".to_string(),
                count: 1,
                slot: 0,
            }),
        };
        let mut registry = PostconditionRegistry::new();
        registry.register("equip", Box::new(EquipToolPostcondition));
        let args = json!({"item": "diamond_pickaxe", "slot": "main"});
        assert!(registry.verify("equip", &ctx, &args).await.is_ok());
    }

    #[tokio::test]
    async fn mismatched_held_item_fails_with_op_name() {
        let ctx = FixedCtx {
            clock: AtomicI64::new(0),
            token: CancellationToken::new(),
            held: Some(InventoryItem {
                name: "wooden_pickaxe".to_string(),
                count: 1,
                slot: 0,
            }),
        };
        let mut registry = PostconditionRegistry::new();
        registry.register("equip", Box::new(EquipToolPostcondition));
        let args = json!({"item": "diamond_pickaxe", "slot": "main"});
        let err = registry.verify("equip", &ctx, &args).await.unwrap_err();
        assert_eq!(err, "equip");
    }

    #[tokio::test]
    async fn leaf_with_no_registered_check_always_passes() {
        let ctx = FixedCtx {
            clock: AtomicI64::new(0),
            token: CancellationToken::new(),
            held: None,
        };
        let registry = PostconditionRegistry::new();
        assert!(registry.verify("chat", &ctx, &json!({})).await.is_ok());
    }
}
