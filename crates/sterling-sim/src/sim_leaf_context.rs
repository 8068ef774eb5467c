//! In-memory `LeafContext` for tests and the CLI demo (SPEC_FULL.md §6),
//! modeled on `agenticlaw_kg::resource::LocalFsDriver`: a trait boundary the
//! real system treats as opaque, backed here by a concrete in-process store
//! instead of a real voxel-world client.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sterling_core::Clock;
use sterling_leaves::world::{
    BlockPos, Control, EntitySnapshot, FaceVec, Hand, InventoryItem, Position,
};
use sterling_leaves::{ActuatorResult, LeafContext};
use sterling_core::LeafErrorCode;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug, Default)]
struct SimWorldState {
    position: Position,
    inventory: Vec<InventoryItem>,
    held_main_hand: Option<String>,
    held_off_hand: Option<String>,
    blocks: HashMap<BlockPos, String>,
    entities: Vec<EntitySnapshot>,
    time_of_day: u64,
    controls: HashMap<Control, bool>,
    chat_log: Vec<String>,
}

/// In-memory world a `sterling_leaves::Leaf` can run against without a real
/// game client attached. Interior state lives behind a `tokio::sync::Mutex`,
/// the same pattern `operator::mock_provider::MockProvider` uses for its
/// canned-response queue.
pub struct SimLeafContext {
    clock: Arc<dyn Clock>,
    token: CancellationToken,
    state: Mutex<SimWorldState>,
}

impl SimLeafContext {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            token: CancellationToken::new(),
            state: Mutex::new(SimWorldState::default()),
        }
    }

    pub async fn set_position(&self, position: Position) {
        self.state.lock().await.position = position;
    }

    pub async fn place_block_directly(&self, pos: BlockPos, block: impl Into<String>) {
        self.state.lock().await.blocks.insert(pos, block.into());
    }

    pub async fn add_inventory_item(&self, item: InventoryItem) {
        self.state.lock().await.inventory.push(item);
    }

    pub async fn set_time_of_day(&self, time_of_day: u64) {
        self.state.lock().await.time_of_day = time_of_day;
    }

    pub async fn spawn_entity(&self, entity: EntitySnapshot) {
        self.state.lock().await.entities.push(entity);
    }

    pub async fn chat_log(&self) -> Vec<String> {
        self.state.lock().await.chat_log.clone()
    }
}

#[async_trait]
impl LeafContext for SimLeafContext {
    fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    fn cancel_token(&self) -> CancellationToken {
        self.token.clone()
    }

    fn record_metric(&self, name: &str, value: f64) {
        tracing::debug!(metric = name, value, "sim: metric recorded");
    }

    fn record_error(&self, detail: &str) {
        tracing::warn!(detail, "sim: error recorded");
    }

    async fn position(&self) -> Position {
        self.state.lock().await.position
    }

    async fn inventory(&self) -> Vec<InventoryItem> {
        self.state.lock().await.inventory.clone()
    }

    async fn held_item(&self, hand: Hand) -> Option<InventoryItem> {
        let state = self.state.lock().await;
        let name = match hand {
            Hand::MainHand => state.held_main_hand.as_deref(),
            Hand::OffHand => state.held_off_hand.as_deref(),
        }?;
        state.inventory.iter().find(|item| item.name == name).cloned()
    }

    async fn block_at(&self, pos: BlockPos) -> Option<String> {
        self.state.lock().await.blocks.get(&pos).cloned()
    }

    async fn light_level(&self, _pos: BlockPos) -> u8 {
        15
    }

    async fn entities(&self) -> Vec<EntitySnapshot> {
        self.state.lock().await.entities.clone()
    }

    async fn time_of_day(&self) -> u64 {
        self.state.lock().await.time_of_day
    }

    async fn has_line_of_sight(&self, _target: Position) -> bool {
        true
    }

    async fn look_at(&self, position: Position) -> ActuatorResult<()> {
        self.state.lock().await.position = position;
        Ok(())
    }

    async fn set_control(&self, control: Control, active: bool) -> ActuatorResult<()> {
        self.state.lock().await.controls.insert(control, active);
        Ok(())
    }

    async fn attack(&self, entity_id: &str) -> ActuatorResult<()> {
        let mut state = self.state.lock().await;
        state.entities.retain(|e| e.id != entity_id);
        Ok(())
    }

    async fn dig(&self, pos: BlockPos) -> ActuatorResult<()> {
        let mut state = self.state.lock().await;
        if state.blocks.remove(&pos).is_none() {
            return Err(LeafErrorCode::WorldInvalidPosition);
        }
        Ok(())
    }

    /// Places at `ref_block + face`, per the convention `sterling_leaves`
    /// commits to at this boundary.
    async fn place_block(&self, ref_block: BlockPos, face: FaceVec) -> ActuatorResult<()> {
        let target = ref_block.offset(face);
        let mut state = self.state.lock().await;
        if state.blocks.contains_key(&target) {
            return Err(LeafErrorCode::PlaceInvalidFace);
        }
        state.blocks.insert(target, "placed_block".to_string());
        Ok(())
    }

    async fn equip(&self, item: &str, slot: Hand) -> ActuatorResult<()> {
        let mut state = self.state.lock().await;
        if !state.inventory.iter().any(|i| i.name == item) {
            return Err(LeafErrorCode::InventoryMissingItem);
        }
        match slot {
            Hand::MainHand => state.held_main_hand = Some(item.to_string()),
            Hand::OffHand => state.held_off_hand = Some(item.to_string()),
        }
        Ok(())
    }

    async fn activate_item(&self, _main_hand: bool) -> ActuatorResult<()> {
        Ok(())
    }

    async fn activate_block(&self, pos: BlockPos) -> ActuatorResult<()> {
        let state = self.state.lock().await;
        if !state.blocks.contains_key(&pos) {
            return Err(LeafErrorCode::WorldInvalidPosition);
        }
        Ok(())
    }

    async fn chat(&self, message: &str) -> ActuatorResult<()> {
        self.state.lock().await.chat_log.push(message.to_string());
        Ok(())
    }

    async fn sleep(&self, bed: BlockPos) -> ActuatorResult<()> {
        let state = self.state.lock().await;
        if !state.blocks.contains_key(&bed) {
            return Err(LeafErrorCode::WorldInvalidPosition);
        }
        // Minecraft night is roughly ticks 13000-23000 of a 24000-tick day.
        if !(13_000..23_000).contains(&state.time_of_day) {
            return Err(LeafErrorCode::SleepNotNight);
        }
        Ok(())
    }
}
