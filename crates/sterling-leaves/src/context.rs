//! `LeafContext` — the opaque handle leaves use to reach the actuator and
//! the rest of the process (spec.md §3). The core treats it purely as an
//! interface; concrete bindings to a world (or a test double) live outside
//! this crate, the same way `agenticlaw_kg::ResourceDriver` is a trait with
//! swappable backends.

use crate::world::{BlockPos, Control, EntitySnapshot, FaceVec, Hand, InventoryItem, Position};
use sterling_core::LeafErrorCode;
use tokio_util::sync::CancellationToken;

pub type ActuatorResult<T> = Result<T, LeafErrorCode>;

#[async_trait::async_trait]
pub trait LeafContext: Send + Sync {
    /// Current time, in milliseconds. Leaves must never call `SystemTime`
    /// directly so tests can drive them with a `FakeClock`-backed context.
    fn now_ms(&self) -> i64;

    /// One cancellation token per top-level execution (spec.md §5). Leaves
    /// observe it cooperatively and return promptly with `aborted` when
    /// tripped.
    fn cancel_token(&self) -> CancellationToken;

    fn record_metric(&self, name: &str, value: f64);
    fn record_error(&self, detail: &str);

    // --- reads ---
    async fn position(&self) -> Position;
    async fn inventory(&self) -> Vec<InventoryItem>;
    async fn held_item(&self, hand: Hand) -> Option<InventoryItem>;
    async fn block_at(&self, pos: BlockPos) -> Option<String>;
    async fn light_level(&self, pos: BlockPos) -> u8;
    async fn entities(&self) -> Vec<EntitySnapshot>;
    async fn time_of_day(&self) -> u64;
    async fn has_line_of_sight(&self, target: Position) -> bool;

    // --- writes ---
    async fn look_at(&self, pos: Position) -> ActuatorResult<()>;
    async fn set_control(&self, control: Control, active: bool) -> ActuatorResult<()>;
    async fn attack(&self, entity_id: &str) -> ActuatorResult<()>;
    async fn dig(&self, pos: BlockPos) -> ActuatorResult<()>;
    /// Places at `ref_block + face` (spec.md §6 convention).
    async fn place_block(&self, ref_block: BlockPos, face: FaceVec) -> ActuatorResult<()>;
    async fn equip(&self, item: &str, slot: Hand) -> ActuatorResult<()>;
    async fn activate_item(&self, main_hand: bool) -> ActuatorResult<()>;
    async fn activate_block(&self, pos: BlockPos) -> ActuatorResult<()>;
    async fn chat(&self, message: &str) -> ActuatorResult<()>;
    async fn sleep(&self, bed: BlockPos) -> ActuatorResult<()>;
}
