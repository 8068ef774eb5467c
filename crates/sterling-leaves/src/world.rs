//! Typed shapes for the actuator/perception boundary (spec.md §6). These are
//! plain data — the voxel-world client that actually moves a body lives
//! outside this crate; `sterling-sim` provides an in-memory stand-in.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl BlockPos {
    pub fn offset(&self, face: FaceVec) -> Self {
        Self {
            x: self.x + face.dx,
            y: self.y + face.dy,
            z: self.z + face.dz,
        }
    }
}

/// Unit-ish vector identifying which face of a block was clicked.
/// `placeBlock(refBlock, faceVec)` places at `refBlock.position + faceVec`
/// (spec.md §6 — the core commits to this convention).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceVec {
    pub dx: i64,
    pub dy: i64,
    pub dz: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    pub count: u32,
    pub slot: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    Forward,
    Back,
    Left,
    Right,
    Jump,
    Sprint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hand {
    MainHand,
    OffHand,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: String,
    pub kind: String,
    pub position: Position,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub position: Position,
    pub inventory: Vec<InventoryItem>,
    pub held_main_hand: Option<String>,
    pub held_off_hand: Option<String>,
    pub entities: Vec<EntitySnapshot>,
    pub time_of_day: u64,
}
