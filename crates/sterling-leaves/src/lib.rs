//! Leaf contract and registry (spec.md §3, §4.1 — component C1).

pub mod context;
pub mod leaf;
pub mod permissions;
pub mod registry;
pub mod world;

pub use context::{ActuatorResult, LeafContext};
pub use leaf::{Leaf, LeafError, LeafMetrics, LeafResult};
pub use permissions::Permission;
pub use registry::{LeafRegistry, Provenance};
