//! Leaf registry (spec.md §4.1): `name -> (version -> leaf)`, append-only
//! except via explicit `clear()`, modeled on
//! `agenticlaw_tools::registry::ToolRegistry` but keyed by `(name, version)`
//! instead of name alone.

use crate::context::LeafContext;
use crate::leaf::{Leaf, LeafError, LeafMetrics, LeafResult};
use crate::permissions::Permission;
use chrono::{DateTime, TimeZone, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use sterling_core::error::{Result, SterlingError};
use sterling_core::LeafErrorCode;

/// Provenance recorded alongside a leaf registration (spec.md §3, carried
/// through from the enhanced registry — spec.md §4.6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Provenance {
    pub author: String,
    pub code_hash: String,
    pub created_at: DateTime<Utc>,
    pub metadata: Option<Value>,
}

impl Provenance {
    /// `now_ms` comes from the caller's [`sterling_core::Clock`] — provenance
    /// timestamps must replay deterministically like every other timestamp
    /// in this crate, never `Utc::now()`.
    pub fn new(author: impl Into<String>, code_hash: impl Into<String>, now_ms: i64) -> Self {
        Self {
            author: author.into(),
            code_hash: code_hash.into(),
            created_at: Utc.timestamp_millis_opt(now_ms).single().expect("now_ms out of chrono's representable range"),
            metadata: None,
        }
    }
}

struct Entry {
    leaf: Arc<dyn Leaf>,
    provenance: Option<Provenance>,
}

/// `registerLeaf` / `getLeaf` / `listLeaves` / `listNames` / `clear`
/// (spec.md §4.1).
#[derive(Default)]
pub struct LeafRegistry {
    leaves: BTreeMap<String, BTreeMap<String, Entry>>,
}

impl LeafRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the leaf (non-empty name, semver-shaped version,
    /// allowlisted permissions) and rejects `(name, version)` collisions
    /// with `SterlingError::VersionExists`.
    pub fn register_leaf(
        &mut self,
        leaf: Arc<dyn Leaf>,
        provenance: Option<Provenance>,
    ) -> Result<String> {
        let name = leaf.name().to_string();
        if name.trim().is_empty() {
            return Err(SterlingError::InvalidLeaf(
                "must have a valid name".into(),
            ));
        }
        let version = leaf.version().to_string();
        if !is_valid_semver(&version) {
            return Err(SterlingError::InvalidLeaf(
                "must have a valid version".into(),
            ));
        }
        for permission in leaf.permissions() {
            // `Permission` is already a closed enum at the Rust type level,
            // but a leaf constructed from a dynamic descriptor (e.g. a
            // proposed option's declared permissions) still needs this
            // check — see sterling-registry's proposal ingestion.
            if Permission::parse(permission.as_str()).is_none() {
                return Err(SterlingError::InvalidLeaf(format!(
                    "invalid permission: {permission}"
                )));
            }
        }

        let versions = self.leaves.entry(name.clone()).or_default();
        if versions.contains_key(&version) {
            return Err(SterlingError::VersionExists);
        }
        versions.insert(version.clone(), Entry { leaf, provenance });
        Ok(format!("{name}@{version}"))
    }

    /// Latest version is the lexicographically greatest version string
    /// (spec.md §4.1 invariant — deliberately string order, not semantic
    /// semver order, per the spec's own wording).
    pub fn get_leaf(&self, name: &str, version: Option<&str>) -> Option<Arc<dyn Leaf>> {
        let versions = self.leaves.get(name)?;
        match version {
            Some(v) => versions.get(v).map(|e| e.leaf.clone()),
            None => versions.values().last().map(|e| e.leaf.clone()),
        }
    }

    pub fn provenance_of(&self, name: &str, version: &str) -> Option<Provenance> {
        self.leaves.get(name)?.get(version)?.provenance.clone()
    }

    pub fn list_leaves(&self) -> Vec<Arc<dyn Leaf>> {
        self.leaves
            .values()
            .flat_map(|versions| versions.values().map(|e| e.leaf.clone()))
            .collect()
    }

    pub fn list_names(&self) -> Vec<String> {
        self.leaves.keys().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.leaves.clear();
    }

    /// Run a leaf with a timeout and panic guard — leaves never propagate a
    /// Rust panic across this boundary (spec.md §4.9/ambient error
    /// handling): a caught panic becomes a retryable failure, a caught
    /// timeout becomes a retryable `movement.timeout`-shaped failure.
    pub async fn dispatch(
        &self,
        name: &str,
        version: Option<&str>,
        ctx: &dyn LeafContext,
        args: Value,
    ) -> Result<LeafResult> {
        let leaf = self
            .get_leaf(name, version)
            .ok_or_else(|| SterlingError::LeafNotFound(name.to_string()))?;

        let start = ctx.now_ms();
        let timeout = std::time::Duration::from_millis(leaf.timeout_ms());
        let guarded = AssertUnwindSafe(leaf.run(ctx, args)).catch_unwind();

        let outcome = tokio::time::timeout(timeout, guarded).await;
        let duration_ms = (ctx.now_ms() - start).max(0) as u64;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(_panic)) => {
                tracing::warn!(leaf = name, "leaf panicked during run()");
                LeafResult::failure(
                    LeafError::new(
                        LeafErrorCode::Unknown("internal.panic".into()),
                        Some("leaf panicked during execution".to_string()),
                    )
                    .retryable(true),
                    LeafMetrics {
                        duration_ms,
                        retries: 0,
                        timeouts: 0,
                    },
                )
            }
            Err(_elapsed) => {
                tracing::warn!(leaf = name, timeout_ms = leaf.timeout_ms(), "leaf timed out");
                LeafResult::failure(
                    LeafError::new(
                        LeafErrorCode::MovementTimeout,
                        Some(format!("leaf {name} exceeded {}ms", leaf.timeout_ms())),
                    )
                    .retryable(true),
                    LeafMetrics {
                        duration_ms,
                        retries: 0,
                        timeouts: 1,
                    },
                )
            }
        };
        Ok(result)
    }
}

fn is_valid_semver(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ActuatorResult;
    use crate::world::{BlockPos, Control, EntitySnapshot, FaceVec, Hand, InventoryItem, Position};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, Ordering};
    use tokio_util::sync::CancellationToken;

    struct NoopCtx {
        clock: AtomicI64,
        token: CancellationToken,
    }

    impl NoopCtx {
        fn new() -> Self {
            Self {
                clock: AtomicI64::new(0),
                token: CancellationToken::new(),
            }
        }
    }

    #[async_trait]
    impl LeafContext for NoopCtx {
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

    struct EchoLeaf {
        version: String,
        timeout_ms: u64,
        panics: bool,
    }

    #[async_trait]
    impl Leaf for EchoLeaf {
        fn name(&self) -> &str {
            "echo"
        }
        fn version(&self) -> &str {
            &self.version
        }
        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }
        fn permissions(&self) -> &[Permission] {
            &[Permission::Sense]
        }
        fn timeout_ms(&self) -> u64 {
            self.timeout_ms
        }
        async fn run(&self, _ctx: &dyn LeafContext, args: Value) -> LeafResult {
            if self.panics {
                panic!("boom");
            }
            if self.timeout_ms == 1 {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
            LeafResult::success(args, LeafMetrics::default())
        }
    }

    fn leaf(version: &str) -> Arc<dyn Leaf> {
        Arc::new(EchoLeaf {
            version: version.to_string(),
            timeout_ms: 30_000,
            panics: false,
        })
    }

    #[test]
    fn register_rejects_version_collision() {
        let mut reg = LeafRegistry::new();
        reg.register_leaf(leaf("1.0.0"), None).unwrap();
        let err = reg.register_leaf(leaf("1.0.0"), None).unwrap_err();
        assert!(matches!(err, SterlingError::VersionExists));
    }

    #[test]
    fn register_rejects_invalid_version() {
        let mut reg = LeafRegistry::new();
        let err = reg.register_leaf(leaf("not-semver"), None).unwrap_err();
        assert!(matches!(err, SterlingError::InvalidLeaf(_)));
    }

    #[test]
    fn two_versions_coexist_latest_is_lexicographic() {
        let mut reg = LeafRegistry::new();
        reg.register_leaf(leaf("1.0.0"), None).unwrap();
        reg.register_leaf(leaf("2.0.0"), None).unwrap();
        assert_eq!(reg.get_leaf("echo", Some("1.0.0")).unwrap().version(), "1.0.0");
        assert_eq!(reg.get_leaf("echo", None).unwrap().version(), "2.0.0");
    }

    #[test]
    fn clear_then_reregister_succeeds() {
        let mut reg = LeafRegistry::new();
        reg.register_leaf(leaf("1.0.0"), None).unwrap();
        reg.clear();
        assert!(reg.list_names().is_empty());
        reg.register_leaf(leaf("1.0.0"), None).unwrap();
        assert_eq!(reg.list_names(), vec!["echo".to_string()]);
    }

    #[tokio::test]
    async fn dispatch_times_out() {
        let mut reg = LeafRegistry::new();
        reg.register_leaf(
            Arc::new(EchoLeaf {
                version: "1.0.0".into(),
                timeout_ms: 1,
                panics: false,
            }),
            None,
        )
        .unwrap();
        let ctx = NoopCtx::new();
        let result = reg
            .dispatch("echo", None, &ctx, json!({}))
            .await
            .unwrap();
        assert!(!result.is_success());
        assert!(result.is_retryable());
    }

    #[tokio::test]
    async fn dispatch_catches_panic() {
        let mut reg = LeafRegistry::new();
        reg.register_leaf(
            Arc::new(EchoLeaf {
                version: "1.0.0".into(),
                timeout_ms: 30_000,
                panics: true,
            }),
            None,
        )
        .unwrap();
        let ctx = NoopCtx::new();
        let result = reg
            .dispatch("echo", None, &ctx, json!({}))
            .await
            .unwrap();
        assert!(!result.is_success());
        assert!(result.is_retryable());
    }
}
