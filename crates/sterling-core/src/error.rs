//! Error taxonomy (spec.md §7) and the cross-cutting `SterlingError` type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The leaf error taxonomy, mirrored verbatim from spec.md §7 so that
/// callers on the other side of a transport boundary can switch on the
/// exact code string. Variants with a payload (`PostconditionFailed`,
/// `Unknown`) render their dotted/colon form via [`LeafErrorCode::code`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum LeafErrorCode {
    PathUnreachable,
    PathStuck,
    PathUnsafe,
    PlaceInvalidFace,
    PlaceSprawlLimit,
    DigTimeout,
    InventoryMissingItem,
    WorldInvalidPosition,
    WorldInsufficientMaterials,
    SenseApiError,
    SenseInvalidInput,
    ContainerUnsupported,
    ContainerNotImplemented,
    MovementTimeout,
    Aborted,
    MaxRetriesExceeded,
    /// `postcondition_failed:<op>` — never retryable (spec.md §7).
    PostconditionFailed(String),
    SleepNotNight,
    SleepFailed,
    CollectFailed,
    /// Reserved fallback for anything not in the taxonomy; normalization
    /// (spec.md §4.4) should have already mapped domain-specific reasons
    /// elsewhere, this is the leaf-error-level catch-all.
    Unknown(String),
}

impl LeafErrorCode {
    pub fn postcondition_failed(op: impl Into<String>) -> Self {
        Self::PostconditionFailed(op.into())
    }

    pub fn code(&self) -> String {
        match self {
            Self::PathUnreachable => "path.unreachable".into(),
            Self::PathStuck => "path.stuck".into(),
            Self::PathUnsafe => "path.unsafe".into(),
            Self::PlaceInvalidFace => "place.invalidFace".into(),
            Self::PlaceSprawlLimit => "place.sprawlLimit".into(),
            Self::DigTimeout => "dig.timeout".into(),
            Self::InventoryMissingItem => "inventory.missingItem".into(),
            Self::WorldInvalidPosition => "world.invalidPosition".into(),
            Self::WorldInsufficientMaterials => "world.insufficientMaterials".into(),
            Self::SenseApiError => "sense.apiError".into(),
            Self::SenseInvalidInput => "sense.invalidInput".into(),
            Self::ContainerUnsupported => "container.unsupported".into(),
            Self::ContainerNotImplemented => "container.notImplemented".into(),
            Self::MovementTimeout => "movement.timeout".into(),
            Self::Aborted => "aborted".into(),
            Self::MaxRetriesExceeded => "max_retries_exceeded".into(),
            Self::PostconditionFailed(op) => format!("postcondition_failed:{op}"),
            Self::SleepNotNight => "sleep.notNight".into(),
            Self::SleepFailed => "sleep.failed".into(),
            Self::CollectFailed => "collect.failed".into(),
            Self::Unknown(raw) => raw.clone(),
        }
    }

    /// Postcondition failures are non-retryable by design — they signal
    /// state desync, not contention (spec.md §7, §9).
    pub fn default_retryable(&self) -> bool {
        !matches!(
            self,
            Self::PostconditionFailed(_) | Self::Aborted | Self::MaxRetriesExceeded
        )
    }

    pub fn from_code(raw: &str) -> Self {
        match raw {
            "path.unreachable" => Self::PathUnreachable,
            "path.stuck" => Self::PathStuck,
            "path.unsafe" => Self::PathUnsafe,
            "place.invalidFace" => Self::PlaceInvalidFace,
            "place.sprawlLimit" => Self::PlaceSprawlLimit,
            "dig.timeout" => Self::DigTimeout,
            "inventory.missingItem" => Self::InventoryMissingItem,
            "world.invalidPosition" => Self::WorldInvalidPosition,
            "world.insufficientMaterials" => Self::WorldInsufficientMaterials,
            "sense.apiError" => Self::SenseApiError,
            "sense.invalidInput" => Self::SenseInvalidInput,
            "container.unsupported" => Self::ContainerUnsupported,
            "container.notImplemented" => Self::ContainerNotImplemented,
            "movement.timeout" => Self::MovementTimeout,
            "aborted" => Self::Aborted,
            "max_retries_exceeded" => Self::MaxRetriesExceeded,
            "sleep.notNight" => Self::SleepNotNight,
            "sleep.failed" => Self::SleepFailed,
            "collect.failed" => Self::CollectFailed,
            other => {
                if let Some(op) = other.strip_prefix("postcondition_failed:") {
                    Self::PostconditionFailed(op.to_string())
                } else {
                    Self::Unknown(other.to_string())
                }
            }
        }
    }
}

impl std::fmt::Display for LeafErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<LeafErrorCode> for String {
    fn from(code: LeafErrorCode) -> Self {
        code.code()
    }
}

impl TryFrom<String> for LeafErrorCode {
    type Error = std::convert::Infallible;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Ok(Self::from_code(&value))
    }
}

/// Cross-cutting error type for registry/lifecycle operations that are not
/// part of the leaf taxonomy. Public APIs use `thiserror`, never `anyhow`,
/// the way `agenticlaw_core::Error` does.
#[derive(Error, Debug)]
pub enum SterlingError {
    #[error("leaf validation failed: {0}")]
    InvalidLeaf(String),

    #[error("version_exists")]
    VersionExists,

    #[error("leaf not found: {0}")]
    LeafNotFound(String),

    #[error("bt compile error: {0}")]
    CompileError(String),

    #[error("option not found: {0}")]
    OptionNotFound(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("quota exceeded for {0}")]
    QuotaExceeded(String),

    #[error("reasoner error: {0}")]
    ReasonerError(String),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SterlingError>;
