//! Cheaply-cloneable identifiers, modeled on `agenticlaw_core::SessionKey`:
//! an `Arc<str>` wrapper so cloning an id never allocates.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

macro_rules! interned_id {
    ($name:ident) => {
        #[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(Arc::from(s.into()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

interned_id!(TaskId);
interned_id!(LeafName);

/// `name@version` identity for a registered option/skill.
interned_id!(OptionId);

impl OptionId {
    pub fn compose(name: &str, version: &str) -> Self {
        Self::new(format!("{name}@{version}"))
    }
}

/// `(name, version)` identity for a leaf. Two leaves with the same name and
/// different versions coexist in the registry (spec.md §3, Leaf invariant).
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct LeafId {
    pub name: LeafName,
    pub version: Arc<str>,
}

impl LeafId {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: LeafName::new(name.into()),
            version: Arc::from(version.into()),
        }
    }
}

impl std::fmt::Display for LeafId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Generate a short random-looking suffix for default task ids, the way the
/// teacher derives subagent names from a purpose hash
/// (`agenticlaw_agent::subagent::purpose_hash_name`).
pub fn new_task_id() -> TaskId {
    TaskId::new(uuid::Uuid::new_v4().to_string())
}
