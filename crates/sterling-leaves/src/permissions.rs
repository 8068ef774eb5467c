//! Permission allowlist (spec.md §3): every leaf declares the set of
//! actuator capabilities it needs, drawn from a fixed, closed set.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Movement,
    Dig,
    Place,
    Sense,
    Chat,
    #[serde(rename = "container.read")]
    ContainerRead,
    #[serde(rename = "container.write")]
    ContainerWrite,
}

impl Permission {
    pub const ALL: [Permission; 7] = [
        Permission::Movement,
        Permission::Dig,
        Permission::Place,
        Permission::Sense,
        Permission::Chat,
        Permission::ContainerRead,
        Permission::ContainerWrite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movement => "movement",
            Self::Dig => "dig",
            Self::Place => "place",
            Self::Sense => "sense",
            Self::Chat => "chat",
            Self::ContainerRead => "container.read",
            Self::ContainerWrite => "container.write",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == raw)
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
