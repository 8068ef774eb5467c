//! Idle governor decision codes (spec.md §4.7). Emission and suppression
//! codes are disjoint by naming convention; a tick categorizes into exactly
//! one.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecisionCode {
    EmittedExecutable,
    EmittedBlocked,
    EmittedError,
    SuppressedInFlight,
    SuppressedLeaseCooldown,
    SuppressedHourlyCap,
    SuppressedPendingPlanning,
}

impl DecisionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmittedExecutable => "emitted_executable",
            Self::EmittedBlocked => "emitted_blocked",
            Self::EmittedError => "emitted_error",
            Self::SuppressedInFlight => "suppressed_in_flight",
            Self::SuppressedLeaseCooldown => "suppressed_lease_cooldown",
            Self::SuppressedHourlyCap => "suppressed_hourly_cap",
            Self::SuppressedPendingPlanning => "suppressed_pending_planning",
        }
    }

    pub fn is_emission(&self) -> bool {
        matches!(self, Self::EmittedExecutable | Self::EmittedBlocked | Self::EmittedError)
    }

    pub fn is_suppression(&self) -> bool {
        !self.is_emission()
    }
}

impl std::fmt::Display for DecisionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
