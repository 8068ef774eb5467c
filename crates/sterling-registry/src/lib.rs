//! Enhanced leaf/option registry and the dynamic option-creation flow
//! (spec.md §4.6 — component C6).

pub mod dynamic;
pub mod impasse;
pub mod option;
pub mod registry;

pub use dynamic::{DynamicCreationFlow, ProposalArtifact, ProposalHistoryEntry, ReasonerClient};
pub use impasse::{ImpasseCheck, ImpasseConfig, ImpasseState, ImpasseTracker};
pub use option::{OptionState, Quota, RegisteredOption, ShadowConfig, ShadowStats};
pub use registry::{EnhancedRegistry, RetirementEval};
