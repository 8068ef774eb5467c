//! Reactive Executor + Idle Governor (spec.md §4.7, §5 — component C7).

pub mod decision;
pub mod executor;
pub mod loop_breaker;
pub mod postcondition;
pub mod report;

pub use decision::DecisionCode;
pub use executor::{Executor, TickOutcome};
pub use loop_breaker::{LoopBreaker, LoopBreakerOutcome};
pub use postcondition::{EquipToolPostcondition, PostconditionCheck, PostconditionRegistry};
pub use report::{DispatchedStep, Execution, Expansion, GoldenRunReport, LoopEpisode, StepResult, TaskRef, ToolDiagnostics, VerificationStatus};
