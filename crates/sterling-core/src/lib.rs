//! Shared types for the Sterling autonomy control plane.
//!
//! Every crate in the workspace depends on this one for identifiers, the
//! clock abstraction, the error taxonomy, and environment configuration.

pub mod clock;
pub mod config;
pub mod error;
pub mod ids;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::EnvConfig;
pub use error::{LeafErrorCode, SterlingError};
pub use ids::{LeafId, OptionId, TaskId};
