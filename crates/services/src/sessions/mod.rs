mod drill;
mod plan;
mod workflow;

// Public API of the drill subsystem.
pub use crate::error::SessionError;
pub use drill::{DrillSession, SessionProgress};
pub use plan::SessionPlan;
pub use workflow::{SessionAnswerResult, SessionConfig, SessionLoopService};
