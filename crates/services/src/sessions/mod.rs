mod driver;
mod progress;
mod service;
mod snapshot;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use driver::{DriverOutcome, SessionCommand, SessionDriver, SessionEvent};
pub use progress::SessionProgress;
pub use service::{QuizSession, SessionStatus, StepOutcome};
pub use snapshot::{SESSION_STATE_KEY, SessionCheckpoint, SessionSnapshot};
pub use workflow::QuizLoopService;
