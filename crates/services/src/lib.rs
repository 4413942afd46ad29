#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod quiz_service;
pub mod results;
pub mod sessions;
pub mod timer;

pub use quiz_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use error::{AppServicesError, QuizServiceError, ResultsError, SessionError};
pub use quiz_service::QuizService;
pub use results::{LeaderboardEntry, LeaderboardStats, LeaderboardSummary, ResultsService};
pub use timer::TimerBinding;

pub use sessions::{
    DriverOutcome, QuizLoopService, QuizSession, SessionCommand, SessionDriver, SessionEvent,
    SessionCheckpoint, SessionProgress, SessionSnapshot, SessionStatus, StepOutcome,
};
