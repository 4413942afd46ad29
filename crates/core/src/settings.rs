use chrono::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("seconds per question must be between 1 and 3600")]
    InvalidSecondsPerQuestion,

    #[error("grace period must be at most 10000 ms")]
    InvalidGracePeriod,

    #[error("tick interval must be between 10 and 60000 ms")]
    InvalidTickInterval,
}

/// Timing configuration for a quiz-taking session.
///
/// Only built through [`QuizSettings::new`] or `Default`, so every value is in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSettings {
    seconds_per_question: u32,
    grace_period_ms: u32,
    tick_interval_ms: u32,
}

impl QuizSettings {
    pub const DEFAULT_SECONDS_PER_QUESTION: u32 = 50;
    pub const DEFAULT_GRACE_PERIOD_MS: u32 = 1_000;
    pub const DEFAULT_TICK_INTERVAL_MS: u32 = 1_000;

    /// Creates validated settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if any value is outside its accepted range.
    pub fn new(
        seconds_per_question: u32,
        grace_period_ms: u32,
        tick_interval_ms: u32,
    ) -> Result<Self, SettingsError> {
        if !(1..=3_600).contains(&seconds_per_question) {
            return Err(SettingsError::InvalidSecondsPerQuestion);
        }
        if grace_period_ms > 10_000 {
            return Err(SettingsError::InvalidGracePeriod);
        }
        if !(10..=60_000).contains(&tick_interval_ms) {
            return Err(SettingsError::InvalidTickInterval);
        }

        Ok(Self {
            seconds_per_question,
            grace_period_ms,
            tick_interval_ms,
        })
    }

    #[must_use]
    pub fn seconds_per_question(&self) -> u32 {
        self.seconds_per_question
    }

    #[must_use]
    pub fn grace_period_ms(&self) -> u32 {
        self.grace_period_ms
    }

    #[must_use]
    pub fn tick_interval_ms(&self) -> u32 {
        self.tick_interval_ms
    }

    /// Time each question stays answerable.
    #[must_use]
    pub fn question_duration(&self) -> Duration {
        Duration::seconds(i64::from(self.seconds_per_question))
    }

    /// Pause between an expiry and the automatic transition it triggers.
    #[must_use]
    pub fn grace_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(u64::from(self.grace_period_ms))
    }

    #[must_use]
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(u64::from(self.tick_interval_ms))
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            seconds_per_question: Self::DEFAULT_SECONDS_PER_QUESTION,
            grace_period_ms: Self::DEFAULT_GRACE_PERIOD_MS,
            tick_interval_ms: Self::DEFAULT_TICK_INTERVAL_MS,
        }
    }
}
