use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::QuizId;
use crate::model::score::QuizScore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizResultError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("{answers} answers recorded for {total} questions")]
    AnswerCountMismatch { total: u32, answers: usize },

    #[error("participant name cannot be empty")]
    EmptyParticipantName,
}

/// Who took the quiz, as entered on the start screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    name: String,
    class_name: Option<String>,
}

impl Participant {
    /// # Errors
    ///
    /// Returns `QuizResultError::EmptyParticipantName` for a blank name.
    pub fn new(
        name: impl Into<String>,
        class_name: Option<String>,
    ) -> Result<Self, QuizResultError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(QuizResultError::EmptyParticipantName);
        }
        let class_name = class_name
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());
        Ok(Self { name, class_name })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }
}

/// What a completed session hands to the results collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    quiz_id: Option<QuizId>,
    participant: Option<Participant>,
    score: QuizScore,
    answers: Vec<Option<String>>,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl QuizResult {
    /// # Errors
    ///
    /// Returns `QuizResultError` if timestamps are out of order or the answer
    /// list does not have one slot per question.
    pub fn new(
        quiz_id: Option<QuizId>,
        participant: Option<Participant>,
        score: QuizScore,
        answers: Vec<Option<String>>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, QuizResultError> {
        if completed_at < started_at {
            return Err(QuizResultError::InvalidTimeRange);
        }
        if usize::try_from(score.total()).ok() != Some(answers.len()) {
            return Err(QuizResultError::AnswerCountMismatch {
                total: score.total(),
                answers: answers.len(),
            });
        }
        Ok(Self {
            quiz_id,
            participant,
            score,
            answers,
            started_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn quiz_id(&self) -> Option<QuizId> {
        self.quiz_id
    }

    #[must_use]
    pub fn participant(&self) -> Option<&Participant> {
        self.participant.as_ref()
    }

    #[must_use]
    pub fn score(&self) -> QuizScore {
        self.score
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<String>] {
        &self.answers
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Seconds between start and completion.
    #[must_use]
    pub fn time_spent_secs(&self) -> i64 {
        (self.completed_at - self.started_at).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn participant_trims_and_drops_blank_class() {
        let p = Participant::new("  Ada ", Some(" ".into())).unwrap();
        assert_eq!(p.name(), "Ada");
        assert_eq!(p.class_name(), None);
        assert_eq!(
            Participant::new("", None),
            Err(QuizResultError::EmptyParticipantName)
        );
    }

    #[test]
    fn result_requires_one_answer_per_question() {
        let score = QuizScore::from_persisted(1, 0, 2, 50).unwrap();
        let now = fixed_now();
        let err = QuizResult::new(None, None, score, vec![Some("a".into())], now, now).unwrap_err();
        assert_eq!(
            err,
            QuizResultError::AnswerCountMismatch {
                total: 2,
                answers: 1
            }
        );

        let ok = QuizResult::new(
            Some(QuizId::new(3)),
            None,
            score,
            vec![Some("a".into()), None],
            now,
            now + Duration::seconds(90),
        )
        .unwrap();
        assert_eq!(ok.time_spent_secs(), 90);
    }

    #[test]
    fn result_rejects_reversed_times() {
        let score = QuizScore::from_persisted(0, 0, 1, 0).unwrap();
        let now = fixed_now();
        assert_eq!(
            QuizResult::new(None, None, score, vec![None], now, now - Duration::seconds(1)),
            Err(QuizResultError::InvalidTimeRange)
        );
    }
}
