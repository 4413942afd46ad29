use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuizId;
use crate::model::question::{Question, QuestionDraft, QuestionError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("quiz needs at least one question")]
    NoQuestions,

    #[error("question {index} is invalid: {source}")]
    InvalidQuestion {
        index: usize,
        #[source]
        source: QuestionError,
    },

    #[error("updated_at is before created_at")]
    InvalidTimeRange,
}

/// Author input for creating or replacing a quiz.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub questions: Vec<QuestionDraft>,
}

/// Validated title, description and questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidQuiz {
    pub title: String,
    pub description: Option<String>,
    pub questions: Vec<Question>,
}

impl QuizDraft {
    /// Validate title and every question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyTitle`, `QuizError::NoQuestions`, or
    /// `QuizError::InvalidQuestion` naming the first offending question.
    pub fn validate(self) -> Result<ValidQuiz, QuizError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if self.questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }

        let questions = self
            .questions
            .into_iter()
            .enumerate()
            .map(|(index, draft)| {
                draft
                    .validate()
                    .map_err(|source| QuizError::InvalidQuestion { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let description = self
            .description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(ValidQuiz {
            title,
            description,
            questions,
        })
    }
}

/// A persisted quiz: a titled, ordered, non-empty list of questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    title: String,
    description: Option<String>,
    questions: Vec<Question>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Quiz {
    /// Build a new quiz from author input.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the draft does not validate.
    pub fn new(id: QuizId, draft: QuizDraft, created_at: DateTime<Utc>) -> Result<Self, QuizError> {
        let valid = draft.validate()?;
        Ok(Self {
            id,
            title: valid.title,
            description: valid.description,
            questions: valid.questions,
            created_at,
            updated_at: created_at,
        })
    }

    /// Rehydrate a quiz from storage.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the stored data no longer validates or the
    /// timestamps are out of order.
    pub fn from_persisted(
        id: QuizId,
        draft: QuizDraft,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        if updated_at < created_at {
            return Err(QuizError::InvalidTimeRange);
        }
        let mut quiz = Self::new(id, draft, created_at)?;
        quiz.updated_at = updated_at;
        Ok(quiz)
    }

    /// Replace title, description and questions, keeping id and creation time.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the draft does not validate; the quiz is left
    /// unchanged in that case.
    pub fn replace(&mut self, draft: QuizDraft, updated_at: DateTime<Utc>) -> Result<(), QuizError> {
        let valid = draft.validate()?;
        self.title = valid.title;
        self.description = valid.description;
        self.questions = valid.questions;
        self.updated_at = updated_at.max(self.created_at);
        Ok(())
    }

    /// Returns the same quiz under a storage-assigned id.
    #[must_use]
    pub fn with_id(mut self, id: QuizId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn to_draft(&self) -> QuizDraft {
        QuizDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            questions: self.questions.iter().map(Question::to_draft).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn draft(title: &str, count: usize) -> QuizDraft {
        QuizDraft {
            title: title.to_owned(),
            description: Some("  ".to_owned()),
            questions: (0..count)
                .map(|i| QuestionDraft {
                    text: format!("Q{i}"),
                    options: vec!["yes".into(), "no".into()],
                    correct_answer: "yes".into(),
                })
                .collect(),
        }
    }

    #[test]
    fn builds_quiz_and_drops_blank_description() {
        let quiz = Quiz::new(QuizId::new(1), draft("Rust basics", 3), fixed_now()).unwrap();
        assert_eq!(quiz.title(), "Rust basics");
        assert_eq!(quiz.description(), None);
        assert_eq!(quiz.questions().len(), 3);
        assert_eq!(quiz.created_at(), quiz.updated_at());
    }

    #[test]
    fn rejects_missing_title_or_questions() {
        assert_eq!(
            Quiz::new(QuizId::new(1), draft(" ", 1), fixed_now()),
            Err(QuizError::EmptyTitle)
        );
        assert_eq!(
            Quiz::new(QuizId::new(1), draft("t", 0), fixed_now()),
            Err(QuizError::NoQuestions)
        );
    }

    #[test]
    fn reports_index_of_invalid_question() {
        let mut d = draft("t", 3);
        d.questions[2].correct_answer = "maybe".into();
        let err = Quiz::new(QuizId::new(1), d, fixed_now()).unwrap_err();
        assert_eq!(
            err,
            QuizError::InvalidQuestion {
                index: 2,
                source: QuestionError::CorrectAnswerNotAnOption,
            }
        );
    }

    #[test]
    fn replace_keeps_identity_and_bumps_updated_at() {
        let mut quiz = Quiz::new(QuizId::new(7), draft("old", 1), fixed_now()).unwrap();
        let later = fixed_now() + Duration::minutes(5);
        quiz.replace(draft("new", 2), later).unwrap();

        assert_eq!(quiz.id(), QuizId::new(7));
        assert_eq!(quiz.title(), "new");
        assert_eq!(quiz.questions().len(), 2);
        assert_eq!(quiz.updated_at(), later);

        assert!(quiz.replace(draft("", 1), later).is_err());
        assert_eq!(quiz.title(), "new");
    }
}
