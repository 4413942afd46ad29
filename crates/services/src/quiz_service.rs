use std::sync::Arc;

use quiz_core::model::{Quiz, QuizDraft, QuizId};
use storage::repository::QuizRepository;

use crate::Clock;
use crate::error::QuizServiceError;

/// Orchestrates quiz creation, editing and persistence.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
}

impl QuizService {
    #[must_use]
    pub fn new(clock: Clock, quizzes: Arc<dyn QuizRepository>) -> Self {
        Self { clock, quizzes }
    }

    /// Validate and persist a new quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` for validation failures.
    /// Returns `QuizServiceError::Storage` if persistence fails.
    pub async fn create_quiz(&self, draft: QuizDraft) -> Result<QuizId, QuizServiceError> {
        let quiz = Quiz::new(QuizId::new(0), draft, self.clock.now())?;
        let id = self.quizzes.insert_new_quiz(&quiz).await?;
        tracing::info!(quiz_id = %id, title = quiz.title(), "quiz created");
        Ok(id)
    }

    /// Parse a quiz document and persist it.
    ///
    /// Accepts the JSON shape used by quiz files:
    /// `{ "title", "description"?, "questions": [{ "question", "options", "answer" }] }`.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Parse` for malformed JSON, otherwise as
    /// [`Self::create_quiz`].
    pub async fn import_json(&self, raw: &str) -> Result<QuizId, QuizServiceError> {
        let draft: QuizDraft = serde_json::from_str(raw)?;
        self.create_quiz(draft).await
    }

    /// Fetch a quiz by ID.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` for unknown ids.
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn get_quiz(&self, id: QuizId) -> Result<Quiz, QuizServiceError> {
        self.quizzes
            .get_quiz(id)
            .await?
            .ok_or(QuizServiceError::NotFound)
    }

    /// List quizzes ordered by ID, up to the given limit.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn list_quizzes(&self, limit: u32) -> Result<Vec<Quiz>, QuizServiceError> {
        Ok(self.quizzes.list_quizzes(limit).await?)
    }

    /// Replace a quiz's content, keeping its id and creation time.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound`, `QuizServiceError::Quiz` or
    /// `QuizServiceError::Storage`.
    pub async fn update_quiz(&self, id: QuizId, draft: QuizDraft) -> Result<Quiz, QuizServiceError> {
        let mut quiz = self.get_quiz(id).await?;
        quiz.replace(draft, self.clock.now())?;
        self.quizzes.upsert_quiz(&quiz).await?;
        tracing::info!(quiz_id = %id, "quiz updated");
        Ok(quiz)
    }

    /// Delete a quiz. Stored results keep their scores but lose the link.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` if nothing was deleted.
    pub async fn delete_quiz(&self, id: QuizId) -> Result<(), QuizServiceError> {
        if !self.quizzes.delete_quiz(id).await? {
            return Err(QuizServiceError::NotFound);
        }
        tracing::info!(quiz_id = %id, "quiz deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{QuestionDraft, QuizError};
    use quiz_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn service(clock: Clock) -> QuizService {
        QuizService::new(clock, Arc::new(InMemoryRepository::new()))
    }

    fn draft(title: &str) -> QuizDraft {
        QuizDraft {
            title: title.into(),
            description: None,
            questions: vec![QuestionDraft {
                text: "2 + 2?".into(),
                options: vec!["3".into(), "4".into()],
                correct_answer: "4".into(),
            }],
        }
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let svc = service(Clock::fixed(fixed_now()));
        let err = svc.create_quiz(draft("   ")).await.unwrap_err();
        assert!(matches!(err, QuizServiceError::Quiz(QuizError::EmptyTitle)));
    }

    #[tokio::test]
    async fn import_json_accepts_quiz_file_shape() {
        let svc = service(Clock::fixed(fixed_now()));
        let raw = r#"{
            "title": "Rivers",
            "questions": [
                { "question": "Longest river?", "options": ["Nile", "Thames"], "answer": "Nile" }
            ]
        }"#;

        let id = svc.import_json(raw).await.unwrap();
        let quiz = svc.get_quiz(id).await.unwrap();
        assert_eq!(quiz.title(), "Rivers");
        assert_eq!(quiz.questions()[0].correct_answer(), "Nile");
    }

    #[tokio::test]
    async fn import_json_reports_parse_errors() {
        let svc = service(Clock::fixed(fixed_now()));
        let err = svc.import_json("{ not json").await.unwrap_err();
        assert!(matches!(err, QuizServiceError::Parse(_)));
    }

    #[tokio::test]
    async fn update_keeps_created_at() {
        let mut clock = Clock::fixed(fixed_now());
        let svc = service(clock);
        let id = svc.create_quiz(draft("Math")).await.unwrap();

        clock.advance(Duration::hours(2));
        let svc = QuizService::new(clock, Arc::clone(&svc.quizzes));
        let updated = svc.update_quiz(id, draft("Math II")).await.unwrap();
        assert_eq!(updated.title(), "Math II");
        assert_eq!(updated.created_at(), fixed_now());
        assert_eq!(updated.updated_at(), fixed_now() + Duration::hours(2));
    }

    #[tokio::test]
    async fn delete_missing_quiz_is_not_found() {
        let svc = service(Clock::fixed(fixed_now()));
        let id = svc.create_quiz(draft("Temp")).await.unwrap();
        svc.delete_quiz(id).await.unwrap();
        assert!(matches!(
            svc.delete_quiz(id).await,
            Err(QuizServiceError::NotFound)
        ));
        assert!(svc.list_quizzes(10).await.unwrap().is_empty());
    }
}
