use std::sync::Arc;

use quiz_core::QuizSettings;
use quiz_core::countdown::CountdownWatch;
use quiz_core::model::{Participant, Quiz, QuizId, ResultId};
use storage::repository::{DeadlineStore, QuizRepository, QuizResultRepository};
use tokio::task::JoinHandle;

use super::service::QuizSession;
use super::snapshot::SessionCheckpoint;
use crate::Clock;
use crate::error::SessionError;
use crate::timer::TimerBinding;

/// Orchestrates session start, per-question timers and result persistence.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    settings: QuizSettings,
    quizzes: Arc<dyn QuizRepository>,
    results: Arc<dyn QuizResultRepository>,
    timer: TimerBinding,
    checkpoint: SessionCheckpoint,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: QuizSettings,
        quizzes: Arc<dyn QuizRepository>,
        results: Arc<dyn QuizResultRepository>,
        deadlines: Arc<dyn DeadlineStore>,
    ) -> Self {
        Self {
            clock,
            settings,
            quizzes,
            results,
            timer: TimerBinding::new(Arc::clone(&deadlines), settings.question_duration()),
            checkpoint: SessionCheckpoint::new(deadlines),
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn settings(&self) -> QuizSettings {
        self.settings
    }

    #[must_use]
    pub fn timer(&self) -> &TimerBinding {
        &self.timer
    }

    /// Start a fresh attempt: forget every stored deadline and any saved
    /// session, then load the quiz.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::QuizNotFound` for unknown ids, `SessionError::Empty`
    /// for a quiz without questions, or `SessionError::Storage`.
    pub async fn start_session(
        &self,
        quiz_id: QuizId,
        participant: Option<Participant>,
    ) -> Result<QuizSession, SessionError> {
        self.reset().await?;
        let quiz = self.load_quiz(quiz_id).await?;
        let session = QuizSession::for_quiz(&quiz, self.clock.now())?.with_participant(participant);
        tracing::info!(
            quiz_id = %quiz_id,
            questions = session.total_questions(),
            "session started"
        );
        Ok(session)
    }

    /// Pick up where the last run of this quiz stopped.
    ///
    /// Restores position, answers, expiries and start time from the saved
    /// checkpoint, and keeps stored deadlines so time spent before a restart
    /// still counts. Without a usable checkpoint the quiz opens at the first
    /// question. A `participant` given here replaces the saved one.
    ///
    /// # Errors
    ///
    /// Same as [`Self::start_session`].
    pub async fn resume_session(
        &self,
        quiz_id: QuizId,
        participant: Option<Participant>,
    ) -> Result<QuizSession, SessionError> {
        let quiz = self.load_quiz(quiz_id).await?;
        if let Some(snapshot) = self.checkpoint.load().await {
            match QuizSession::restore(&quiz, snapshot) {
                Ok(restored) => {
                    let session = match participant {
                        Some(p) => restored.with_participant(Some(p)),
                        None => restored,
                    };
                    tracing::info!(
                        quiz_id = %quiz_id,
                        index = session.current_index(),
                        "session resumed"
                    );
                    return Ok(session);
                }
                Err(err) => tracing::warn!(error = %err, "ignoring saved session"),
            }
        }

        let session = QuizSession::for_quiz(&quiz, self.clock.now())?.with_participant(participant);
        tracing::info!(quiz_id = %quiz_id, "no saved session, starting at the first question");
        Ok(session)
    }

    async fn load_quiz(&self, quiz_id: QuizId) -> Result<Quiz, SessionError> {
        self.quizzes
            .get_quiz(quiz_id)
            .await?
            .ok_or(SessionError::QuizNotFound)
    }

    /// Persist the session's logical state, or drop it once completed.
    ///
    /// Never fails; a lost checkpoint only costs the ability to resume.
    pub async fn checkpoint(&self, session: &QuizSession) {
        match session.snapshot() {
            Some(snapshot) => self.checkpoint.save(&snapshot).await,
            None => {
                if let Err(err) = self.checkpoint.discard().await {
                    tracing::warn!(error = %err, "could not drop session checkpoint");
                }
            }
        }
    }

    /// Clear all timer state and the saved session so the next attempt
    /// starts from full time. Returns how many stored entries were removed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the deadline store cannot be cleared.
    pub async fn reset(&self) -> Result<u64, SessionError> {
        let removed = self.timer.clear_all().await? + self.checkpoint.discard().await?;
        tracing::info!(removed, "session state reset");
        Ok(removed)
    }

    /// Bind a countdown to the session's current question.
    pub async fn arm_current(&self, session: &QuizSession) -> CountdownWatch {
        let index = session.current_index();
        let deadline = self
            .timer
            .get_or_create_deadline(index, self.clock.now())
            .await;
        CountdownWatch::new(index, deadline)
    }

    /// Persist the completed session's result once.
    ///
    /// Returns the stored id; a second call returns the same id without
    /// writing again.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotCompleted` before completion or
    /// `SessionError::Storage` if the append fails.
    pub async fn submit_result(&self, session: &mut QuizSession) -> Result<ResultId, SessionError> {
        if let Some(id) = session.result_id() {
            return Ok(id);
        }
        let result = session.build_result()?;
        let id = self.results.append_result(&result).await?;
        session.set_result_id(id);
        tracing::info!(result_id = %id, "result submitted");
        Ok(id)
    }

    /// Hand the completed result to the results store without waiting.
    ///
    /// Failures are logged and never reopen the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotCompleted` before completion.
    pub fn submit_in_background(
        &self,
        session: &QuizSession,
    ) -> Result<JoinHandle<Option<ResultId>>, SessionError> {
        let result = session.build_result()?;
        let results = Arc::clone(&self.results);
        Ok(tokio::spawn(async move {
            match results.append_result(&result).await {
                Ok(id) => {
                    tracing::info!(result_id = %id, "result submitted");
                    Some(id)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "result submission failed");
                    None
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{QuestionDraft, QuizDraft};
    use quiz_core::time::fixed_now;
    use crate::sessions::SESSION_STATE_KEY;
    use storage::repository::InMemoryRepository;

    async fn setup(clock: Clock) -> (QuizLoopService, InMemoryRepository, QuizId) {
        let repo = InMemoryRepository::new();
        let draft = QuizDraft {
            title: "Planets".into(),
            description: None,
            questions: (0..2)
                .map(|i| QuestionDraft {
                    text: format!("Q{i}"),
                    options: vec!["a".into(), "b".into()],
                    correct_answer: "a".into(),
                })
                .collect(),
        };
        let quiz = Quiz::new(QuizId::new(0), draft, fixed_now()).unwrap();
        let id = repo.insert_new_quiz(&quiz).await.unwrap();
        let service = QuizLoopService::new(
            clock,
            QuizSettings::default(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        (service, repo, id)
    }

    #[tokio::test]
    async fn unknown_quiz_is_reported() {
        let (service, _repo, _id) = setup(Clock::fixed(fixed_now())).await;
        let err = service
            .start_session(QuizId::new(99), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::QuizNotFound));
    }

    #[tokio::test]
    async fn start_clears_deadlines_but_resume_keeps_them() {
        let (service, repo, id) = setup(Clock::fixed(fixed_now())).await;
        repo.put_value("deadline:0", "1").await.unwrap();

        let resumed = service.resume_session(id, None).await.unwrap();
        let watch = service.arm_current(&resumed).await;
        assert_eq!(watch.deadline().timestamp_millis(), 1);

        let fresh = service.start_session(id, None).await.unwrap();
        let watch = service.arm_current(&fresh).await;
        assert_eq!(watch.deadline(), fixed_now() + Duration::seconds(50));
    }

    #[tokio::test]
    async fn resume_restores_checkpointed_session() {
        let (service, repo, id) = setup(Clock::fixed(fixed_now())).await;
        let participant = Participant::new("Ada", None).unwrap();
        let mut session = service.start_session(id, Some(participant)).await.unwrap();
        session.select_answer("a");
        session.advance();
        service.checkpoint(&session).await;

        let later = QuizLoopService::new(
            Clock::fixed(fixed_now() + Duration::minutes(5)),
            QuizSettings::default(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        let resumed = later.resume_session(id, None).await.unwrap();
        assert_eq!(resumed.current_index(), 1);
        assert_eq!(resumed.answers(), &[Some("a".to_owned()), None]);
        assert_eq!(resumed.started_at(), fixed_now());
        assert_eq!(resumed.participant().unwrap().name(), "Ada");

        // a fresh start forgets the checkpoint
        let fresh = later.start_session(id, None).await.unwrap();
        assert_eq!(fresh.current_index(), 0);
        let reopened = later.resume_session(id, None).await.unwrap();
        assert_eq!(reopened.current_index(), 0);
        assert_eq!(reopened.answers(), &[None, None]);
    }

    #[tokio::test]
    async fn completion_drops_checkpoint() {
        let (service, repo, id) = setup(Clock::fixed(fixed_now())).await;
        let mut session = service.start_session(id, None).await.unwrap();
        session.select_answer("a");
        service.checkpoint(&session).await;
        assert!(repo.get_value(SESSION_STATE_KEY).await.unwrap().is_some());

        session.advance();
        session.select_answer("a");
        session.complete(fixed_now());
        service.checkpoint(&session).await;
        assert!(repo.get_value(SESSION_STATE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn submit_result_is_idempotent() {
        let (service, repo, id) = setup(Clock::fixed(fixed_now())).await;
        let mut session = service.start_session(id, None).await.unwrap();
        assert!(matches!(
            service.submit_result(&mut session).await,
            Err(SessionError::NotCompleted)
        ));

        session.select_answer("a");
        session.advance();
        session.select_answer("b");
        session.complete(fixed_now());

        let first = service.submit_result(&mut session).await.unwrap();
        let second = service.submit_result(&mut session).await.unwrap();
        assert_eq!(first, second);

        let rows = repo.list_top_results(id, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].result.score().percentage(), 50);
    }

    #[tokio::test]
    async fn background_submission_reports_id() {
        let (service, repo, id) = setup(Clock::fixed(fixed_now())).await;
        let mut session = service.start_session(id, None).await.unwrap();
        session.expire_current();
        session.auto_progress(fixed_now());
        session.expire_current();
        session.auto_progress(fixed_now());
        assert!(session.is_complete());

        let handle = service.submit_in_background(&session).unwrap();
        let stored = handle.await.unwrap().unwrap();
        assert_eq!(repo.get_result(stored).await.unwrap().score().skipped(), 2);
    }
}
