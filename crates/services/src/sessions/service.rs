use chrono::{DateTime, Utc};
use std::fmt;

use quiz_core::time::{from_millis, to_millis};

use quiz_core::model::{
    AnswerSheet, Participant, Question, QuestionReview, Quiz, QuizId, QuizResult, QuizScore,
    ResultId, score,
};

use super::progress::SessionProgress;
use super::snapshot::SessionSnapshot;
use crate::error::SessionError;

//
// ─── STATES & OUTCOMES ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Completed,
}

/// What a transition request did.
///
/// `NeedsAnswer` is the "must answer first" signal: the gate was closed and
/// nothing changed. `NotAllowed` covers requests that can never succeed from
/// the current position (retreat on the first question, advance on the
/// last, anything after completion).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Advanced { index: usize },
    Retreated { index: usize },
    Completed { score: QuizScore },
    NeedsAnswer,
    NotAllowed,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One attempt at a quiz.
///
/// Steps through a fixed question list; every mutation goes through the
/// transition methods so the gates are evaluated in one place.
pub struct QuizSession {
    quiz_id: Option<QuizId>,
    participant: Option<Participant>,
    questions: Vec<Question>,
    current: usize,
    sheet: AnswerSheet,
    status: SessionStatus,
    score: Option<QuizScore>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    result_id: Option<ResultId>,
}

impl QuizSession {
    /// Create a session over an externally supplied question list.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no questions are provided.
    pub fn new(questions: Vec<Question>, started_at: DateTime<Utc>) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }

        Ok(Self {
            quiz_id: None,
            participant: None,
            sheet: AnswerSheet::new(questions.len()),
            questions,
            current: 0,
            status: SessionStatus::Active,
            score: None,
            started_at,
            completed_at: None,
            result_id: None,
        })
    }

    /// Create a session for a stored quiz.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the quiz has no questions.
    pub fn for_quiz(quiz: &Quiz, started_at: DateTime<Utc>) -> Result<Self, SessionError> {
        let mut session = Self::new(quiz.questions().to_vec(), started_at)?;
        session.quiz_id = Some(quiz.id());
        Ok(session)
    }

    /// Rebuild an unfinished session for `quiz` from a checkpoint.
    ///
    /// Answers are restored before expiries so a frozen slot keeps what it
    /// held when its time ran out.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StaleCheckpoint` when the snapshot belongs to
    /// another quiz or does not fit its question list.
    pub fn restore(quiz: &Quiz, snapshot: SessionSnapshot) -> Result<Self, SessionError> {
        let len = quiz.questions().len();
        let fits = snapshot.quiz_id == Some(quiz.id())
            && snapshot.answers.len() == len
            && snapshot.current < len
            && snapshot.expired.iter().all(|&i| i < len);
        let started_at = from_millis(snapshot.started_at);
        let (true, Some(started_at)) = (fits, started_at) else {
            return Err(SessionError::StaleCheckpoint);
        };

        let mut session = Self::for_quiz(quiz, started_at)?;
        for (index, answer) in snapshot.answers.into_iter().enumerate() {
            if let Some(answer) = answer {
                session.sheet.set_answer(index, answer);
            }
        }
        for index in snapshot.expired {
            session.sheet.mark_expired(index);
        }
        session.current = snapshot.current;
        session.participant = snapshot
            .participant
            .and_then(|name| Participant::new(name, snapshot.class_name).ok());
        Ok(session)
    }

    /// Checkpoint of the logical state; `None` once completed.
    #[must_use]
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        if self.is_complete() {
            return None;
        }
        Some(SessionSnapshot {
            quiz_id: self.quiz_id,
            participant: self.participant.as_ref().map(|p| p.name().to_owned()),
            class_name: self
                .participant
                .as_ref()
                .and_then(|p| p.class_name())
                .map(str::to_owned),
            current: self.current,
            answers: self.sheet.answers().to_vec(),
            expired: self.expired_indices(),
            started_at: to_millis(self.started_at),
        })
    }

    #[must_use]
    pub fn with_participant(mut self, participant: Option<Participant>) -> Self {
        self.participant = participant;
        self
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
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current + 1 == self.questions.len()
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<String>] {
        self.sheet.answers()
    }

    #[must_use]
    pub fn current_answer(&self) -> Option<&str> {
        self.sheet.answer(self.current)
    }

    #[must_use]
    pub fn is_expired(&self, index: usize) -> bool {
        self.sheet.is_expired(index)
    }

    #[must_use]
    pub fn expired_indices(&self) -> Vec<usize> {
        self.sheet.expired_indices().iter().copied().collect()
    }

    #[must_use]
    pub fn score(&self) -> Option<QuizScore> {
        self.score
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn result_id(&self) -> Option<ResultId> {
        self.result_id
    }

    pub(crate) fn set_result_id(&mut self, id: ResultId) {
        self.result_id = Some(id);
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            current: self.current,
            answered: self.sheet.answered_count(),
            expired: self.sheet.expired_indices().len(),
            is_complete: self.is_complete(),
        }
    }

    /// Record an answer for the current question.
    ///
    /// Returns `false` (and changes nothing) once the question has expired or
    /// the session is complete.
    pub fn select_answer(&mut self, value: impl Into<String>) -> bool {
        if self.is_complete() {
            return false;
        }
        self.sheet.set_answer(self.current, value)
    }

    /// Record the option at zero-based `option` for the current question.
    pub fn select_option(&mut self, option: usize) -> bool {
        let Some(value) = self.current_question().options().get(option).cloned() else {
            return false;
        };
        self.select_answer(value)
    }

    /// Record typed input for the current question.
    ///
    /// Text equal to one of the options wins over a position, so a question
    /// whose options are numbers still takes them literally. Otherwise a
    /// number in range picks that 1-based option, and anything else is kept
    /// as the answer verbatim.
    pub fn choose(&mut self, input: &str) -> bool {
        let input = input.trim();
        let options = self.current_question().options();
        let exact = options.iter().any(|o| o == input);
        let count = options.len();
        match input.parse::<usize>() {
            Ok(n) if !exact && (1..=count).contains(&n) => self.select_option(n - 1),
            _ => self.select_answer(input),
        }
    }

    fn gate_open(&self) -> bool {
        self.sheet.is_settled(self.current)
    }

    /// Move to the next question once the current one is answered or expired.
    pub fn advance(&mut self) -> StepOutcome {
        if self.is_complete() || self.is_last() {
            return StepOutcome::NotAllowed;
        }
        if !self.gate_open() {
            return StepOutcome::NeedsAnswer;
        }
        self.current += 1;
        tracing::debug!(index = self.current, "advanced");
        StepOutcome::Advanced {
            index: self.current,
        }
    }

    /// Move back one question. Never gated on an answer.
    pub fn retreat(&mut self) -> StepOutcome {
        if self.is_complete() || self.current == 0 {
            return StepOutcome::NotAllowed;
        }
        self.current -= 1;
        tracing::debug!(index = self.current, "retreated");
        StepOutcome::Retreated {
            index: self.current,
        }
    }

    /// Finish the session from the last question and compute the score.
    pub fn complete(&mut self, now: DateTime<Utc>) -> StepOutcome {
        if self.is_complete() || !self.is_last() {
            return StepOutcome::NotAllowed;
        }
        if !self.gate_open() {
            return StepOutcome::NeedsAnswer;
        }

        // non-empty by construction
        let Some(score) = score::finalize(&self.questions, self.sheet.answers()) else {
            return StepOutcome::NotAllowed;
        };
        self.sheet.freeze();
        self.score = Some(score);
        self.status = SessionStatus::Completed;
        self.completed_at = Some(now.max(self.started_at));
        tracing::info!(
            correct = score.correct(),
            total = score.total(),
            percentage = score.percentage(),
            "session completed"
        );
        StepOutcome::Completed { score }
    }

    /// Freeze the current question because its countdown hit zero.
    ///
    /// Returns `true` only for the first expiry of this question.
    pub fn expire_current(&mut self) -> bool {
        if self.is_complete() {
            return false;
        }
        let first = self.sheet.mark_expired(self.current);
        if first {
            tracing::debug!(index = self.current, "question expired");
        }
        first
    }

    /// Automatic follow-up to an expiry: advance, or complete on the last
    /// question. Does nothing unless the current question is expired.
    pub fn auto_progress(&mut self, now: DateTime<Utc>) -> StepOutcome {
        if self.is_complete() || !self.sheet.is_expired(self.current) {
            return StepOutcome::NotAllowed;
        }
        if self.is_last() {
            self.complete(now)
        } else {
            self.advance()
        }
    }

    /// Per-question breakdown, available once the session is complete.
    #[must_use]
    pub fn review(&self) -> Option<Vec<QuestionReview>> {
        self.is_complete()
            .then(|| score::review(&self.questions, self.sheet.answers()))
    }

    /// Package the completed session for the results collaborator.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotCompleted` before completion.
    pub fn build_result(&self) -> Result<QuizResult, SessionError> {
        let (Some(score), Some(completed_at)) = (self.score, self.completed_at) else {
            return Err(SessionError::NotCompleted);
        };
        Ok(QuizResult::new(
            self.quiz_id,
            self.participant.clone(),
            score,
            self.sheet.answers().to_vec(),
            self.started_at,
            completed_at,
        )?)
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("quiz_id", &self.quiz_id)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("expired", &self.sheet.expired_indices())
            .field("status", &self.status)
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .field("result_id", &self.result_id)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
