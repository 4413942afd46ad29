use async_trait::async_trait;
use quiz_core::model::{Quiz, QuizId, QuizResult, ResultId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted result together with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResultRow {
    pub id: ResultId,
    pub result: QuizResult,
}

impl QuizResultRow {
    #[must_use]
    pub fn new(id: ResultId, result: QuizResult) -> Self {
        Self { id, result }
    }
}

/// Orders rows best first: higher percentage, more correct answers, earlier
/// completion, lower id.
pub fn leaderboard_order(a: &QuizResultRow, b: &QuizResultRow) -> std::cmp::Ordering {
    let (sa, sb) = (a.result.score(), b.result.score());
    sb.percentage()
        .cmp(&sa.percentage())
        .then_with(|| sb.correct().cmp(&sa.correct()))
        .then_with(|| a.result.completed_at().cmp(&b.result.completed_at()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Flat string key/value map used to survive restarts mid-session.
///
/// Values are stored as opaque strings; callers own their encoding and must
/// tolerate values they cannot parse.
#[async_trait]
pub trait DeadlineStore: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    async fn get_value(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or overwrite a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn put_value(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove every key starting with `prefix`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    async fn remove_prefix(&self, prefix: &str) -> Result<u64, StorageError>;
}

/// Repository contract for quizzes.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Insert a new quiz and return its assigned ID.
    ///
    /// The id carried by `quiz` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn insert_new_quiz(&self, quiz: &Quiz) -> Result<QuizId, StorageError>;

    /// Persist or replace a quiz under its own id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;

    /// Fetch a quiz by ID, `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError>;

    /// List quizzes ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn list_quizzes(&self, limit: u32) -> Result<Vec<Quiz>, StorageError>;

    /// Delete a quiz, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    async fn delete_quiz(&self, id: QuizId) -> Result<bool, StorageError>;
}

/// Repository contract for completed-session results.
#[async_trait]
pub trait QuizResultRepository: Send + Sync {
    /// Append a result and return its ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(&self, result: &QuizResult) -> Result<ResultId, StorageError>;

    /// Fetch a result by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: ResultId) -> Result<QuizResult, StorageError>;

    /// Best results for a quiz in [`leaderboard_order`].
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn list_top_results(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<QuizResultRow>, StorageError>;
}

#[derive(Default)]
struct Counters {
    quiz: u64,
    result: u64,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    quizzes: Arc<Mutex<BTreeMap<QuizId, Quiz>>>,
    results: Arc<Mutex<BTreeMap<ResultId, QuizResult>>>,
    values: Arc<Mutex<HashMap<String, String>>>,
    counters: Arc<Mutex<Counters>>,
}

fn poisoned<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeadlineStore for InMemoryRepository {
    async fn get_value(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.values.lock().map_err(poisoned)?;
        Ok(guard.get(key).cloned())
    }

    async fn put_value(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.values.lock().map_err(poisoned)?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<u64, StorageError> {
        let mut guard = self.values.lock().map_err(poisoned)?;
        let before = guard.len();
        guard.retain(|k, _| !k.starts_with(prefix));
        Ok(u64::try_from(before - guard.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn insert_new_quiz(&self, quiz: &Quiz) -> Result<QuizId, StorageError> {
        let id = {
            let mut counters = self.counters.lock().map_err(poisoned)?;
            counters.quiz += 1;
            QuizId::new(counters.quiz)
        };
        let mut guard = self.quizzes.lock().map_err(poisoned)?;
        guard.insert(id, quiz.clone().with_id(id));
        Ok(id)
    }

    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        {
            let mut counters = self.counters.lock().map_err(poisoned)?;
            counters.quiz = counters.quiz.max(quiz.id().value());
        }
        let mut guard = self.quizzes.lock().map_err(poisoned)?;
        guard.insert(quiz.id(), quiz.clone());
        Ok(())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_quizzes(&self, limit: u32) -> Result<Vec<Quiz>, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(guard.values().take(limit).cloned().collect())
    }

    async fn delete_quiz(&self, id: QuizId) -> Result<bool, StorageError> {
        let mut guard = self.quizzes.lock().map_err(poisoned)?;
        Ok(guard.remove(&id).is_some())
    }
}

#[async_trait]
impl QuizResultRepository for InMemoryRepository {
    async fn append_result(&self, result: &QuizResult) -> Result<ResultId, StorageError> {
        let id = {
            let mut counters = self.counters.lock().map_err(poisoned)?;
            counters.result += 1;
            ResultId::new(counters.result)
        };
        let mut guard = self.results.lock().map_err(poisoned)?;
        guard.insert(id, result.clone());
        Ok(id)
    }

    async fn get_result(&self, id: ResultId) -> Result<QuizResult, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_top_results(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<QuizResultRow>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let mut rows: Vec<_> = guard
            .iter()
            .filter(|(_, r)| r.quiz_id() == Some(quiz_id))
            .map(|(id, r)| QuizResultRow::new(*id, r.clone()))
            .collect();
        rows.sort_by(leaderboard_order);
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub results: Arc<dyn QuizResultRepository>,
    pub deadlines: Arc<dyn DeadlineStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
        let results: Arc<dyn QuizResultRepository> = Arc::new(repo.clone());
        let deadlines: Arc<dyn DeadlineStore> = Arc::new(repo);
        Self {
            quizzes,
            results,
            deadlines,
        }
    }
}
