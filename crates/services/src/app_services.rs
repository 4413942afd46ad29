use std::sync::Arc;

use quiz_core::QuizSettings;
use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::quiz_service::QuizService;
use crate::results::ResultsService;
use crate::sessions::QuizLoopService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    quizzes: Arc<QuizService>,
    results: Arc<ResultsService>,
    session_loop: Arc<QuizLoopService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: QuizSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        tracing::debug!(db_url, "sqlite storage ready");
        Ok(Self::from_storage(&storage, clock, settings))
    }

    /// Build services over throwaway in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock, settings: QuizSettings) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, settings)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, settings: QuizSettings) -> Self {
        let quizzes = Arc::new(QuizService::new(clock, Arc::clone(&storage.quizzes)));
        let results = Arc::new(ResultsService::new(Arc::clone(&storage.results)));
        let session_loop = Arc::new(QuizLoopService::new(
            clock,
            settings,
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.results),
            Arc::clone(&storage.deadlines),
        ));
        Self {
            quizzes,
            results,
            session_loop,
        }
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn results(&self) -> Arc<ResultsService> {
        Arc::clone(&self.results)
    }

    #[must_use]
    pub fn session_loop(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.session_loop)
    }
}
