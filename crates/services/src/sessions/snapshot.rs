use std::sync::Arc;

use quiz_core::model::QuizId;
use serde::{Deserialize, Serialize};
use storage::repository::{DeadlineStore, StorageError};

/// Key under which the in-progress session is checkpointed.
pub const SESSION_STATE_KEY: &str = "session:state";

/// Logical state of an unfinished session, enough to pick it up after a
/// restart. Restored through [`super::QuizSession::restore`], which checks it
/// against the quiz before trusting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub quiz_id: Option<QuizId>,
    pub participant: Option<String>,
    pub class_name: Option<String>,
    pub current: usize,
    pub answers: Vec<Option<String>>,
    pub expired: Vec<usize>,
    /// Unix millis.
    pub started_at: i64,
}

/// Reads and writes the single session checkpoint.
///
/// Shares the deadline store; like deadlines, a checkpoint that cannot be
/// read or decoded is treated as absent.
#[derive(Clone)]
pub struct SessionCheckpoint {
    store: Arc<dyn DeadlineStore>,
}

impl SessionCheckpoint {
    #[must_use]
    pub fn new(store: Arc<dyn DeadlineStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Option<SessionSnapshot> {
        let raw = match self.store.get_value(SESSION_STATE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(error = %err, "session checkpoint lookup failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring corrupt session checkpoint");
                None
            }
        }
    }

    /// Overwrite the checkpoint. Failures are logged, never returned.
    pub async fn save(&self, snapshot: &SessionSnapshot) {
        let raw = match serde_json::to_string(snapshot) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(error = %err, "could not encode session checkpoint");
                return;
            }
        };
        if let Err(err) = self.store.put_value(SESSION_STATE_KEY, &raw).await {
            tracing::warn!(error = %err, "could not persist session checkpoint");
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be reached.
    pub async fn discard(&self) -> Result<u64, StorageError> {
        self.store.remove_prefix(SESSION_STATE_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            quiz_id: Some(QuizId::new(4)),
            participant: Some("Ada".into()),
            class_name: None,
            current: 1,
            answers: vec![Some("a".into()), None],
            expired: vec![1],
            started_at: 1_700_000_000_000,
        }
    }

    #[tokio::test]
    async fn saved_checkpoint_loads_back() {
        let repo = InMemoryRepository::new();
        let checkpoint = SessionCheckpoint::new(Arc::new(repo.clone()));
        assert_eq!(checkpoint.load().await, None);

        checkpoint.save(&snapshot()).await;
        assert_eq!(checkpoint.load().await, Some(snapshot()));

        assert_eq!(checkpoint.discard().await.unwrap(), 1);
        assert_eq!(checkpoint.load().await, None);
    }

    #[tokio::test]
    async fn garbage_reads_as_absent() {
        let repo = InMemoryRepository::new();
        repo.put_value(SESSION_STATE_KEY, "{not json").await.unwrap();
        let checkpoint = SessionCheckpoint::new(Arc::new(repo));
        assert_eq!(checkpoint.load().await, None);
    }
}
