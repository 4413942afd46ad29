use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use quiz_core::time::{from_millis, to_millis};
use storage::repository::{DeadlineStore, StorageError};

/// Key prefix shared by every persisted question deadline.
pub const DEADLINE_KEY_PREFIX: &str = "deadline:";

/// Storage key for the deadline of question `index`.
#[must_use]
pub fn deadline_key(index: usize) -> String {
    format!("{DEADLINE_KEY_PREFIX}{index}")
}

/// Owns the per-question deadline map.
///
/// A deadline is created the first time its question becomes current and is
/// never extended afterwards, so leaving and re-entering a question (or
/// restarting the process) cannot buy extra time.
#[derive(Clone)]
pub struct TimerBinding {
    store: Arc<dyn DeadlineStore>,
    duration: Duration,
}

impl TimerBinding {
    #[must_use]
    pub fn new(store: Arc<dyn DeadlineStore>, duration: Duration) -> Self {
        Self { store, duration }
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Return the deadline for `index`, creating and persisting it on first use.
    ///
    /// A persisted deadline is returned unchanged even if it has passed.
    /// Missing, unreadable or corrupt values are replaced by `now + duration`.
    /// Never fails: a store that rejects the write still yields the fresh
    /// deadline for this process.
    pub async fn get_or_create_deadline(&self, index: usize, now: DateTime<Utc>) -> DateTime<Utc> {
        let key = deadline_key(index);
        if let Some(existing) = self.read_persisted(&key).await {
            tracing::debug!(index, deadline = %existing, "reusing persisted deadline");
            return existing;
        }

        let deadline = now + self.duration;
        if let Err(err) = self
            .store
            .put_value(&key, &to_millis(deadline).to_string())
            .await
        {
            tracing::warn!(index, error = %err, "could not persist question deadline");
        } else {
            tracing::debug!(index, deadline = %deadline, "created question deadline");
        }
        deadline
    }

    /// Erase every persisted deadline.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be cleared.
    pub async fn clear_all(&self) -> Result<u64, StorageError> {
        let removed = self.store.remove_prefix(DEADLINE_KEY_PREFIX).await?;
        tracing::debug!(removed, "cleared question deadlines");
        Ok(removed)
    }

    async fn read_persisted(&self, key: &str) -> Option<DateTime<Utc>> {
        let raw = match self.store.get_value(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(key, error = %err, "deadline lookup failed; starting fresh");
                return None;
            }
        };

        let parsed = raw.trim().parse::<i64>().ok().and_then(from_millis);
        if parsed.is_none() {
            tracing::warn!(key, raw = %raw, "ignoring corrupt persisted deadline");
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::countdown::remaining_secs;
    use quiz_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn binding(repo: &InMemoryRepository) -> TimerBinding {
        TimerBinding::new(Arc::new(repo.clone()), Duration::seconds(50))
    }

    #[tokio::test]
    async fn creates_once_and_reuses() {
        let repo = InMemoryRepository::new();
        let timer = binding(&repo);
        let now = fixed_now();

        let first = timer.get_or_create_deadline(0, now).await;
        let second = timer.get_or_create_deadline(0, now).await;
        assert_eq!(first, now + Duration::seconds(50));
        assert_eq!(first, second);

        let stored = repo.get_value("deadline:0").await.unwrap().unwrap();
        assert_eq!(stored, to_millis(first).to_string());
    }

    #[tokio::test]
    async fn reload_keeps_first_deadline() {
        let repo = InMemoryRepository::new();
        let start = fixed_now();
        let before = binding(&repo).get_or_create_deadline(1, start).await;

        // fresh binding over the same store, twenty seconds later
        let later = start + Duration::seconds(20);
        let after = binding(&repo).get_or_create_deadline(1, later).await;

        assert_eq!(before, after);
        assert_eq!(remaining_secs(later, after), 30);
    }

    #[tokio::test]
    async fn expired_deadline_is_not_resurrected() {
        let repo = InMemoryRepository::new();
        let timer = binding(&repo);
        let start = fixed_now();
        let deadline = timer.get_or_create_deadline(2, start).await;

        let much_later = start + Duration::minutes(10);
        let again = timer.get_or_create_deadline(2, much_later).await;
        assert_eq!(again, deadline);
        assert_eq!(remaining_secs(much_later, again), 0);
    }

    #[tokio::test]
    async fn corrupt_value_is_replaced() {
        let repo = InMemoryRepository::new();
        repo.put_value("deadline:3", "not-a-number").await.unwrap();
        let timer = binding(&repo);
        let now = fixed_now();

        let deadline = timer.get_or_create_deadline(3, now).await;
        assert_eq!(deadline, now + Duration::seconds(50));
        assert_eq!(
            repo.get_value("deadline:3").await.unwrap(),
            Some(to_millis(deadline).to_string())
        );
    }

    #[tokio::test]
    async fn clear_all_forgets_every_deadline() {
        let repo = InMemoryRepository::new();
        let timer = binding(&repo);
        let now = fixed_now();
        timer.get_or_create_deadline(0, now).await;
        timer.get_or_create_deadline(1, now).await;
        repo.put_value("unrelated", "x").await.unwrap();

        assert_eq!(timer.clear_all().await.unwrap(), 2);

        let later = now + Duration::seconds(5);
        assert_eq!(
            timer.get_or_create_deadline(0, later).await,
            later + Duration::seconds(50)
        );
        assert!(repo.get_value("unrelated").await.unwrap().is_some());
    }
}
