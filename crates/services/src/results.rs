use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use quiz_core::model::{QuizId, QuizResult, Rating, ResultId};
use storage::repository::{QuizResultRepository, QuizResultRow};

use crate::error::ResultsError;

/// One ranked leaderboard line.
///
/// Presentation-agnostic: the caller formats names and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// One-based position; equal scores still get distinct ranks.
    pub rank: u32,
    pub result_id: ResultId,
    pub participant: Option<String>,
    pub class_name: Option<String>,
    pub correct: u32,
    pub total: u32,
    pub percentage: u32,
    pub rating: Rating,
    pub time_spent_secs: i64,
    pub completed_at: DateTime<Utc>,
}

impl LeaderboardEntry {
    fn from_row(rank: u32, row: &QuizResultRow) -> Self {
        let result = &row.result;
        let score = result.score();
        Self {
            rank,
            result_id: row.id,
            participant: result.participant().map(|p| p.name().to_owned()),
            class_name: result
                .participant()
                .and_then(|p| p.class_name())
                .map(str::to_owned),
            correct: score.correct(),
            total: score.total(),
            percentage: score.percentage(),
            rating: score.rating(),
            time_spent_secs: result.time_spent_secs(),
            completed_at: result.completed_at(),
        }
    }
}

/// Aggregate figures shown above a quiz's ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardStats {
    pub total_students: u32,
    pub total_questions: u32,
    pub highest_percentage: u32,
    pub lowest_percentage: u32,
    pub average_percentage: f64,
}

impl LeaderboardStats {
    /// `None` for an empty row set.
    #[must_use]
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a QuizResultRow>) -> Option<Self> {
        let mut count = 0_u32;
        let mut sum = 0_u64;
        let mut highest = 0_u32;
        let mut lowest = u32::MAX;
        let mut questions = 0_u32;
        for row in rows {
            let score = row.result.score();
            count = count.saturating_add(1);
            sum += u64::from(score.percentage());
            highest = highest.max(score.percentage());
            lowest = lowest.min(score.percentage());
            questions = questions.max(score.total());
        }
        if count == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let average = sum as f64 / f64::from(count);
        Some(Self {
            total_students: count,
            total_questions: questions,
            highest_percentage: highest,
            lowest_percentage: lowest,
            average_percentage: average,
        })
    }
}

/// Stats for every stored result of a quiz, overall and per class.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardSummary {
    pub overall: LeaderboardStats,
    /// Keyed by class name; results without a class only count overall.
    pub by_class: BTreeMap<String, LeaderboardStats>,
}

/// Read side of stored quiz results.
#[derive(Clone)]
pub struct ResultsService {
    results: Arc<dyn QuizResultRepository>,
}

impl ResultsService {
    #[must_use]
    pub fn new(results: Arc<dyn QuizResultRepository>) -> Self {
        Self { results }
    }

    /// Top results for a quiz, best first.
    ///
    /// # Errors
    ///
    /// Returns `ResultsError::Storage` if repository access fails.
    pub async fn leaderboard(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, ResultsError> {
        let rows = self.results.list_top_results(quiz_id, limit).await?;
        Ok(rows
            .iter()
            .zip(1_u32..)
            .map(|(row, rank)| LeaderboardEntry::from_row(rank, row))
            .collect())
    }

    /// Aggregate every stored result for a quiz; `None` before the first one.
    ///
    /// # Errors
    ///
    /// Returns `ResultsError::Storage` if repository access fails.
    pub async fn summary(&self, quiz_id: QuizId) -> Result<Option<LeaderboardSummary>, ResultsError> {
        let rows = self.results.list_top_results(quiz_id, u32::MAX).await?;
        let Some(overall) = LeaderboardStats::from_rows(&rows) else {
            return Ok(None);
        };

        let mut grouped: BTreeMap<String, Vec<&QuizResultRow>> = BTreeMap::new();
        for row in &rows {
            if let Some(class) = row.result.participant().and_then(|p| p.class_name()) {
                grouped.entry(class.to_owned()).or_default().push(row);
            }
        }
        let by_class = grouped
            .into_iter()
            .filter_map(|(class, rows)| {
                LeaderboardStats::from_rows(rows.into_iter()).map(|stats| (class, stats))
            })
            .collect();

        Ok(Some(LeaderboardSummary { overall, by_class }))
    }

    /// Fetch a single stored result.
    ///
    /// # Errors
    ///
    /// Returns `ResultsError::Storage` (including `NotFound`).
    pub async fn get_result(&self, id: ResultId) -> Result<QuizResult, ResultsError> {
        Ok(self.results.get_result(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{Participant, QuizScore};
    use quiz_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, StorageError};

    fn result(quiz: QuizId, name: &str, correct: u32, secs: i64) -> QuizResult {
        result_in(quiz, name, None, correct, secs)
    }

    fn result_in(
        quiz: QuizId,
        name: &str,
        class: Option<&str>,
        correct: u32,
        secs: i64,
    ) -> QuizResult {
        QuizResult::new(
            Some(quiz),
            Some(Participant::new(name, class.map(str::to_owned)).unwrap()),
            QuizScore::from_persisted(correct, 4 - correct, 4, correct * 25).unwrap(),
            vec![None; 4],
            fixed_now(),
            fixed_now() + Duration::seconds(secs),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn leaderboard_ranks_best_first() {
        let repo = InMemoryRepository::new();
        let quiz = QuizId::new(1);
        repo.append_result(&result(quiz, "Bo", 2, 40)).await.unwrap();
        repo.append_result(&result(quiz, "Al", 4, 90)).await.unwrap();
        repo.append_result(&result(quiz, "Cy", 2, 10)).await.unwrap();
        repo.append_result(&result(QuizId::new(2), "Zz", 4, 5))
            .await
            .unwrap();

        let svc = ResultsService::new(Arc::new(repo));
        let board = svc.leaderboard(quiz, 10).await.unwrap();

        let names: Vec<_> = board
            .iter()
            .map(|e| e.participant.as_deref().unwrap())
            .collect();
        assert_eq!(names, ["Al", "Cy", "Bo"]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].rating, Rating::Excellent);
        assert_eq!(board[2].rank, 3);
        assert_eq!(board[2].time_spent_secs, 40);
    }

    #[tokio::test]
    async fn summary_aggregates_all_results_and_classes() {
        let repo = InMemoryRepository::new();
        let quiz = QuizId::new(1);
        repo.append_result(&result_in(quiz, "Al", Some("5A"), 4, 30))
            .await
            .unwrap();
        repo.append_result(&result_in(quiz, "Bo", Some("5A"), 1, 30))
            .await
            .unwrap();
        repo.append_result(&result_in(quiz, "Cy", Some("5B"), 2, 30))
            .await
            .unwrap();
        repo.append_result(&result(quiz, "Di", 3, 30)).await.unwrap();
        repo.append_result(&result(QuizId::new(2), "Zz", 0, 5))
            .await
            .unwrap();

        let svc = ResultsService::new(Arc::new(repo));
        let summary = svc.summary(quiz).await.unwrap().unwrap();

        assert_eq!(summary.overall.total_students, 4);
        assert_eq!(summary.overall.total_questions, 4);
        assert_eq!(summary.overall.highest_percentage, 100);
        assert_eq!(summary.overall.lowest_percentage, 25);
        assert!((summary.overall.average_percentage - 62.5).abs() < f64::EPSILON);

        let classes: Vec<_> = summary.by_class.keys().map(String::as_str).collect();
        assert_eq!(classes, ["5A", "5B"]);
        let a = &summary.by_class["5A"];
        assert_eq!(a.total_students, 2);
        assert_eq!((a.highest_percentage, a.lowest_percentage), (100, 25));

        // ranking limit does not shrink the aggregates
        assert_eq!(svc.leaderboard(quiz, 1).await.unwrap().len(), 1);
        assert!(svc.summary(QuizId::new(3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_result_surfaces_not_found() {
        let svc = ResultsService::new(Arc::new(InMemoryRepository::new()));
        let err = svc.get_result(ResultId::new(9)).await.unwrap_err();
        assert!(matches!(err, ResultsError::Storage(StorageError::NotFound)));
    }
}
