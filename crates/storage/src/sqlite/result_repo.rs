use quiz_core::model::{Participant, QuizId, QuizResult, QuizScore, ResultId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, id_i64, quiz_id_from_i64, result_id_from_i64, ser, u32_from_i64};
use crate::repository::{QuizResultRepository, QuizResultRow, StorageError};

fn map_result_row(row: &SqliteRow) -> Result<QuizResult, StorageError> {
    let quiz_id = row
        .try_get::<Option<i64>, _>("quiz_id")
        .map_err(ser)?
        .map(quiz_id_from_i64)
        .transpose()?;
    let participant_name: Option<String> = row.try_get("participant_name").map_err(ser)?;
    let class_name: Option<String> = row.try_get("class_name").map_err(ser)?;
    let correct = u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?;
    let incorrect = u32_from_i64("incorrect", row.try_get::<i64, _>("incorrect").map_err(ser)?)?;
    let total = u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?;
    let percentage = u32_from_i64(
        "percentage",
        row.try_get::<i64, _>("percentage").map_err(ser)?,
    )?;
    let answers: String = row.try_get("answers").map_err(ser)?;
    let started_at = row.try_get("started_at").map_err(ser)?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;

    let participant = participant_name
        .map(|name| Participant::new(name, class_name))
        .transpose()
        .map_err(ser)?;
    let score = QuizScore::from_persisted(correct, incorrect, total, percentage).map_err(ser)?;
    let answers: Vec<Option<String>> = serde_json::from_str(&answers).map_err(ser)?;

    QuizResult::new(quiz_id, participant, score, answers, started_at, completed_at).map_err(ser)
}

fn map_result_row_with_id(row: &SqliteRow) -> Result<QuizResultRow, StorageError> {
    let id = result_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    Ok(QuizResultRow::new(id, map_result_row(row)?))
}

#[async_trait::async_trait]
impl QuizResultRepository for SqliteRepository {
    async fn append_result(&self, result: &QuizResult) -> Result<ResultId, StorageError> {
        let quiz_id = result
            .quiz_id()
            .map(|id| id_i64("quiz_id", id.value()))
            .transpose()?;
        let score = result.score();
        let answers = serde_json::to_string(result.answers()).map_err(ser)?;

        let res = sqlx::query(
            r"
                INSERT INTO quiz_results (
                    quiz_id, participant_name, class_name,
                    correct, incorrect, total, percentage,
                    answers, started_at, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(quiz_id)
        .bind(result.participant().map(Participant::name))
        .bind(result.participant().and_then(Participant::class_name))
        .bind(i64::from(score.correct()))
        .bind(i64::from(score.incorrect()))
        .bind(i64::from(score.total()))
        .bind(i64::from(score.percentage()))
        .bind(answers)
        .bind(result.started_at())
        .bind(result.completed_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        result_id_from_i64(res.last_insert_rowid())
    }

    async fn get_result(&self, id: ResultId) -> Result<QuizResult, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    quiz_id, participant_name, class_name,
                    correct, incorrect, total, percentage,
                    answers, started_at, completed_at
                FROM quiz_results
                WHERE id = ?1
            ",
        )
        .bind(id_i64("result_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_result_row(&row)
    }

    async fn list_top_results(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<QuizResultRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, quiz_id, participant_name, class_name,
                    correct, incorrect, total, percentage,
                    answers, started_at, completed_at
                FROM quiz_results
                WHERE quiz_id = ?1
                ORDER BY percentage DESC, correct DESC, completed_at ASC, id ASC
                LIMIT ?2
            ",
        )
        .bind(id_i64("quiz_id", quiz_id.value())?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_result_row_with_id(&row)?);
        }

        Ok(out)
    }
}
