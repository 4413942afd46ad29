use quiz_core::model::{QuestionDraft, Quiz, QuizDraft, QuizId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, id_i64, quiz_id_from_i64, ser};
use crate::repository::{QuizRepository, StorageError};

fn questions_json(quiz: &Quiz) -> Result<String, StorageError> {
    let drafts: Vec<QuestionDraft> = quiz.questions().iter().map(|q| q.to_draft()).collect();
    serde_json::to_string(&drafts).map_err(ser)
}

fn map_quiz_row(row: &SqliteRow) -> Result<Quiz, StorageError> {
    let id = quiz_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let title: String = row.try_get("title").map_err(ser)?;
    let description: Option<String> = row.try_get("description").map_err(ser)?;
    let questions: String = row.try_get("questions").map_err(ser)?;
    let created_at = row.try_get("created_at").map_err(ser)?;
    let updated_at = row.try_get("updated_at").map_err(ser)?;

    let questions: Vec<QuestionDraft> = serde_json::from_str(&questions).map_err(ser)?;
    Quiz::from_persisted(
        id,
        QuizDraft {
            title,
            description,
            questions,
        },
        created_at,
        updated_at,
    )
    .map_err(ser)
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn insert_new_quiz(&self, quiz: &Quiz) -> Result<QuizId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO quizzes (title, description, questions, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(quiz.title())
        .bind(quiz.description())
        .bind(questions_json(quiz)?)
        .bind(quiz.created_at())
        .bind(quiz.updated_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        quiz_id_from_i64(res.last_insert_rowid())
    }

    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO quizzes (id, title, description, questions, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                questions = excluded.questions,
                updated_at = excluded.updated_at
            ",
        )
        .bind(id_i64("quiz_id", quiz.id().value())?)
        .bind(quiz.title())
        .bind(quiz.description())
        .bind(questions_json(quiz)?)
        .bind(quiz.created_at())
        .bind(quiz.updated_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, questions, created_at, updated_at
            FROM quizzes
            WHERE id = ?1
            ",
        )
        .bind(id_i64("quiz_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_quiz_row).transpose()
    }

    async fn list_quizzes(&self, limit: u32) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, questions, created_at, updated_at
            FROM quizzes
            ORDER BY id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_quiz_row).collect()
    }

    async fn delete_quiz(&self, id: QuizId) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM quizzes WHERE id = ?1")
            .bind(id_i64("quiz_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected() > 0)
    }
}
