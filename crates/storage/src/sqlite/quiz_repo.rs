use quiz_core::model::{Quiz, QuizId};

use super::SqliteRepository;
use super::mapping::{conn, map_quiz_row, quiz_id_to_i64, ser};
use crate::repository::{QuestionRecord, QuizRecord, QuizRepository, StorageError};

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let record = QuizRecord::from_quiz(quiz);
        let questions: &[QuestionRecord] = &record.questions;
        let questions_json = serde_json::to_string(questions).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO quizzes (id, title, description, questions, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                questions = excluded.questions
            ",
        )
        .bind(quiz_id_to_i64(record.id)?)
        .bind(record.title)
        .bind(record.description)
        .bind(questions_json)
        .bind(record.created_by.as_str())
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, questions, created_by, created_at
            FROM quizzes
            WHERE id = ?1
            ",
        )
        .bind(quiz_id_to_i64(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_quiz_row(&row)?.into_quiz().map_err(ser)
    }

    async fn list_quizzes(&self, limit: u32) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, questions, created_by, created_at
            FROM quizzes
            ORDER BY created_at DESC, id DESC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| map_quiz_row(row)?.into_quiz().map_err(ser))
            .collect()
    }
}
