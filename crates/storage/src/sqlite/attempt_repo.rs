use quiz_core::model::{AttemptResult, QuizId, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_attempt_row, quiz_id_to_i64, ser};
use crate::repository::{AttemptRepository, AttemptRow, StorageError};

const ATTEMPT_COLUMNS: &str = r"
    id, quiz_id, quiz_title, user_id, user_email, score,
    correct_answers, total_questions, answers, completed_at
";

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &AttemptResult) -> Result<i64, StorageError> {
        let answers = serde_json::to_string(attempt.answers()).map_err(ser)?;

        let res = sqlx::query(
            r"
                INSERT INTO attempts (
                    quiz_id, quiz_title, user_id, user_email, score,
                    correct_answers, total_questions, answers, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(quiz_id_to_i64(attempt.quiz_id())?)
        .bind(attempt.quiz_title())
        .bind(attempt.user_id().as_str())
        .bind(attempt.user_email())
        .bind(i64::from(attempt.score()))
        .bind(i64::from(attempt.correct_answers()))
        .bind(i64::from(attempt.total_questions()))
        .bind(answers)
        .bind(attempt.completed_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn get_attempt(&self, id: i64) -> Result<AttemptResult, StorageError> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        Ok(map_attempt_row(&row)?.attempt)
    }

    async fn list_attempts_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE user_id = ?1 \
             ORDER BY completed_at DESC, id DESC LIMIT ?2"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_str())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_attempt_row).collect()
    }

    async fn list_attempts_for_quiz(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE quiz_id = ?1 \
             ORDER BY completed_at DESC, id DESC LIMIT ?2"
        );
        let rows = sqlx::query(&sql)
            .bind(quiz_id_to_i64(quiz_id)?)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_attempt_row).collect()
    }
}
