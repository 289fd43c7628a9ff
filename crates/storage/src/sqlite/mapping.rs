use quiz_core::model::{AttemptResult, QuizId, UserId};
use sqlx::Row;

use crate::repository::{AttemptRow, QuestionRecord, QuizRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn quiz_id_to_i64(id: QuizId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("quiz_id overflow".into()))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    u64::try_from(v)
        .map(QuizId::new)
        .map_err(|_| StorageError::Serialization(format!("invalid quiz_id: {v}")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_quiz_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuizRecord, StorageError> {
    let questions_json: String = row.try_get("questions").map_err(ser)?;
    let questions: Vec<QuestionRecord> = serde_json::from_str(&questions_json).map_err(ser)?;

    Ok(QuizRecord {
        id: quiz_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        questions,
        created_by: UserId::new(row.try_get::<String, _>("created_by").map_err(ser)?),
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<AttemptRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let score = u8::try_from(row.try_get::<i64, _>("score").map_err(ser)?)
        .map_err(|_| StorageError::Serialization("invalid score".into()))?;
    let answers_json: String = row.try_get("answers").map_err(ser)?;
    let answers: Vec<Option<usize>> = serde_json::from_str(&answers_json).map_err(ser)?;

    let attempt = AttemptResult::from_persisted(
        quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?,
        row.try_get("quiz_title").map_err(ser)?,
        UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        row.try_get("user_email").map_err(ser)?,
        score,
        u32_from_i64(
            "correct_answers",
            row.try_get::<i64, _>("correct_answers").map_err(ser)?,
        )?,
        u32_from_i64(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
        answers,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)?;

    Ok(AttemptRow::new(id, attempt))
}
