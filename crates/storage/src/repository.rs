use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{AttemptResult, Question, Quiz, QuizError, QuizId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
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

/// Persisted shape of a question inside a quiz document.
///
/// Field names follow the stored document (`question`, `options`, `correctAnswer`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
}

impl QuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            question: question.text().to_owned(),
            options: question.options().to_vec(),
            correct_answer: question.correct_option(),
        }
    }
}

/// Persisted shape for a quiz.
///
/// Mirrors the domain `Quiz` so repositories can store documents written by
/// other clients and still validate them on the way back in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRecord {
    pub id: QuizId,
    pub title: String,
    pub description: Option<String>,
    pub questions: Vec<QuestionRecord>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl QuizRecord {
    #[must_use]
    pub fn from_quiz(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id(),
            title: quiz.title().to_owned(),
            description: quiz.description().map(ToOwned::to_owned),
            questions: quiz.questions().iter().map(QuestionRecord::from_question).collect(),
            created_by: quiz.created_by().clone(),
            created_at: quiz.created_at(),
        }
    }

    /// Convert the record back into a domain `Quiz`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the stored document violates quiz invariants
    /// (no questions, fewer than two options, correct index out of range).
    pub fn into_quiz(self) -> Result<Quiz, QuizError> {
        let questions = self
            .questions
            .into_iter()
            .enumerate()
            .map(|(i, q)| Question::new(i, q.question, q.options, q.correct_answer))
            .collect::<Result<Vec<_>, _>>()?;

        Quiz::new(
            self.id,
            self.title,
            self.description,
            questions,
            self.created_by,
            self.created_at,
        )
    }
}

/// A persisted attempt together with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRow {
    pub id: i64,
    pub attempt: AttemptResult,
}

impl AttemptRow {
    #[must_use]
    pub fn new(id: i64, attempt: AttemptResult) -> Self {
        Self { id, attempt }
    }
}

/// Repository contract for quiz definitions.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Persist or replace a quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;

    /// Fetch a quiz by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or `Serialization` if the
    /// stored document is not a valid quiz.
    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError>;

    /// List quizzes, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_quizzes(&self, limit: u32) -> Result<Vec<Quiz>, StorageError>;
}

/// Repository contract for finished attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append an attempt and return its storage id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn append_attempt(&self, attempt: &AttemptResult) -> Result<i64, StorageError>;

    /// Fetch an attempt by storage id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_attempt(&self, id: i64) -> Result<AttemptResult, StorageError>;

    /// List a user's attempts, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_attempts_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError>;

    /// List attempts for a quiz, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_attempts_for_quiz(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    quizzes: Arc<Mutex<HashMap<QuizId, Quiz>>>,
    attempts: Arc<Mutex<Vec<AttemptResult>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn newest_first(rows: &mut Vec<AttemptRow>, limit: u32) {
    rows.sort_by(|a, b| {
        b.attempt
            .completed_at()
            .cmp(&a.attempt.completed_at())
            .then(b.id.cmp(&a.id))
    });
    rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let mut guard = self.quizzes.lock().map_err(lock_err)?;
        guard.insert(quiz.id(), quiz.clone());
        Ok(())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError> {
        let guard = self.quizzes.lock().map_err(lock_err)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_quizzes(&self, limit: u32) -> Result<Vec<Quiz>, StorageError> {
        let guard = self.quizzes.lock().map_err(lock_err)?;
        let mut quizzes: Vec<Quiz> = guard.values().cloned().collect();
        quizzes.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then(b.id().cmp(&a.id()))
        });
        quizzes.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(quizzes)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &AttemptResult) -> Result<i64, StorageError> {
        let mut guard = self.attempts.lock().map_err(lock_err)?;
        guard.push(attempt.clone());
        i64::try_from(guard.len()).map_err(|_| StorageError::Serialization("id overflow".into()))
    }

    async fn get_attempt(&self, id: i64) -> Result<AttemptResult, StorageError> {
        let guard = self.attempts.lock().map_err(lock_err)?;
        usize::try_from(id)
            .ok()
            .and_then(|id| id.checked_sub(1))
            .and_then(|idx| guard.get(idx))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_attempts_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let guard = self.attempts.lock().map_err(lock_err)?;
        let mut rows: Vec<AttemptRow> = guard
            .iter()
            .zip(1_i64..)
            .filter(|(a, _)| a.user_id() == user_id)
            .map(|(a, id)| AttemptRow::new(id, a.clone()))
            .collect();
        newest_first(&mut rows, limit);
        Ok(rows)
    }

    async fn list_attempts_for_quiz(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let guard = self.attempts.lock().map_err(lock_err)?;
        let mut rows: Vec<AttemptRow> = guard
            .iter()
            .zip(1_i64..)
            .filter(|(a, _)| a.quiz_id() == quiz_id)
            .map(|(a, id)| AttemptRow::new(id, a.clone()))
            .collect();
        newest_first(&mut rows, limit);
        Ok(rows)
    }
}

/// Aggregates quiz and attempt repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self { quizzes, attempts }
    }
}
