//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{AnswerError, QuizError, SettingsError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by an `IdentityProvider`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IdentityError {
    #[error("no user is signed in")]
    NotSignedIn,
    #[error("identity provider failed: {0}")]
    Provider(String),
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session already completed")]
    Completed,
    #[error("select an option before advancing")]
    Unanswered,
    #[error("session runner has stopped")]
    Closed,
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
