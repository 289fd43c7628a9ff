use std::sync::Arc;

use quiz_core::model::SessionSettings;
use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::identity::IdentityProvider;
use crate::sessions::{AttemptHistoryService, QuizSessionService};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    quiz_sessions: Arc<QuizSessionService>,
    history: Arc<AttemptHistoryService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        identity: Arc<dyn IdentityProvider>,
        settings: SessionSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock, identity, settings))
    }

    /// Build services over an existing backend.
    #[must_use]
    pub fn from_storage(
        storage: Storage,
        clock: Clock,
        identity: Arc<dyn IdentityProvider>,
        settings: SessionSettings,
    ) -> Self {
        let quiz_sessions = Arc::new(
            QuizSessionService::new(
                clock,
                Arc::clone(&storage.quizzes),
                Arc::clone(&storage.attempts),
                identity,
            )
            .with_settings(settings),
        );
        let history = Arc::new(AttemptHistoryService::new(Arc::clone(&storage.attempts)));

        Self {
            storage,
            quiz_sessions,
            history,
        }
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn quiz_sessions(&self) -> Arc<QuizSessionService> {
        Arc::clone(&self.quiz_sessions)
    }

    #[must_use]
    pub fn history(&self) -> Arc<AttemptHistoryService> {
        Arc::clone(&self.history)
    }
}
