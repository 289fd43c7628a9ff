use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use quiz_core::model::{QuizId, SessionSettings};
use storage::repository::{AttemptRepository, QuizRepository};

use super::persister::ResultPersister;
use super::runner::{self, SessionHandle};
use super::session::QuizSession;
use crate::Clock;
use crate::error::SessionError;
use crate::identity::IdentityProvider;

/// Loads quizzes, resolves the player and starts timed sessions.
#[derive(Clone)]
pub struct QuizSessionService {
    clock: Clock,
    settings: SessionSettings,
    quizzes: Arc<dyn QuizRepository>,
    identity: Arc<dyn IdentityProvider>,
    persister: ResultPersister,
}

impl QuizSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn AttemptRepository>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            clock,
            settings: SessionSettings::default(),
            quizzes,
            identity,
            persister: ResultPersister::new(attempts),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.persister = self.persister.with_write_timeout(write_timeout);
        self
    }

    #[must_use]
    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    /// Loads `quiz_id` and opens an untimed session on question 0.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Identity` if nobody is signed in and
    /// `SessionError::Storage` if the quiz is missing or fails validation.
    pub async fn prepare_session(&self, quiz_id: QuizId) -> Result<QuizSession, SessionError> {
        let user = self.identity.current_user().await?;
        let quiz = self.quizzes.get_quiz(quiz_id).await?;
        Ok(QuizSession::new(quiz, user, self.clock.now()))
    }

    /// Loads `quiz_id` and starts its countdown.
    ///
    /// # Errors
    ///
    /// Same as [`QuizSessionService::prepare_session`].
    pub async fn start_session(&self, quiz_id: QuizId) -> Result<SessionHandle, SessionError> {
        let session = self.prepare_session(quiz_id).await?;
        info!(
            quiz_id = %quiz_id,
            title = session.quiz().title(),
            "starting quiz"
        );
        Ok(runner::spawn(
            session,
            self.settings,
            self.persister.clone(),
            self.clock,
        ))
    }
}
