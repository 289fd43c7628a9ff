use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use quiz_core::model::AttemptResult;
use storage::repository::AttemptRepository;

use super::view::AttemptId;

/// Writes finished attempts to the attempt store.
///
/// Writes are best effort: failures and timeouts are logged and reported as
/// `None`, never as errors.
#[derive(Clone)]
pub struct ResultPersister {
    attempts: Arc<dyn AttemptRepository>,
    write_timeout: Duration,
}

impl ResultPersister {
    pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

    #[must_use]
    pub fn new(attempts: Arc<dyn AttemptRepository>) -> Self {
        Self {
            attempts,
            write_timeout: Self::DEFAULT_WRITE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    /// Appends `result` once. Returns the stored id, or `None` if the write
    /// failed or timed out.
    pub async fn persist(&self, result: &AttemptResult) -> Option<AttemptId> {
        let write = self.attempts.append_attempt(result);
        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(Ok(id)) => {
                info!(
                    attempt_id = id,
                    quiz_id = %result.quiz_id(),
                    user_id = %result.user_id(),
                    score = result.score(),
                    "attempt persisted"
                );
                Some(id)
            }
            Ok(Err(err)) => {
                warn!(
                    error = %err,
                    quiz_id = %result.quiz_id(),
                    user_id = %result.user_id(),
                    "failed to persist attempt"
                );
                None
            }
            Err(_) => {
                warn!(
                    timeout_ms = u64::try_from(self.write_timeout.as_millis()).unwrap_or(u64::MAX),
                    quiz_id = %result.quiz_id(),
                    "timed out persisting attempt"
                );
                None
            }
        }
    }

    /// Spawns the write and returns immediately.
    #[must_use = "await the handle to learn the stored id, or drop it to detach"]
    pub fn persist_detached(&self, result: AttemptResult) -> JoinHandle<Option<AttemptId>> {
        let persister = self.clone();
        tokio::spawn(async move { persister.persist(&result).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quiz_core::model::{AnswerTracker, CurrentUser, Question, Quiz, QuizId, UserId};
    use quiz_core::time::fixed_now;
    use storage::repository::{AttemptRow, InMemoryRepository, StorageError};

    struct SlowAttempts;

    #[async_trait]
    impl AttemptRepository for SlowAttempts {
        async fn append_attempt(&self, _attempt: &AttemptResult) -> Result<i64, StorageError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(1)
        }

        async fn get_attempt(&self, _id: i64) -> Result<AttemptResult, StorageError> {
            Err(StorageError::NotFound)
        }

        async fn list_attempts_for_user(
            &self,
            _user_id: &UserId,
            _limit: u32,
        ) -> Result<Vec<AttemptRow>, StorageError> {
            Ok(Vec::new())
        }

        async fn list_attempts_for_quiz(
            &self,
            _quiz_id: QuizId,
            _limit: u32,
        ) -> Result<Vec<AttemptRow>, StorageError> {
            Ok(Vec::new())
        }
    }

    fn result() -> AttemptResult {
        let question = Question::new(0, "Q", vec!["a".into(), "b".into()], 1).unwrap();
        let quiz = Quiz::new(
            QuizId::new(5),
            "Persist",
            None,
            vec![question],
            UserId::new("author"),
            fixed_now(),
        )
        .unwrap();
        let tracker = AnswerTracker::for_quiz(&quiz);
        let user = CurrentUser::new(UserId::new("player"), "player@example.com");
        AttemptResult::from_session(&quiz, &tracker, &user, fixed_now())
    }

    #[tokio::test]
    async fn persists_to_repository() {
        let repo = InMemoryRepository::new();
        let persister = ResultPersister::new(Arc::new(repo.clone()));

        let id = persister.persist_detached(result()).await.unwrap();
        let id = id.expect("stored");
        assert_eq!(repo.get_attempt(id).await.unwrap(), result());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_write_times_out_to_none() {
        let persister = ResultPersister::new(Arc::new(SlowAttempts))
            .with_write_timeout(Duration::from_secs(2));
        assert_eq!(persister.persist(&result()).await, None);
    }
}
