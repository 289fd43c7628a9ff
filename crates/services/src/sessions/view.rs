use chrono::{DateTime, Utc};
use std::sync::Arc;

use quiz_core::model::{AttemptResult, QuizId, UserId};
use storage::repository::{AttemptRepository, AttemptRow};

use crate::error::SessionError;

/// Storage identifier for a persisted attempt.
///
/// NOTE: This is currently `i64` to match `SQLite` row IDs.
pub type AttemptId = i64;

/// Presentation-agnostic list item for a finished attempt.
///
/// No pre-formatted strings; the UI formats timestamps and percentages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptListItem {
    pub id: AttemptId,
    pub quiz_id: QuizId,
    pub quiz_title: String,
    pub completed_at: DateTime<Utc>,

    pub score: u8,
    pub correct: u32,
    pub total: u32,
    pub unanswered: u32,
}

impl AttemptListItem {
    #[must_use]
    pub fn from_row(row: &AttemptRow) -> Self {
        let attempt = &row.attempt;
        let unanswered = attempt.answers().iter().filter(|a| a.is_none()).count();
        Self {
            id: row.id,
            quiz_id: attempt.quiz_id(),
            quiz_title: attempt.quiz_title().to_owned(),
            completed_at: attempt.completed_at(),
            score: attempt.score(),
            correct: attempt.correct_answers(),
            total: attempt.total_questions(),
            unanswered: u32::try_from(unanswered).unwrap_or(u32::MAX),
        }
    }
}

/// Read side of persisted attempts.
#[derive(Clone)]
pub struct AttemptHistoryService {
    attempts: Arc<dyn AttemptRepository>,
}

impl AttemptHistoryService {
    pub const DEFAULT_LIMIT: u32 = 50;

    #[must_use]
    pub fn new(attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { attempts }
    }

    /// Most recent attempts by `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the repository query fails.
    pub async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<AttemptListItem>, SessionError> {
        let rows = self.attempts.list_attempts_for_user(user_id, limit).await?;
        Ok(rows.iter().map(AttemptListItem::from_row).collect())
    }

    /// Most recent attempts at `quiz_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the repository query fails.
    pub async fn list_for_quiz(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<AttemptListItem>, SessionError> {
        let rows = self.attempts.list_attempts_for_quiz(quiz_id, limit).await?;
        Ok(rows.iter().map(AttemptListItem::from_row).collect())
    }

    /// Full attempt, including per-question answers.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` (`NotFound` when missing).
    pub async fn get(&self, id: AttemptId) -> Result<AttemptResult, SessionError> {
        Ok(self.attempts.get_attempt(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{AnswerTracker, CurrentUser, Question, Quiz};
    use quiz_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, StorageError};

    fn quiz(id: u64) -> Quiz {
        let questions = (0..4)
            .map(|i| Question::new(i, format!("Q{i}"), vec!["a".into(), "b".into()], 0).unwrap())
            .collect();
        Quiz::new(
            QuizId::new(id),
            format!("Quiz {id}"),
            None,
            questions,
            UserId::new("author"),
            fixed_now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn lists_user_attempts_as_items() {
        let repo = InMemoryRepository::new();
        let history = AttemptHistoryService::new(Arc::new(repo.clone()));
        let user = CurrentUser::new(UserId::new("ann"), "ann@example.com");

        let q1 = quiz(1);
        let mut tracker = AnswerTracker::for_quiz(&q1);
        tracker.set(0, 0).unwrap();
        tracker.set(1, 1).unwrap();
        let older = AttemptResult::from_session(&q1, &tracker, &user, fixed_now());
        repo.append_attempt(&older).await.unwrap();

        let q2 = quiz(2);
        let newer = AttemptResult::from_session(
            &q2,
            &AnswerTracker::for_quiz(&q2),
            &user,
            fixed_now() + Duration::hours(1),
        );
        repo.append_attempt(&newer).await.unwrap();

        let items = history
            .list_for_user(&user.id, AttemptHistoryService::DEFAULT_LIMIT)
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quiz_title, "Quiz 2");
        assert_eq!(items[0].unanswered, 4);
        assert_eq!(items[1].correct, 1);
        assert_eq!(items[1].unanswered, 2);
        assert_eq!(items[1].score, 25);

        let for_quiz = history.list_for_quiz(QuizId::new(1), 10).await.unwrap();
        assert_eq!(for_quiz.len(), 1);
        assert_eq!(history.get(for_quiz[0].id).await.unwrap(), older);
    }

    #[tokio::test]
    async fn missing_attempt_surfaces_not_found() {
        let history = AttemptHistoryService::new(Arc::new(InMemoryRepository::new()));
        let err = history.get(42).await.unwrap_err();
        assert!(matches!(err, SessionError::Storage(StorageError::NotFound)));
    }
}
