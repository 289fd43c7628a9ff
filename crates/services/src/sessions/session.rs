use chrono::{DateTime, Utc};
use std::fmt;
use tracing::debug;

use quiz_core::model::{AnswerTracker, AttemptResult, CurrentUser, Question, Quiz};

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Where a quiz session currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Question `question` is open and accepting selections.
    AwaitingAnswer { question: usize },
    /// Terminal: the attempt has been scored.
    Completed(AttemptResult),
}

/// What caused a question to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceTrigger {
    /// The user confirmed their selection.
    User,
    /// The countdown reached zero.
    Timeout,
}

/// Result of a successful `advance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Next { question: usize },
    Completed(AttemptResult),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// State machine for one attempt at a quiz.
///
/// Owns the quiz snapshot and the answer tracker. It is synchronous and has
/// no notion of time beyond the completion timestamp passed to `advance`;
/// the countdown and the serialization of triggers live in the runner.
pub struct QuizSession {
    quiz: Quiz,
    user: CurrentUser,
    tracker: AnswerTracker,
    state: SessionState,
    triggers: Vec<AdvanceTrigger>,
    started_at: DateTime<Utc>,
}

impl QuizSession {
    /// Opens a session on question 0.
    ///
    /// `Quiz` guarantees at least one question, so there is always a first
    /// question to await.
    #[must_use]
    pub fn new(quiz: Quiz, user: CurrentUser, started_at: DateTime<Utc>) -> Self {
        let tracker = AnswerTracker::for_quiz(&quiz);
        Self {
            quiz,
            user,
            tracker,
            state: SessionState::AwaitingAnswer { question: 0 },
            triggers: Vec::new(),
            started_at,
        }
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerTracker {
        &self.tracker
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// How each closed question ended, in question order.
    #[must_use]
    pub fn triggers(&self) -> &[AdvanceTrigger] {
        &self.triggers
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            SessionState::AwaitingAnswer { question } => Some(question),
            SessionState::Completed(_) => None,
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current_index().and_then(|i| self.quiz.question(i))
    }

    /// The selection recorded for the open question, if any.
    #[must_use]
    pub fn current_selection(&self) -> Option<usize> {
        self.current_index().and_then(|i| self.tracker.get(i))
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.state, SessionState::Completed(_))
    }

    #[must_use]
    pub fn result(&self) -> Option<&AttemptResult> {
        match &self.state {
            SessionState::Completed(result) => Some(result),
            SessionState::AwaitingAnswer { .. } => None,
        }
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.quiz.question_count(),
            answered: self.tracker.answered_count(),
            current: self.current_index(),
            is_complete: self.is_complete(),
        }
    }

    /// Records `option` for the open question. May be called repeatedly;
    /// the last selection wins.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session has finished and
    /// `SessionError::Answer` if `option` is out of range.
    pub fn select_answer(&mut self, option: usize) -> Result<(), SessionError> {
        let Some(question) = self.current_index() else {
            return Err(SessionError::Completed);
        };
        self.tracker.set(question, option)?;
        debug!(question, option, "answer selected");
        Ok(())
    }

    /// Closes the open question.
    ///
    /// A user-triggered advance requires a selection; a timeout does not, and
    /// an unanswered question then scores as incorrect. Advancing past the
    /// last question scores the attempt and freezes the answers.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session already finished
    /// (state is left untouched) and `SessionError::Unanswered` for a user
    /// advance with no selection.
    pub fn advance(
        &mut self,
        trigger: AdvanceTrigger,
        now: DateTime<Utc>,
    ) -> Result<AdvanceOutcome, SessionError> {
        let Some(question) = self.current_index() else {
            return Err(SessionError::Completed);
        };
        if trigger == AdvanceTrigger::User && !self.tracker.is_answered(question) {
            return Err(SessionError::Unanswered);
        }
        self.triggers.push(trigger);

        if question < self.quiz.last_index() {
            let next = question + 1;
            self.state = SessionState::AwaitingAnswer { question: next };
            debug!(from = question, to = next, ?trigger, "question advanced");
            return Ok(AdvanceOutcome::Next { question: next });
        }

        self.tracker.freeze();
        let result = AttemptResult::from_session(&self.quiz, &self.tracker, &self.user, now);
        self.state = SessionState::Completed(result.clone());
        debug!(
            quiz_id = %self.quiz.id(),
            score = result.score(),
            ?trigger,
            "session completed"
        );
        Ok(AdvanceOutcome::Completed(result))
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("quiz_id", &self.quiz.id())
            .field("questions", &self.quiz.question_count())
            .field("user", &self.user.id)
            .field("state", &self.current_index())
            .field("answered", &self.tracker.answered_count())
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
