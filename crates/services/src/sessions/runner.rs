use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use quiz_core::Clock;
use quiz_core::model::{AttemptResult, SessionSettings};

use super::persister::ResultPersister;
use super::session::{AdvanceOutcome, AdvanceTrigger, QuizSession};
use super::timer::{CountdownTimer, RemainingSecs, TimerEpoch};
use super::view::AttemptId;
use crate::error::SessionError;

//
// ─── COMMANDS & VIEWS ──────────────────────────────────────────────────────────
//

/// Everything that can change a running session. Both user actions and timer
/// expiries go through one channel and are applied one at a time.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    Select {
        option: usize,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Advance {
        reply: oneshot::Sender<Result<AdvanceOutcome, SessionError>>,
    },
    Expired {
        epoch: TimerEpoch,
    },
}

/// Snapshot of a running session for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionView {
    AwaitingAnswer {
        question: usize,
        total: usize,
        selected: Option<usize>,
    },
    Completed(AttemptResult),
}

impl SessionView {
    fn of(session: &QuizSession) -> Self {
        match session.result() {
            Some(result) => SessionView::Completed(result.clone()),
            None => SessionView::AwaitingAnswer {
                question: session.current_index().unwrap_or_default(),
                total: session.quiz().question_count(),
                selected: session.current_selection(),
            },
        }
    }

    #[must_use]
    pub fn question(&self) -> Option<usize> {
        match self {
            SessionView::AwaitingAnswer { question, .. } => Some(*question),
            SessionView::Completed(_) => None,
        }
    }

    #[must_use]
    pub fn result(&self) -> Option<&AttemptResult> {
        match self {
            SessionView::Completed(result) => Some(result),
            SessionView::AwaitingAnswer { .. } => None,
        }
    }
}

/// Final account of a session once its runner has stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// `None` if the session was abandoned before the last question closed.
    pub result: Option<AttemptResult>,
    /// Storage id of the persisted attempt; `None` if abandoned or the write failed.
    pub attempt_id: Option<AttemptId>,
    pub triggers: Vec<AdvanceTrigger>,
}

//
// ─── HANDLE ────────────────────────────────────────────────────────────────────
//

/// Caller side of a running session.
///
/// Dropping the handle (or calling [`SessionHandle::close`]) stops the runner
/// and cancels the countdown.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    view: watch::Receiver<SessionView>,
    remaining: RemainingSecs,
    task: JoinHandle<SessionReport>,
}

impl SessionHandle {
    /// Selects `option` for the open question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Answer` for an out-of-range option,
    /// `SessionError::Completed` after the last question, and
    /// `SessionError::Closed` if the runner has stopped.
    pub async fn select_answer(&self, option: usize) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Select { option, reply })?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Confirms the current selection and moves on.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unanswered` when nothing is selected,
    /// `SessionError::Completed` once finished, and `SessionError::Closed` if
    /// the runner has stopped.
    pub async fn advance(&self) -> Result<AdvanceOutcome, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Advance { reply })?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Receiver that is notified on every question change, selection and completion.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Seconds left on the open question.
    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining.get()
    }

    /// Waits until the session reaches `Completed` and returns the result.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the runner stops first.
    pub async fn completed(&self) -> Result<AttemptResult, SessionError> {
        let mut view = self.view.clone();
        let done = view
            .wait_for(|v| matches!(v, SessionView::Completed(_)))
            .await
            .map_err(|_| SessionError::Closed)?;
        done.result().cloned().ok_or(SessionError::Closed)
    }

    /// Stops the runner and waits for any in-flight result write.
    ///
    /// An unfinished session is abandoned: nothing is persisted.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the runner task panicked.
    pub async fn close(self) -> Result<SessionReport, SessionError> {
        let SessionHandle { commands, task, .. } = self;
        drop(commands);
        task.await.map_err(|_| SessionError::Closed)
    }

    fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::Closed)
    }

    #[cfg(test)]
    pub(crate) fn send_raw(&self, command: SessionCommand) {
        let _ = self.commands.send(command);
    }
}

//
// ─── RUNNER ────────────────────────────────────────────────────────────────────
//

/// Starts `session` on its own task and returns a handle to drive it.
///
/// Must be called from within a tokio runtime.
#[must_use]
pub fn spawn(
    session: QuizSession,
    settings: SessionSettings,
    persister: ResultPersister,
    clock: Clock,
) -> SessionHandle {
    let (commands, inbox) = mpsc::unbounded_channel();
    let (publish, view) = watch::channel(SessionView::of(&session));

    // The timer only holds a weak sender so dropping the handle closes the inbox.
    let expiries = commands.downgrade();
    let mut timer = CountdownTimer::new(move |epoch| {
        if let Some(tx) = expiries.upgrade() {
            let _ = tx.send(SessionCommand::Expired { epoch });
        }
    });
    timer.reset(settings.question_secs());
    let remaining = timer.remaining_handle();

    info!(
        quiz_id = %session.quiz().id(),
        user_id = %session.user().id,
        questions = session.quiz().question_count(),
        question_secs = settings.question_secs(),
        "quiz session started"
    );

    let runner = Runner {
        session,
        settings,
        timer,
        persister,
        clock,
        publish,
        write: None,
    };
    let task = tokio::spawn(runner.run(inbox));

    SessionHandle {
        commands,
        view,
        remaining,
        task,
    }
}

struct Runner {
    session: QuizSession,
    settings: SessionSettings,
    timer: CountdownTimer,
    persister: ResultPersister,
    clock: Clock,
    publish: watch::Sender<SessionView>,
    write: Option<JoinHandle<Option<AttemptId>>>,
}

impl Runner {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<SessionCommand>) -> SessionReport {
        while let Some(command) = inbox.recv().await {
            match command {
                SessionCommand::Select { option, reply } => {
                    let res = self.session.select_answer(option);
                    if res.is_ok() {
                        self.publish();
                    }
                    let _ = reply.send(res);
                }
                SessionCommand::Advance { reply } => {
                    let res = self.advance(AdvanceTrigger::User);
                    let _ = reply.send(res);
                }
                SessionCommand::Expired { epoch } => {
                    if epoch != self.timer.epoch() || self.session.is_complete() {
                        debug!(epoch, current = self.timer.epoch(), "ignoring stale expiry");
                        continue;
                    }
                    // Errors here can only be `Completed`, ruled out above.
                    let _ = self.advance(AdvanceTrigger::Timeout);
                }
            }
        }

        self.timer.cancel();
        if !self.session.is_complete() {
            info!(
                quiz_id = %self.session.quiz().id(),
                answered = self.session.answers().answered_count(),
                "quiz session abandoned"
            );
        }

        let attempt_id = match self.write.take() {
            Some(write) => match write.await {
                Ok(id) => id,
                Err(err) => {
                    warn!(error = %err, "attempt write task failed");
                    None
                }
            },
            None => None,
        };

        SessionReport {
            result: self.session.result().cloned(),
            attempt_id,
            triggers: self.session.triggers().to_vec(),
        }
    }

    fn advance(&mut self, trigger: AdvanceTrigger) -> Result<AdvanceOutcome, SessionError> {
        let outcome = self.session.advance(trigger, self.clock.now())?;
        self.timer.cancel();

        match &outcome {
            AdvanceOutcome::Next { .. } => {
                self.timer.reset(self.settings.question_secs());
            }
            AdvanceOutcome::Completed(result) => {
                info!(
                    quiz_id = %result.quiz_id(),
                    score = result.score(),
                    correct = result.correct_answers(),
                    total = result.total_questions(),
                    "quiz session completed"
                );
                self.write = Some(self.persister.persist_detached(result.clone()));
            }
        }

        self.publish();
        Ok(outcome)
    }

    fn publish(&self) {
        self.publish.send_replace(SessionView::of(&self.session));
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use quiz_core::model::{CurrentUser, Question, Quiz, QuizId, UserId};
    use quiz_core::time::fixed_clock;
    use storage::repository::{AttemptRepository, AttemptRow, InMemoryRepository, StorageError};
    use tokio::time::sleep;

    /// Epoch of the countdown started for question 0.
    const FIRST_EPOCH: TimerEpoch = 1;

    struct FailingAttempts;

    #[async_trait]
    impl AttemptRepository for FailingAttempts {
        async fn append_attempt(&self, _attempt: &AttemptResult) -> Result<i64, StorageError> {
            Err(StorageError::Connection("store unavailable".into()))
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

    fn session(correct: &[usize]) -> QuizSession {
        let questions = correct
            .iter()
            .enumerate()
            .map(|(i, c)| {
                Question::new(i, format!("Q{i}"), vec!["a".into(), "b".into()], *c).unwrap()
            })
            .collect();
        let quiz = Quiz::new(
            QuizId::new(1),
            "Runner",
            None,
            questions,
            UserId::new("author"),
            quiz_core::time::fixed_now(),
        )
        .unwrap();
        QuizSession::new(
            quiz,
            CurrentUser::new(UserId::new("player"), "player@example.com"),
            quiz_core::time::fixed_now(),
        )
    }

    fn start(correct: &[usize], repo: Arc<dyn AttemptRepository>) -> SessionHandle {
        spawn(
            session(correct),
            SessionSettings::default(),
            ResultPersister::new(repo),
            fixed_clock(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_selection_and_countdown() {
        let handle = start(&[0, 1], Arc::new(InMemoryRepository::new()));
        assert_eq!(handle.remaining_secs(), 30);

        handle.select_answer(1).await.unwrap();
        assert_eq!(
            handle.view(),
            SessionView::AwaitingAnswer {
                question: 0,
                total: 2,
                selected: Some(1)
            }
        );

        sleep(Duration::from_millis(4500)).await;
        assert_eq!(handle.remaining_secs(), 26);
    }

    #[tokio::test(start_paused = true)]
    async fn user_advance_resets_countdown() {
        let handle = start(&[0, 1], Arc::new(InMemoryRepository::new()));
        sleep(Duration::from_millis(10_500)).await;
        assert_eq!(handle.remaining_secs(), 20);

        handle.select_answer(0).await.unwrap();
        let outcome = handle.advance().await.unwrap();
        assert_eq!(outcome, AdvanceOutcome::Next { question: 1 });
        assert_eq!(handle.remaining_secs(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn user_advance_without_selection_is_rejected() {
        let handle = start(&[0, 1], Arc::new(InMemoryRepository::new()));
        let err = handle.advance().await.unwrap_err();
        assert!(matches!(err, SessionError::Unanswered));
        assert_eq!(handle.view().question(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_and_user_advance_race_yields_one_transition() {
        let repo = InMemoryRepository::new();
        let handle = start(&[0], Arc::new(repo.clone()));
        handle.select_answer(0).await.unwrap();

        handle.send_raw(SessionCommand::Expired { epoch: FIRST_EPOCH });
        let second = handle.advance().await;
        assert!(matches!(second, Err(SessionError::Completed)));

        let report = handle.close().await.unwrap();
        assert_eq!(report.triggers, vec![AdvanceTrigger::Timeout]);
        assert_eq!(report.result.unwrap().correct_answers(), 1);
        let stored = repo
            .list_attempts_for_user(&UserId::new("player"), 10)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_expiry_is_ignored() {
        let handle = start(&[0, 1], Arc::new(InMemoryRepository::new()));
        handle.select_answer(0).await.unwrap();
        handle.advance().await.unwrap();

        // Question 0's countdown was replaced when question 1 opened.
        handle.send_raw(SessionCommand::Expired { epoch: FIRST_EPOCH });
        handle.select_answer(1).await.unwrap();
        assert_eq!(handle.view().question(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn persistence_failure_still_completes() {
        let handle = start(&[1], Arc::new(FailingAttempts));
        handle.select_answer(1).await.unwrap();
        let outcome = handle.advance().await.unwrap();
        assert!(matches!(outcome, AdvanceOutcome::Completed(_)));

        let result = handle.completed().await.unwrap();
        assert_eq!(result.score(), 100);

        let report = handle.close().await.unwrap();
        assert_eq!(report.attempt_id, None);
        assert_eq!(report.result.unwrap().score(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn closing_unfinished_session_persists_nothing() {
        let repo = InMemoryRepository::new();
        let handle = start(&[0, 1], Arc::new(repo.clone()));
        handle.select_answer(0).await.unwrap();

        let report = handle.close().await.unwrap();
        assert_eq!(report.result, None);
        assert_eq!(report.attempt_id, None);

        sleep(Duration::from_secs(120)).await;
        let stored = repo
            .list_attempts_for_quiz(QuizId::new(1), 10)
            .await
            .unwrap();
        assert!(stored.is_empty());
    }
}
