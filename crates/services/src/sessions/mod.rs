mod persister;
mod progress;
mod runner;
mod session;
mod timer;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use persister::ResultPersister;
pub use progress::SessionProgress;
pub use runner::{SessionHandle, SessionReport, SessionView, spawn};
pub use session::{AdvanceOutcome, AdvanceTrigger, QuizSession, SessionState};
pub use timer::{CountdownTimer, RemainingSecs, TimerEpoch};
pub use view::{AttemptHistoryService, AttemptId, AttemptListItem};
pub use workflow::QuizSessionService;
