#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod identity;
pub mod sessions;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, IdentityError, SessionError};
pub use identity::{IdentityProvider, StaticIdentity};

pub use sessions::{
    AdvanceOutcome, AdvanceTrigger, AttemptHistoryService, AttemptId, AttemptListItem,
    QuizSession, QuizSessionService, SessionHandle, SessionReport, SessionView,
};
