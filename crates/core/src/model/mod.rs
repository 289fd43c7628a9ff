mod answers;
mod attempt;
mod ids;
mod quiz;
mod settings;
mod user;

pub use ids::{ParseIdError, QuizId, UserId};

pub use answers::{AnswerError, AnswerTracker};
pub use attempt::{AttemptError, AttemptResult};
pub use quiz::{MIN_OPTIONS, Question, Quiz, QuizError};
pub use settings::{SessionSettings, SettingsError};
pub use user::CurrentUser;
