use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("question time limit must be between 1 and 3600 seconds, got {0}")]
    InvalidQuestionSecs(u32),
}

/// Runtime knobs for a quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    question_secs: u32,
}

impl SessionSettings {
    pub const DEFAULT_QUESTION_SECS: u32 = 30;
    pub const MAX_QUESTION_SECS: u32 = 3600;

    /// Creates settings with a custom per-question countdown.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidQuestionSecs` outside `1..=3600`.
    pub fn new(question_secs: u32) -> Result<Self, SettingsError> {
        if question_secs == 0 || question_secs > Self::MAX_QUESTION_SECS {
            return Err(SettingsError::InvalidQuestionSecs(question_secs));
        }
        Ok(Self { question_secs })
    }

    /// Seconds each question stays open before it is forced forward.
    #[must_use]
    pub fn question_secs(&self) -> u32 {
        self.question_secs
    }

    #[must_use]
    pub fn question_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.question_secs))
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            question_secs: Self::DEFAULT_QUESTION_SECS,
        }
    }
}
