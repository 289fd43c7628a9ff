use thiserror::Error;

use crate::model::quiz::Quiz;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("question index {index} out of range (quiz has {total} questions)")]
    QuestionOutOfRange { index: usize, total: usize },

    #[error("option {option} out of range for question {index} ({options} options)")]
    OptionOutOfRange {
        index: usize,
        option: usize,
        options: usize,
    },

    #[error("answers are frozen")]
    Frozen,
}

/// Per-question record of the option the user picked.
///
/// Slots are dense: one per question, `None` meaning unanswered. Every stored
/// selection is within bounds of its question's options. Once frozen the
/// tracker rejects further writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerTracker {
    selections: Vec<Option<usize>>,
    option_counts: Vec<usize>,
    frozen: bool,
}

impl AnswerTracker {
    /// Creates an empty tracker sized for `quiz`.
    #[must_use]
    pub fn for_quiz(quiz: &Quiz) -> Self {
        let option_counts: Vec<usize> = quiz.questions().iter().map(|q| q.option_count()).collect();
        Self {
            selections: vec![None; option_counts.len()],
            option_counts,
            frozen: false,
        }
    }

    /// Records `option` for question `index`, replacing any earlier selection.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::Frozen` after [`AnswerTracker::freeze`], or an
    /// out-of-range error if either index is invalid.
    pub fn set(&mut self, index: usize, option: usize) -> Result<(), AnswerError> {
        if self.frozen {
            return Err(AnswerError::Frozen);
        }
        let options = *self
            .option_counts
            .get(index)
            .ok_or(AnswerError::QuestionOutOfRange {
                index,
                total: self.option_counts.len(),
            })?;
        if option >= options {
            return Err(AnswerError::OptionOutOfRange {
                index,
                option,
                options,
            });
        }
        self.selections[index] = Some(option);
        Ok(())
    }

    /// Returns the selection for question `index`; `None` if unanswered or out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<usize> {
        self.selections.get(index).copied().flatten()
    }

    #[must_use]
    pub fn is_answered(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.selections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.selections.iter().filter(|s| s.is_some()).count()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Option<usize>] {
        &self.selections
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}
