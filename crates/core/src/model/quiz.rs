use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{QuizId, UserId};

/// Minimum number of options a question must offer.
pub const MIN_OPTIONS: usize = 2;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("quiz must contain at least one question")]
    NoQuestions,

    #[error("question {index} has empty text")]
    EmptyQuestionText { index: usize },

    #[error("question {index} needs at least 2 options, found {found}")]
    TooFewOptions { index: usize, found: usize },

    #[error("question {index} option {option} is empty")]
    EmptyOption { index: usize, option: usize },

    #[error("question {index} marks option {correct} correct but only has {options} options")]
    CorrectOptionOutOfRange {
        index: usize,
        correct: usize,
        options: usize,
    },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single prompt with its ordered options and the index of the right one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    text: String,
    options: Vec<String>,
    correct_option: usize,
}

impl Question {
    /// Creates a validated question.
    ///
    /// `index` is only used to label errors with the question's position.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the text or any option is blank, fewer than two
    /// options are given, or `correct_option` is out of bounds.
    pub fn new(
        index: usize,
        text: impl Into<String>,
        options: Vec<String>,
        correct_option: usize,
    ) -> Result<Self, QuizError> {
        let text = text.into().trim().to_owned();
        if text.is_empty() {
            return Err(QuizError::EmptyQuestionText { index });
        }
        if options.len() < MIN_OPTIONS {
            return Err(QuizError::TooFewOptions {
                index,
                found: options.len(),
            });
        }
        if let Some(option) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuizError::EmptyOption { index, option });
        }
        if correct_option >= options.len() {
            return Err(QuizError::CorrectOptionOutOfRange {
                index,
                correct: correct_option,
                options: options.len(),
            });
        }

        Ok(Self {
            text,
            options,
            correct_option,
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn correct_option(&self) -> usize {
        self.correct_option
    }

    /// Returns true if `selected` is exactly the correct option.
    #[must_use]
    pub fn is_correct(&self, selected: Option<usize>) -> bool {
        selected == Some(self.correct_option)
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// An ordered, immutable collection of questions.
///
/// A `Quiz` can only be built through [`Quiz::new`], which rejects empty
/// quizzes, so every session starts with at least one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    title: String,
    description: Option<String>,
    questions: Vec<Question>,
    created_by: UserId,
    created_at: DateTime<Utc>,
}

impl Quiz {
    /// Creates a validated quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyTitle` for a blank title and
    /// `QuizError::NoQuestions` if `questions` is empty.
    pub fn new(
        id: QuizId,
        title: impl Into<String>,
        description: Option<String>,
        questions: Vec<Question>,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Self {
            id,
            title,
            description,
            questions,
            created_by,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn last_index(&self) -> usize {
        self.questions.len() - 1
    }

    #[must_use]
    pub fn created_by(&self) -> &UserId {
        &self.created_by
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn opts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn question_requires_two_options() {
        let err = Question::new(3, "Pick", opts(&["only"]), 0).unwrap_err();
        assert_eq!(err, QuizError::TooFewOptions { index: 3, found: 1 });
    }

    #[test]
    fn question_rejects_out_of_range_correct_option() {
        let err = Question::new(0, "Pick", opts(&["a", "b"]), 2).unwrap_err();
        assert!(matches!(
            err,
            QuizError::CorrectOptionOutOfRange { correct: 2, options: 2, .. }
        ));
    }

    #[test]
    fn question_rejects_blank_option() {
        let err = Question::new(1, "Pick", opts(&["a", "  "]), 0).unwrap_err();
        assert_eq!(err, QuizError::EmptyOption { index: 1, option: 1 });
    }

    #[test]
    fn quiz_rejects_zero_questions() {
        let err = Quiz::new(
            QuizId::new(1),
            "Empty",
            None,
            Vec::new(),
            UserId::new("author"),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, QuizError::NoQuestions);
    }

    #[test]
    fn quiz_trims_title_and_drops_blank_description() {
        let q = Question::new(0, "2 + 2?", opts(&["3", "4"]), 1).unwrap();
        let quiz = Quiz::new(
            QuizId::new(1),
            "  Maths ",
            Some("   ".into()),
            vec![q],
            UserId::new("author"),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(quiz.title(), "Maths");
        assert_eq!(quiz.description(), None);
        assert_eq!(quiz.last_index(), 0);
        assert!(quiz.question(0).unwrap().is_correct(Some(1)));
        assert!(!quiz.question(0).unwrap().is_correct(None));
    }
}
