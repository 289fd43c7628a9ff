use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::{AnswerTracker, CurrentUser, Quiz, QuizId, UserId};
use crate::score::{self, Score};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("correct answers ({correct}) exceed total questions ({total})")]
    CountMismatch { correct: u32, total: u32 },

    #[error("answer slots ({len}) do not match total questions ({total})")]
    AnswersLength { len: usize, total: u32 },

    #[error("stored score {stored} does not match computed score {computed}")]
    ScoreMismatch { stored: u8, computed: u8 },
}

/// One user's finished run through a quiz.
///
/// Built exactly once when a session completes and never mutated afterwards.
/// Serializes to the attempt document stored by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    quiz_id: QuizId,
    quiz_title: String,
    user_id: UserId,
    user_email: String,
    score: u8,
    correct_answers: u32,
    total_questions: u32,
    answers: Vec<Option<usize>>,
    completed_at: DateTime<Utc>,
}

impl AttemptResult {
    /// Scores `tracker` against `quiz` and captures the result for `user`.
    #[must_use]
    pub fn from_session(
        quiz: &Quiz,
        tracker: &AnswerTracker,
        user: &CurrentUser,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let Score {
            correct,
            total,
            percentage,
        } = score::score(quiz, tracker);

        Self {
            quiz_id: quiz.id(),
            quiz_title: quiz.title().to_owned(),
            user_id: user.id.clone(),
            user_email: user.email.clone(),
            score: percentage,
            correct_answers: correct,
            total_questions: total,
            answers: tracker.as_slice().to_vec(),
            completed_at,
        }
    }

    /// Rehydrate an attempt from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if counts, answer slots or score are inconsistent.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        quiz_id: QuizId,
        quiz_title: String,
        user_id: UserId,
        user_email: String,
        score: u8,
        correct_answers: u32,
        total_questions: u32,
        answers: Vec<Option<usize>>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        if correct_answers > total_questions {
            return Err(AttemptError::CountMismatch {
                correct: correct_answers,
                total: total_questions,
            });
        }
        if u32::try_from(answers.len()).ok() != Some(total_questions) {
            return Err(AttemptError::AnswersLength {
                len: answers.len(),
                total: total_questions,
            });
        }
        let computed = score::percentage(correct_answers as usize, total_questions as usize);
        if computed != score {
            return Err(AttemptError::ScoreMismatch {
                stored: score,
                computed,
            });
        }

        Ok(Self {
            quiz_id,
            quiz_title,
            user_id,
            user_email,
            score,
            correct_answers,
            total_questions,
            answers,
            completed_at,
        })
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn quiz_title(&self) -> &str {
        &self.quiz_title
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn user_email(&self) -> &str {
        &self.user_email
    }

    /// Integer percentage in `0..=100`.
    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Question;
    use crate::time::fixed_now;

    fn two_question_quiz() -> Quiz {
        let q = |i: usize, correct| {
            Question::new(i, format!("Q{i}"), vec!["x".into(), "y".into()], correct).unwrap()
        };
        Quiz::new(
            QuizId::new(3),
            "Pair",
            None,
            vec![q(0, 0), q(1, 1)],
            UserId::new("author"),
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn serializes_to_attempt_document() {
        let quiz = two_question_quiz();
        let mut tracker = AnswerTracker::for_quiz(&quiz);
        tracker.set(1, 1).unwrap();
        let user = CurrentUser::new(UserId::new("u-1"), "u1@example.com");

        let result = AttemptResult::from_session(&quiz, &tracker, &user, fixed_now());
        let doc = serde_json::to_value(&result).unwrap();

        assert_eq!(doc["quizId"], 3);
        assert_eq!(doc["quizTitle"], "Pair");
        assert_eq!(doc["userId"], "u-1");
        assert_eq!(doc["userEmail"], "u1@example.com");
        assert_eq!(doc["score"], 50);
        assert_eq!(doc["correctAnswers"], 1);
        assert_eq!(doc["totalQuestions"], 2);
        assert_eq!(doc["answers"], serde_json::json!([null, 1]));
        assert!(doc["completedAt"].is_string());
    }

    #[test]
    fn from_persisted_rejects_inconsistent_score() {
        let err = AttemptResult::from_persisted(
            QuizId::new(1),
            "T".into(),
            UserId::new("u"),
            "e".into(),
            90,
            1,
            2,
            vec![Some(0), None],
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            AttemptError::ScoreMismatch {
                stored: 90,
                computed: 50
            }
        );
    }

    #[test]
    fn from_persisted_rejects_short_answer_list() {
        let err = AttemptResult::from_persisted(
            QuizId::new(1),
            "T".into(),
            UserId::new("u"),
            "e".into(),
            50,
            1,
            2,
            vec![Some(0)],
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, AttemptError::AnswersLength { len: 1, total: 2 }));
    }
}
