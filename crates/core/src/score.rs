//! Pure scoring of an attempt.

use serde::{Deserialize, Serialize};

use crate::model::{AnswerTracker, Quiz};

/// Outcome of comparing recorded answers with the correct ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub correct: u32,
    pub total: u32,
    /// `round(correct / total * 100)`, always within `0..=100`.
    pub percentage: u8,
}

/// Scores `tracker` against `quiz`.
///
/// A question counts as correct only when its recorded selection equals the
/// correct option; unanswered questions never match. `percentage` is 0 when
/// there are no questions.
#[must_use]
pub fn score(quiz: &Quiz, tracker: &AnswerTracker) -> Score {
    let correct = quiz
        .questions()
        .iter()
        .enumerate()
        .filter(|(i, q)| q.is_correct(tracker.get(*i)))
        .count();
    let total = quiz.question_count();

    Score {
        correct: saturating_u32(correct),
        total: saturating_u32(total),
        percentage: percentage(correct, total),
    }
}

/// Integer percentage rounded half away from zero.
#[must_use]
pub fn percentage(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total);
    // (2c * 100 + t) / 2t == round(c * 100 / t) for non-negative integers.
    let rounded = (correct * 200 + total) / (total * 2);
    u8::try_from(rounded).unwrap_or(100)
}

fn saturating_u32(v: usize) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}
