//! Final score for a finished attempt.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::domain::Quiz;

/// Percentage at or above which an attempt passes.
pub const PASS_THRESHOLD: f64 = 70.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
  Pass,
  NeedsImprovement,
}

impl Verdict {
  pub fn from_percentage(percentage: f64) -> Self {
    if percentage >= PASS_THRESHOLD { Verdict::Pass } else { Verdict::NeedsImprovement }
  }

  pub fn headline(&self) -> &'static str {
    match self {
      Verdict::Pass => "Congratulations!",
      Verdict::NeedsImprovement => "Keep practicing!",
    }
  }

  pub fn message(&self) -> &'static str {
    match self {
      Verdict::Pass => "You did great on this quiz!",
      Verdict::NeedsImprovement => "You can improve your score with more practice.",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreReport {
  pub score: usize,
  pub total: usize,
  pub percentage: f64,
  pub verdict: Verdict,
}

/// One point per question whose recorded option index equals the index of the first option
/// matching `correct_answer`. A question whose answer is missing from its options scores 0.
pub fn score(quiz: &Quiz, answers: &HashMap<usize, usize>) -> ScoreReport {
  let mut score = 0;
  for (index, question) in quiz.questions.iter().enumerate() {
    let Some(correct) = question.correct_index() else {
      warn!(
        target: "scoring",
        question = index + 1,
        correct_answer = %question.correct_answer,
        "Correct answer not found in options; scoring as 0"
      );
      continue;
    };
    if answers.get(&index) == Some(&correct) {
      score += 1;
    }
  }

  let total = quiz.questions.len();
  let percentage = if total == 0 { 0.0 } else { 100.0 * score as f64 / total as f64 };
  ScoreReport { score, total, percentage, verdict: Verdict::from_percentage(percentage) }
}
