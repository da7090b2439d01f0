//! Domain models: quiz request parameters, the generated quiz, and per-question feedback.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::util::json_text;

pub const MIN_QUESTIONS: i64 = 1;
pub const MAX_QUESTIONS: i64 = 20;

/// How hard the generated questions should be.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }

  /// Exact match on the lowercase names used by the start form.
  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "easy" => Some(Difficulty::Easy),
      "medium" => Some(Difficulty::Medium),
      "hard" => Some(Difficulty::Hard),
      _ => None,
    }
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Validated generation parameters. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizRequest {
  topic: String,
  num_questions: u8,
  difficulty: Difficulty,
}

impl QuizRequest {
  /// Check raw form input. Checks run in form order: topic, count, difficulty.
  pub fn validate(topic: &str, num_questions: i64, difficulty: &str) -> Result<Self, ValidationError> {
    if topic.trim().is_empty() {
      return Err(ValidationError::EmptyTopic);
    }
    if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&num_questions) {
      return Err(ValidationError::QuestionCountOutOfRange(num_questions));
    }
    let difficulty = Difficulty::parse(difficulty)
      .ok_or_else(|| ValidationError::UnknownDifficulty(difficulty.to_string()))?;

    Ok(Self {
      topic: topic.to_string(),
      num_questions: num_questions as u8,
      difficulty,
    })
  }

  pub fn topic(&self) -> &str { &self.topic }
  pub fn num_questions(&self) -> u8 { self.num_questions }
  pub fn difficulty(&self) -> Difficulty { self.difficulty }
}

/// A generated quiz as the session sees it. Built from the upstream JSON by
/// [`Quiz::from_value`], which never fails.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Quiz {
  pub questions: Vec<Question>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Question {
  pub question: String,
  // Not guaranteed unique, and `correct_answer` is not guaranteed to be among them.
  pub options: Vec<String>,
  pub correct_answer: String,
}

impl Quiz {
  /// Missing or `null` fields become empty; numbers and booleans become their text.
  /// A `questions` or `options` value that is not an array counts as empty.
  pub fn from_value(v: &Value) -> Self {
    let questions = v
      .get("questions")
      .and_then(Value::as_array)
      .map(|qs| qs.iter().map(Question::from_value).collect())
      .unwrap_or_default();
    Self { questions }
  }
}

impl Question {
  fn from_value(v: &Value) -> Self {
    Self {
      question: json_text(v.get("question")),
      options: v
        .get("options")
        .and_then(Value::as_array)
        .map(|os| os.iter().map(|o| json_text(Some(o))).collect())
        .unwrap_or_default(),
      correct_answer: json_text(v.get("correctAnswer")),
    }
  }

  /// Position of the first option whose text equals `correct_answer`.
  pub fn correct_index(&self) -> Option<usize> {
    self.options.iter().position(|o| *o == self.correct_answer)
  }

  /// Text comparison, not index comparison: duplicated correct options all count.
  pub fn is_correct_option(&self, option_index: usize) -> bool {
    self.options
      .get(option_index)
      .map(|o| *o == self.correct_answer)
      .unwrap_or(false)
  }
}

/// Signal shown right after an answer is picked, before advancing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
  Correct,
  Incorrect,
}
