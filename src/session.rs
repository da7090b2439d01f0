//! Quiz session state machine.
//!
//! All mutation goes through [`transition`], a pure function from the current session and a
//! user (or Gateway) action to the next session plus an [`Effect`] for the driver to run.
//! Actions that make no sense in the current phase leave the session untouched.
//!
//! ```text
//! Idle --start(valid)--> Loading --loaded--> Answering --select--> Reviewing --next--> Answering
//!   ^                       |                                          |
//!   +------- failed --------+                                     next(last)
//!   +---------------------------- new quiz ----------- Finished <------+
//! ```

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::domain::{Feedback, Quiz, QuizRequest};
use crate::error::GatewayError;
use crate::scoring::{self, ScoreReport};

pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate quiz. Please try again.";
pub const GENERATION_TIMED_OUT_MESSAGE: &str = "Quiz generation timed out. Please try again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
  Idle,
  Loading,
  Answering,
  Reviewing,
  Finished,
}

/// Progress through the loaded quiz. Reset whenever a new quiz is loaded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionState {
  pub current_question_index: usize,
  /// question index -> selected option index
  pub answers: HashMap<usize, usize>,
  pub feedback: Option<Feedback>,
  pub completed: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
  pub quiz: Option<Quiz>,
  pub progress: SessionState,
  pub loading: bool,
  /// Last user-facing message (validation or generic generation failure).
  pub error: Option<String>,
}

#[derive(Debug)]
pub enum Action {
  Start { topic: String, num_questions: i64, difficulty: String },
  QuizLoaded(Quiz),
  GenerationFailed(GatewayError),
  Select(usize),
  Advance,
  Restart,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Effect {
  None,
  /// Call the Gateway once and feed the outcome back as `QuizLoaded` / `GenerationFailed`.
  Generate(QuizRequest),
}

impl Session {
  pub fn phase(&self) -> Phase {
    if self.loading {
      return Phase::Loading;
    }
    match &self.quiz {
      None => Phase::Idle,
      Some(_) if self.progress.completed => Phase::Finished,
      Some(_) if self.progress.feedback.is_some() => Phase::Reviewing,
      Some(_) => Phase::Answering,
    }
  }

  pub fn question_count(&self) -> usize {
    self.quiz.as_ref().map(|q| q.questions.len()).unwrap_or(0)
  }

  /// Score of a finished attempt. Pure, so safe to call on every render.
  pub fn report(&self) -> Option<ScoreReport> {
    match (&self.quiz, self.phase()) {
      (Some(quiz), Phase::Finished) => Some(scoring::score(quiz, &self.progress.answers)),
      _ => None,
    }
  }
}

pub fn transition(session: Session, action: Action) -> (Session, Effect) {
  let phase = session.phase();
  match (phase, action) {
    (Phase::Idle, Action::Start { topic, num_questions, difficulty }) => {
      match QuizRequest::validate(&topic, num_questions, &difficulty) {
        Ok(req) => {
          info!(target: "session", topic = %req.topic(), num_questions = req.num_questions(), difficulty = %req.difficulty(), "Starting quiz generation");
          let next = Session { loading: true, error: None, ..session };
          (next, Effect::Generate(req))
        }
        Err(e) => {
          debug!(target: "session", error = %e, "Start rejected by validation");
          (Session { error: Some(e.to_string()), ..session }, Effect::None)
        }
      }
    }

    (Phase::Loading, Action::QuizLoaded(quiz)) => {
      if quiz.questions.is_empty() {
        warn!(target: "session", "Generated quiz has no questions");
        return (failed(GENERATION_FAILED_MESSAGE), Effect::None);
      }
      info!(target: "session", questions = quiz.questions.len(), "Quiz loaded");
      let next = Session {
        quiz: Some(quiz),
        progress: SessionState::default(),
        loading: false,
        error: None,
      };
      (next, Effect::None)
    }

    (Phase::Loading, Action::GenerationFailed(e)) => {
      warn!(target: "session", error = %e, "Quiz generation failed");
      let message = if e.is_timeout() { GENERATION_TIMED_OUT_MESSAGE } else { GENERATION_FAILED_MESSAGE };
      (failed(message), Effect::None)
    }

    (Phase::Answering, Action::Select(option)) => {
      let index = session.progress.current_question_index;
      let Some(question) = session.quiz.as_ref().and_then(|q| q.questions.get(index)) else {
        return (session, Effect::None);
      };
      if option >= question.options.len() {
        debug!(target: "session", question = index, option, "Ignoring out-of-range option");
        return (session, Effect::None);
      }
      let feedback = if question.is_correct_option(option) { Feedback::Correct } else { Feedback::Incorrect };

      let mut next = session;
      next.progress.answers.insert(index, option);
      next.progress.feedback = Some(feedback);
      (next, Effect::None)
    }

    (Phase::Reviewing, Action::Advance) => {
      let last = session.question_count().saturating_sub(1);
      let mut next = session;
      next.progress.feedback = None;
      if next.progress.current_question_index < last {
        next.progress.current_question_index += 1;
      } else {
        next.progress.completed = true;
        if let Some(report) = next.report() {
          info!(target: "session", score = report.score, total = report.total, verdict = ?report.verdict, "Quiz finished");
        }
      }
      (next, Effect::None)
    }

    (Phase::Finished, Action::Restart) => (Session::default(), Effect::None),

    (phase, action) => {
      debug!(target: "session", ?phase, ?action, "Action ignored in current phase");
      (session, Effect::None)
    }
  }
}

fn failed(message: &str) -> Session {
  Session { error: Some(message.to_string()), ..Session::default() }
}
