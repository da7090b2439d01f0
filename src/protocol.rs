//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Feedback;
use crate::scoring::Verdict;
use crate::session::{Action, Phase, Session};
use crate::util::json_text;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartQuiz {
        topic: String,
        #[serde(rename = "numQuestions")]
        num_questions: i64,
        difficulty: String,
    },
    SelectAnswer {
        #[serde(rename = "optionIndex")]
        option_index: usize,
    },
    NextQuestion,
    NewQuiz,
}

impl ClientWsMessage {
    /// Session action carried by this message, if any.
    pub fn into_action(self) -> Option<Action> {
        match self {
            ClientWsMessage::Ping => None,
            ClientWsMessage::StartQuiz { topic, num_questions, difficulty } => {
                Some(Action::Start { topic, num_questions, difficulty })
            }
            ClientWsMessage::SelectAnswer { option_index } => Some(Action::Select(option_index)),
            ClientWsMessage::NextQuestion => Some(Action::Advance),
            ClientWsMessage::NewQuiz => Some(Action::Restart),
        }
    }
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    View {
        view: SessionView,
    },
    Error {
        message: String,
    },
}

/// What the client should render for the current phase.
#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionView {
    Idle {
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Loading,
    Question {
        index: usize,
        total: usize,
        /// 0..=100, share of the quiz reached including the current question.
        progress: f64,
        question: String,
        options: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        selected: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        feedback: Option<Feedback>,
        /// Revealed only once feedback is shown.
        #[serde(rename = "correctAnswer", skip_serializing_if = "Option::is_none")]
        correct_answer: Option<String>,
        #[serde(rename = "isLast")]
        is_last: bool,
    },
    Results {
        score: usize,
        total: usize,
        percentage: f64,
        verdict: Verdict,
        headline: &'static str,
        message: &'static str,
    },
}

impl From<&Session> for SessionView {
    fn from(s: &Session) -> Self {
        match s.phase() {
            Phase::Idle => SessionView::Idle { error: s.error.clone() },
            Phase::Loading => SessionView::Loading,
            Phase::Answering | Phase::Reviewing => {
                let index = s.progress.current_question_index;
                let total = s.question_count();
                let question = s.quiz.as_ref().and_then(|q| q.questions.get(index)).cloned().unwrap_or_default();
                let feedback = s.progress.feedback;
                SessionView::Question {
                    index,
                    total,
                    progress: if total == 0 { 0.0 } else { 100.0 * (index + 1) as f64 / total as f64 },
                    question: question.question,
                    options: question.options,
                    selected: s.progress.answers.get(&index).copied(),
                    feedback,
                    correct_answer: feedback.map(|_| question.correct_answer),
                    is_last: index + 1 >= total,
                }
            }
            Phase::Finished => match s.report() {
                Some(r) => SessionView::Results {
                    score: r.score,
                    total: r.total,
                    percentage: (r.percentage * 100.0).round() / 100.0,
                    verdict: r.verdict,
                    headline: r.verdict.headline(),
                    message: r.verdict.message(),
                },
                None => SessionView::Idle { error: None },
            },
        }
    }
}

//
// HTTP request/response DTOs
//

/// Body of `POST /api/generate`. Forwarded to the Gateway as received: any JSON value is
/// accepted for each field and rendered into the instruction as text.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateIn {
    #[serde(default)]
    pub topic: Value,
    #[serde(default, rename = "numQuestions")]
    pub num_questions: Value,
    #[serde(default)]
    pub difficulty: Value,
}

impl GenerateIn {
    /// `(topic, num_questions, difficulty)` as instruction text.
    pub fn instruction_parts(&self) -> (String, String, String) {
        (
            json_text(Some(&self.topic)),
            json_text(Some(&self.num_questions)),
            json_text(Some(&self.difficulty)),
        )
    }
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
