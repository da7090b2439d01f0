//! WebSocket upgrade + message loop. Each connection owns one quiz session.
//! Client messages are parsed as JSON, mapped to session actions, and every resulting
//! view is pushed back as its own message (so `loading` arrives before the quiz does).
//! Messages that arrive while a quiz is being generated are answered and dropped.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use futures::{future, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{info, error, instrument, debug, Instrument};
use uuid::Uuid;

use crate::logic::drive;
use crate::protocol::{ClientWsMessage, ServerWsMessage, SessionView};
use crate::session::Session;
use crate::state::AppState;

pub const BUSY_MESSAGE: &str = "Quiz generation in progress; message ignored.";

/// One inbound frame: a parsed client message, or the reason it could not be parsed.
pub(crate) type Inbound = Result<ClientWsMessage, String>;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "quizgen_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| {
    let session_id = Uuid::new_v4();
    handle_ws(socket, state).instrument(tracing::info_span!("quiz_session", %session_id))
  })
}

async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
  info!(target: "quizgen_backend", "WebSocket connected");
  let (mut sender, receiver) = socket.split();
  let (tx, mut rx) = unbounded_channel::<ServerWsMessage>();

  let writer = tokio::spawn(async move {
    while let Some(reply) = rx.recv().await {
      let out = serde_json::to_string(&reply).unwrap_or_else(|e| {
        serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
      });
      if let Err(e) = sender.send(Message::Text(out)).await {
        error!(target: "quizgen_backend", error = %e, "WS send error");
        break;
      }
    }
  });

  // Ends at Close or at the first read error. Non-text frames are answered by the
  // protocol layer and skipped.
  let inbound = receiver
    .take_while(|frame| future::ready(matches!(frame, Ok(m) if !matches!(m, Message::Close(_)))))
    .filter_map(|frame| {
      future::ready(match frame {
        Ok(Message::Text(txt)) => {
          Some(serde_json::from_str::<ClientWsMessage>(&txt).map_err(|e| format!("Invalid JSON: {}", e)))
        }
        _ => None,
      })
    });
  run_session(Box::pin(inbound), &state, &tx).await;

  drop(tx);
  let _ = writer.await;
  info!(target: "quizgen_backend", "WebSocket disconnected");
}

/// Feed inbound messages through one session until the stream ends.
/// While an action is being driven (a generation call in flight), further messages are
/// not queued: each gets an error reply and is dropped.
pub(crate) async fn run_session<S>(mut inbound: S, state: &AppState, tx: &UnboundedSender<ServerWsMessage>) -> Session
where
  S: Stream<Item = Inbound> + Unpin,
{
  let mut session = Session::default();
  let _ = tx.send(view_message(&session));

  while let Some(next) = inbound.next().await {
    let incoming = match next {
      Ok(m) => m,
      Err(message) => {
        let _ = tx.send(ServerWsMessage::Error { message });
        continue;
      }
    };
    debug!(target: "quizgen_backend", "WS received: {:?}", &incoming);

    let step = handle_client_ws(incoming, session, state, tx);
    tokio::pin!(step);
    session = loop {
      tokio::select! {
        done = &mut step => break done,
        Some(queued) = inbound.next() => reject_while_busy(queued, tx),
      }
    };
  }
  session
}

fn reject_while_busy(queued: Inbound, tx: &UnboundedSender<ServerWsMessage>) {
  let reply = match queued {
    Ok(ClientWsMessage::Ping) => ServerWsMessage::Pong,
    Ok(other) => {
      debug!(target: "quizgen_backend", "WS dropped while busy: {:?}", other);
      ServerWsMessage::Error { message: BUSY_MESSAGE.into() }
    }
    Err(message) => ServerWsMessage::Error { message },
  };
  let _ = tx.send(reply);
}

/// Apply one client message to the session, queueing every view it produces.
#[instrument(level = "info", skip(session, state, tx))]
pub(crate) async fn handle_client_ws(
  msg: ClientWsMessage,
  session: Session,
  state: &AppState,
  tx: &UnboundedSender<ServerWsMessage>,
) -> Session {
  match msg.into_action() {
    None => {
      let _ = tx.send(ServerWsMessage::Pong);
      session
    }
    Some(action) => {
      drive(state, session, action, |s| {
        let _ = tx.send(view_message(s));
      })
      .await
    }
  }
}

fn view_message(session: &Session) -> ServerWsMessage {
  ServerWsMessage::View { view: SessionView::from(session) }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use axum::http::StatusCode;
  use serde_json::{json, Value};
  use tokio::sync::mpsc::UnboundedReceiver;

  use super::*;
  use crate::gateway::testing::{envelope, mock_upstream, sample_quiz, test_config, Seen};
  use crate::session::Phase;

  async fn state_against(status: StatusCode, body: String) -> (AppState, Seen) {
    let (url, seen) = mock_upstream(status, body, Duration::ZERO).await;
    (AppState::new(test_config(url)).unwrap(), seen)
  }

  fn msg(v: Value) -> ClientWsMessage {
    serde_json::from_value(v).unwrap()
  }

  fn drain(rx: &mut UnboundedReceiver<ServerWsMessage>) -> Vec<Value> {
    let mut out = Vec::new();
    while let Ok(m) = rx.try_recv() {
      out.push(serde_json::to_value(m).unwrap());
    }
    out
  }

  fn start_msg(n: i64) -> ClientWsMessage {
    msg(json!({ "type": "start_quiz", "topic": "Geography", "numQuestions": n, "difficulty": "easy" }))
  }

  #[tokio::test]
  async fn start_streams_loading_then_first_question() {
    let (state, seen) = state_against(StatusCode::OK, envelope(sample_quiz())).await;
    let (tx, mut rx) = unbounded_channel();

    let session = handle_client_ws(start_msg(2), Session::default(), &state, &tx).await;
    assert_eq!(session.phase(), Phase::Answering);

    let sent = drain(&mut rx);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0]["view"]["phase"], "loading");
    assert_eq!(sent[1]["view"]["phase"], "question");
    assert_eq!(sent[1]["view"]["question"], "Capital of France?");
    assert_eq!(seen.calls.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn invalid_start_never_calls_upstream() {
    let (state, seen) = state_against(StatusCode::OK, envelope(sample_quiz())).await;
    let (tx, mut rx) = unbounded_channel();

    for n in [0, 21] {
      let session = handle_client_ws(start_msg(n), Session::default(), &state, &tx).await;
      assert_eq!(session.phase(), Phase::Idle);
    }
    let blank = msg(json!({ "type": "start_quiz", "topic": "  ", "numQuestions": 3, "difficulty": "easy" }));
    handle_client_ws(blank, Session::default(), &state, &tx).await;

    let sent = drain(&mut rx);
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0]["view"]["error"], "Number of questions must be between 1 and 20.");
    assert_eq!(sent[2]["view"]["error"], "Please enter a valid topic.");
    assert!(seen.calls.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn upstream_failure_returns_to_idle_with_generic_message() {
    let (state, _) = state_against(StatusCode::INTERNAL_SERVER_ERROR, "boom".into()).await;
    let (tx, mut rx) = unbounded_channel();

    let session = handle_client_ws(start_msg(3), Session::default(), &state, &tx).await;
    assert_eq!(session.phase(), Phase::Idle);
    assert!(session.quiz.is_none());

    let sent = drain(&mut rx);
    assert_eq!(sent.last().unwrap()["view"], json!({ "phase": "idle", "error": "Failed to generate quiz. Please try again." }));
  }

  #[tokio::test]
  async fn full_session_over_messages() {
    let (state, _) = state_against(StatusCode::OK, envelope(sample_quiz())).await;
    let (tx, mut rx) = unbounded_channel();

    let mut session = handle_client_ws(start_msg(2), Session::default(), &state, &tx).await;
    for m in [
      json!({ "type": "select_answer", "optionIndex": 0 }),
      json!({ "type": "next_question" }),
      json!({ "type": "select_answer", "optionIndex": 1 }),
      json!({ "type": "next_question" }),
    ] {
      session = handle_client_ws(msg(m), session, &state, &tx).await;
    }
    assert_eq!(session.phase(), Phase::Finished);

    let sent = drain(&mut rx);
    let results = &sent.last().unwrap()["view"];
    assert_eq!(results["phase"], "results");
    assert_eq!(results["score"], 2);
    assert_eq!(results["verdict"], "pass");
    assert_eq!(results["headline"], "Congratulations!");

    let session = handle_client_ws(msg(json!({ "type": "new_quiz" })), session, &state, &tx).await;
    assert_eq!(session, Session::default());
  }

  #[tokio::test]
  async fn actions_sent_during_generation_are_dropped() {
    let (url, seen) = mock_upstream(StatusCode::OK, envelope(sample_quiz()), Duration::from_millis(200)).await;
    let state = AppState::new(test_config(url)).unwrap();
    let (tx, mut rx) = unbounded_channel();

    let inbound = futures::stream::iter(vec![
      Ok(start_msg(2)),
      Ok(msg(json!({ "type": "select_answer", "optionIndex": 0 }))),
      Ok(msg(json!({ "type": "ping" }))),
    ]);
    let session = run_session(inbound, &state, &tx).await;

    assert_eq!(session.phase(), Phase::Answering);
    assert!(session.progress.answers.is_empty());
    assert!(session.progress.feedback.is_none());
    assert_eq!(seen.calls.lock().unwrap().len(), 1);

    let sent = drain(&mut rx);
    let kinds: Vec<_> = sent.iter().map(|m| m["type"].as_str().unwrap_or_default().to_string()).collect();
    assert_eq!(kinds, ["view", "view", "error", "pong", "view"]);
    assert_eq!(sent[1]["view"]["phase"], "loading");
    assert_eq!(sent[2]["message"], BUSY_MESSAGE);
    assert_eq!(sent[4]["view"]["phase"], "question");
    assert!(sent[4]["view"].get("selected").is_none());
  }

  #[tokio::test]
  async fn messages_after_generation_apply_normally() {
    let (state, _) = state_against(StatusCode::OK, envelope(sample_quiz())).await;
    let (tx, mut rx) = unbounded_channel();

    let inbound = futures::stream::iter(vec![Ok(start_msg(2)), Err("Invalid JSON: eof".to_string())]);
    let session = run_session(inbound, &state, &tx).await;
    assert_eq!(session.phase(), Phase::Answering);

    // Nothing left in flight, so a select now lands.
    let session = handle_client_ws(msg(json!({ "type": "select_answer", "optionIndex": 0 })), session, &state, &tx).await;
    assert_eq!(session.progress.answers.get(&0), Some(&0));

    let sent = drain(&mut rx);
    assert!(sent.iter().any(|m| m["type"] == "error" && m["message"] == "Invalid JSON: eof"));
  }

  #[tokio::test]
  async fn numeric_options_from_upstream_show_as_text() {
    let quiz = json!({ "questions": [{ "question": "2 + 2?", "options": [3, 4], "correctAnswer": 4 }] });
    let (state, _) = state_against(StatusCode::OK, envelope(quiz)).await;
    let (tx, mut rx) = unbounded_channel();

    let session = handle_client_ws(start_msg(1), Session::default(), &state, &tx).await;
    let session = handle_client_ws(msg(json!({ "type": "select_answer", "optionIndex": 1 })), session, &state, &tx).await;
    assert_eq!(session.phase(), Phase::Reviewing);

    let sent = drain(&mut rx);
    let view = &sent.last().unwrap()["view"];
    assert_eq!(view["options"], json!(["3", "4"]));
    assert_eq!(view["feedback"], "correct");
  }

  #[tokio::test]
  async fn ping_gets_pong_without_touching_session() {
    let (state, _) = state_against(StatusCode::OK, envelope(sample_quiz())).await;
    let (tx, mut rx) = unbounded_channel();

    let session = handle_client_ws(msg(json!({ "type": "ping" })), Session::default(), &state, &tx).await;
    assert_eq!(session, Session::default());
    assert_eq!(drain(&mut rx), vec![json!({ "type": "pong" })]);
  }
}
