//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Running session effects and feeding their outcome back into the state machine
//!   - Driving one client action through every follow-up it triggers

use crate::domain::Quiz;
use crate::session::{transition, Action, Effect, Session};
use crate::state::AppState;

/// Run an effect to completion. Returns the action that reports its outcome, if any.
pub async fn perform(state: &AppState, effect: Effect) -> Option<Action> {
  match effect {
    Effect::None => None,
    Effect::Generate(req) => {
      let outcome = state
        .gateway
        .generate(req.topic(), &req.num_questions().to_string(), req.difficulty().as_str())
        .await;
      Some(match outcome {
        Ok(raw) => Action::QuizLoaded(Quiz::from_value(&raw)),
        Err(e) => Action::GenerationFailed(e),
      })
    }
  }
}

/// Apply an action and every follow-up it triggers, calling `on_view` after each step
/// so the client sees intermediate phases such as `loading`.
pub async fn drive<F>(state: &AppState, session: Session, action: Action, mut on_view: F) -> Session
where
  F: FnMut(&Session),
{
  let (mut session, mut effect) = transition(session, action);
  on_view(&session);
  while let Some(follow_up) = perform(state, effect).await {
    (session, effect) = transition(session, follow_up);
    on_view(&session);
  }
  session
}
