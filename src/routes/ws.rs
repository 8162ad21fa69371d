//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request,
//! except live edits: those answer after the quiet period, and only the latest
//! edit of a burst (per session) gets an answer.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use crate::editor::{Debouncer, EditOutcome};
use crate::logic::*;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "prabodha", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "prabodha", "WebSocket connected");
  // Debounced replies come back through this channel.
  let (tx, mut rx) = mpsc::unbounded_channel::<ServerWsMessage>();
  let mut conn = WsConnection::new(state, tx);

  loop {
    let reply = tokio::select! {
      incoming = socket.recv() => match incoming {
        Some(Ok(Message::Text(txt))) => {
          match serde_json::from_str::<ClientWsMessage>(&txt) {
            Ok(msg) => {
              debug!(target: "prabodha", "WS received: {:?}", &msg);
              conn.handle(msg).await
            }
            Err(e) => Some(ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }),
          }
        }
        Some(Ok(Message::Ping(payload))) => {
          let _ = socket.send(Message::Pong(payload)).await;
          None
        }
        Some(Ok(Message::Close(_))) | None => break,
        Some(Ok(_)) => None,
        Some(Err(e)) => {
          error!(target: "prabodha", error = %e, "WS receive error");
          break;
        }
      },
      Some(delayed) = rx.recv() => Some(delayed),
    };

    let Some(reply) = reply else { continue };
    let out = serde_json::to_string(&reply).unwrap_or_else(|e| {
      serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
    });
    if let Err(e) = socket.send(Message::Text(out)).await {
      error!(target: "prabodha", error = %e, "WS send error");
      break;
    }
  }
  conn.close().await;
  info!(target: "prabodha", "WebSocket disconnected");
}

fn err_msg(e: impl std::fmt::Display) -> ServerWsMessage {
  ServerWsMessage::Error { message: e.to_string() }
}

/// Per-connection state: the sessions opened over this socket and one
/// debouncer per session for live edits.
pub(crate) struct WsConnection {
  state: Arc<AppState>,
  tx: mpsc::UnboundedSender<ServerWsMessage>,
  debouncers: HashMap<String, Debouncer>,
  opened: Vec<String>,
}

impl WsConnection {
  pub(crate) fn new(state: Arc<AppState>, tx: mpsc::UnboundedSender<ServerWsMessage>) -> Self {
    Self { state, tx, debouncers: HashMap::new(), opened: Vec::new() }
  }

  fn cancel_pending(&mut self, session_id: &str) {
    if let Some(d) = self.debouncers.get_mut(session_id) {
      d.cancel();
    }
  }

  /// Handle one client message. `None` means the answer (if any) arrives later on the channel.
  #[instrument(level = "info", skip(self))]
  pub(crate) async fn handle(&mut self, msg: ClientWsMessage) -> Option<ServerWsMessage> {
    let state = &self.state.clone();
    let reply = match msg {
      ClientWsMessage::Ping => ServerWsMessage::Pong,

      ClientWsMessage::NewSession { user } => {
        let session_id = state.create_session(&user).await;
        self.opened.push(session_id.clone());
        ServerWsMessage::Session { session_id }
      }

      ClientWsMessage::NextChallenge { session_id, level, exclude_id } => {
        self.cancel_pending(&session_id);
        match next_challenge(state, &session_id, level, exclude_id.as_deref()).await {
          Ok(challenge) => ServerWsMessage::Challenge { challenge },
          Err(e) => err_msg(e),
        }
      }

      ClientWsMessage::Validate { code } => ServerWsMessage::Verdict { verdict: validate_code(&code) },

      ClientWsMessage::Run { session_id, code } => {
        // An explicit run supersedes any pending live check.
        self.cancel_pending(&session_id);
        match run_code(state, &session_id, &code).await {
          Ok(editor) => ServerWsMessage::Editor { editor },
          Err(e) => err_msg(e),
        }
      }

      ClientWsMessage::Edit { session_id, code } => match edit_code(state, &session_id, &code).await {
        Ok((EditOutcome::Buffered, editor)) => ServerWsMessage::Editor { editor },
        Ok((EditOutcome::NeedsRevalidation, _)) => {
          let delay = state.debounce;
          let state = Arc::clone(state);
          let tx = self.tx.clone();
          let id = session_id.clone();
          self.debouncers.entry(session_id).or_default().schedule(delay, async move {
            let reply = match revalidate(&state, &id).await {
              Ok(editor) => ServerWsMessage::Editor { editor },
              Err(e) => err_msg(e),
            };
            let _ = tx.send(reply);
          });
          return None;
        }
        Err(e) => err_msg(e),
      },

      ClientWsMessage::ShowSolution { session_id } => match show_solution(state, &session_id).await {
        Ok(editor) => ServerWsMessage::Editor { editor },
        Err(e) => err_msg(e),
      },

      ClientWsMessage::Complete { session_id } => match complete_challenge(state, &session_id).await {
        Ok(completion) => ServerWsMessage::Completion { completion },
        Err(e) => err_msg(e),
      },

      ClientWsMessage::Mentor { session_id, mode } => match mentor_reply(state, &session_id, mode).await {
        Ok(text) => ServerWsMessage::Mentor { text },
        Err(e) => err_msg(e),
      },

      ClientWsMessage::Progress { user } => ServerWsMessage::Progress { progress: user_progress(state, &user) },
    };
    Some(reply)
  }

  /// Stop pending checks and forget the sessions this socket opened.
  pub(crate) async fn close(mut self) {
    for (_, mut d) in self.debouncers.drain() {
      d.cancel();
    }
    self.state.remove_sessions(&self.opened).await;
  }
}
