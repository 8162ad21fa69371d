//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Path, Query, State}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::Result;
use crate::logic::*;
use crate::progress::leaderboard;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, challenges: state.catalog.len() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_levels(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(LevelsOut { levels: state.catalog.levels() })
}

#[instrument(level = "info", skip(state, body), fields(user = %body.user))]
pub async fn http_post_session(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SessionIn>,
) -> impl IntoResponse {
  let session_id = state.create_session(&body.user).await;
  Json(SessionOut { session_id })
}

#[instrument(level = "info", skip(state, body), fields(session_id = %body.session_id, level = body.level))]
pub async fn http_post_next_challenge(
  State(state): State<Arc<AppState>>,
  Json(body): Json<NextChallengeIn>,
) -> Result<Json<ChallengeOut>> {
  let ch = next_challenge(&state, &body.session_id, body.level, body.exclude_id.as_deref()).await?;
  info!(target: "challenge", id = %ch.id, level = ch.level, "HTTP challenge served");
  Ok(Json(ch))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_challenge(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<ChallengeOut>> {
  Ok(Json(get_challenge(&state, &id)?))
}

#[instrument(level = "info", skip(body), fields(code_len = body.code.len()))]
pub async fn http_post_validate(Json(body): Json<ValidateIn>) -> impl IntoResponse {
  Json(validate_code(&body.code))
}

#[instrument(level = "info", skip(state, body), fields(session_id = %body.session_id, code_len = body.code.len()))]
pub async fn http_post_run(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CodeIn>,
) -> Result<Json<EditorOut>> {
  let out = run_code(&state, &body.session_id, &body.code).await?;
  info!(target: "gate", session = %body.session_id, attempts = out.attempts, error = ?out.error, "HTTP run evaluated");
  Ok(Json(out))
}

/// Clients debounce on their side; the edit is re-validated right away once live.
#[instrument(level = "debug", skip(state, body), fields(session_id = %body.session_id, code_len = body.code.len()))]
pub async fn http_post_edit(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CodeIn>,
) -> Result<Json<EditorOut>> {
  Ok(Json(edit_and_revalidate(&state, &body.session_id, &body.code).await?))
}

#[instrument(level = "info", skip(state, body), fields(session_id = %body.session_id))]
pub async fn http_post_solution(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SessionRef>,
) -> Result<Json<EditorOut>> {
  Ok(Json(show_solution(&state, &body.session_id).await?))
}

#[instrument(level = "info", skip(state, body), fields(session_id = %body.session_id))]
pub async fn http_post_complete(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SessionRef>,
) -> Result<Json<CompletionOut>> {
  Ok(Json(complete_challenge(&state, &body.session_id).await?))
}

#[instrument(level = "info", skip(state), fields(user = %q.user))]
pub async fn http_get_progress(
  State(state): State<Arc<AppState>>,
  Query(q): Query<UserQuery>,
) -> impl IntoResponse {
  Json(user_progress(&state, &q.user))
}

#[instrument(level = "info", skip(state), fields(user = %q.user))]
pub async fn http_get_leaderboard(
  State(state): State<Arc<AppState>>,
  Query(q): Query<UserQuery>,
) -> impl IntoResponse {
  let xp = state.store.load(&q.user).xp;
  Json(LeaderboardOut { entries: leaderboard(xp) })
}

#[instrument(level = "info", skip(state, body), fields(session_id = %body.session_id, mode = ?body.mode))]
pub async fn http_post_mentor(
  State(state): State<Arc<AppState>>,
  Json(body): Json<MentorIn>,
) -> Result<Json<MentorOut>> {
  let text = mentor_reply(&state, &body.session_id, body.mode).await?;
  info!(target: "prabodha", session = %body.session_id, "HTTP mentor reply served");
  Ok(Json(MentorOut { text }))
}
