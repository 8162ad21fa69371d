//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Serving challenges through the session's rotation
//!   - Run / live edit / solution reveal on the session's editor
//!   - Completing challenges and reporting progress
//!   - Canned mentor responses

use tracing::{debug, info, instrument};

use crate::editor::EditOutcome;
use crate::error::{ApiError, Result};
use crate::gate::{self, Verdict};
use crate::mentor::{self, MentorMode};
use crate::catalog::Catalog;
use crate::progress::{self, current_rank, level_progress, next_rank, xp_progress, Progress};
use crate::protocol::{editor_out, to_out, ChallengeOut, CompletionOut, EditorOut, ProgressOut};
use crate::state::{touch, AppState};
use crate::util::trunc_for_log;

pub fn progress_out(catalog: &Catalog, progress: Progress) -> ProgressOut {
  let xp = progress.xp;
  let levels = catalog
    .levels()
    .into_iter()
    .map(|l| (l.level, level_progress(catalog, &progress, l.level)))
    .collect();
  ProgressOut { progress, rank: current_rank(xp), next_rank: next_rank(xp), xp_progress: xp_progress(xp), levels }
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn next_challenge(
  state: &AppState,
  session_id: &str,
  level: u32,
  exclude_id: Option<&str>,
) -> Result<ChallengeOut> {
  let (challenge, user) = {
    let mut sessions = state.sessions.write().await;
    let session = touch(&mut sessions, session_id)?;
    let mut rng = rand::thread_rng();
    let picked = session
      .next_challenge(&state.catalog, level, exclude_id, &mut rng)
      .ok_or(ApiError::NoChallenges(level))?;
    (picked, session.user.clone())
  };
  let completed = state.store.load(&user).is_completed(&challenge.id);
  info!(target: "challenge", level, id = %challenge.id, ?exclude_id, "Challenge served");
  Ok(to_out(&challenge, completed))
}

pub fn get_challenge(state: &AppState, id: &str) -> Result<ChallengeOut> {
  state
    .get_challenge(id)
    .map(|c| to_out(c, false))
    .ok_or_else(|| ApiError::UnknownChallenge(id.to_string()))
}

#[instrument(level = "info", skip(code), fields(code_len = code.len()))]
pub fn validate_code(code: &str) -> Verdict {
  let v = gate::validate(code);
  debug!(target: "gate", acceptable = v.acceptable, code = %trunc_for_log(code, 80), "Stateless validation");
  v
}

#[instrument(level = "info", skip(state, code), fields(%session_id, code_len = code.len()))]
pub async fn run_code(state: &AppState, session_id: &str, code: &str) -> Result<EditorOut> {
  let mut sessions = state.sessions.write().await;
  let session = touch(&mut sessions, session_id)?;
  session.editor.edit(code);
  let verdict = session.editor.run();
  Ok(editor_out(&session.editor, Some(verdict)))
}

/// Store an edit. Returns the snapshot and whether a re-validation is due.
#[instrument(level = "debug", skip(state, code), fields(%session_id, code_len = code.len()))]
pub async fn edit_code(state: &AppState, session_id: &str, code: &str) -> Result<(EditOutcome, EditorOut)> {
  let mut sessions = state.sessions.write().await;
  let session = touch(&mut sessions, session_id)?;
  let outcome = session.editor.edit(code);
  Ok((outcome, editor_out(&session.editor, None)))
}

#[instrument(level = "debug", skip(state), fields(%session_id))]
pub async fn revalidate(state: &AppState, session_id: &str) -> Result<EditorOut> {
  let mut sessions = state.sessions.write().await;
  let session = touch(&mut sessions, session_id)?;
  let verdict = session.editor.revalidate();
  Ok(editor_out(&session.editor, verdict))
}

/// Edit followed by an immediate re-validation when the session is live.
pub async fn edit_and_revalidate(state: &AppState, session_id: &str, code: &str) -> Result<EditorOut> {
  match edit_code(state, session_id, code).await? {
    (EditOutcome::NeedsRevalidation, _) => revalidate(state, session_id).await,
    (EditOutcome::Buffered, out) => Ok(out),
  }
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn show_solution(state: &AppState, session_id: &str) -> Result<EditorOut> {
  let mut sessions = state.sessions.write().await;
  let session = touch(&mut sessions, session_id)?;
  let id = session.current.clone().ok_or(ApiError::NoActiveChallenge)?;
  let challenge = state.get_challenge(&id).ok_or_else(|| ApiError::UnknownChallenge(id.clone()))?;
  let completed = state.store.load(&session.user).is_completed(&id);
  session.editor.reveal_solution(challenge, completed)?;
  Ok(editor_out(&session.editor, None))
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn complete_challenge(state: &AppState, session_id: &str) -> Result<CompletionOut> {
  let (user, id) = {
    let mut sessions = state.sessions.write().await;
    let session = touch(&mut sessions, session_id)?;
    let id = session.current.clone().ok_or(ApiError::NoActiveChallenge)?;
    (session.user.clone(), id)
  };
  let challenge = state.get_challenge(&id).ok_or_else(|| ApiError::UnknownChallenge(id.clone()))?;

  let _guard = state.lock_progress(&user).await;
  let mut p = state.store.load(&user);
  let awarded = progress::mark_complete(&mut p, challenge, progress::today());
  if awarded {
    state.store.save(&user, &p);
  }
  let xp_earned = if awarded { challenge.xp_reward } else { 0 };
  info!(target: "challenge", %user, %id, awarded, xp = p.xp, "Challenge completed");
  Ok(CompletionOut { challenge_id: id, awarded, xp_earned, progress: progress_out(&state.catalog, p) })
}

#[instrument(level = "info", skip(state), fields(%session_id, ?mode))]
pub async fn mentor_reply(state: &AppState, session_id: &str, mode: MentorMode) -> Result<String> {
  let id = {
    let mut sessions = state.sessions.write().await;
    let session = touch(&mut sessions, session_id)?;
    session.current.clone().ok_or(ApiError::NoActiveChallenge)?
  };
  let challenge = state.get_challenge(&id).ok_or_else(|| ApiError::UnknownChallenge(id.clone()))?;
  let text = mentor::respond(mode, challenge, &mut rand::thread_rng());
  debug!(target: "prabodha", %id, "Mentor reply via canned responses.");
  Ok(text)
}

pub fn user_progress(state: &AppState, user: &str) -> ProgressOut {
  progress_out(&state.catalog, state.store.load(user))
}
