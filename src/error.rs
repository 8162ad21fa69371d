//! API-facing errors. Handlers return `Result<_, ApiError>`; the error turns
//! into a JSON `{ "error": ... }` body with a matching status code.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::editor::EditorError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("Unknown session: {0}")]
  UnknownSession(String),

  #[error("Unknown challenge: {0}")]
  UnknownChallenge(String),

  #[error("No challenges for level {0}")]
  NoChallenges(u32),

  #[error("No active challenge in this session")]
  NoActiveChallenge,

  #[error(transparent)]
  Editor(#[from] EditorError),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::UnknownSession(_) | ApiError::UnknownChallenge(_) | ApiError::NoChallenges(_) => StatusCode::NOT_FOUND,
      ApiError::NoActiveChallenge => StatusCode::CONFLICT,
      ApiError::Editor(_) => StatusCode::FORBIDDEN,
    }
  }
}

#[derive(Serialize)]
struct ErrorOut {
  error: String,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> axum::response::Response {
    (self.status(), Json(ErrorOut { error: self.to_string() })).into_response()
  }
}

pub type Result<T> = std::result::Result<T, ApiError>;
