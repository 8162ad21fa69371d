//! Code acceptability gate: cheap static checks run on user markup before it
//! is handed to the preview sandbox.
//!
//! Checks run in order and stop at the first failure:
//!   1. empty input
//!   2. no tag at all
//!   3. brace balance inside the first `<style>` block
//!   4. quote balance inside the same block
//!   5. structural scan of the whole document (`markup::scan`)
//!   6. `<style>` / `</style>` pairing over the whole document
//!
//! `validate` never panics; anything unexpected becomes `Rejection::Internal`.

use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::Serialize;
use tracing::{debug, instrument, warn};

pub mod markup;

/// Longest parser message excerpt carried into a rejection reason.
pub const PARSE_EXCERPT_MAX: usize = 50;

static ANY_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]+>").ok());
static STYLE_BLOCK: LazyLock<Option<Regex>> =
  LazyLock::new(|| Regex::new(r"(?i)<style[^>]*>([\s\S]*?)</style>").ok());
static STYLE_OPEN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)<style[^>]*>").ok());
static STYLE_CLOSE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)</style>").ok());

fn compiled(re: &'static LazyLock<Option<Regex>>) -> Result<&'static Regex, Rejection> {
  LazyLock::force(re).as_ref().ok_or_else(|| Rejection::Internal("pattern failed to compile".into()))
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
  #[error("Code is empty.")]
  Empty,
  #[error("Missing HTML tags.")]
  MissingTags,
  #[error("Unclosed CSS braces ({open} open, {close} close)")]
  UnbalancedBraces { open: usize, close: usize },
  #[error("Unclosed single quote in CSS")]
  UnclosedSingleQuote,
  #[error("Unclosed double quote in CSS")]
  UnclosedDoubleQuote,
  #[error("HTML parsing error: {0}")]
  Parse(String),
  #[error("Unclosed <style> tag.")]
  UnclosedStyleTag,
  #[error("Code validation error: {0}")]
  Internal(String),
}

impl Rejection {
  /// Stable machine-readable tag for the rejection class.
  pub fn kind(&self) -> &'static str {
    match self {
      Rejection::Empty => "empty",
      Rejection::MissingTags => "missing_tags",
      Rejection::UnbalancedBraces { .. } => "brace_imbalance",
      Rejection::UnclosedSingleQuote | Rejection::UnclosedDoubleQuote => "quote_imbalance",
      Rejection::Parse(_) => "parse_error",
      Rejection::UnclosedStyleTag => "style_tag_mismatch",
      Rejection::Internal(_) => "internal",
    }
  }
}

/// Outcome of one validation call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Verdict {
  pub acceptable: bool,
  pub reason: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub kind: Option<&'static str>,
}

impl Verdict {
  pub fn accepted() -> Self {
    Self { acceptable: true, reason: None, kind: None }
  }

  pub fn rejected(r: &Rejection) -> Self {
    Self { acceptable: false, reason: Some(r.to_string()), kind: Some(r.kind()) }
  }
}

impl From<Result<(), Rejection>> for Verdict {
  fn from(r: Result<(), Rejection>) -> Self {
    match r {
      Ok(()) => Verdict::accepted(),
      Err(e) => Verdict::rejected(&e),
    }
  }
}

/// Validate `source` for preview rendering.
#[instrument(level = "debug", skip(source), fields(source_len = source.len()))]
pub fn validate(source: &str) -> Verdict {
  let outcome = panic::catch_unwind(AssertUnwindSafe(|| check(source)))
    .unwrap_or_else(|payload| Err(Rejection::Internal(panic_message(payload.as_ref()))));

  match &outcome {
    Ok(()) => debug!(target: "gate", "Code accepted"),
    Err(Rejection::Internal(msg)) => warn!(target: "gate", error = %msg, "Validation failed unexpectedly"),
    Err(r) => debug!(target: "gate", kind = r.kind(), reason = %r, "Code rejected"),
  }
  outcome.into()
}

/// Run all checks, returning the first rejection.
pub fn check(source: &str) -> Result<(), Rejection> {
  check_not_empty(source)?;
  check_has_tag(source)?;
  let style_block = compiled(&STYLE_BLOCK)?;
  if let Some(css) = style_block.captures(source).and_then(|c| c.get(1)).map(|m| m.as_str()) {
    check_braces(css)?;
    check_quotes(css)?;
  }
  check_structure(source)?;
  check_style_pairing(source)
}

fn check_not_empty(source: &str) -> Result<(), Rejection> {
  if source.trim().is_empty() { Err(Rejection::Empty) } else { Ok(()) }
}

fn check_has_tag(source: &str) -> Result<(), Rejection> {
  if compiled(&ANY_TAG)?.is_match(source) { Ok(()) } else { Err(Rejection::MissingTags) }
}

fn check_braces(css: &str) -> Result<(), Rejection> {
  let open = css.matches('{').count();
  let close = css.matches('}').count();
  if open != close {
    return Err(Rejection::UnbalancedBraces { open, close });
  }
  Ok(())
}

fn check_quotes(css: &str) -> Result<(), Rejection> {
  if css.matches('\'').count() % 2 != 0 {
    return Err(Rejection::UnclosedSingleQuote);
  }
  if css.matches('"').count() % 2 != 0 {
    return Err(Rejection::UnclosedDoubleQuote);
  }
  Ok(())
}

fn check_structure(source: &str) -> Result<(), Rejection> {
  match markup::scan(source) {
    Ok(summary) => {
      debug!(target: "gate", elements = summary.elements, "Structural scan passed");
      Ok(())
    }
    Err(e) => {
      let excerpt: String = e.to_string().chars().take(PARSE_EXCERPT_MAX).collect();
      Err(Rejection::Parse(excerpt))
    }
  }
}

fn check_style_pairing(source: &str) -> Result<(), Rejection> {
  let opens = compiled(&STYLE_OPEN)?.find_iter(source).count();
  let closes = compiled(&STYLE_CLOSE)?.find_iter(source).count();
  if opens != closes {
    return Err(Rejection::UnclosedStyleTag);
  }
  Ok(())
}

/// Content of the first `<style ...>...</style>` block, matched case-insensitively.
pub fn first_style_block(source: &str) -> Option<&str> {
  compiled(&STYLE_BLOCK).ok()?.captures(source).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown error".into()
  }
}
