//! Editor session state machine: explicit run, live re-validation after the
//! first run, and a single-slot debouncer for live edits.
//!
//! States:
//!   - before the first run, edits only update the buffer;
//!   - `run` validates and promotes the buffer to `last_good` or records the error;
//!   - after the first run, every edit is re-validated (debounced by the caller).

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::Challenge;
use crate::gate::{self, Verdict};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
  #[error("Make at least one attempt before seeing the solution.")]
  SolutionLocked,
}

/// What the caller should do after an edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOutcome {
  /// No run yet; nothing to re-validate.
  Buffered,
  /// Live mode; schedule a (debounced) `revalidate`.
  NeedsRevalidation,
}

#[derive(Clone, Debug, Default)]
pub struct EditorSession {
  pub code: String,
  /// Last accepted code; drives the preview. `None` hides the preview.
  pub last_good: Option<String>,
  pub error: Option<String>,
  pub has_run: bool,
  pub attempts: u32,
  pub showing_solution: bool,
}

impl EditorSession {
  pub fn new(code: impl Into<String>) -> Self {
    Self { code: code.into(), ..Self::default() }
  }

  /// Start over with a new challenge's starter code.
  pub fn load_challenge(&mut self, challenge: &Challenge) {
    *self = Self::new(challenge.starter_code.clone());
  }

  pub fn edit(&mut self, code: impl Into<String>) -> EditOutcome {
    self.code = code.into();
    if self.has_run { EditOutcome::NeedsRevalidation } else { EditOutcome::Buffered }
  }

  /// Explicit run: counts an attempt and switches to live mode.
  pub fn run(&mut self) -> Verdict {
    self.attempts += 1;
    self.has_run = true;
    let v = self.apply();
    info!(target: "gate", attempts = self.attempts, acceptable = v.acceptable, "Run");
    v
  }

  /// Live re-validation of the current buffer. No-op before the first run.
  pub fn revalidate(&mut self) -> Option<Verdict> {
    if !self.has_run {
      return None;
    }
    Some(self.apply())
  }

  fn apply(&mut self) -> Verdict {
    let v = gate::validate(&self.code);
    if v.acceptable {
      self.last_good = Some(self.code.clone());
      self.error = None;
    } else {
      self.last_good = None;
      self.error = v.reason.clone();
    }
    v
  }

  /// Put the reference solution in the buffer. Requires an attempt unless
  /// the challenge was already completed.
  pub fn reveal_solution(&mut self, challenge: &Challenge, completed: bool) -> Result<(), EditorError> {
    if self.attempts < 1 && !completed {
      return Err(EditorError::SolutionLocked);
    }
    self.code = challenge.solution_code.clone();
    self.showing_solution = true;
    debug!(target: "challenge", id = %challenge.id, "Solution revealed");
    Ok(())
  }
}

/// Single-slot delayed task: scheduling replaces whatever was pending.
#[derive(Debug, Default)]
pub struct Debouncer {
  pending: Option<JoinHandle<()>>,
}

impl Debouncer {
  pub fn new() -> Self { Self::default() }

  /// Run `task` after `delay` unless superseded by another `schedule` or `cancel`.
  pub fn schedule<F>(&mut self, delay: Duration, task: F)
  where
    F: Future<Output = ()> + Send + 'static,
  {
    self.cancel();
    self.pending = Some(tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      task.await;
    }));
  }

  pub fn cancel(&mut self) {
    if let Some(h) = self.pending.take() {
      h.abort();
    }
  }

  pub fn is_pending(&self) -> bool {
    self.pending.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
  }
}

impl Drop for Debouncer {
  fn drop(&mut self) {
    self.cancel();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::tests::challenge;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  #[test]
  fn edits_before_first_run_only_buffer() {
    let mut ed = EditorSession::new("<div></div>");
    assert_eq!(ed.edit("<p>x</p>"), EditOutcome::Buffered);
    assert_eq!(ed.revalidate(), None);
    assert!(ed.last_good.is_none());
    assert!(ed.error.is_none());
  }

  #[test]
  fn run_accepts_and_promotes_code() {
    let mut ed = EditorSession::new("<style>.a{}</style><div class=\"a\"></div>");
    let v = ed.run();
    assert!(v.acceptable);
    assert_eq!(ed.last_good.as_deref(), Some(ed.code.as_str()));
    assert_eq!(ed.error, None);
    assert_eq!(ed.attempts, 1);
    assert!(ed.has_run);
  }

  #[test]
  fn rejection_clears_preview_and_sets_error() {
    let mut ed = EditorSession::new("<div></div>");
    ed.run();
    assert!(ed.last_good.is_some());
    assert_eq!(ed.edit("<style>.a{</style><div></div>"), EditOutcome::NeedsRevalidation);
    let v = ed.revalidate().unwrap();
    assert!(!v.acceptable);
    assert!(ed.last_good.is_none());
    assert_eq!(ed.error.as_deref(), Some("Unclosed CSS braces (1 open, 0 close)"));
    assert_eq!(ed.attempts, 1);
  }

  #[test]
  fn live_revalidation_recovers_after_fix() {
    let mut ed = EditorSession::new("");
    ed.run();
    assert_eq!(ed.error.as_deref(), Some("Code is empty."));
    ed.edit("<b>fixed</b>");
    assert!(ed.revalidate().unwrap().acceptable);
    assert_eq!(ed.last_good.as_deref(), Some("<b>fixed</b>"));
    assert!(ed.error.is_none());
  }

  #[test]
  fn solution_requires_an_attempt_unless_completed() {
    let c = challenge("s1", 1);
    let mut ed = EditorSession::new(c.starter_code.clone());
    assert_eq!(ed.reveal_solution(&c, false), Err(EditorError::SolutionLocked));
    assert_eq!(ed.reveal_solution(&c, true), Ok(()));
    assert_eq!(ed.code, c.solution_code);

    let mut ed = EditorSession::new(c.starter_code.clone());
    ed.run();
    assert!(ed.reveal_solution(&c, false).is_ok());
    assert!(ed.showing_solution);
  }

  #[test]
  fn load_challenge_resets_everything() {
    let c = challenge("s2", 1);
    let mut ed = EditorSession::new("<p></p>");
    ed.run();
    ed.load_challenge(&c);
    assert_eq!(ed.code, c.starter_code);
    assert!(!ed.has_run);
    assert_eq!(ed.attempts, 0);
    assert!(ed.last_good.is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn debouncer_runs_only_the_latest_task() {
    let hits = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(AtomicUsize::new(0));
    let mut d = Debouncer::new();
    for i in 1..=3 {
      let hits = hits.clone();
      let last = last.clone();
      d.schedule(Duration::from_millis(500), async move {
        hits.fetch_add(1, Ordering::SeqCst);
        last.store(i, Ordering::SeqCst);
      });
      tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(d.is_pending());
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(last.load(Ordering::SeqCst), 3);
    assert!(!d.is_pending());
  }

  #[tokio::test(start_paused = true)]
  async fn cancelled_task_never_fires() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut d = Debouncer::new();
    let h = hits.clone();
    d.schedule(Duration::from_millis(200), async move {
      h.fetch_add(1, Ordering::SeqCst);
    });
    d.cancel();
    assert!(!d.is_pending());
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 0);
  }
}
