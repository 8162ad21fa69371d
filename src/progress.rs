//! Player progress: XP, completed challenges, daily streaks, ranks, and the
//! persistence collaborator that stores it.
//!
//! Storage failures never reach the caller: loads fall back to the default
//! progress and failed saves are logged and dropped.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::domain::Challenge;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
  pub xp: u32,
  pub completed_challenges: Vec<String>,
  pub current_streak: u32,
  /// Local calendar date of the last XP gain.
  pub last_played: Option<NaiveDate>,
}

impl Progress {
  pub fn is_completed(&self, id: &str) -> bool {
    self.completed_challenges.iter().any(|c| c == id)
  }
}

/// Today's date in the server's local time zone.
pub fn today() -> NaiveDate {
  Local::now().date_naive()
}

fn touch_streak(p: &mut Progress, today: NaiveDate) {
  if p.last_played == Some(today) {
    return;
  }
  let played_yesterday = p.last_played.is_some() && p.last_played == today.pred_opt();
  p.current_streak = if played_yesterday { p.current_streak + 1 } else { 1 };
  p.last_played = Some(today);
}

pub fn add_xp(p: &mut Progress, amount: u32, today: NaiveDate) {
  p.xp = p.xp.saturating_add(amount);
  touch_streak(p, today);
}

/// Award the challenge's XP on first completion. Returns whether anything changed.
pub fn mark_complete(p: &mut Progress, challenge: &Challenge, today: NaiveDate) -> bool {
  if p.is_completed(&challenge.id) {
    return false;
  }
  p.completed_challenges.push(challenge.id.clone());
  add_xp(p, challenge.xp_reward, today);
  true
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rank {
  pub title: &'static str,
  pub min_xp: u32,
  pub max_xp: u32,
  pub icon: &'static str,
}

pub const RANKS: [Rank; 5] = [
  Rank { title: "Novice Coder", min_xp: 0, max_xp: 50, icon: "🌱" },
  Rank { title: "Curious Builder", min_xp: 51, max_xp: 100, icon: "🔧" },
  Rank { title: "Code Explorer", min_xp: 101, max_xp: 200, icon: "🚀" },
  Rank { title: "CSS Warrior", min_xp: 201, max_xp: 350, icon: "⚔️" },
  Rank { title: "Layout Master", min_xp: 351, max_xp: 500, icon: "👑" },
];

pub fn current_rank(xp: u32) -> Rank {
  RANKS.iter().rev().find(|r| xp >= r.min_xp).copied().unwrap_or(RANKS[0])
}

pub fn next_rank(xp: u32) -> Option<Rank> {
  let cur = current_rank(xp);
  let idx = RANKS.iter().position(|r| r.title == cur.title)?;
  RANKS.get(idx + 1).copied()
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct XpProgress {
  pub current: u32,
  pub max: u32,
  pub percentage: f32,
}

/// Progress through the current rank toward the next one.
pub fn xp_progress(xp: u32) -> XpProgress {
  let cur = current_rank(xp);
  let Some(next) = next_rank(xp) else {
    return XpProgress { current: xp, max: xp, percentage: 100.0 };
  };
  let current = xp - cur.min_xp;
  let max = next.min_xp - cur.min_xp;
  let percentage = ((current as f32 / max as f32) * 100.0).min(100.0);
  XpProgress { current, max, percentage }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LevelProgress {
  pub completed: usize,
  pub total: usize,
}

pub fn level_progress(catalog: &Catalog, p: &Progress, level: u32) -> LevelProgress {
  let all = catalog.all_for_level(level);
  LevelProgress {
    completed: all.iter().filter(|c| p.is_completed(&c.id)).count(),
    total: all.len(),
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
  pub rank: usize,
  pub name: String,
  pub xp: u32,
  pub avatar: String,
  pub is_user: bool,
}

const SAMPLE_PLAYERS: &[(&str, u32, &str)] = &[
  ("CodeMaster_99", 450, "👑"),
  ("CSSNinja", 380, "🥷"),
  ("PixelPro", 320, "🎨"),
  ("FlexboxFan", 275, "📦"),
  ("GridGuru", 180, "📐"),
  ("StyleStar", 150, "⭐"),
  ("HTMLHero", 120, "🦸"),
  ("WebWizard", 95, "🧙"),
  ("CodeCub", 60, "🐻"),
];

/// Sample players plus the user, highest XP first. Ties keep the sample player ahead.
pub fn leaderboard(user_xp: u32) -> Vec<LeaderboardEntry> {
  let mut rows: Vec<LeaderboardEntry> = SAMPLE_PLAYERS
    .iter()
    .map(|(name, xp, avatar)| LeaderboardEntry {
      rank: 0,
      name: (*name).into(),
      xp: *xp,
      avatar: (*avatar).into(),
      is_user: false,
    })
    .collect();
  rows.push(LeaderboardEntry {
    rank: 0,
    name: "You".into(),
    xp: user_xp,
    avatar: current_rank(user_xp).icon.into(),
    is_user: true,
  });
  rows.sort_by(|a, b| b.xp.cmp(&a.xp));
  for (i, r) in rows.iter_mut().enumerate() {
    r.rank = i + 1;
  }
  rows
}

/// Persistence collaborator for per-user progress.
pub trait ProgressStore: Send + Sync {
  /// Never fails; unknown users and broken storage yield the default progress.
  fn load(&self, user: &str) -> Progress;
  /// Best effort; failures are logged, not returned.
  fn save(&self, user: &str, progress: &Progress);
}

/// Normalised key for per-user storage and locking.
pub fn user_key(user: &str) -> String {
  user.trim().to_lowercase()
}

#[derive(Debug, Default)]
pub struct MemoryStore {
  inner: Mutex<HashMap<String, Progress>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }
}

impl ProgressStore for MemoryStore {
  fn load(&self, user: &str) -> Progress {
    match self.inner.lock() {
      Ok(m) => m.get(&user_key(user)).cloned().unwrap_or_default(),
      Err(e) => {
        warn!(target: "prabodha", error = %e, "Progress store poisoned; using defaults");
        Progress::default()
      }
    }
  }

  fn save(&self, user: &str, progress: &Progress) {
    match self.inner.lock() {
      Ok(mut m) => {
        m.insert(user_key(user), progress.clone());
      }
      Err(e) => warn!(target: "prabodha", error = %e, "Progress store poisoned; dropping save"),
    }
  }
}

/// One JSON file per user under `dir`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
  dir: PathBuf,
}

impl JsonFileStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  fn path_for(&self, user: &str) -> PathBuf {
    let safe: String = user_key(user)
      .chars()
      .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
      .collect();
    let name = if safe.is_empty() { "_anonymous".to_string() } else { safe };
    self.dir.join(format!("{}.json", name))
  }
}

impl ProgressStore for JsonFileStore {
  fn load(&self, user: &str) -> Progress {
    let path = self.path_for(user);
    let raw = match std::fs::read_to_string(&path) {
      Ok(s) => s,
      Err(e) => {
        debug!(target: "prabodha", path = %path.display(), error = %e, "No stored progress; using defaults");
        return Progress::default();
      }
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
      warn!(target: "prabodha", path = %path.display(), error = %e, "Failed to parse stored progress; using defaults");
      Progress::default()
    })
  }

  fn save(&self, user: &str, progress: &Progress) {
    let path = self.path_for(user);
    let res = std::fs::create_dir_all(&self.dir)
      .and_then(|_| serde_json::to_string_pretty(progress).map_err(std::io::Error::other))
      .and_then(|json| std::fs::write(&path, json));
    if let Err(e) = res {
      warn!(target: "prabodha", path = %path.display(), error = %e, "Failed to save progress");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::tests::challenge;

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
  }

  #[test]
  fn first_completion_awards_xp_once() {
    let mut p = Progress::default();
    let c = challenge("a", 1);
    assert!(mark_complete(&mut p, &c, day(10)));
    assert!(!mark_complete(&mut p, &c, day(10)));
    assert_eq!(p.xp, 10);
    assert_eq!(p.completed_challenges, vec!["a".to_string()]);
  }

  #[test]
  fn streak_counts_consecutive_days() {
    let mut p = Progress::default();
    add_xp(&mut p, 5, day(10));
    assert_eq!(p.current_streak, 1);
    add_xp(&mut p, 5, day(10));
    assert_eq!(p.current_streak, 1);
    add_xp(&mut p, 5, day(11));
    assert_eq!(p.current_streak, 2);
    add_xp(&mut p, 5, day(14));
    assert_eq!(p.current_streak, 1);
    assert_eq!(p.last_played, Some(day(14)));
    assert_eq!(p.xp, 20);
  }

  #[test]
  fn streak_follows_calendar_across_month_end() {
    let mut p = Progress::default();
    add_xp(&mut p, 5, day(28));
    add_xp(&mut p, 5, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    assert_eq!(p.current_streak, 2);
  }

  #[test]
  fn last_played_serializes_as_calendar_date() {
    let p = Progress { last_played: Some(day(3)), ..Default::default() };
    let json = serde_json::to_value(&p).unwrap();
    assert_eq!(json["lastPlayed"], serde_json::json!("2026-02-03"));
  }

  #[test]
  fn rank_boundaries() {
    assert_eq!(current_rank(0).title, "Novice Coder");
    assert_eq!(current_rank(50).title, "Novice Coder");
    assert_eq!(current_rank(51).title, "Curious Builder");
    assert_eq!(current_rank(351).title, "Layout Master");
    assert_eq!(current_rank(9999).title, "Layout Master");
    assert_eq!(next_rank(0).map(|r| r.title), Some("Curious Builder"));
    assert_eq!(next_rank(400), None);
  }

  #[test]
  fn xp_progress_within_rank() {
    let p = xp_progress(76);
    assert_eq!(p.current, 25);
    assert_eq!(p.max, 50);
    assert!((p.percentage - 50.0).abs() < f32::EPSILON);
    let top = xp_progress(420);
    assert_eq!((top.current, top.max), (420, 420));
    assert_eq!(top.percentage, 100.0);
  }

  #[test]
  fn level_progress_counts_completed() {
    let cat = Catalog::builtin().unwrap();
    let p = Progress { completed_challenges: vec!["l1-c2".into(), "l3-c1".into()], ..Default::default() };
    assert_eq!(level_progress(&cat, &p, 1), LevelProgress { completed: 1, total: 3 });
    assert_eq!(level_progress(&cat, &p, 9), LevelProgress { completed: 0, total: 0 });
  }

  #[test]
  fn leaderboard_places_user_by_xp() {
    let rows = leaderboard(300);
    assert_eq!(rows.len(), 10);
    let me = rows.iter().find(|r| r.is_user).unwrap();
    assert_eq!(me.rank, 4);
    assert_eq!(me.avatar, "⚔️");
    assert!(rows.windows(2).all(|w| w[0].xp >= w[1].xp));
    assert_eq!(rows[0].rank, 1);
  }

  #[test]
  fn memory_store_is_case_insensitive_per_user() {
    let s = MemoryStore::new();
    let p = Progress { xp: 42, ..Default::default() };
    s.save("Ada", &p);
    assert_eq!(s.load("ada").xp, 42);
    assert_eq!(s.load("bob"), Progress::default());
  }

  #[test]
  fn file_store_round_trips_and_tolerates_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let s = JsonFileStore::new(dir.path().join("progress"));
    assert_eq!(s.load("ada"), Progress::default());

    let p = Progress { xp: 7, completed_challenges: vec!["l1-c1".into()], current_streak: 1, last_played: Some(day(3)) };
    s.save("Ada", &p);
    assert_eq!(s.load("ADA"), p);

    std::fs::write(dir.path().join("progress").join("ada.json"), "{not json").unwrap();
    assert_eq!(s.load("ada"), Progress::default());
  }

  #[test]
  fn file_store_save_failure_is_swallowed() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "x").unwrap();
    // A regular file where the directory should be: create_dir_all fails.
    let s = JsonFileStore::new(blocker.join("nested"));
    s.save("ada", &Progress { xp: 1, ..Default::default() });
    assert_eq!(s.load("ada"), Progress::default());
  }
}
