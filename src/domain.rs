//! Domain models: challenges, difficulty labels and level metadata.

use serde::{Deserialize, Serialize};

/// Fixed difficulty label shown next to each challenge.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}
impl Default for Difficulty {
  fn default() -> Self { Difficulty::Easy }
}

/// One visual-target puzzle. Defined once at startup, never mutated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Challenge {
  pub id: String,
  pub level: u32,
  pub title: String,
  /// What the target looks like, in words.
  pub description: String,
  /// How the reference solution achieves the target.
  pub target_explanation: String,
  pub starter_code: String,
  pub solution_code: String,
  pub xp_reward: u32,
  #[serde(default)]
  pub difficulty: Difficulty,
}

/// Level metadata as written in the catalog file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelMeta {
  pub level: u32,
  pub name: String,
  #[serde(default)]
  pub description: String,
}

/// Level metadata plus the derived challenge count.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
  pub level: u32,
  pub name: String,
  pub description: String,
  pub challenge_count: usize,
}
