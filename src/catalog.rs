//! Static challenge catalog: built-in TOML data plus optional config-provided extras.
//!
//! The catalog is assembled once at startup and shared read-only afterwards.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{Challenge, LevelInfo, LevelMeta};

const BUILTIN_CATALOG: &str = include_str!("../data/challenges.toml");

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
  #[error("catalog parse error: {0}")]
  Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize, Default)]
struct CatalogFile {
  #[serde(default)]
  challenges: Vec<Challenge>,
  #[serde(default)]
  levels: Vec<LevelMeta>,
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
  challenges: Vec<Challenge>,
  levels: Vec<LevelMeta>,
}

impl Catalog {
  /// The built-in catalog shipped with the binary.
  pub fn builtin() -> Result<Self, CatalogError> {
    Self::from_toml(BUILTIN_CATALOG)
  }

  pub fn from_toml(s: &str) -> Result<Self, CatalogError> {
    let file: CatalogFile = toml::from_str(s)?;
    Ok(Self::from_parts(file.challenges, file.levels))
  }

  /// Build from raw entries. Invalid entries and duplicate ids are skipped;
  /// the first definition of an id wins.
  pub fn from_parts(challenges: Vec<Challenge>, levels: Vec<LevelMeta>) -> Self {
    let mut cat = Self::default();
    cat.extend(challenges, levels);
    cat
  }

  /// Append extra challenges and level metadata without overwriting existing ids/levels.
  pub fn extend(&mut self, challenges: Vec<Challenge>, levels: Vec<LevelMeta>) {
    let mut seen: HashSet<String> = self.challenges.iter().map(|c| c.id.clone()).collect();
    for c in challenges {
      if c.id.trim().is_empty() {
        error!(target: "challenge", title = %c.title, "Skipping catalog entry: empty id.");
        continue;
      }
      if c.level == 0 {
        error!(target: "challenge", id = %c.id, "Skipping catalog entry: level must be positive.");
        continue;
      }
      if !seen.insert(c.id.clone()) {
        error!(target: "challenge", id = %c.id, "Skipping catalog entry: duplicate id.");
        continue;
      }
      self.challenges.push(c);
    }
    for meta in levels {
      if self.levels.iter().any(|l| l.level == meta.level) {
        continue;
      }
      self.levels.push(meta);
    }
    self.levels.sort_by_key(|l| l.level);
  }

  /// All challenges for `level`, in catalog order.
  pub fn all_for_level(&self, level: u32) -> Vec<&Challenge> {
    self.challenges.iter().filter(|c| c.level == level).collect()
  }

  /// First challenge with the given id.
  pub fn by_id(&self, id: &str) -> Option<&Challenge> {
    self.challenges.iter().find(|c| c.id == id)
  }

  /// Level metadata with derived counts. Levels that only exist through
  /// challenges (no metadata entry) get a generic name.
  pub fn levels(&self) -> Vec<LevelInfo> {
    let mut numbers: Vec<u32> = self.levels.iter().map(|l| l.level).collect();
    for c in &self.challenges {
      if !numbers.contains(&c.level) {
        numbers.push(c.level);
      }
    }
    numbers.sort_unstable();

    numbers
      .into_iter()
      .map(|level| {
        let meta = self.levels.iter().find(|l| l.level == level);
        LevelInfo {
          level,
          name: meta.map(|m| m.name.clone()).unwrap_or_else(|| format!("Level {}", level)),
          description: meta.map(|m| m.description.clone()).unwrap_or_default(),
          challenge_count: self.challenges.iter().filter(|c| c.level == level).count(),
        }
      })
      .collect()
  }

  pub fn len(&self) -> usize { self.challenges.len() }

  pub fn is_empty(&self) -> bool { self.challenges.is_empty() }

  pub fn log_inventory(&self) {
    for l in self.levels() {
      info!(target: "challenge", level = l.level, name = %l.name, count = l.challenge_count, "Startup challenge inventory");
    }
  }
}
