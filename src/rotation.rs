//! Challenge rotation: random selection per level without immediate repeats,
//! cycling through every challenge of a level before any of them comes back.
//!
//! Rotation bookkeeping lives in `RotationState`, owned by whoever manages the
//! "current level" (a session), and is passed in by `&mut`.

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::catalog::Catalog;
use crate::domain::Challenge;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelRotation {
  /// Ids shown since the last full cycle.
  pub shown: HashSet<String>,
  pub last_shown: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct RotationState {
  levels: HashMap<u32, LevelRotation>,
}

impl RotationState {
  pub fn new() -> Self { Self::default() }

  pub fn level(&self, level: u32) -> Option<&LevelRotation> {
    self.levels.get(&level)
  }

  fn level_mut(&mut self, level: u32) -> &mut LevelRotation {
    self.levels.entry(level).or_default()
  }
}

/// Pick the next challenge for `level`.
///
/// Candidates are the level's challenges minus `exclude_id`, the last shown
/// one, and everything already shown in the current cycle. Once the cycle is
/// complete the shown set is cleared and only the last shown id is avoided.
///
/// Returns `None` when the level has no challenges. `exclude_id` is never
/// returned unless the level's cycle just wrapped (the wrap only avoids the
/// last shown id) or the level has a single challenge.
pub fn select_next<'a, R: Rng + ?Sized>(
  catalog: &'a Catalog,
  state: &mut RotationState,
  level: u32,
  exclude_id: Option<&str>,
  rng: &mut R,
) -> Option<&'a Challenge> {
  let all = catalog.all_for_level(level);
  if all.is_empty() {
    return None;
  }

  let rot = state.level_mut(level);
  let last = rot.last_shown.clone();
  let is_last = |c: &&Challenge| last.as_deref() == Some(c.id.as_str());

  let mut pool: Vec<&Challenge> = all
    .iter()
    .copied()
    .filter(|c| Some(c.id.as_str()) != exclude_id)
    .filter(|c| !is_last(c))
    .filter(|c| !rot.shown.contains(&c.id))
    .collect();

  if rot.shown.len() >= all.len() {
    // Full cycle: start over, only guarding against the immediate repeat.
    rot.shown.clear();
    pool = all.iter().copied().filter(|c| !is_last(c)).collect();
    debug!(target: "challenge", level, "Rotation cycle complete; resetting shown set");
  } else if pool.is_empty() {
    // Everything unseen is excluded; allow already-shown ones before giving up.
    pool = all
      .iter()
      .copied()
      .filter(|c| Some(c.id.as_str()) != exclude_id)
      .filter(|c| !is_last(c))
      .collect();
  }

  if pool.is_empty() {
    pool = all;
  }

  let picked = *pool.choose(rng)?;
  rot.shown.insert(picked.id.clone());
  rot.last_shown = Some(picked.id.clone());
  debug!(target: "challenge", level, id = %picked.id, shown = rot.shown.len(), "Rotation pick");
  Some(picked)
}

/// Forget what was shown for `level`.
pub fn reset_rotation(state: &mut RotationState, level: u32) {
  state.levels.remove(&level);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::tests::challenge;
  use proptest::prelude::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn catalog_with(level_sizes: &[(u32, usize)]) -> Catalog {
    let mut v = Vec::new();
    for (level, n) in level_sizes {
      for i in 0..*n {
        v.push(challenge(&format!("l{}-c{}", level, i), *level));
      }
    }
    Catalog::from_parts(v, vec![])
  }

  #[test]
  fn empty_level_returns_none() {
    let cat = catalog_with(&[(1, 3)]);
    let mut st = RotationState::new();
    let mut rng = StdRng::seed_from_u64(1);
    assert!(select_next(&cat, &mut st, 2, None, &mut rng).is_none());
    assert!(st.level(2).is_none());
  }

  #[test]
  fn single_challenge_level_falls_back_to_it() {
    let cat = catalog_with(&[(1, 1)]);
    let mut st = RotationState::new();
    let mut rng = StdRng::seed_from_u64(2);
    for _ in 0..4 {
      let c = select_next(&cat, &mut st, 1, Some("l1-c0"), &mut rng).unwrap();
      assert_eq!(c.id, "l1-c0");
    }
  }

  #[test]
  fn explicit_exclude_is_honoured_within_a_cycle() {
    let cat = catalog_with(&[(1, 3)]);
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..50 {
      let mut st = RotationState::new();
      let c = select_next(&cat, &mut st, 1, Some("l1-c1"), &mut rng).unwrap();
      assert_ne!(c.id, "l1-c1");
    }
  }

  #[test]
  fn records_pick_as_last_shown() {
    let cat = catalog_with(&[(1, 3)]);
    let mut st = RotationState::new();
    let mut rng = StdRng::seed_from_u64(4);
    let c = select_next(&cat, &mut st, 1, None, &mut rng).unwrap();
    let rot = st.level(1).unwrap();
    assert_eq!(rot.last_shown.as_deref(), Some(c.id.as_str()));
    assert!(rot.shown.contains(&c.id));
  }

  #[test]
  fn shown_set_wraps_after_full_cycle() {
    let cat = catalog_with(&[(1, 3)]);
    let mut st = RotationState::new();
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..3 {
      select_next(&cat, &mut st, 1, None, &mut rng).unwrap();
    }
    assert_eq!(st.level(1).unwrap().shown.len(), 3);
    select_next(&cat, &mut st, 1, None, &mut rng).unwrap();
    assert_eq!(st.level(1).unwrap().shown.len(), 1);
  }

  #[test]
  fn wrap_ignores_explicit_exclude() {
    // Two challenges; after both are shown the exclude is dropped and only
    // the last shown one is avoided, so the excluded id can come right back.
    let cat = catalog_with(&[(1, 2)]);
    let mut st = RotationState::new();
    let mut rng = StdRng::seed_from_u64(6);
    let first = select_next(&cat, &mut st, 1, None, &mut rng).unwrap().id.clone();
    let second = select_next(&cat, &mut st, 1, None, &mut rng).unwrap().id.clone();
    assert_ne!(first, second);
    let third = select_next(&cat, &mut st, 1, Some(&first), &mut rng).unwrap();
    assert_eq!(third.id, first);
  }

  #[test]
  fn reset_makes_previous_pick_eligible_again() {
    let cat = catalog_with(&[(1, 2)]);
    let mut rng = StdRng::seed_from_u64(7);
    let mut seen_repeat = false;
    for _ in 0..64 {
      let mut st = RotationState::new();
      let first = select_next(&cat, &mut st, 1, None, &mut rng).unwrap().id.clone();
      reset_rotation(&mut st, 1);
      assert!(st.level(1).is_none());
      let again = select_next(&cat, &mut st, 1, None, &mut rng).unwrap();
      if again.id == first {
        seen_repeat = true;
      }
    }
    assert!(seen_repeat);
  }

  #[test]
  fn levels_rotate_independently() {
    let cat = catalog_with(&[(1, 2), (2, 2)]);
    let mut st = RotationState::new();
    let mut rng = StdRng::seed_from_u64(8);
    select_next(&cat, &mut st, 1, None, &mut rng).unwrap();
    select_next(&cat, &mut st, 2, None, &mut rng).unwrap();
    reset_rotation(&mut st, 1);
    assert!(st.level(1).is_none());
    assert_eq!(st.level(2).unwrap().shown.len(), 1);
  }

  proptest! {
    #[test]
    fn never_repeats_consecutively(n in 2usize..8, calls in 2usize..40, seed in any::<u64>()) {
      let cat = catalog_with(&[(1, n)]);
      let mut st = RotationState::new();
      let mut rng = StdRng::seed_from_u64(seed);
      let mut prev: Option<String> = None;
      for _ in 0..calls {
        let id = select_next(&cat, &mut st, 1, None, &mut rng).unwrap().id.clone();
        prop_assert_ne!(Some(&id), prev.as_ref());
        prev = Some(id);
      }
    }

    #[test]
    fn covers_every_challenge_within_one_cycle(n in 2usize..8, seed in any::<u64>()) {
      let cat = catalog_with(&[(1, n)]);
      let mut st = RotationState::new();
      let mut rng = StdRng::seed_from_u64(seed);
      let mut seen = HashSet::new();
      for _ in 0..n {
        seen.insert(select_next(&cat, &mut st, 1, None, &mut rng).unwrap().id.clone());
      }
      prop_assert_eq!(seen.len(), n);
    }

    #[test]
    fn state_only_references_level_ids(n in 1usize..6, calls in 1usize..20, seed in any::<u64>()) {
      let cat = catalog_with(&[(1, n), (2, 3)]);
      let mut st = RotationState::new();
      let mut rng = StdRng::seed_from_u64(seed);
      for _ in 0..calls {
        select_next(&cat, &mut st, 1, None, &mut rng);
      }
      let rot = st.level(1).unwrap();
      for id in rot.shown.iter().chain(rot.last_shown.iter()) {
        prop_assert!(id.starts_with("l1-"));
      }
      prop_assert!(rot.shown.len() <= n);
    }
  }
}
