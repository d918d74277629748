//! Strength metrics computed from logged sets
//!
//! Every calculator is a single pass over already-fetched rows. Missing
//! optional values never fail a computation: absent weight/reps count as 0
//! and absent RPE falls back to `DEFAULT_RPE`.

use crate::models::{ExerciseLog, LoggedSet};

/// ---------------------------------------------------------------------------
/// Constants
/// ---------------------------------------------------------------------------

/// RPE assumed when a set was logged without one
pub const DEFAULT_RPE: f64 = 7.0;

/// Fixed body weight used to scale neural load. Placeholder, not a measurement.
pub const REFERENCE_BODYWEIGHT_KG: f64 = 75.0;

/// Brzycki is undefined at 37 reps and meaningless past it
pub const MAX_E1RM_REPS: i64 = 36;

/// TRAC components are each scored 0-10
pub const TRAC_COMPONENT_MAX: i64 = 10;
pub const TRAC_MAX: i64 = 20;

/// ---------------------------------------------------------------------------
/// Set abstraction
/// ---------------------------------------------------------------------------

/// Anything that looks like a performed set
pub trait SetSample {
  fn weight(&self) -> Option<f64>;
  fn reps(&self) -> Option<i64>;
  fn rpe(&self) -> Option<f64>;

  fn weight_or_zero(&self) -> f64 {
    self.weight().filter(|w| w.is_finite() && *w > 0.0).unwrap_or(0.0)
  }

  fn reps_or_zero(&self) -> f64 {
    self.reps().filter(|r| *r > 0).unwrap_or(0) as f64
  }

  fn rpe_or_default(&self) -> f64 {
    self.rpe().filter(|r| r.is_finite() && *r > 0.0).unwrap_or(DEFAULT_RPE)
  }
}

impl SetSample for ExerciseLog {
  fn weight(&self) -> Option<f64> {
    self.actual_weight
  }

  fn reps(&self) -> Option<i64> {
    self.actual_reps
  }

  fn rpe(&self) -> Option<f64> {
    self.actual_rpe
  }
}

impl SetSample for LoggedSet {
  fn weight(&self) -> Option<f64> {
    self.weight
  }

  fn reps(&self) -> Option<i64> {
    self.reps
  }

  fn rpe(&self) -> Option<f64> {
    self.rpe
  }
}

impl<T: SetSample> SetSample for &T {
  fn weight(&self) -> Option<f64> {
    (*self).weight()
  }

  fn reps(&self) -> Option<i64> {
    (*self).reps()
  }

  fn rpe(&self) -> Option<f64> {
    (*self).rpe()
  }
}

/// ---------------------------------------------------------------------------
/// Calculators
/// ---------------------------------------------------------------------------

/// Estimated one-rep max (Brzycki): `weight * 36 / (37 - reps)`.
///
/// A single is its own max. Reps outside `[1, 36]` and negative or
/// non-finite weights have no estimate.
pub fn estimate_e1rm(weight: f64, reps: i64) -> Option<f64> {
  if !weight.is_finite() || weight < 0.0 || !(1..=MAX_E1RM_REPS).contains(&reps) {
    return None;
  }
  if reps == 1 {
    return Some(weight);
  }
  Some(weight * (36.0 / (37.0 - reps as f64)))
}

/// e1RM of one performed set, if it has both weight and reps
pub fn set_e1rm<T: SetSample>(set: &T) -> Option<f64> {
  estimate_e1rm(set.weight()?, set.reps()?)
}

/// Total volume: sum of weight x reps
pub fn tonnage<T: SetSample>(sets: &[T]) -> f64 {
  sets.iter().map(set_tonnage).sum()
}

pub fn set_tonnage<T: SetSample>(set: &T) -> f64 {
  set.weight_or_zero() * set.reps_or_zero()
}

/// Per-set stress: `reps * RPE / 10`
pub fn set_stress<T: SetSample>(set: &T) -> f64 {
  set.reps_or_zero() * set.rpe_or_default() / 10.0
}

/// Per-set neural load: `weight * reps * RPE / 75`
pub fn set_neural_load<T: SetSample>(set: &T) -> f64 {
  set.weight_or_zero() * set.reps_or_zero() * set.rpe_or_default() / REFERENCE_BODYWEIGHT_KG
}

/// Average per-set stress over the given sets (usually one week)
pub fn stress_index<T: SetSample>(sets: &[T]) -> Option<f64> {
  mean(sets.iter().map(set_stress))
}

/// Average per-set neural load over the given sets (usually one exercise)
pub fn neural_load<T: SetSample>(sets: &[T]) -> Option<f64> {
  mean(sets.iter().map(set_neural_load))
}

/// Best e1RM across the sets
pub fn best_e1rm<T: SetSample>(sets: &[T]) -> Option<f64> {
  sets.iter().filter_map(set_e1rm).fold(None, |best, value| match best {
    Some(b) if b >= value => Some(b),
    _ => Some(value),
  })
}

/// Composite readiness score on a 0-20 scale.
///
/// Sleep and motivation count up, soreness counts down. Components are
/// clamped to 0-10 before combining.
pub fn trac_score(sleep: i64, soreness: i64, motivation: i64) -> i64 {
  let clamp = |v: i64| v.clamp(0, TRAC_COMPONENT_MAX);
  let raw = clamp(sleep) + clamp(motivation) + (TRAC_COMPONENT_MAX - clamp(soreness));
  let scaled = raw as f64 * TRAC_MAX as f64 / (3 * TRAC_COMPONENT_MAX) as f64;
  scaled.round() as i64
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
  let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
  if count == 0 {
    None
  } else {
    Some(sum / count as f64)
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
