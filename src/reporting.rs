//! Performance reporting
//!
//! Groups an athlete's logged sets by (block, week), by exercise and by
//! category, then runs the metric calculators over each group. Reports are
//! recomputed on every request from the rows in the selected period.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::metrics::{self, set_e1rm};
use crate::models::{LoggedSet, TrainingBlock};
use crate::plan;
use crate::training_log::{self, LoggedSetFilter};

/// ---------------------------------------------------------------------------
/// Period filter
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
  OneWeek,
  OneMonth,
  #[default]
  ThreeMonths,
  SixMonths,
  OneYear,
  All,
}

impl Period {
  pub fn as_str(&self) -> &'static str {
    match self {
      Period::OneWeek => "1w",
      Period::OneMonth => "1m",
      Period::ThreeMonths => "3m",
      Period::SixMonths => "6m",
      Period::OneYear => "1y",
      Period::All => "all",
    }
  }

  fn days(&self) -> Option<i64> {
    match self {
      Period::OneWeek => Some(7),
      Period::OneMonth => Some(30),
      Period::ThreeMonths => Some(90),
      Period::SixMonths => Some(180),
      Period::OneYear => Some(365),
      Period::All => None,
    }
  }

  /// The window ending at `now`
  pub fn range(&self, now: DateTime<Utc>) -> DateRange {
    DateRange {
      start: self.days().map(|d| now - Duration::days(d)),
      end: now,
    }
  }
}

impl FromStr for Period {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "1w" => Ok(Period::OneWeek),
      "1m" => Ok(Period::OneMonth),
      "3m" => Ok(Period::ThreeMonths),
      "6m" => Ok(Period::SixMonths),
      "1y" => Ok(Period::OneYear),
      "all" => Ok(Period::All),
      other => Err(AppError::validation(format!(
        "Unknown period {:?}, expected one of 1w, 1m, 3m, 6m, 1y, all",
        other
      ))),
    }
  }
}

impl fmt::Display for Period {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl Serialize for Period {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
  /// `None` means unbounded
  pub start: Option<DateTime<Utc>>,
  pub end: DateTime<Utc>,
}

/// ---------------------------------------------------------------------------
/// Report types
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct E1rmPoint {
  pub completed_at: DateTime<Utc>,
  pub exercise_id: Uuid,
  pub exercise_name: String,
  pub block_id: Uuid,
  pub week_number: i64,
  pub weight: f64,
  pub reps: i64,
  pub e1rm: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyLoad {
  pub block_id: Uuid,
  pub block_name: String,
  pub week_number: i64,
  pub sets: usize,
  pub tonnage: f64,
  pub stress_index: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSummary {
  pub exercise_id: Uuid,
  pub exercise_name: String,
  pub category: String,
  pub sets: usize,
  pub tonnage: f64,
  pub best_e1rm: Option<f64>,
  pub neural_load: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTonnage {
  pub category: String,
  pub tonnage: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockProgress {
  pub block_id: Uuid,
  pub block_name: String,
  pub current_week: i64,
  pub total_weeks: i64,
  pub progress_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
  pub athlete_id: Uuid,
  pub period: Period,
  pub range: DateRange,
  pub total_sets: usize,
  pub total_tonnage: f64,
  pub e1rm_series: Vec<E1rmPoint>,
  pub weekly: Vec<WeeklyLoad>,
  pub exercises: Vec<ExerciseSummary>,
  pub category_tonnage: Vec<CategoryTonnage>,
  pub block_progress: Vec<BlockProgress>,
}

/// Everything a report is computed from
pub struct ReportInput<'a> {
  pub athlete_id: Uuid,
  pub period: Period,
  pub range: DateRange,
  /// Oldest first
  pub sets: &'a [LoggedSet],
  pub blocks: &'a [TrainingBlock],
  /// Highest week with a logged set, per block
  pub last_logged_weeks: &'a HashMap<Uuid, i64>,
}

/// ---------------------------------------------------------------------------
/// Computation
/// ---------------------------------------------------------------------------

/// `current_week / total_weeks * 100`, clamped to [0, 100]. Zero weeks is 0%.
pub fn block_progress(current_week: i64, total_weeks: i64) -> f64 {
  if total_weeks <= 0 {
    return 0.0;
  }
  (current_week as f64 / total_weeks as f64 * 100.0).clamp(0.0, 100.0)
}

impl PerformanceReport {
  pub fn compute(input: &ReportInput<'_>) -> Self {
    let mut e1rm_series = Vec::new();
    let mut by_week: BTreeMap<(Uuid, i64), Vec<&LoggedSet>> = BTreeMap::new();
    let mut by_exercise: BTreeMap<Uuid, Vec<&LoggedSet>> = BTreeMap::new();
    let mut category_tonnage: BTreeMap<String, f64> = BTreeMap::new();

    for set in input.sets {
      if let Some(e1rm) = set_e1rm(set) {
        e1rm_series.push(E1rmPoint {
          completed_at: set.completed_at,
          exercise_id: set.exercise_id,
          exercise_name: set.exercise_name.clone(),
          block_id: set.block_id,
          week_number: set.week_number,
          weight: set.weight.unwrap_or_default(),
          reps: set.reps.unwrap_or_default(),
          e1rm,
        });
      }

      by_week.entry((set.block_id, set.week_number)).or_default().push(set);
      by_exercise.entry(set.exercise_id).or_default().push(set);
      *category_tonnage.entry(set.category.clone()).or_default() += metrics::set_tonnage(set);
    }

    e1rm_series.sort_by_key(|p| p.completed_at);

    let mut weekly: Vec<WeeklyLoad> = by_week
      .into_iter()
      .map(|((block_id, week_number), sets)| WeeklyLoad {
        block_id,
        block_name: sets[0].block_name.clone(),
        week_number,
        sets: sets.len(),
        tonnage: metrics::tonnage(&sets),
        stress_index: metrics::stress_index(&sets).unwrap_or_default(),
      })
      .collect();
    // Blocks in order of their first logged set, weeks ascending within a block
    let first_seen: HashMap<Uuid, DateTime<Utc>> = input
      .sets
      .iter()
      .rev()
      .map(|s| (s.block_id, s.completed_at))
      .collect();
    weekly.sort_by_key(|w| (first_seen.get(&w.block_id).copied(), w.block_id, w.week_number));

    let mut exercises: Vec<ExerciseSummary> = by_exercise
      .into_iter()
      .map(|(exercise_id, sets)| ExerciseSummary {
        exercise_id,
        exercise_name: sets[0].exercise_name.clone(),
        category: sets[0].category.clone(),
        sets: sets.len(),
        tonnage: metrics::tonnage(&sets),
        best_e1rm: metrics::best_e1rm(&sets),
        neural_load: metrics::neural_load(&sets).unwrap_or_default(),
      })
      .collect();
    exercises.sort_by(|a, b| a.exercise_name.cmp(&b.exercise_name));

    let progress = input
      .blocks
      .iter()
      .map(|block| {
        let current_week = input.last_logged_weeks.get(&block.id).copied().unwrap_or(0);
        BlockProgress {
          block_id: block.id,
          block_name: block.name.clone(),
          current_week,
          total_weeks: block.total_weeks,
          progress_percent: block_progress(current_week, block.total_weeks),
        }
      })
      .collect();

    PerformanceReport {
      athlete_id: input.athlete_id,
      period: input.period,
      range: input.range,
      total_sets: input.sets.len(),
      total_tonnage: metrics::tonnage(input.sets),
      e1rm_series,
      weekly,
      exercises,
      category_tonnage: category_tonnage
        .into_iter()
        .map(|(category, tonnage)| CategoryTonnage { category, tonnage })
        .collect(),
      block_progress: progress,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Database Operations
/// ---------------------------------------------------------------------------

/// Read blocks, logged sets and progress weeks concurrently, then compute
pub async fn build_performance_report(
  pool: &SqlitePool,
  athlete_id: Uuid,
  exercise_id: Option<Uuid>,
  period: Period,
  now: DateTime<Utc>,
) -> AppResult<PerformanceReport> {
  let range = period.range(now);
  let filter = LoggedSetFilter {
    athlete_id,
    exercise_id,
    since: range.start,
    until: Some(range.end),
  };

  let (blocks, sets, last_logged_weeks) = tokio::try_join!(
    plan::list_blocks(pool, None, Some(athlete_id)),
    training_log::load_logged_sets(pool, &filter),
    training_log::load_last_logged_weeks(pool, athlete_id)
  )?;

  debug!(%athlete_id, %period, sets = sets.len(), blocks = blocks.len(), "Computing performance report");

  Ok(PerformanceReport::compute(&ReportInput {
    athlete_id,
    period,
    range,
    sets: &sets,
    blocks: &blocks,
    last_logged_weeks: &last_logged_weeks,
  }))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
