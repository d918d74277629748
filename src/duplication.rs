//! Training Week Duplication
//!
//! Copies the most recent week of a block forward by seven days:
//! - every day, exercise and target set gets a fresh id
//! - parent references are remapped through explicit id-translation tables
//! - the movement (`exercise_id`) is copied by reference, not duplicated
//!
//! `duplicate_week` is the pure core and never touches storage.
//! `duplicate_latest_week` reads the source week, runs the core and writes the
//! result back inside a single transaction, so a failed insert leaves no
//! partial week behind.

use std::collections::HashMap;

use chrono::Duration;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{DayExercise, ExerciseSet, TrainingBlock, TrainingDay};

/// Days between a source day and its copy
pub const WEEK_OFFSET_DAYS: i64 = 7;

/// Rows per INSERT statement, keeps bind counts well under SQLite's limit
const INSERT_CHUNK_ROWS: usize = 500;

/// ---------------------------------------------------------------------------
/// Errors
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DuplicationError {
    #[error("Training block {0} not found")]
    BlockNotFound(Uuid),

    #[error("Nothing to duplicate: block {0} has no training days")]
    NothingToDuplicate(Uuid),

    #[error("{kind} {child} references {parent}, which is not part of the source week")]
    OrphanReference {
        kind: &'static str,
        child: Uuid,
        parent: Uuid,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// ---------------------------------------------------------------------------
/// Id translation table: old id -> new id for one level of the tree
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct IdTranslation {
    map: HashMap<Uuid, Uuid>,
}

impl IdTranslation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, old_id: Uuid, new_id: Uuid) {
        self.map.insert(old_id, new_id);
    }

    pub fn get(&self, old_id: &Uuid) -> Option<Uuid> {
        self.map.get(old_id).copied()
    }

    /// Translate a parent reference, failing if the parent was not copied
    fn translate(&self, kind: &'static str, child: Uuid, parent: Uuid) -> Result<Uuid, DuplicationError> {
        self.get(&parent)
            .ok_or(DuplicationError::OrphanReference { kind, child, parent })
    }
}

#[cfg(test)]
impl IdTranslation {
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn new_ids(&self) -> impl Iterator<Item = &Uuid> {
        self.map.values()
    }
}

/// ---------------------------------------------------------------------------
/// Input and output of the pure core
/// ---------------------------------------------------------------------------

/// One week of a block with its full exercise tree
#[derive(Debug, Clone)]
pub struct SourceWeek {
    pub block_id: Uuid,
    pub week_number: i64,
    pub days: Vec<TrainingDay>,
    pub exercises: Vec<DayExercise>,
    pub sets: Vec<ExerciseSet>,
}

/// The copied week, ready to insert day -> exercise -> set
#[derive(Debug, Clone)]
pub struct NewWeek {
    pub block_id: Uuid,
    pub week_number: i64,
    pub days: Vec<TrainingDay>,
    pub exercises: Vec<DayExercise>,
    pub sets: Vec<ExerciseSet>,
    pub day_ids: IdTranslation,
    pub exercise_ids: IdTranslation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicationSummary {
    pub block_id: Uuid,
    pub source_week: i64,
    pub new_week: i64,
    pub days_created: usize,
    pub exercises_created: usize,
    pub sets_created: usize,
}

impl NewWeek {
    pub fn summary(&self) -> DuplicationSummary {
        DuplicationSummary {
            block_id: self.block_id,
            source_week: self.week_number - 1,
            new_week: self.week_number,
            days_created: self.days.len(),
            exercises_created: self.exercises.len(),
            sets_created: self.sets.len(),
        }
    }
}

/// ---------------------------------------------------------------------------
/// Pure core
/// ---------------------------------------------------------------------------

/// Copy a week with freshly generated ids
pub fn duplicate_week(source: &SourceWeek) -> Result<NewWeek, DuplicationError> {
    duplicate_week_with(source, Uuid::new_v4)
}

/// Copy a week, drawing new ids from `next_id`
pub fn duplicate_week_with(
    source: &SourceWeek,
    mut next_id: impl FnMut() -> Uuid,
) -> Result<NewWeek, DuplicationError> {
    if source.days.is_empty() {
        return Err(DuplicationError::NothingToDuplicate(source.block_id));
    }

    let week_number = source.week_number + 1;

    // Days first: exercises cannot be remapped until every day has its new id
    let mut day_ids = IdTranslation::new();
    let mut days = Vec::with_capacity(source.days.len());
    for day in &source.days {
        if day.block_id != source.block_id {
            return Err(DuplicationError::OrphanReference {
                kind: "day",
                child: day.id,
                parent: day.block_id,
            });
        }

        let id = next_id();
        day_ids.insert(day.id, id);
        days.push(TrainingDay {
            id,
            block_id: source.block_id,
            week_number,
            day_number: day.day_number,
            scheduled_date: day
                .scheduled_date
                .and_then(|d| d.checked_add_signed(Duration::days(WEEK_OFFSET_DAYS))),
            name: day.name.clone(),
        });
    }

    let mut exercise_ids = IdTranslation::new();
    let mut exercises = Vec::with_capacity(source.exercises.len());
    for exercise in &source.exercises {
        let training_day_id = day_ids.translate("exercise", exercise.id, exercise.training_day_id)?;

        let id = next_id();
        exercise_ids.insert(exercise.id, id);
        exercises.push(DayExercise {
            id,
            training_day_id,
            exercise_id: exercise.exercise_id,
            target_sets: exercise.target_sets,
            order_index: exercise.order_index,
            notes: exercise.notes.clone(),
        });
    }

    let mut sets = Vec::with_capacity(source.sets.len());
    for set in &source.sets {
        let day_exercise_id = exercise_ids.translate("set", set.id, set.day_exercise_id)?;

        sets.push(ExerciseSet {
            id: next_id(),
            day_exercise_id,
            set_number: set.set_number,
            target_reps: set.target_reps,
            target_weight: set.target_weight,
            target_rpe: set.target_rpe,
            target_percentage: set.target_percentage,
        });
    }

    Ok(NewWeek {
        block_id: source.block_id,
        week_number,
        days,
        exercises,
        sets,
        day_ids,
        exercise_ids,
    })
}

/// ---------------------------------------------------------------------------
/// Database Operations
/// ---------------------------------------------------------------------------

/// Duplicate the highest week of a block and bump `total_weeks`.
///
/// Everything runs in one transaction; returning early drops it and rolls back.
pub async fn duplicate_latest_week(
    pool: &SqlitePool,
    block_id: Uuid,
) -> Result<DuplicationSummary, DuplicationError> {
    let mut tx = pool.begin().await?;

    let block: TrainingBlock = sqlx::query_as("SELECT * FROM training_blocks WHERE id = ?")
        .bind(block_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DuplicationError::BlockNotFound(block_id))?;

    let source = load_latest_week(&mut tx, block.id).await?;
    let new_week = duplicate_week(&source)?;

    // Strict order: days, then exercises (need day ids), then sets (need exercise ids)
    insert_days(&mut tx, &new_week.days).await?;
    insert_exercises(&mut tx, &new_week.exercises).await?;
    insert_sets(&mut tx, &new_week.sets).await?;

    sqlx::query("UPDATE training_blocks SET total_weeks = ? WHERE id = ?")
        .bind(new_week.week_number)
        .bind(block.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let summary = new_week.summary();
    info!(
        block_id = %summary.block_id,
        new_week = summary.new_week,
        days = summary.days_created,
        exercises = summary.exercises_created,
        sets = summary.sets_created,
        "Duplicated training week"
    );

    Ok(summary)
}

/// Load the highest-numbered week of a block with one read per level
pub async fn load_latest_week(
    conn: &mut SqliteConnection,
    block_id: Uuid,
) -> Result<SourceWeek, DuplicationError> {
    let max_week: Option<i64> =
        sqlx::query_scalar("SELECT MAX(week_number) FROM training_days WHERE block_id = ?")
            .bind(block_id)
            .fetch_one(&mut *conn)
            .await?;

    let week_number = max_week.ok_or(DuplicationError::NothingToDuplicate(block_id))?;
    debug!(%block_id, week_number, "Loading source week");

    let days: Vec<TrainingDay> = sqlx::query_as(
        r#"
        SELECT * FROM training_days
        WHERE block_id = ? AND week_number = ?
        ORDER BY day_number
        "#,
    )
    .bind(block_id)
    .bind(week_number)
    .fetch_all(&mut *conn)
    .await?;

    let exercises: Vec<DayExercise> = sqlx::query_as(
        r#"
        SELECT de.* FROM day_exercises de
        JOIN training_days td ON td.id = de.training_day_id
        WHERE td.block_id = ? AND td.week_number = ?
        ORDER BY td.day_number, de.order_index
        "#,
    )
    .bind(block_id)
    .bind(week_number)
    .fetch_all(&mut *conn)
    .await?;

    let sets: Vec<ExerciseSet> = sqlx::query_as(
        r#"
        SELECT es.* FROM exercise_sets es
        JOIN day_exercises de ON de.id = es.day_exercise_id
        JOIN training_days td ON td.id = de.training_day_id
        WHERE td.block_id = ? AND td.week_number = ?
        ORDER BY es.day_exercise_id, es.set_number
        "#,
    )
    .bind(block_id)
    .bind(week_number)
    .fetch_all(&mut *conn)
    .await?;

    Ok(SourceWeek {
        block_id,
        week_number,
        days,
        exercises,
        sets,
    })
}

async fn insert_days(conn: &mut SqliteConnection, days: &[TrainingDay]) -> Result<(), sqlx::Error> {
    for chunk in days.chunks(INSERT_CHUNK_ROWS) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO training_days (id, block_id, week_number, day_number, scheduled_date, name) ",
        );
        builder.push_values(chunk, |mut row, day| {
            row.push_bind(day.id)
                .push_bind(day.block_id)
                .push_bind(day.week_number)
                .push_bind(day.day_number)
                .push_bind(day.scheduled_date)
                .push_bind(day.name.clone());
        });
        builder.build().execute(&mut *conn).await?;
    }
    Ok(())
}

async fn insert_exercises(
    conn: &mut SqliteConnection,
    exercises: &[DayExercise],
) -> Result<(), sqlx::Error> {
    for chunk in exercises.chunks(INSERT_CHUNK_ROWS) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO day_exercises (id, training_day_id, exercise_id, target_sets, order_index, notes) ",
        );
        builder.push_values(chunk, |mut row, exercise| {
            row.push_bind(exercise.id)
                .push_bind(exercise.training_day_id)
                .push_bind(exercise.exercise_id)
                .push_bind(exercise.target_sets)
                .push_bind(exercise.order_index)
                .push_bind(exercise.notes.clone());
        });
        builder.build().execute(&mut *conn).await?;
    }
    Ok(())
}

async fn insert_sets(conn: &mut SqliteConnection, sets: &[ExerciseSet]) -> Result<(), sqlx::Error> {
    for chunk in sets.chunks(INSERT_CHUNK_ROWS) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO exercise_sets (id, day_exercise_id, set_number, target_reps, target_weight, target_rpe, target_percentage) ",
        );
        builder.push_values(chunk, |mut row, set| {
            row.push_bind(set.id)
                .push_bind(set.day_exercise_id)
                .push_bind(set.set_number)
                .push_bind(set.target_reps)
                .push_bind(set.target_weight)
                .push_bind(set.target_rpe)
                .push_bind(set.target_percentage);
        });
        builder.build().execute(&mut *conn).await?;
    }
    Ok(())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
