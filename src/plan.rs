//! Training plan store: blocks, days, day exercises and target sets.
//!
//! Write operations return the id of the block they touched so the caller can
//! invalidate the cached plan.

use std::collections::{BTreeSet, HashMap};

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::PlanCache;
use crate::error::{AppError, AppResult};
use crate::models::{
  BlockPlan, BlockStatus, DayExercise, ExerciseSet, ExerciseSetUpdate, NewDayExercise,
  NewTrainingBlock, NewTrainingDay, PlannedDay, PlannedExercise, TrainingBlock, TrainingDay,
};

/// Upper bound on blank target sets created with a day exercise
pub const MAX_TARGET_SETS: i64 = 20;

/// ---------------------------------------------------------------------------
/// Blocks
/// ---------------------------------------------------------------------------

pub async fn create_block(pool: &SqlitePool, new_block: NewTrainingBlock) -> AppResult<TrainingBlock> {
  let coach_id = new_block
    .coach_id
    .ok_or_else(|| AppError::validation("coachId is required"))?;
  let athlete_id = new_block
    .athlete_id
    .ok_or_else(|| AppError::validation("athleteId is required"))?;
  let name = new_block
    .name
    .map(|n| n.trim().to_string())
    .filter(|n| !n.is_empty())
    .ok_or_else(|| AppError::validation("name is required"))?;
  if new_block.total_weeks < 0 {
    return Err(AppError::validation("totalWeeks must not be negative"));
  }

  let block: TrainingBlock = sqlx::query_as(
    r#"
    INSERT INTO training_blocks (id, coach_id, athlete_id, name, total_weeks, status, start_date, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
    RETURNING *
    "#,
  )
  .bind(Uuid::new_v4())
  .bind(coach_id)
  .bind(athlete_id)
  .bind(&name)
  .bind(new_block.total_weeks)
  .bind(new_block.status)
  .bind(new_block.start_date)
  .bind(chrono::Utc::now())
  .fetch_one(pool)
  .await?;

  info!(block_id = %block.id, %athlete_id, "Created training block");
  Ok(block)
}

/// List blocks, optionally filtered by coach and/or athlete. Newest first.
pub async fn list_blocks(
  pool: &SqlitePool,
  coach_id: Option<Uuid>,
  athlete_id: Option<Uuid>,
) -> AppResult<Vec<TrainingBlock>> {
  let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM training_blocks WHERE 1 = 1");
  if let Some(coach_id) = coach_id {
    builder.push(" AND coach_id = ").push_bind(coach_id);
  }
  if let Some(athlete_id) = athlete_id {
    builder.push(" AND athlete_id = ").push_bind(athlete_id);
  }
  builder.push(" ORDER BY created_at DESC");

  let blocks = builder.build_query_as::<TrainingBlock>().fetch_all(pool).await?;
  Ok(blocks)
}

pub async fn get_block(pool: &SqlitePool, block_id: Uuid) -> AppResult<TrainingBlock> {
  sqlx::query_as::<_, TrainingBlock>("SELECT * FROM training_blocks WHERE id = ?")
    .bind(block_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Training block {}", block_id)))
}

pub async fn update_block_status(
  pool: &SqlitePool,
  block_id: Uuid,
  status: BlockStatus,
) -> AppResult<TrainingBlock> {
  let block = sqlx::query_as::<_, TrainingBlock>(
    "UPDATE training_blocks SET status = ? WHERE id = ? RETURNING *",
  )
  .bind(status)
  .bind(block_id)
  .fetch_optional(pool)
  .await?
  .ok_or_else(|| AppError::not_found(format!("Training block {}", block_id)))?;

  info!(%block_id, ?status, "Updated block status");
  Ok(block)
}

/// Delete a block; days, exercises, sets and logs cascade
pub async fn delete_block(pool: &SqlitePool, block_id: Uuid) -> AppResult<()> {
  let result = sqlx::query("DELETE FROM training_blocks WHERE id = ?")
    .bind(block_id)
    .execute(pool)
    .await?;

  if result.rows_affected() == 0 {
    return Err(AppError::not_found(format!("Training block {}", block_id)));
  }

  info!(%block_id, "Deleted training block");
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Days and exercises
/// ---------------------------------------------------------------------------

/// Add a day to a block. A day past the current last week extends `total_weeks`.
pub async fn add_day(pool: &SqlitePool, block_id: Uuid, new_day: NewTrainingDay) -> AppResult<TrainingDay> {
  if new_day.week_number < 1 {
    return Err(AppError::validation("weekNumber must be at least 1"));
  }
  if new_day.day_number < 1 {
    return Err(AppError::validation("dayNumber must be at least 1"));
  }

  let mut tx = pool.begin().await?;

  let extended = sqlx::query(
    "UPDATE training_blocks SET total_weeks = MAX(total_weeks, ?) WHERE id = ?",
  )
  .bind(new_day.week_number)
  .bind(block_id)
  .execute(&mut *tx)
  .await?;
  if extended.rows_affected() == 0 {
    return Err(AppError::not_found(format!("Training block {}", block_id)));
  }

  let day: TrainingDay = sqlx::query_as(
    r#"
    INSERT INTO training_days (id, block_id, week_number, day_number, scheduled_date, name)
    VALUES (?, ?, ?, ?, ?, ?)
    RETURNING *
    "#,
  )
  .bind(Uuid::new_v4())
  .bind(block_id)
  .bind(new_day.week_number)
  .bind(new_day.day_number)
  .bind(new_day.scheduled_date)
  .bind(new_day.name)
  .fetch_one(&mut *tx)
  .await?;

  tx.commit().await?;

  debug!(%block_id, day_id = %day.id, week = day.week_number, "Added training day");
  Ok(day)
}

/// Add an exercise to a day together with `target_sets` blank target sets.
///
/// Returns the owning block id and the new exercise.
pub async fn add_day_exercise(
  pool: &SqlitePool,
  training_day_id: Uuid,
  new_exercise: NewDayExercise,
) -> AppResult<(Uuid, PlannedExercise)> {
  let exercise_id = new_exercise
    .exercise_id
    .ok_or_else(|| AppError::validation("exerciseId is required"))?;
  if !(0..=MAX_TARGET_SETS).contains(&new_exercise.target_sets) {
    return Err(AppError::validation(format!(
      "targetSets must be between 0 and {}",
      MAX_TARGET_SETS
    )));
  }

  let mut tx = pool.begin().await?;

  let block_id: Uuid = sqlx::query_scalar("SELECT block_id FROM training_days WHERE id = ?")
    .bind(training_day_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Training day {}", training_day_id)))?;

  let exercise_name: String = sqlx::query_scalar("SELECT name FROM exercises WHERE id = ?")
    .bind(exercise_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Exercise {}", exercise_id)))?;

  let exercise: DayExercise = sqlx::query_as(
    r#"
    INSERT INTO day_exercises (id, training_day_id, exercise_id, target_sets, order_index, notes)
    VALUES (?, ?, ?, ?, ?, ?)
    RETURNING *
    "#,
  )
  .bind(Uuid::new_v4())
  .bind(training_day_id)
  .bind(exercise_id)
  .bind(new_exercise.target_sets)
  .bind(new_exercise.order_index)
  .bind(new_exercise.notes)
  .fetch_one(&mut *tx)
  .await?;

  let sets = insert_blank_sets(&mut tx, exercise.id, exercise.target_sets).await?;

  tx.commit().await?;

  debug!(%block_id, day_exercise_id = %exercise.id, sets = sets.len(), "Added day exercise");
  Ok((
    block_id,
    PlannedExercise {
      exercise,
      exercise_name: Some(exercise_name),
      sets,
    },
  ))
}

async fn insert_blank_sets(
  conn: &mut SqliteConnection,
  day_exercise_id: Uuid,
  count: i64,
) -> Result<Vec<ExerciseSet>, sqlx::Error> {
  let sets: Vec<ExerciseSet> = (1..=count)
    .map(|set_number| ExerciseSet {
      id: Uuid::new_v4(),
      day_exercise_id,
      set_number,
      target_reps: None,
      target_weight: None,
      target_rpe: None,
      target_percentage: None,
    })
    .collect();

  if sets.is_empty() {
    return Ok(sets);
  }

  let mut builder: QueryBuilder<Sqlite> =
    QueryBuilder::new("INSERT INTO exercise_sets (id, day_exercise_id, set_number) ");
  builder.push_values(&sets, |mut row, set| {
    row
      .push_bind(set.id)
      .push_bind(set.day_exercise_id)
      .push_bind(set.set_number);
  });
  builder.build().execute(&mut *conn).await?;

  Ok(sets)
}

/// Delete a day exercise with its target sets and logs. Returns the owning block id.
pub async fn delete_day_exercise(pool: &SqlitePool, day_exercise_id: Uuid) -> AppResult<Uuid> {
  let mut tx = pool.begin().await?;

  let block_id: Uuid = sqlx::query_scalar(
    r#"
    SELECT td.block_id FROM day_exercises de
    JOIN training_days td ON td.id = de.training_day_id
    WHERE de.id = ?
    "#,
  )
  .bind(day_exercise_id)
  .fetch_optional(&mut *tx)
  .await?
  .ok_or_else(|| AppError::not_found(format!("Day exercise {}", day_exercise_id)))?;

  sqlx::query("DELETE FROM day_exercises WHERE id = ?")
    .bind(day_exercise_id)
    .execute(&mut *tx)
    .await?;

  tx.commit().await?;
  Ok(block_id)
}

/// ---------------------------------------------------------------------------
/// Bulk target-set update
/// ---------------------------------------------------------------------------

fn validate_set_update(update: &ExerciseSetUpdate) -> AppResult<()> {
  if matches!(update.target_reps, Some(r) if r < 0) {
    return Err(AppError::validation("targetReps must not be negative"));
  }
  if matches!(update.target_weight, Some(w) if !w.is_finite() || w < 0.0) {
    return Err(AppError::validation("targetWeight must not be negative"));
  }
  if matches!(update.target_rpe, Some(r) if !(1.0..=10.0).contains(&r)) {
    return Err(AppError::validation("targetRpe must be between 1 and 10"));
  }
  if matches!(update.target_percentage, Some(p) if !p.is_finite() || p < 0.0) {
    return Err(AppError::validation("targetPercentage must not be negative"));
  }
  Ok(())
}

/// Update many target sets in one transaction.
///
/// Absent fields keep their stored value. An unknown set id fails the whole
/// batch. Returns the ids of the blocks that own the updated sets.
pub async fn update_exercise_sets_bulk(
  pool: &SqlitePool,
  updates: &[ExerciseSetUpdate],
) -> AppResult<Vec<Uuid>> {
  for update in updates {
    validate_set_update(update)?;
  }
  if updates.is_empty() {
    return Ok(Vec::new());
  }

  let mut tx = pool.begin().await?;
  let mut day_exercise_ids = BTreeSet::new();

  for update in updates {
    let day_exercise_id: Option<Uuid> = sqlx::query_scalar(
      r#"
      UPDATE exercise_sets SET
        target_reps = COALESCE(?, target_reps),
        target_weight = COALESCE(?, target_weight),
        target_rpe = COALESCE(?, target_rpe),
        target_percentage = COALESCE(?, target_percentage)
      WHERE id = ?
      RETURNING day_exercise_id
      "#,
    )
    .bind(update.target_reps)
    .bind(update.target_weight)
    .bind(update.target_rpe)
    .bind(update.target_percentage)
    .bind(update.id)
    .fetch_optional(&mut *tx)
    .await?;

    match day_exercise_id {
      Some(id) => {
        day_exercise_ids.insert(id);
      }
      None => return Err(AppError::not_found(format!("Exercise set {}", update.id))),
    }
  }

  let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
    "SELECT DISTINCT td.block_id FROM day_exercises de \
     JOIN training_days td ON td.id = de.training_day_id WHERE de.id IN (",
  );
  let mut separated = builder.separated(", ");
  for id in &day_exercise_ids {
    separated.push_bind(*id);
  }
  separated.push_unseparated(")");
  let block_ids: Vec<Uuid> = builder.build_query_scalar().fetch_all(&mut *tx).await?;

  tx.commit().await?;

  info!(updated = updates.len(), blocks = block_ids.len(), "Bulk-updated target sets");
  Ok(block_ids)
}

/// ---------------------------------------------------------------------------
/// Plan tree
/// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct ExerciseRow {
  #[sqlx(flatten)]
  exercise: DayExercise,
  exercise_name: Option<String>,
}

/// Load block -> days -> exercises -> sets with one read per level
pub async fn load_block_plan(pool: &SqlitePool, block_id: Uuid) -> AppResult<BlockPlan> {
  let block = get_block(pool, block_id).await?;

  let days_query = sqlx::query_as::<_, TrainingDay>(
    "SELECT * FROM training_days WHERE block_id = ? ORDER BY week_number, day_number",
  )
  .bind(block_id)
  .fetch_all(pool);

  let exercises_query = sqlx::query_as::<_, ExerciseRow>(
    r#"
    SELECT de.*, e.name AS exercise_name FROM day_exercises de
    JOIN training_days td ON td.id = de.training_day_id
    LEFT JOIN exercises e ON e.id = de.exercise_id
    WHERE td.block_id = ?
    ORDER BY de.order_index
    "#,
  )
  .bind(block_id)
  .fetch_all(pool);

  let sets_query = sqlx::query_as::<_, ExerciseSet>(
    r#"
    SELECT es.* FROM exercise_sets es
    JOIN day_exercises de ON de.id = es.day_exercise_id
    JOIN training_days td ON td.id = de.training_day_id
    WHERE td.block_id = ?
    ORDER BY es.set_number
    "#,
  )
  .bind(block_id)
  .fetch_all(pool);

  let (days, exercise_rows, sets) = tokio::try_join!(days_query, exercises_query, sets_query)?;

  let mut sets_by_exercise: HashMap<Uuid, Vec<ExerciseSet>> = HashMap::new();
  for set in sets {
    sets_by_exercise.entry(set.day_exercise_id).or_default().push(set);
  }

  let mut exercises_by_day: HashMap<Uuid, Vec<PlannedExercise>> = HashMap::new();
  for row in exercise_rows {
    let sets = sets_by_exercise.remove(&row.exercise.id).unwrap_or_default();
    exercises_by_day
      .entry(row.exercise.training_day_id)
      .or_default()
      .push(PlannedExercise {
        exercise: row.exercise,
        exercise_name: row.exercise_name,
        sets,
      });
  }

  let days = days
    .into_iter()
    .map(|day| PlannedDay {
      exercises: exercises_by_day.remove(&day.id).unwrap_or_default(),
      day,
    })
    .collect();

  Ok(BlockPlan { block, days })
}

/// Read-through: serve from the cache, otherwise load and remember
pub async fn get_block_plan_cached(
  pool: &SqlitePool,
  cache: &PlanCache,
  block_id: Uuid,
) -> AppResult<BlockPlan> {
  if let Some(plan) = cache.get(&block_id) {
    debug!(%block_id, "plan cache hit");
    return Ok(plan);
  }

  // Taken before the load so a write committed meanwhile keeps this plan out
  let generation = cache.generation(&block_id);
  let plan = load_block_plan(pool, block_id).await?;
  cache.insert_if_current(plan.clone(), generation);
  Ok(plan)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{
    count_rows, date, seed_test_block, seed_test_day, seed_test_log, seed_test_roster,
    setup_test_db, teardown_test_db,
  };
  use chrono::Utc;

  fn new_block(coach_id: Uuid, athlete_id: Uuid, name: &str) -> NewTrainingBlock {
    NewTrainingBlock {
      coach_id: Some(coach_id),
      athlete_id: Some(athlete_id),
      name: Some(name.to_string()),
      total_weeks: 0,
      status: BlockStatus::Draft,
      start_date: Some(date(2024, 3, 4)),
    }
  }

  #[tokio::test]
  async fn test_create_and_get_block() {
    let pool = setup_test_db().await;
    let roster = seed_test_roster(&pool).await;

    let created = create_block(&pool, new_block(roster.coach_id, roster.athlete_id, "  Peaking  "))
      .await
      .expect("Should create block");
    assert_eq!(created.name, "Peaking");
    assert_eq!(created.status, BlockStatus::Draft);

    let fetched = get_block(&pool, created.id).await.expect("Should fetch block");
    assert_eq!(fetched.start_date, Some(date(2024, 3, 4)));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_create_block_validation() {
    let pool = setup_test_db().await;
    let roster = seed_test_roster(&pool).await;

    let mut missing_name = new_block(roster.coach_id, roster.athlete_id, "x");
    missing_name.name = Some("   ".into());
    assert!(matches!(create_block(&pool, missing_name).await, Err(AppError::Validation(_))));

    let mut missing_athlete = new_block(roster.coach_id, roster.athlete_id, "x");
    missing_athlete.athlete_id = None;
    assert!(matches!(create_block(&pool, missing_athlete).await, Err(AppError::Validation(_))));

    // Unknown coach trips the foreign key
    let orphan = new_block(Uuid::new_v4(), roster.athlete_id, "x");
    assert!(matches!(create_block(&pool, orphan).await, Err(AppError::Validation(_))));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_list_blocks_filters() {
    let pool = setup_test_db().await;
    let roster = seed_test_roster(&pool).await;
    seed_test_block(&pool, &roster, 4).await;
    seed_test_block(&pool, &roster, 6).await;

    let by_athlete = list_blocks(&pool, None, Some(roster.athlete_id)).await.unwrap();
    assert_eq!(by_athlete.len(), 2);

    let nobody = list_blocks(&pool, Some(Uuid::new_v4()), None).await.unwrap();
    assert!(nobody.is_empty());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_update_status_and_delete_block() {
    let pool = setup_test_db().await;
    let roster = seed_test_roster(&pool).await;
    let block_id = seed_test_block(&pool, &roster, 1).await;
    let seeded = seed_test_day(&pool, block_id, 1, 1, None, &[(roster.squat_id, &[(5, 100.0)])]).await;
    seed_test_log(&pool, seeded.exercise_ids[0], roster.athlete_id, 1, (100.0, 5, Some(8.0)), Utc::now()).await;

    let updated = update_block_status(&pool, block_id, BlockStatus::Completed).await.unwrap();
    assert_eq!(updated.status, BlockStatus::Completed);

    delete_block(&pool, block_id).await.expect("Should delete");
    assert_eq!(count_rows(&pool, "training_days").await, 0);
    assert_eq!(count_rows(&pool, "exercise_sets").await, 0);
    assert_eq!(count_rows(&pool, "exercise_logs").await, 0);

    assert!(matches!(delete_block(&pool, block_id).await, Err(AppError::NotFound(_))));
    assert!(matches!(
      update_block_status(&pool, block_id, BlockStatus::Active).await,
      Err(AppError::NotFound(_))
    ));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_add_day_extends_total_weeks() {
    let pool = setup_test_db().await;
    let roster = seed_test_roster(&pool).await;
    let block_id = seed_test_block(&pool, &roster, 2).await;

    let day = add_day(
      &pool,
      block_id,
      NewTrainingDay {
        week_number: 4,
        day_number: 2,
        scheduled_date: Some(date(2024, 1, 23)),
        name: Some("Volume".into()),
      },
    )
    .await
    .expect("Should add day");
    assert_eq!(day.week_number, 4);

    let block = get_block(&pool, block_id).await.unwrap();
    assert_eq!(block.total_weeks, 4);

    let bad_week = NewTrainingDay { week_number: 0, day_number: 1, scheduled_date: None, name: None };
    assert!(matches!(add_day(&pool, block_id, bad_week).await, Err(AppError::Validation(_))));

    let unknown = NewTrainingDay { week_number: 1, day_number: 1, scheduled_date: None, name: None };
    assert!(matches!(add_day(&pool, Uuid::new_v4(), unknown).await, Err(AppError::NotFound(_))));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_add_day_exercise_creates_blank_sets() {
    let pool = setup_test_db().await;
    let roster = seed_test_roster(&pool).await;
    let block_id = seed_test_block(&pool, &roster, 1).await;
    let seeded = seed_test_day(&pool, block_id, 1, 1, None, &[]).await;

    let (owner, planned) = add_day_exercise(
      &pool,
      seeded.day_id,
      NewDayExercise {
        exercise_id: Some(roster.deadlift_id),
        target_sets: 4,
        order_index: 1,
        notes: None,
      },
    )
    .await
    .expect("Should add exercise");

    assert_eq!(owner, block_id);
    assert_eq!(planned.exercise_name.as_deref(), Some("Deadlift"));
    let numbers: Vec<i64> = planned.sets.iter().map(|s| s.set_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    assert!(planned.sets.iter().all(|s| s.target_reps.is_none()));
    assert_eq!(count_rows(&pool, "exercise_sets").await, 4);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_add_day_exercise_rejects_unknown_references() {
    let pool = setup_test_db().await;
    let roster = seed_test_roster(&pool).await;
    let block_id = seed_test_block(&pool, &roster, 1).await;
    let seeded = seed_test_day(&pool, block_id, 1, 1, None, &[]).await;

    let unknown_movement = NewDayExercise {
      exercise_id: Some(Uuid::new_v4()),
      target_sets: 3,
      order_index: 0,
      notes: None,
    };
    assert!(matches!(
      add_day_exercise(&pool, seeded.day_id, unknown_movement).await,
      Err(AppError::NotFound(_))
    ));

    let too_many = NewDayExercise {
      exercise_id: Some(roster.squat_id),
      target_sets: MAX_TARGET_SETS + 1,
      order_index: 0,
      notes: None,
    };
    assert!(matches!(
      add_day_exercise(&pool, seeded.day_id, too_many).await,
      Err(AppError::Validation(_))
    ));
    assert_eq!(count_rows(&pool, "day_exercises").await, 0);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_delete_day_exercise_returns_block() {
    let pool = setup_test_db().await;
    let roster = seed_test_roster(&pool).await;
    let block_id = seed_test_block(&pool, &roster, 1).await;
    let seeded = seed_test_day(&pool, block_id, 1, 1, None, &[(roster.bench_id, &[(8, 70.0), (8, 70.0)])]).await;

    let owner = delete_day_exercise(&pool, seeded.exercise_ids[0]).await.unwrap();
    assert_eq!(owner, block_id);
    assert_eq!(count_rows(&pool, "exercise_sets").await, 0);

    assert!(matches!(
      delete_day_exercise(&pool, seeded.exercise_ids[0]).await,
      Err(AppError::NotFound(_))
    ));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_bulk_update_sets() {
    // Arrange
    let pool = setup_test_db().await;
    let roster = seed_test_roster(&pool).await;
    let block_id = seed_test_block(&pool, &roster, 1).await;
    let seeded = seed_test_day(&pool, block_id, 1, 1, None, &[(roster.squat_id, &[(5, 100.0), (5, 100.0)])]).await;

    // Act
    let updates = vec![
      ExerciseSetUpdate {
        id: seeded.set_ids[0],
        target_reps: Some(3),
        target_weight: Some(120.0),
        target_rpe: None,
        target_percentage: None,
      },
      ExerciseSetUpdate {
        id: seeded.set_ids[1],
        target_reps: None,
        target_weight: None,
        target_rpe: Some(9.0),
        target_percentage: None,
      },
    ];
    let blocks = update_exercise_sets_bulk(&pool, &updates).await.expect("Should update");

    // Assert
    assert_eq!(blocks, vec![block_id]);
    let plan = load_block_plan(&pool, block_id).await.unwrap();
    let sets = &plan.days[0].exercises[0].sets;
    assert_eq!((sets[0].target_reps, sets[0].target_weight), (Some(3), Some(120.0)));
    assert_eq!(sets[0].target_rpe, Some(8.0), "absent fields are kept");
    assert_eq!((sets[1].target_reps, sets[1].target_rpe), (Some(5), Some(9.0)));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_bulk_update_unknown_id_rolls_back() {
    let pool = setup_test_db().await;
    let roster = seed_test_roster(&pool).await;
    let block_id = seed_test_block(&pool, &roster, 1).await;
    let seeded = seed_test_day(&pool, block_id, 1, 1, None, &[(roster.squat_id, &[(5, 100.0)])]).await;

    let updates = vec![
      ExerciseSetUpdate {
        id: seeded.set_ids[0],
        target_reps: Some(1),
        target_weight: None,
        target_rpe: None,
        target_percentage: None,
      },
      ExerciseSetUpdate {
        id: Uuid::new_v4(),
        target_reps: Some(2),
        target_weight: None,
        target_rpe: None,
        target_percentage: None,
      },
    ];

    let result = update_exercise_sets_bulk(&pool, &updates).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let reps: Option<i64> = sqlx::query_scalar("SELECT target_reps FROM exercise_sets WHERE id = ?")
      .bind(seeded.set_ids[0])
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!(reps, Some(5));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_bulk_update_validates_before_writing() {
    let pool = setup_test_db().await;

    let updates = vec![ExerciseSetUpdate {
      id: Uuid::new_v4(),
      target_reps: None,
      target_weight: None,
      target_rpe: Some(11.0),
      target_percentage: None,
    }];
    assert!(matches!(
      update_exercise_sets_bulk(&pool, &updates).await,
      Err(AppError::Validation(_))
    ));
    assert!(update_exercise_sets_bulk(&pool, &[]).await.unwrap().is_empty());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_load_block_plan_builds_ordered_tree() {
    let pool = setup_test_db().await;
    let roster = seed_test_roster(&pool).await;
    let block_id = seed_test_block(&pool, &roster, 2).await;
    seed_test_day(&pool, block_id, 2, 1, Some(date(2024, 1, 8)), &[(roster.deadlift_id, &[(3, 180.0)])]).await;
    seed_test_day(
      &pool,
      block_id,
      1,
      1,
      Some(date(2024, 1, 1)),
      &[(roster.squat_id, &[(5, 100.0), (5, 105.0)]), (roster.bench_id, &[(8, 70.0)])],
    )
    .await;

    let plan = load_block_plan(&pool, block_id).await.expect("Should load plan");

    assert_eq!(plan.days.len(), 2);
    assert_eq!(plan.days[0].day.week_number, 1);
    assert_eq!(plan.last_week(), Some(2));
    assert_eq!(plan.days_in_week(1).count(), 1);

    let first_day = &plan.days[0];
    let names: Vec<_> = first_day
      .exercises
      .iter()
      .map(|e| e.exercise_name.clone().unwrap_or_default())
      .collect();
    assert_eq!(names, vec!["Back Squat", "Bench Press"]);
    assert_eq!(first_day.exercises[0].sets[1].target_weight, Some(105.0));

    assert!(matches!(load_block_plan(&pool, Uuid::new_v4()).await, Err(AppError::NotFound(_))));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_cached_plan_is_served_until_invalidated() {
    let pool = setup_test_db().await;
    let cache = PlanCache::new();
    let roster = seed_test_roster(&pool).await;
    let block_id = seed_test_block(&pool, &roster, 1).await;

    let first = get_block_plan_cached(&pool, &cache, block_id).await.unwrap();
    assert!(first.days.is_empty());
    assert_eq!(cache.len(), 1);

    seed_test_day(&pool, block_id, 1, 1, None, &[]).await;
    let stale = get_block_plan_cached(&pool, &cache, block_id).await.unwrap();
    assert!(stale.days.is_empty());

    cache.invalidate(&block_id);
    let fresh = get_block_plan_cached(&pool, &cache, block_id).await.unwrap();
    assert_eq!(fresh.days.len(), 1);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_plan_loaded_across_a_write_is_not_cached() {
    let pool = setup_test_db().await;
    let cache = PlanCache::new();
    let roster = seed_test_roster(&pool).await;
    let block_id = seed_test_block(&pool, &roster, 1).await;

    // Reader loads, then a day is added and invalidated before the reader stores
    let generation = cache.generation(&block_id);
    let before_write = load_block_plan(&pool, block_id).await.unwrap();
    seed_test_day(&pool, block_id, 1, 1, None, &[]).await;
    cache.invalidate(&block_id);

    assert!(!cache.insert_if_current(before_write, generation));
    assert!(cache.get(&block_id).is_none());

    let fresh = get_block_plan_cached(&pool, &cache, block_id).await.unwrap();
    assert_eq!(fresh.days.len(), 1);
    assert_eq!(cache.get(&block_id).unwrap().days.len(), 1);

    teardown_test_db(pool).await;
  }
}
