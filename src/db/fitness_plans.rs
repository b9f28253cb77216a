use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{DbFitnessPlan, FitnessPlan, FitnessPlanFilter, FitnessPlanInput, PlanStatus};

pub const DUPLICATE_FITNESS_PLAN: &str =
    "A fitness plan with this title, category and level already exists";

/// Trimmed text and JSON-encoded list columns, ready to bind.
struct FitnessPlanRow<'a> {
    title: &'a str,
    description: &'a str,
    category: &'a str,
    level: &'a str,
    duration: &'a str,
    prerequisites: String,
    equipment: String,
    goals: String,
    schedule: String,
    status: &'static str,
}

impl<'a> FitnessPlanRow<'a> {
    fn new(plan: &'a FitnessPlanInput) -> Result<Self, AppError> {
        Ok(Self {
            title: plan.title.trim(),
            description: plan.description.trim(),
            category: plan.category.trim(),
            level: plan.level.trim(),
            duration: plan.duration.trim(),
            prerequisites: serde_json::to_string(&plan.prerequisites)?,
            equipment: serde_json::to_string(&plan.equipment)?,
            goals: serde_json::to_string(&plan.goals)?,
            schedule: serde_json::to_string(&plan.schedule)?,
            status: plan.status.as_str(),
        })
    }
}

#[instrument(skip(pool))]
pub async fn get_fitness_plan(pool: &Pool<Sqlite>, id: i64) -> Result<FitnessPlan, AppError> {
    info!("Fetching fitness plan");
    let row = sqlx::query_as!(
        DbFitnessPlan,
        "SELECT id, title, description, category, level, duration, weekly_workouts, difficulty,
                prerequisites, equipment, goals, schedule, status, created_by, created_at,
                updated_at
         FROM fitness_plans WHERE id = ?",
        id
    )
    .fetch_optional(pool)
    .await?;

    match row {
        Some(plan) => Ok(FitnessPlan::from(plan)),
        _ => Err(AppError::NotFound(format!("Fitness plan {} not found", id))),
    }
}

#[instrument(skip(pool))]
pub async fn get_published_fitness_plans(
    pool: &Pool<Sqlite>,
    filter: &FitnessPlanFilter,
) -> Result<Vec<FitnessPlan>, AppError> {
    info!("Getting published fitness plans");
    let category = filter.category.as_deref();
    let level = filter.level.as_deref();
    let rows = sqlx::query_as!(
        DbFitnessPlan,
        "SELECT id, title, description, category, level, duration, weekly_workouts, difficulty,
                prerequisites, equipment, goals, schedule, status, created_by, created_at,
                updated_at
         FROM fitness_plans
         WHERE status = 'published'
           AND (?1 IS NULL OR category = ?1 COLLATE NOCASE)
           AND (?2 IS NULL OR level = ?2 COLLATE NOCASE)
         ORDER BY title",
        category,
        level
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(FitnessPlan::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_all_fitness_plans(pool: &Pool<Sqlite>) -> Result<Vec<FitnessPlan>, AppError> {
    info!("Getting all fitness plans");
    let rows = sqlx::query_as!(
        DbFitnessPlan,
        "SELECT id, title, description, category, level, duration, weekly_workouts, difficulty,
                prerequisites, equipment, goals, schedule, status, created_by, created_at,
                updated_at
         FROM fitness_plans ORDER BY updated_at DESC, id DESC"
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(FitnessPlan::from).collect())
}

#[instrument(skip(pool, plan), fields(title = %plan.title))]
pub async fn create_fitness_plan(
    pool: &Pool<Sqlite>,
    plan: &FitnessPlanInput,
    created_by: Option<i64>,
) -> Result<FitnessPlan, AppError> {
    info!("Creating fitness plan");
    let row = FitnessPlanRow::new(plan)?;
    let res = sqlx::query!(
        "INSERT INTO fitness_plans
         (title, description, category, level, duration, weekly_workouts, difficulty,
          prerequisites, equipment, goals, schedule, status, created_by)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        row.title,
        row.description,
        row.category,
        row.level,
        row.duration,
        plan.weekly_workouts,
        plan.difficulty,
        row.prerequisites,
        row.equipment,
        row.goals,
        row.schedule,
        row.status,
        created_by
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_FITNESS_PLAN))?;

    get_fitness_plan(pool, res.last_insert_rowid()).await
}

#[instrument(skip(pool, plan), fields(title = %plan.title))]
pub async fn update_fitness_plan(
    pool: &Pool<Sqlite>,
    id: i64,
    plan: &FitnessPlanInput,
) -> Result<FitnessPlan, AppError> {
    info!("Updating fitness plan");
    let now = Utc::now().naive_utc();
    let row = FitnessPlanRow::new(plan)?;
    let result = sqlx::query!(
        "UPDATE fitness_plans
         SET title = ?, description = ?, category = ?, level = ?, duration = ?,
             weekly_workouts = ?, difficulty = ?, prerequisites = ?, equipment = ?,
             goals = ?, schedule = ?, status = ?, updated_at = ?
         WHERE id = ?",
        row.title,
        row.description,
        row.category,
        row.level,
        row.duration,
        plan.weekly_workouts,
        plan.difficulty,
        row.prerequisites,
        row.equipment,
        row.goals,
        row.schedule,
        row.status,
        now,
        id
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_FITNESS_PLAN))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Fitness plan {} not found", id)));
    }

    get_fitness_plan(pool, id).await
}

#[instrument(skip(pool))]
pub async fn set_fitness_plan_status(
    pool: &Pool<Sqlite>,
    id: i64,
    status: PlanStatus,
) -> Result<FitnessPlan, AppError> {
    info!(status = %status.as_str(), "Setting fitness plan status");
    let now = Utc::now().naive_utc();
    let status = status.as_str();
    let result = sqlx::query!(
        "UPDATE fitness_plans SET status = ?, updated_at = ? WHERE id = ?",
        status,
        now,
        id
    )
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Fitness plan {} not found", id)));
    }

    get_fitness_plan(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_fitness_plan(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting fitness plan");
    let result = sqlx::query!("DELETE FROM fitness_plans WHERE id = ?", id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Fitness plan {} not found", id)));
    }

    Ok(())
}
