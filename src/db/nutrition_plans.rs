use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{
    DbNutritionPlan, NutritionPlan, NutritionPlanFilter, NutritionPlanInput, PlanStatus,
};

pub const DUPLICATE_NUTRITION_PLAN: &str =
    "A nutrition plan with this title and category already exists";

struct NutritionPlanRow<'a> {
    title: &'a str,
    description: &'a str,
    category: &'a str,
    dietary_tags: String,
    meal_plan: String,
    status: &'static str,
}

impl<'a> NutritionPlanRow<'a> {
    fn new(plan: &'a NutritionPlanInput) -> Result<Self, AppError> {
        Ok(Self {
            title: plan.title.trim(),
            description: plan.description.trim(),
            category: plan.category.trim(),
            dietary_tags: serde_json::to_string(&plan.dietary_tags)?,
            meal_plan: serde_json::to_string(&plan.meal_plan)?,
            status: plan.status.as_str(),
        })
    }
}

#[instrument(skip(pool))]
pub async fn get_nutrition_plan(pool: &Pool<Sqlite>, id: i64) -> Result<NutritionPlan, AppError> {
    info!("Fetching nutrition plan");
    let row = sqlx::query_as!(
        DbNutritionPlan,
        "SELECT id, title, description, category, calories_per_day, meals_per_day, dietary_tags,
                meal_plan, status, created_by, created_at, updated_at
         FROM nutrition_plans WHERE id = ?",
        id
    )
    .fetch_optional(pool)
    .await?;

    match row {
        Some(plan) => Ok(NutritionPlan::from(plan)),
        _ => Err(AppError::NotFound(format!("Nutrition plan {} not found", id))),
    }
}

#[instrument(skip(pool))]
pub async fn get_published_nutrition_plans(
    pool: &Pool<Sqlite>,
    filter: &NutritionPlanFilter,
) -> Result<Vec<NutritionPlan>, AppError> {
    info!("Getting published nutrition plans");
    let category = filter.category.as_deref();
    let rows = sqlx::query_as!(
        DbNutritionPlan,
        "SELECT id, title, description, category, calories_per_day, meals_per_day, dietary_tags,
                meal_plan, status, created_by, created_at, updated_at
         FROM nutrition_plans
         WHERE status = 'published'
           AND (?1 IS NULL OR category = ?1 COLLATE NOCASE)
         ORDER BY title",
        category
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(NutritionPlan::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_all_nutrition_plans(pool: &Pool<Sqlite>) -> Result<Vec<NutritionPlan>, AppError> {
    info!("Getting all nutrition plans");
    let rows = sqlx::query_as!(
        DbNutritionPlan,
        "SELECT id, title, description, category, calories_per_day, meals_per_day, dietary_tags,
                meal_plan, status, created_by, created_at, updated_at
         FROM nutrition_plans ORDER BY updated_at DESC, id DESC"
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(NutritionPlan::from).collect())
}

#[instrument(skip(pool, plan), fields(title = %plan.title))]
pub async fn create_nutrition_plan(
    pool: &Pool<Sqlite>,
    plan: &NutritionPlanInput,
    created_by: Option<i64>,
) -> Result<NutritionPlan, AppError> {
    info!("Creating nutrition plan");
    let row = NutritionPlanRow::new(plan)?;
    let res = sqlx::query!(
        "INSERT INTO nutrition_plans
         (title, description, category, calories_per_day, meals_per_day, dietary_tags,
          meal_plan, status, created_by)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        row.title,
        row.description,
        row.category,
        plan.calories_per_day,
        plan.meals_per_day,
        row.dietary_tags,
        row.meal_plan,
        row.status,
        created_by
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_NUTRITION_PLAN))?;

    get_nutrition_plan(pool, res.last_insert_rowid()).await
}

#[instrument(skip(pool, plan), fields(title = %plan.title))]
pub async fn update_nutrition_plan(
    pool: &Pool<Sqlite>,
    id: i64,
    plan: &NutritionPlanInput,
) -> Result<NutritionPlan, AppError> {
    info!("Updating nutrition plan");
    let now = Utc::now().naive_utc();
    let row = NutritionPlanRow::new(plan)?;
    let result = sqlx::query!(
        "UPDATE nutrition_plans
         SET title = ?, description = ?, category = ?, calories_per_day = ?,
             meals_per_day = ?, dietary_tags = ?, meal_plan = ?, status = ?, updated_at = ?
         WHERE id = ?",
        row.title,
        row.description,
        row.category,
        plan.calories_per_day,
        plan.meals_per_day,
        row.dietary_tags,
        row.meal_plan,
        row.status,
        now,
        id
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_NUTRITION_PLAN))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Nutrition plan {} not found", id)));
    }

    get_nutrition_plan(pool, id).await
}

#[instrument(skip(pool))]
pub async fn set_nutrition_plan_status(
    pool: &Pool<Sqlite>,
    id: i64,
    status: PlanStatus,
) -> Result<NutritionPlan, AppError> {
    info!(status = %status.as_str(), "Setting nutrition plan status");
    let now = Utc::now().naive_utc();
    let status = status.as_str();
    let result = sqlx::query!(
        "UPDATE nutrition_plans SET status = ?, updated_at = ? WHERE id = ?",
        status,
        now,
        id
    )
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Nutrition plan {} not found", id)));
    }

    get_nutrition_plan(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_nutrition_plan(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting nutrition plan");
    let result = sqlx::query!("DELETE FROM nutrition_plans WHERE id = ?", id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Nutrition plan {} not found", id)));
    }

    Ok(())
}
