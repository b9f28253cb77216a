use chrono::NaiveDate;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{Activity, ActivityInput, DayCount, DbActivity};

#[instrument(skip(pool))]
pub async fn get_activity(pool: &Pool<Sqlite>, id: i64) -> Result<Activity, AppError> {
    let row = sqlx::query_as!(
        DbActivity,
        "SELECT id, user_id, date, type AS activity_type, details, created_at
         FROM activities WHERE id = ?",
        id
    )
    .fetch_optional(pool)
    .await?;

    match row {
        Some(activity) => Ok(Activity::from(activity)),
        _ => Err(AppError::NotFound(format!("Activity {} not found", id))),
    }
}

/// Activities for one user in the half-open date range `[from, until)`.
#[instrument(skip(pool))]
pub async fn get_activities_between(
    pool: &Pool<Sqlite>,
    user_id: i64,
    from: NaiveDate,
    until: NaiveDate,
) -> Result<Vec<Activity>, AppError> {
    info!("Getting activities in range");
    let rows = sqlx::query_as!(
        DbActivity,
        "SELECT id, user_id, date, type AS activity_type, details, created_at
         FROM activities
         WHERE user_id = ? AND date >= ? AND date < ?
         ORDER BY date, id",
        user_id,
        from,
        until
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Activity::from).collect())
}

#[instrument(skip(pool))]
pub async fn count_activities_by_day(
    pool: &Pool<Sqlite>,
    user_id: i64,
    from: NaiveDate,
    until: NaiveDate,
) -> Result<Vec<DayCount>, AppError> {
    let rows = sqlx::query!(
        r#"SELECT date AS "date!: NaiveDate", COUNT(*) AS "count!: i64" FROM activities
         WHERE user_id = ? AND date >= ? AND date < ?
         GROUP BY date
         ORDER BY date"#,
        user_id,
        from,
        until
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| DayCount {
            date: row.date,
            count: row.count,
        })
        .collect())
}

/// Distinct activity dates on or before `until`, newest first.
#[instrument(skip(pool))]
pub async fn get_recent_activity_dates(
    pool: &Pool<Sqlite>,
    user_id: i64,
    until: NaiveDate,
) -> Result<Vec<NaiveDate>, AppError> {
    let dates = sqlx::query_scalar!(
        r#"SELECT DISTINCT date AS "date!: NaiveDate" FROM activities
         WHERE user_id = ? AND date <= ?
         ORDER BY date DESC"#,
        user_id,
        until
    )
    .fetch_all(pool)
    .await?;

    Ok(dates)
}

#[instrument(skip(pool, activity), fields(activity_type = %activity.activity_type))]
pub async fn create_activity(
    pool: &Pool<Sqlite>,
    user_id: i64,
    activity: &ActivityInput,
) -> Result<Activity, AppError> {
    info!("Logging activity");
    let details = activity
        .details
        .clone()
        .unwrap_or_else(|| serde_json::json!({}));

    let activity_type = activity.activity_type.trim();
    let details = serde_json::to_string(&details)?;

    let res = sqlx::query!(
        "INSERT INTO activities (user_id, date, type, details) VALUES (?, ?, ?, ?)",
        user_id,
        activity.date,
        activity_type,
        details
    )
    .execute(pool)
    .await?;

    get_activity(pool, res.last_insert_rowid()).await
}

#[instrument(skip(pool))]
pub async fn delete_activity(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting activity");
    sqlx::query!("DELETE FROM activities WHERE id = ?", id)
        .execute(pool)
        .await?;

    Ok(())
}
