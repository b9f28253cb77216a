use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{DbFeedback, Feedback, FeedbackInput};

#[instrument(skip(pool))]
pub async fn get_feedback(pool: &Pool<Sqlite>, id: i64) -> Result<Feedback, AppError> {
    let row = sqlx::query_as!(
        DbFeedback,
        "SELECT id, user_id, full_name, email, content, rating, created_at, replied_at
         FROM feedback WHERE id = ?",
        id
    )
    .fetch_optional(pool)
    .await?;

    match row {
        Some(feedback) => Ok(Feedback::from(feedback)),
        _ => Err(AppError::NotFound(format!("Feedback {} not found", id))),
    }
}

#[instrument(skip(pool))]
pub async fn get_all_feedback(pool: &Pool<Sqlite>) -> Result<Vec<Feedback>, AppError> {
    info!("Getting all feedback");
    let rows = sqlx::query_as!(
        DbFeedback,
        "SELECT id, user_id, full_name, email, content, rating, created_at, replied_at
         FROM feedback ORDER BY created_at DESC, id DESC"
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Feedback::from).collect())
}

#[instrument(skip(pool, feedback))]
pub async fn create_feedback(
    pool: &Pool<Sqlite>,
    user_id: Option<i64>,
    feedback: &FeedbackInput,
) -> Result<Feedback, AppError> {
    info!("Recording feedback");
    let full_name = feedback.full_name.trim();
    let email = feedback.email.trim();
    let content = feedback.content.trim();

    let res = sqlx::query!(
        "INSERT INTO feedback (user_id, full_name, email, content, rating) VALUES (?, ?, ?, ?, ?)",
        user_id,
        full_name,
        email,
        content,
        feedback.rating
    )
    .execute(pool)
    .await?;

    get_feedback(pool, res.last_insert_rowid()).await
}

#[instrument(skip(pool))]
pub async fn mark_feedback_replied(pool: &Pool<Sqlite>, id: i64) -> Result<Feedback, AppError> {
    info!("Marking feedback as replied");
    let now = Utc::now().naive_utc();
    sqlx::query!("UPDATE feedback SET replied_at = ? WHERE id = ?", now, id)
        .execute(pool)
        .await?;

    get_feedback(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_feedback(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting feedback");
    let result = sqlx::query!("DELETE FROM feedback WHERE id = ?", id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Feedback {} not found", id)));
    }

    Ok(())
}
