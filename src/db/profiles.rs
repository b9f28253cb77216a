use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::auth::Role;
use crate::error::AppError;
use crate::models::{DbProfile, NewProfile, Profile};

#[instrument(skip(pool))]
pub async fn find_profile(pool: &Pool<Sqlite>, user_id: i64) -> Result<Option<Profile>, AppError> {
    info!("Fetching profile");
    let row = sqlx::query_as!(
        DbProfile,
        "SELECT id, full_name, email, role, height, weight, bmi, created_at, updated_at
         FROM user_profiles WHERE id = ?",
        user_id
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Profile::from))
}

#[instrument(skip(pool))]
pub async fn get_profile(pool: &Pool<Sqlite>, user_id: i64) -> Result<Profile, AppError> {
    find_profile(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
}

#[instrument(skip(pool))]
pub async fn create_profile(
    pool: &Pool<Sqlite>,
    profile: &NewProfile,
) -> Result<Profile, AppError> {
    info!(role = %profile.role, "Creating profile");
    let role = profile.role.as_str();
    sqlx::query!(
        "INSERT INTO user_profiles (id, full_name, email, role) VALUES (?, ?, ?, ?)",
        profile.id,
        profile.full_name,
        profile.email,
        role
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::from_unique_violation(e, "Profile already exists"))?;

    get_profile(pool, profile.id).await
}

#[instrument(skip(pool))]
pub async fn get_all_profiles(pool: &Pool<Sqlite>) -> Result<Vec<Profile>, AppError> {
    info!("Getting all profiles");
    let rows = sqlx::query_as!(
        DbProfile,
        "SELECT id, full_name, email, role, height, weight, bmi, created_at, updated_at
         FROM user_profiles ORDER BY created_at DESC, id DESC"
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Profile::from).collect())
}

#[instrument(skip(pool))]
pub async fn update_profile_name(
    pool: &Pool<Sqlite>,
    user_id: i64,
    full_name: &str,
) -> Result<(), AppError> {
    info!("Updating profile name");
    let now = Utc::now().naive_utc();
    let result = sqlx::query!(
        "UPDATE user_profiles SET full_name = ?, updated_at = ? WHERE id = ?",
        full_name,
        now,
        user_id
    )
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Profile not found".to_string()));
    }

    Ok(())
}

#[instrument(skip(pool))]
pub async fn update_profile_email(
    pool: &Pool<Sqlite>,
    user_id: i64,
    email: &str,
) -> Result<(), AppError> {
    info!("Updating profile email");
    let now = Utc::now().naive_utc();
    sqlx::query!(
        "UPDATE user_profiles SET email = ?, updated_at = ? WHERE id = ?",
        email,
        now,
        user_id
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn update_profile_role(
    pool: &Pool<Sqlite>,
    user_id: i64,
    role: Role,
) -> Result<(), AppError> {
    info!(role = %role, "Updating profile role");
    let now = Utc::now().naive_utc();
    let role = role.as_str();
    sqlx::query!(
        "UPDATE user_profiles SET role = ?, updated_at = ? WHERE id = ?",
        role,
        now,
        user_id
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn update_profile_metrics(
    pool: &Pool<Sqlite>,
    user_id: i64,
    height: f64,
    weight: f64,
    bmi: f64,
) -> Result<Profile, AppError> {
    info!("Updating profile body metrics");
    let now = Utc::now().naive_utc();
    let result = sqlx::query!(
        "UPDATE user_profiles SET height = ?, weight = ?, bmi = ?, updated_at = ? WHERE id = ?",
        height,
        weight,
        bmi,
        now,
        user_id
    )
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Profile not found".to_string()));
    }

    get_profile(pool, user_id).await
}
