use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::auth::{Account, DbAccount};
use crate::error::AppError;

const DUPLICATE_EMAIL: &str = "An account with this email already exists";

#[instrument(skip(pool))]
pub async fn get_account(pool: &Pool<Sqlite>, id: i64) -> Result<Account, AppError> {
    info!("Fetching account by ID");
    let row = sqlx::query_as!(
        DbAccount,
        "SELECT id, email, full_name, created_at FROM users WHERE id = ?",
        id
    )
    .fetch_optional(pool)
    .await?;

    match row {
        Some(account) => Ok(Account::from(account)),
        _ => Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn find_account_by_email(
    pool: &Pool<Sqlite>,
    email: &str,
) -> Result<Option<Account>, AppError> {
    info!("Finding account by email");
    let row = sqlx::query_as!(
        DbAccount,
        "SELECT id, email, full_name, created_at FROM users WHERE email = ? COLLATE NOCASE",
        email
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Account::from))
}

#[instrument(skip_all, fields(email))]
pub async fn create_account(
    pool: &Pool<Sqlite>,
    email: &str,
    password: &str,
    full_name: &str,
) -> Result<i64, AppError> {
    info!("Creating new account");

    if find_account_by_email(pool, email).await?.is_some() {
        return Err(AppError::Conflict(DUPLICATE_EMAIL.to_string()));
    }

    let hashed_password = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;

    let res = sqlx::query!(
        "INSERT INTO users (email, password, full_name) VALUES (?, ?, ?)",
        email,
        hashed_password,
        full_name
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_EMAIL))?;

    Ok(res.last_insert_rowid())
}

/// Returns the account when the password matches, `None` otherwise.
#[instrument(skip_all, fields(email))]
pub async fn authenticate_account(
    pool: &Pool<Sqlite>,
    email: &str,
    password: &str,
) -> Result<Option<Account>, AppError> {
    info!("Authenticating account");

    let credentials = sqlx::query!(
        r#"SELECT id AS "id!", password FROM users WHERE email = ? COLLATE NOCASE"#,
        email
    )
    .fetch_optional(pool)
    .await?;

    let Some(credentials) = credentials else {
        return Ok(None);
    };

    match bcrypt::verify(password, &credentials.password) {
        Ok(true) => Ok(Some(get_account(pool, credentials.id).await?)),
        _ => Ok(None),
    }
}

#[instrument(skip(pool))]
pub async fn update_account_email(
    pool: &Pool<Sqlite>,
    user_id: i64,
    email: &str,
) -> Result<(), AppError> {
    info!("Updating account email");
    let existing = sqlx::query!(
        "SELECT id FROM users WHERE email = ? COLLATE NOCASE AND id != ?",
        email,
        user_id
    )
    .fetch_optional(pool)
    .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(DUPLICATE_EMAIL.to_string()));
    }

    sqlx::query!("UPDATE users SET email = ? WHERE id = ?", email, user_id)
        .execute(pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_EMAIL))?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn update_account_name(
    pool: &Pool<Sqlite>,
    user_id: i64,
    full_name: &str,
) -> Result<(), AppError> {
    info!("Updating account name");
    sqlx::query!(
        "UPDATE users SET full_name = ? WHERE id = ?",
        full_name,
        user_id
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Removes the account; sessions, profile and activities go with it and
/// feedback rows are detached.
#[instrument(skip(pool))]
pub async fn delete_account(pool: &Pool<Sqlite>, user_id: i64) -> Result<(), AppError> {
    info!("Deleting account");
    let result = sqlx::query!("DELETE FROM users WHERE id = ?", user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            user_id
        )));
    }

    Ok(())
}
