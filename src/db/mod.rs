pub mod activities;
pub mod feedback;
pub mod fitness_plans;
pub mod nutrition_plans;
pub mod profiles;
pub mod sessions;
pub mod users;

pub use activities::*;
pub use feedback::*;
pub use fitness_plans::*;
pub use nutrition_plans::*;
pub use profiles::*;
pub use sessions::*;
pub use users::*;

use sqlx::{Pool, Sqlite, SqlitePool};
use tracing::info;

use crate::error::AppError;

pub async fn connect(database_url: &str) -> Result<Pool<Sqlite>, AppError> {
    info!("Connecting to database");
    let pool = SqlitePool::connect(database_url).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Migrations completed successfully");
    Ok(())
}
