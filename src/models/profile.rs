use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{naive_to_utc, not_blank};
use crate::auth::Role;

/// Application-level user record: name, role and health metrics.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Profile {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub bmi: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbProfile {
    pub id: Option<i64>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub bmi: Option<f64>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbProfile> for Profile {
    fn from(db: DbProfile) -> Self {
        let raw_role = db.role.unwrap_or_default();
        let role = Role::from_str(&raw_role).unwrap_or_else(|_| {
            tracing::warn!(
                role = %raw_role,
                profile_id = ?db.id,
                "Unknown role on profile, treating as user"
            );
            Role::User
        });

        Self {
            id: db.id.unwrap_or_default(),
            full_name: db.full_name.unwrap_or_default(),
            email: db.email.unwrap_or_default(),
            role,
            height: db.height,
            weight: db.weight,
            bmi: db.bmi,
            created_at: naive_to_utc(db.created_at),
            updated_at: naive_to_utc(db.updated_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate, Clone)]
pub struct ProfileUpdate {
    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "Full name must be at most 100 characters")
    )]
    pub full_name: String,
}

#[derive(Debug, Deserialize, Serialize, Validate, Clone, Copy)]
pub struct BodyMetrics {
    /// Centimetres.
    #[validate(range(min = 50.0, max = 300.0, message = "Height must be between 50 and 300 cm"))]
    pub height: f64,
    /// Kilograms.
    #[validate(range(min = 10.0, max = 500.0, message = "Weight must be between 10 and 500 kg"))]
    pub weight: f64,
}
