pub mod activity;
pub mod feedback;
pub mod fitness_plan;
pub mod nutrition_plan;
pub mod profile;

pub use activity::*;
pub use feedback::*;
pub use fitness_plan::*;
pub use nutrition_plan::*;
pub use profile::*;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use validator::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Draft,
    Published,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::Published => "published",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "published" => PlanStatus::Published,
            _ => PlanStatus::Draft,
        }
    }
}

/// SQLite `CURRENT_TIMESTAMP` columns come back naive; they are always UTC.
pub fn naive_to_utc(value: Option<NaiveDateTime>) -> DateTime<Utc> {
    value
        .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
        .unwrap_or_else(Utc::now)
}

/// Decodes a JSON text column, falling back to the type's default when the
/// stored value is missing or malformed.
pub fn decode_json_column<T: DeserializeOwned + Default>(value: Option<String>) -> T {
    value
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required")
            .with_message(Cow::Borrowed("This field is required")));
    }
    Ok(())
}

pub fn no_blank_entries(values: &[String]) -> Result<(), ValidationError> {
    if values.iter().any(|v| v.trim().is_empty()) {
        return Err(ValidationError::new("blank_entry")
            .with_message(Cow::Borrowed("Entries must not be blank")));
    }
    Ok(())
}
