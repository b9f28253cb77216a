use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::{naive_to_utc, not_blank};

/// One logged activity on the calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbActivity {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub activity_type: Option<String>,
    pub details: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<DbActivity> for Activity {
    fn from(db: DbActivity) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            user_id: db.user_id.unwrap_or_default(),
            date: db.date.unwrap_or_default(),
            activity_type: db.activity_type.unwrap_or_default(),
            details: db
                .details
                .and_then(|raw| serde_json::from_str(&raw).ok())
                .unwrap_or(Value::Null),
            created_at: naive_to_utc(db.created_at),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ActivityInput {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    #[validate(
        custom(function = "not_blank"),
        length(max = 50, message = "Activity type must be at most 50 characters")
    )]
    pub activity_type: String,
    #[serde(default)]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthSummary {
    pub year: i32,
    pub month: u32,
    pub total: i64,
    pub active_days: usize,
    pub days: Vec<DayCount>,
    pub current_streak: u32,
}
