use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{naive_to_utc, not_blank};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub id: i64,
    pub user_id: Option<i64>,
    pub full_name: String,
    pub email: String,
    pub content: String,
    pub rating: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub replied_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbFeedback {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub content: Option<String>,
    pub rating: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
    pub replied_at: Option<NaiveDateTime>,
}

impl From<DbFeedback> for Feedback {
    fn from(db: DbFeedback) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            user_id: db.user_id,
            full_name: db.full_name.unwrap_or_default(),
            email: db.email.unwrap_or_default(),
            content: db.content.unwrap_or_default(),
            rating: db.rating,
            created_at: naive_to_utc(db.created_at),
            replied_at: db.replied_at.map(|dt| naive_to_utc(Some(dt))),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct FeedbackInput {
    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "Full name must be at most 100 characters")
    )]
    pub full_name: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(
        custom(function = "not_blank"),
        length(max = 2000, message = "Feedback must be at most 2000 characters")
    )]
    pub content: String,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    #[serde(default)]
    pub rating: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct FeedbackReply {
    #[validate(
        custom(function = "not_blank"),
        length(max = 5000, message = "Reply must be at most 5000 characters")
    )]
    pub message: String,
}
