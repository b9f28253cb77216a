use chrono::{DateTime, NaiveDateTime, Utc};
use rocket::FromForm;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use super::{PlanStatus, decode_json_column, naive_to_utc, no_blank_entries, not_blank};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Exercise {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ScheduleDay {
    pub day: String,
    #[serde(default)]
    pub focus: String,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FitnessPlan {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub level: String,
    pub duration: String,
    pub weekly_workouts: i64,
    pub difficulty: i64,
    pub prerequisites: Vec<String>,
    pub equipment: Vec<String>,
    pub goals: Vec<String>,
    pub schedule: Vec<ScheduleDay>,
    pub status: PlanStatus,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbFitnessPlan {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub level: Option<String>,
    pub duration: Option<String>,
    pub weekly_workouts: Option<i64>,
    pub difficulty: Option<i64>,
    pub prerequisites: Option<String>,
    pub equipment: Option<String>,
    pub goals: Option<String>,
    pub schedule: Option<String>,
    pub status: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbFitnessPlan> for FitnessPlan {
    fn from(db: DbFitnessPlan) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            title: db.title.unwrap_or_default(),
            description: db.description.unwrap_or_default(),
            category: db.category.unwrap_or_default(),
            level: db.level.unwrap_or_default(),
            duration: db.duration.unwrap_or_default(),
            weekly_workouts: db.weekly_workouts.unwrap_or_default(),
            difficulty: db.difficulty.unwrap_or_default(),
            prerequisites: decode_json_column(db.prerequisites),
            equipment: decode_json_column(db.equipment),
            goals: decode_json_column(db.goals),
            schedule: decode_json_column(db.schedule),
            status: PlanStatus::from_db(&db.status.unwrap_or_default()),
            created_by: db.created_by,
            created_at: naive_to_utc(db.created_at),
            updated_at: naive_to_utc(db.updated_at),
        }
    }
}

/// The editable fields of a fitness plan, as submitted by the admin form
/// and produced by the text importer.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct FitnessPlanInput {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(custom(function = "not_blank"))]
    pub description: String,
    #[validate(custom(function = "not_blank"))]
    pub category: String,
    #[validate(custom(function = "not_blank"))]
    pub level: String,
    #[serde(default)]
    pub duration: String,
    #[validate(range(min = 1, max = 7, message = "Weekly workouts must be between 1 and 7"))]
    #[serde(default = "default_weekly_workouts")]
    pub weekly_workouts: i64,
    #[validate(range(min = 1, max = 5, message = "Difficulty must be between 1 and 5"))]
    #[serde(default = "default_difficulty")]
    pub difficulty: i64,
    #[validate(custom(function = "no_blank_entries"))]
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[validate(custom(function = "no_blank_entries"))]
    #[serde(default)]
    pub equipment: Vec<String>,
    #[validate(custom(function = "no_blank_entries"))]
    #[serde(default)]
    pub goals: Vec<String>,
    #[validate(custom(function = "validate_schedule"))]
    #[serde(default)]
    pub schedule: Vec<ScheduleDay>,
    #[serde(default)]
    pub status: PlanStatus,
}

fn default_weekly_workouts() -> i64 {
    3
}

fn default_difficulty() -> i64 {
    1
}

fn validate_schedule(schedule: &[ScheduleDay]) -> Result<(), ValidationError> {
    for day in schedule {
        if day.day.trim().is_empty() {
            return Err(ValidationError::new("schedule_day")
                .with_message(Cow::Borrowed("Every schedule day needs a label")));
        }
        if day.exercises.iter().any(|e| e.name.trim().is_empty()) {
            return Err(ValidationError::new("schedule_exercise").with_message(Cow::Owned(
                format!("Every exercise on {} needs a name", day.day),
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Default, FromForm)]
pub struct FitnessPlanFilter {
    pub category: Option<String>,
    pub level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> FitnessPlanInput {
        FitnessPlanInput {
            title: "Strength Starter".to_string(),
            description: "Full-body basics".to_string(),
            category: "Strength".to_string(),
            level: "Beginner".to_string(),
            duration: "4 weeks".to_string(),
            weekly_workouts: 3,
            difficulty: 2,
            prerequisites: vec![],
            equipment: vec!["Dumbbells".to_string()],
            goals: vec!["Build strength".to_string()],
            schedule: vec![ScheduleDay {
                day: "Day 1".to_string(),
                focus: "Legs".to_string(),
                exercises: vec![Exercise {
                    name: "Squat".to_string(),
                    sets: Some(3),
                    reps: Some("10".to_string()),
                    ..Default::default()
                }],
            }],
            status: PlanStatus::Draft,
        }
    }

    #[test]
    fn valid_plan_passes() {
        assert!(valid_input().validate().is_ok());
    }

    #[test]
    fn blank_required_fields_are_reported_per_field() {
        let mut input = valid_input();
        input.title = "   ".to_string();
        input.level = String::new();

        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("level"));
        assert!(!fields.contains_key("description"));
    }

    #[test]
    fn difficulty_out_of_range_is_rejected() {
        let mut input = valid_input();
        input.difficulty = 6;
        assert!(input.validate().unwrap_err().field_errors().contains_key("difficulty"));

        input.difficulty = 0;
        assert!(input.validate().unwrap_err().field_errors().contains_key("difficulty"));
    }

    #[test]
    fn unnamed_exercise_fails_schedule_validation() {
        let mut input = valid_input();
        input.schedule[0].exercises.push(Exercise::default());
        assert!(input.validate().unwrap_err().field_errors().contains_key("schedule"));
    }

    #[test]
    fn malformed_json_columns_decode_to_defaults() {
        let plan = FitnessPlan::from(DbFitnessPlan {
            id: Some(1),
            schedule: Some("not json".to_string()),
            goals: None,
            status: Some("published".to_string()),
            ..Default::default()
        });
        assert!(plan.schedule.is_empty());
        assert!(plan.goals.is_empty());
        assert_eq!(plan.status, PlanStatus::Published);
    }
}
