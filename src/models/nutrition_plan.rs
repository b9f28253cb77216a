use chrono::{DateTime, NaiveDateTime, Utc};
use rocket::FromForm;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use super::{PlanStatus, decode_json_column, naive_to_utc, no_blank_entries, not_blank};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Meal {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default)]
    pub foods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MealDay {
    pub day: String,
    #[serde(default)]
    pub meals: Vec<Meal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NutritionPlan {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub calories_per_day: Option<i64>,
    pub meals_per_day: i64,
    pub dietary_tags: Vec<String>,
    pub meal_plan: Vec<MealDay>,
    pub status: PlanStatus,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbNutritionPlan {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub calories_per_day: Option<i64>,
    pub meals_per_day: Option<i64>,
    pub dietary_tags: Option<String>,
    pub meal_plan: Option<String>,
    pub status: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbNutritionPlan> for NutritionPlan {
    fn from(db: DbNutritionPlan) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            title: db.title.unwrap_or_default(),
            description: db.description.unwrap_or_default(),
            category: db.category.unwrap_or_default(),
            calories_per_day: db.calories_per_day,
            meals_per_day: db.meals_per_day.unwrap_or_default(),
            dietary_tags: decode_json_column(db.dietary_tags),
            meal_plan: decode_json_column(db.meal_plan),
            status: PlanStatus::from_db(&db.status.unwrap_or_default()),
            created_by: db.created_by,
            created_at: naive_to_utc(db.created_at),
            updated_at: naive_to_utc(db.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NutritionPlanInput {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(custom(function = "not_blank"))]
    pub description: String,
    #[validate(custom(function = "not_blank"))]
    pub category: String,
    #[validate(range(
        min = 800,
        max = 6000,
        message = "Calories per day must be between 800 and 6000"
    ))]
    #[serde(default)]
    pub calories_per_day: Option<i64>,
    #[validate(range(min = 1, max = 10, message = "Meals per day must be between 1 and 10"))]
    #[serde(default = "default_meals_per_day")]
    pub meals_per_day: i64,
    #[validate(custom(function = "no_blank_entries"))]
    #[serde(default)]
    pub dietary_tags: Vec<String>,
    #[validate(custom(function = "validate_meal_plan"))]
    #[serde(default)]
    pub meal_plan: Vec<MealDay>,
    #[serde(default)]
    pub status: PlanStatus,
}

fn default_meals_per_day() -> i64 {
    3
}

fn validate_meal_plan(meal_plan: &[MealDay]) -> Result<(), ValidationError> {
    for day in meal_plan {
        if day.day.trim().is_empty() {
            return Err(ValidationError::new("meal_day")
                .with_message(Cow::Borrowed("Every meal-plan day needs a label")));
        }
        if day.meals.iter().any(|m| m.name.trim().is_empty()) {
            return Err(ValidationError::new("meal_name").with_message(Cow::Owned(format!(
                "Every meal on {} needs a name",
                day.day
            ))));
        }
    }
    Ok(())
}

#[derive(Debug, Default, FromForm)]
pub struct NutritionPlanFilter {
    pub category: Option<String>,
}
