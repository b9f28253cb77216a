use chrono::{NaiveDate, Utc};
use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};
use tracing::warn;

use crate::auth::{AuthUser, Permission};
use crate::calendar::{current_streak, current_year_month, month_bounds, summarize_month};
use crate::db::{
    count_activities_by_day, create_activity, delete_activity, get_activities_between,
    get_activity, get_recent_activity_dates,
};
use crate::error::AppError;
use crate::models::{Activity, ActivityInput, MonthSummary};
use crate::validation::{
    ApiResult, AppErrorExt, JsonValidateExt, PermissionCheckExt, ToValidationResponse,
};

/// Month requested by the query string, defaulting to the current one.
fn requested_month(
    year: Option<i32>,
    month: Option<u32>,
    today: NaiveDate,
) -> Result<(i32, u32, NaiveDate, NaiveDate), AppError> {
    let (current_year, current_month) = current_year_month(today);
    let year = year.unwrap_or(current_year);
    let month = month.unwrap_or(current_month);
    let (from, until) = month_bounds(year, month)?;
    Ok((year, month, from, until))
}

#[get("/activities?<year>&<month>")]
pub async fn list_activities(
    year: Option<i32>,
    month: Option<u32>,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Activity>>> {
    user.require_permission(Permission::LogActivities)
        .validate_custom()?;

    let (_, _, from, until) =
        requested_month(year, month, Utc::now().date_naive()).validate_custom()?;

    let activities = get_activities_between(db, user.id(), from, until)
        .await
        .validate_custom()?;
    Ok(Json(activities))
}

#[post("/activities", data = "<activity>")]
pub async fn log_activity(
    activity: Json<ActivityInput>,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<Activity>>> {
    user.require_permission(Permission::LogActivities)
        .validate_custom()?;
    let activity = activity.validate_custom()?;

    let created = create_activity(db, user.id(), &activity)
        .await
        .validate_custom()?;
    Ok(Custom(Status::Created, Json(created)))
}

#[get("/activities/summary?<year>&<month>")]
pub async fn activity_summary(
    year: Option<i32>,
    month: Option<u32>,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<MonthSummary>> {
    user.require_permission(Permission::LogActivities)
        .validate_custom()?;

    let today = Utc::now().date_naive();
    let (year, month, from, until) = requested_month(year, month, today).validate_custom()?;

    let days = count_activities_by_day(db, user.id(), from, until)
        .await
        .validate_custom()?;
    let recent = get_recent_activity_dates(db, user.id(), today)
        .await
        .validate_custom()?;

    Ok(Json(summarize_month(
        year,
        month,
        days,
        current_streak(&recent, today),
    )))
}

#[delete("/activities/<id>")]
pub async fn remove_activity(
    id: i64,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Status> {
    user.require_permission(Permission::LogActivities)
        .validate_custom()?;

    let activity = get_activity(db, id).await.validate_custom()?;
    if activity.user_id != user.id() {
        warn!(activity_id = id, user_id = user.id(), "Attempt to delete another user's activity");
        return Err(AppError::Authorization(
            "You can only delete your own activities".to_string(),
        )
        .to_validation_response());
    }

    delete_activity(db, id).await.validate_custom()?;
    Ok(Status::NoContent)
}
