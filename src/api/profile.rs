use rocket::State;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};

use crate::auth::{AuthUser, Permission};
use crate::bmi::{self, BmiReading};
use crate::db::{get_profile, update_account_name, update_profile_metrics, update_profile_name};
use crate::models::{BodyMetrics, Profile, ProfileUpdate};
use crate::validation::{ApiResult, AppErrorExt, JsonValidateExt, PermissionCheckExt};

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub profile: Profile,
    pub reading: BmiReading,
}

/// Stateless calculator, open to anonymous visitors. Takes the same bounds
/// as the stored metrics.
#[post("/bmi", data = "<metrics>")]
pub fn calculate_bmi(metrics: Json<BodyMetrics>) -> ApiResult<Json<BmiReading>> {
    let metrics = metrics.validate_custom()?;
    let reading = bmi::calculate(metrics.height, metrics.weight).validate_custom()?;
    Ok(Json(reading))
}

#[get("/profile")]
pub async fn get_own_profile(user: AuthUser) -> ApiResult<Json<Profile>> {
    user.require_permission(Permission::ViewOwnProfile)
        .validate_custom()?;
    Ok(Json(user.profile))
}

#[put("/profile", data = "<update>")]
pub async fn update_own_profile(
    update: Json<ProfileUpdate>,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Profile>> {
    user.require_permission(Permission::EditOwnProfile)
        .validate_custom()?;
    let update = update.validate_custom()?;
    let full_name = update.full_name.trim();

    update_profile_name(db, user.id(), full_name)
        .await
        .validate_custom()?;
    update_account_name(db, user.id(), full_name)
        .await
        .validate_custom()?;

    let profile = get_profile(db, user.id()).await.validate_custom()?;
    Ok(Json(profile))
}

#[put("/profile/metrics", data = "<metrics>")]
pub async fn update_own_metrics(
    metrics: Json<BodyMetrics>,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<MetricsResponse>> {
    user.require_permission(Permission::EditOwnProfile)
        .validate_custom()?;
    let metrics = metrics.validate_custom()?;

    let reading = bmi::calculate(metrics.height, metrics.weight).validate_custom()?;
    let profile = update_profile_metrics(db, user.id(), metrics.height, metrics.weight, reading.bmi)
        .await
        .validate_custom()?;

    Ok(Json(MetricsResponse { profile, reading }))
}
