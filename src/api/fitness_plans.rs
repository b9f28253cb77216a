use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::Deserialize;
use sqlx::{Pool, Sqlite};

use crate::auth::{AuthUser, Permission};
use crate::db::{
    create_fitness_plan, delete_fitness_plan, get_all_fitness_plans, get_fitness_plan,
    get_published_fitness_plans, set_fitness_plan_status, update_fitness_plan,
};
use crate::error::AppError;
use crate::models::{FitnessPlan, FitnessPlanFilter, FitnessPlanInput, PlanStatus};
use crate::validation::{
    ApiResult, AppErrorExt, JsonValidateExt, PermissionCheckExt, ToValidationResponse,
};

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: PlanStatus,
}

/// Drafts are only visible to staff who preview them and to the admins
/// managing that kind of plan.
pub(super) fn can_see(status: PlanStatus, viewer: Option<&AuthUser>, manage: Permission) -> bool {
    status == PlanStatus::Published
        || viewer.is_some_and(|u| {
            u.has_permission(Permission::PreviewDraftPlans) || u.has_permission(manage)
        })
}

#[get("/fitness-plans?<filter..>")]
pub async fn list_fitness_plans(
    filter: FitnessPlanFilter,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<FitnessPlan>>> {
    let plans = get_published_fitness_plans(db, &filter)
        .await
        .validate_custom()?;
    Ok(Json(plans))
}

#[get("/fitness-plans/<id>")]
pub async fn get_public_fitness_plan(
    id: i64,
    user: Option<AuthUser>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<FitnessPlan>> {
    let plan = get_fitness_plan(db, id).await.validate_custom()?;

    if !can_see(plan.status, user.as_ref(), Permission::ManageFitnessPlans) {
        return Err(
            AppError::NotFound(format!("Fitness plan {} not found", id)).to_validation_response(),
        );
    }

    Ok(Json(plan))
}

#[get("/admin/fitness-plans")]
pub async fn admin_list_fitness_plans(
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<FitnessPlan>>> {
    user.require_permission(Permission::ManageFitnessPlans)
        .validate_custom()?;
    let plans = get_all_fitness_plans(db).await.validate_custom()?;
    Ok(Json(plans))
}

#[get("/admin/fitness-plans/<id>")]
pub async fn admin_get_fitness_plan(
    id: i64,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<FitnessPlan>> {
    user.require_permission(Permission::ManageFitnessPlans)
        .validate_custom()?;
    let plan = get_fitness_plan(db, id).await.validate_custom()?;
    Ok(Json(plan))
}

#[post("/admin/fitness-plans", data = "<plan>")]
pub async fn admin_create_fitness_plan(
    plan: Json<FitnessPlanInput>,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<FitnessPlan>>> {
    user.require_permission(Permission::ManageFitnessPlans)
        .validate_custom()?;
    let plan = plan.validate_custom()?;

    let created = create_fitness_plan(db, &plan, Some(user.id()))
        .await
        .validate_custom()?;

    Ok(Custom(Status::Created, Json(created)))
}

#[put("/admin/fitness-plans/<id>", data = "<plan>")]
pub async fn admin_update_fitness_plan(
    id: i64,
    plan: Json<FitnessPlanInput>,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<FitnessPlan>> {
    user.require_permission(Permission::ManageFitnessPlans)
        .validate_custom()?;
    let plan = plan.validate_custom()?;

    let updated = update_fitness_plan(db, id, &plan).await.validate_custom()?;
    Ok(Json(updated))
}

#[put("/admin/fitness-plans/<id>/status", data = "<update>")]
pub async fn admin_set_fitness_plan_status(
    id: i64,
    update: Json<StatusUpdate>,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<FitnessPlan>> {
    user.require_permission(Permission::ManageFitnessPlans)
        .validate_custom()?;

    let updated = set_fitness_plan_status(db, id, update.status)
        .await
        .validate_custom()?;
    Ok(Json(updated))
}

#[delete("/admin/fitness-plans/<id>")]
pub async fn admin_delete_fitness_plan(
    id: i64,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Status> {
    user.require_permission(Permission::ManageFitnessPlans)
        .validate_custom()?;
    delete_fitness_plan(db, id).await.validate_custom()?;
    Ok(Status::NoContent)
}
