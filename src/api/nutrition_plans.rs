use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};

use super::fitness_plans::{StatusUpdate, can_see};
use crate::auth::{AuthUser, Permission};
use crate::db::{
    create_nutrition_plan, delete_nutrition_plan, get_all_nutrition_plans, get_nutrition_plan,
    get_published_nutrition_plans, set_nutrition_plan_status, update_nutrition_plan,
};
use crate::error::AppError;
use crate::models::{NutritionPlan, NutritionPlanFilter, NutritionPlanInput};
use crate::validation::{
    ApiResult, AppErrorExt, JsonValidateExt, PermissionCheckExt, ToValidationResponse,
};

#[get("/nutrition-plans?<filter..>")]
pub async fn list_nutrition_plans(
    filter: NutritionPlanFilter,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<NutritionPlan>>> {
    let plans = get_published_nutrition_plans(db, &filter)
        .await
        .validate_custom()?;
    Ok(Json(plans))
}

#[get("/nutrition-plans/<id>")]
pub async fn get_public_nutrition_plan(
    id: i64,
    user: Option<AuthUser>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<NutritionPlan>> {
    let plan = get_nutrition_plan(db, id).await.validate_custom()?;

    if !can_see(plan.status, user.as_ref(), Permission::ManageNutritionPlans) {
        return Err(
            AppError::NotFound(format!("Nutrition plan {} not found", id)).to_validation_response(),
        );
    }

    Ok(Json(plan))
}

#[get("/admin/nutrition-plans")]
pub async fn admin_list_nutrition_plans(
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<NutritionPlan>>> {
    user.require_permission(Permission::ManageNutritionPlans)
        .validate_custom()?;
    let plans = get_all_nutrition_plans(db).await.validate_custom()?;
    Ok(Json(plans))
}

#[get("/admin/nutrition-plans/<id>")]
pub async fn admin_get_nutrition_plan(
    id: i64,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<NutritionPlan>> {
    user.require_permission(Permission::ManageNutritionPlans)
        .validate_custom()?;
    let plan = get_nutrition_plan(db, id).await.validate_custom()?;
    Ok(Json(plan))
}

#[post("/admin/nutrition-plans", data = "<plan>")]
pub async fn admin_create_nutrition_plan(
    plan: Json<NutritionPlanInput>,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<NutritionPlan>>> {
    user.require_permission(Permission::ManageNutritionPlans)
        .validate_custom()?;
    let plan = plan.validate_custom()?;

    let created = create_nutrition_plan(db, &plan, Some(user.id()))
        .await
        .validate_custom()?;

    Ok(Custom(Status::Created, Json(created)))
}

#[put("/admin/nutrition-plans/<id>", data = "<plan>")]
pub async fn admin_update_nutrition_plan(
    id: i64,
    plan: Json<NutritionPlanInput>,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<NutritionPlan>> {
    user.require_permission(Permission::ManageNutritionPlans)
        .validate_custom()?;
    let plan = plan.validate_custom()?;

    let updated = update_nutrition_plan(db, id, &plan).await.validate_custom()?;
    Ok(Json(updated))
}

#[put("/admin/nutrition-plans/<id>/status", data = "<update>")]
pub async fn admin_set_nutrition_plan_status(
    id: i64,
    update: Json<StatusUpdate>,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<NutritionPlan>> {
    user.require_permission(Permission::ManageNutritionPlans)
        .validate_custom()?;

    let updated = set_nutrition_plan_status(db, id, update.status)
        .await
        .validate_custom()?;
    Ok(Json(updated))
}

#[delete("/admin/nutrition-plans/<id>")]
pub async fn admin_delete_nutrition_plan(
    id: i64,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Status> {
    user.require_permission(Permission::ManageNutritionPlans)
        .validate_custom()?;
    delete_nutrition_plan(db, id).await.validate_custom()?;
    Ok(Status::NoContent)
}
