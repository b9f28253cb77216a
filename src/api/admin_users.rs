use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{AuthUser, Permission, Role};
use crate::db::{
    create_account, create_profile, delete_account, get_all_feedback, get_all_fitness_plans,
    get_all_nutrition_plans, get_all_profiles, get_profile, update_account_email,
    update_account_name, update_profile_email, update_profile_name, update_profile_role,
};
use crate::error::AppError;
use crate::models::{NewProfile, PlanStatus, Profile, not_blank};
use crate::validation::{
    ApiResult, AppErrorExt, JsonValidateExt, PermissionCheckExt, ToValidationResponse,
};

#[derive(Debug, Deserialize, Validate)]
pub struct NewUserRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "Full name must be at most 100 characters")
    )]
    pub full_name: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::User
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserUpdateRequest {
    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "Full name must be at most 100 characters")
    )]
    pub full_name: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct PlanCounts {
    pub total: usize,
    pub published: usize,
}

/// Landing data for the back-office, scoped to what the caller may manage.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminOverview {
    pub role: Role,
    pub can_manage_fitness_plans: bool,
    pub can_manage_nutrition_plans: bool,
    pub can_manage_users: bool,
    pub can_manage_feedback: bool,
    pub fitness_plans: Option<PlanCounts>,
    pub nutrition_plans: Option<PlanCounts>,
    pub users: Option<usize>,
    pub unanswered_feedback: Option<usize>,
}

#[get("/admin/overview")]
pub async fn admin_overview(
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<AdminOverview>> {
    user.require_permission(Permission::ViewAdminDashboard)
        .validate_custom()?;

    let can_manage_fitness_plans = user.has_permission(Permission::ManageFitnessPlans);
    let can_manage_nutrition_plans = user.has_permission(Permission::ManageNutritionPlans);
    let can_manage_users = user.has_permission(Permission::ManageUsers);
    let can_manage_feedback = user.has_permission(Permission::ManageFeedback);

    let fitness_plans = if can_manage_fitness_plans {
        let plans = get_all_fitness_plans(db).await.validate_custom()?;
        Some(PlanCounts {
            total: plans.len(),
            published: plans
                .iter()
                .filter(|p| p.status == PlanStatus::Published)
                .count(),
        })
    } else {
        None
    };

    let nutrition_plans = if can_manage_nutrition_plans {
        let plans = get_all_nutrition_plans(db).await.validate_custom()?;
        Some(PlanCounts {
            total: plans.len(),
            published: plans
                .iter()
                .filter(|p| p.status == PlanStatus::Published)
                .count(),
        })
    } else {
        None
    };

    let users = if can_manage_users {
        Some(get_all_profiles(db).await.validate_custom()?.len())
    } else {
        None
    };

    let unanswered_feedback = if can_manage_feedback {
        let feedback = get_all_feedback(db).await.validate_custom()?;
        Some(feedback.iter().filter(|f| f.replied_at.is_none()).count())
    } else {
        None
    };

    Ok(Json(AdminOverview {
        role: user.role(),
        can_manage_fitness_plans,
        can_manage_nutrition_plans,
        can_manage_users,
        can_manage_feedback,
        fitness_plans,
        nutrition_plans,
        users,
        unanswered_feedback,
    }))
}

#[get("/admin/users")]
pub async fn admin_list_users(
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Profile>>> {
    user.require_permission(Permission::ManageUsers)
        .validate_custom()?;
    let profiles = get_all_profiles(db).await.validate_custom()?;
    Ok(Json(profiles))
}

/// Provisions an account and its profile row in one go, with the chosen role.
#[post("/admin/users", data = "<request>")]
pub async fn admin_create_user(
    request: Json<NewUserRequest>,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<Profile>>> {
    user.require_permission(Permission::ManageUsers)
        .validate_custom()?;
    let request = request.validate_custom()?;

    let email = request.email.trim();
    let full_name = request.full_name.trim();

    let user_id = create_account(db, email, &request.password, full_name)
        .await
        .validate_custom()?;

    let profile = create_profile(
        db,
        &NewProfile {
            id: user_id,
            full_name: full_name.to_string(),
            email: email.to_string(),
            role: request.role,
        },
    )
    .await
    .validate_custom()?;

    info!(new_user_id = user_id, role = %request.role, "User provisioned");
    Ok(Custom(Status::Created, Json(profile)))
}

#[put("/admin/users/<id>", data = "<request>")]
pub async fn admin_update_user(
    id: i64,
    request: Json<UserUpdateRequest>,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Profile>> {
    user.require_permission(Permission::ManageUsers)
        .validate_custom()?;
    let request = request.validate_custom()?;

    if id == user.id() && request.role != user.role() {
        return Err(AppError::Validation(
            "You cannot change your own role".to_string(),
        )
        .to_validation_response());
    }

    // Fails with NotFound before anything is written.
    get_profile(db, id).await.validate_custom()?;

    let email = request.email.trim();
    let full_name = request.full_name.trim();

    update_account_email(db, id, email).await.validate_custom()?;
    update_account_name(db, id, full_name)
        .await
        .validate_custom()?;
    update_profile_email(db, id, email).await.validate_custom()?;
    update_profile_name(db, id, full_name)
        .await
        .validate_custom()?;
    update_profile_role(db, id, request.role)
        .await
        .validate_custom()?;

    let profile = get_profile(db, id).await.validate_custom()?;
    Ok(Json(profile))
}

#[delete("/admin/users/<id>")]
pub async fn admin_delete_user(
    id: i64,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Status> {
    user.require_permission(Permission::ManageUsers)
        .validate_custom()?;

    if id == user.id() {
        warn!(user_id = id, "Super admin attempted to delete their own account");
        return Err(AppError::Validation(
            "You cannot delete your own account".to_string(),
        )
        .to_validation_response());
    }

    delete_account(db, id).await.validate_custom()?;
    info!(deleted_user_id = id, "User deleted");
    Ok(Status::NoContent)
}
