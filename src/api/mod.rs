pub mod activities;
pub mod admin_users;
pub mod auth;
pub mod feedback;
pub mod fitness_plans;
pub mod nutrition_plans;
pub mod profile;

use rocket::serde::json::Json;
use rocket::{Catcher, Route};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[get("/health")]
pub fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Everything mounted under `/api`.
pub fn routes() -> Vec<Route> {
    routes![
        health,
        auth::signup,
        auth::login,
        auth::logout,
        auth::session,
        profile::calculate_bmi,
        profile::get_own_profile,
        profile::update_own_profile,
        profile::update_own_metrics,
        fitness_plans::list_fitness_plans,
        fitness_plans::get_public_fitness_plan,
        fitness_plans::admin_list_fitness_plans,
        fitness_plans::admin_get_fitness_plan,
        fitness_plans::admin_create_fitness_plan,
        fitness_plans::admin_update_fitness_plan,
        fitness_plans::admin_set_fitness_plan_status,
        fitness_plans::admin_delete_fitness_plan,
        nutrition_plans::list_nutrition_plans,
        nutrition_plans::get_public_nutrition_plan,
        nutrition_plans::admin_list_nutrition_plans,
        nutrition_plans::admin_get_nutrition_plan,
        nutrition_plans::admin_create_nutrition_plan,
        nutrition_plans::admin_update_nutrition_plan,
        nutrition_plans::admin_set_nutrition_plan_status,
        nutrition_plans::admin_delete_nutrition_plan,
        activities::list_activities,
        activities::log_activity,
        activities::activity_summary,
        activities::remove_activity,
        feedback::submit_feedback,
        feedback::admin_list_feedback,
        feedback::admin_delete_feedback,
        feedback::admin_reply_to_feedback,
        admin_users::admin_overview,
        admin_users::admin_list_users,
        admin_users::admin_create_user,
        admin_users::admin_update_user,
        admin_users::admin_delete_user,
    ]
}

pub fn catchers() -> Vec<Catcher> {
    catchers![
        crate::auth::guard::unauthorized,
        crate::auth::guard::forbidden,
        crate::auth::guard::not_found,
        crate::auth::guard::unprocessable,
    ]
}
