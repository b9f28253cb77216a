use std::sync::Arc;

use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::auth::{AuthUser, Permission};
use crate::db::{
    create_feedback, delete_feedback, get_all_feedback, get_feedback, mark_feedback_replied,
};
use crate::mailer::{EmailSender, feedback_reply_email};
use crate::models::{Feedback, FeedbackInput, FeedbackReply};
use crate::validation::{ApiResult, AppErrorExt, JsonValidateExt, PermissionCheckExt};

/// Open to everyone; signed-in submitters are linked to their account.
#[post("/feedback", data = "<feedback>")]
pub async fn submit_feedback(
    feedback: Json<FeedbackInput>,
    user: Option<AuthUser>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<Feedback>>> {
    let feedback = feedback.validate_custom()?;

    let created = create_feedback(db, user.as_ref().map(AuthUser::id), &feedback)
        .await
        .validate_custom()?;
    Ok(Custom(Status::Created, Json(created)))
}

#[get("/admin/feedback")]
pub async fn admin_list_feedback(
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Feedback>>> {
    user.require_permission(Permission::ManageFeedback)
        .validate_custom()?;
    let feedback = get_all_feedback(db).await.validate_custom()?;
    Ok(Json(feedback))
}

#[delete("/admin/feedback/<id>")]
pub async fn admin_delete_feedback(
    id: i64,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Status> {
    user.require_permission(Permission::ManageFeedback)
        .validate_custom()?;
    delete_feedback(db, id).await.validate_custom()?;
    Ok(Status::NoContent)
}

/// Emails the reply to the submitter, then marks the feedback as answered.
/// Nothing is marked when the email fails.
#[post("/admin/feedback/<id>/reply", data = "<reply>")]
pub async fn admin_reply_to_feedback(
    id: i64,
    reply: Json<FeedbackReply>,
    user: AuthUser,
    db: &State<Pool<Sqlite>>,
    mailer: &State<Arc<dyn EmailSender>>,
) -> ApiResult<Json<Feedback>> {
    user.require_permission(Permission::ManageFeedback)
        .validate_custom()?;
    let reply = reply.validate_custom()?;

    let feedback = get_feedback(db, id).await.validate_custom()?;
    let email = feedback_reply_email(&feedback, &reply.message);

    mailer.send(&email).await.validate_custom()?;
    info!(feedback_id = id, "Feedback reply sent");

    let updated = mark_feedback_replied(db, id).await.validate_custom()?;
    Ok(Json(updated))
}
