use chrono::Utc;
use rocket::State;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{
    Account, AuthUser, PresentedToken, SESSION_COOKIE, SessionSnapshot, SqliteAuthBackend,
    UserSession, ensure_profile,
};
use crate::config::AppConfig;
use crate::db::{
    authenticate_account, create_account, create_user_session, get_account, invalidate_session,
};
use crate::error::AppError;
use crate::models::not_blank;
use crate::validation::{ApiResult, AppErrorExt, JsonValidateExt, ToValidationResponse};

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "Full name must be at most 100 characters")
    )]
    pub full_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(custom(function = "not_blank"))]
    pub email: String,
    #[validate(custom(function = "not_blank"))]
    pub password: String,
}

/// A fresh session: the bearer token plus the same view `/auth/session` returns.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(flatten)]
    pub session: SessionSnapshot,
}

async fn start_session(
    db: &Pool<Sqlite>,
    config: &AppConfig,
    cookies: &CookieJar<'_>,
    account: Account,
) -> Result<AuthResponse, AppError> {
    let token = UserSession::generate_token();
    let expires_at = Utc::now() + chrono::Duration::hours(config.session_ttl_hours);

    create_user_session(db, account.id, &token, expires_at.naive_utc()).await?;

    let backend = SqliteAuthBackend::new(db.clone());
    let profile = ensure_profile(&backend, &account, &config.profile_retry).await?;

    cookies.add_private(
        Cookie::build((SESSION_COOKIE, token.clone()))
            .same_site(SameSite::Lax)
            .http_only(true)
            .max_age(rocket::time::Duration::hours(config.session_ttl_hours)),
    );

    Ok(AuthResponse {
        token,
        session: SessionSnapshot::signed_in(account, profile),
    })
}

#[post("/auth/signup", data = "<signup>")]
pub async fn signup(
    signup: Json<SignupRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> ApiResult<Custom<Json<AuthResponse>>> {
    let validated = signup.validate_custom()?;
    let email = validated.email.trim().to_string();
    info!(email = %email, "Signup attempt");

    let user_id = create_account(db, &email, &validated.password, validated.full_name.trim())
        .await
        .validate_custom()?;

    let account = get_account(db, user_id).await.validate_custom()?;

    let response = start_session(db, config, cookies, account)
        .await
        .validate_custom()?;

    Ok(Custom(Status::Created, Json(response)))
}

#[post("/auth/login", data = "<login>")]
pub async fn login(
    login: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> ApiResult<Json<AuthResponse>> {
    let validated = login.validate_custom()?;
    let email = validated.email.trim();
    info!(email = %email, "Login attempt");

    let account = authenticate_account(db, email, &validated.password)
        .await
        .validate_custom()?;

    let Some(account) = account else {
        warn!(email = %email, "Login failed");
        return Err(
            AppError::Authentication("Invalid email or password".to_string())
                .to_validation_response(),
        );
    };

    let response = start_session(db, config, cookies, account)
        .await
        .validate_custom()?;

    Ok(Json(response))
}

#[post("/auth/logout")]
pub async fn logout(
    token: PresentedToken,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
) -> Json<SessionSnapshot> {
    cookies.remove_private(Cookie::build(SESSION_COOKIE));

    for token in token.0 {
        if let Err(err) = invalidate_session(db, &token).await {
            err.log_and_record("Logout session invalidation");
        }
    }

    Json(SessionSnapshot::default())
}

#[get("/auth/session")]
pub async fn session(user: AuthUser) -> Json<SessionSnapshot> {
    Json(SessionSnapshot::signed_in(user.account, user.profile))
}
