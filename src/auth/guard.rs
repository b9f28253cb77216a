use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::serde::json::Json;
use sqlx::SqlitePool;
use tracing::Instrument;

use super::{AuthBackend, AuthUser, SqliteAuthBackend, ensure_profile};
use crate::config::AppConfig;
use crate::validation::ValidationResponse;

pub const SESSION_COOKIE: &str = "session_token";

/// Session tokens the request carries: the private cookie first, then an
/// `Authorization: Bearer` header for non-browser clients.
pub fn session_tokens(request: &Request<'_>) -> Vec<String> {
    let mut tokens = Vec::new();
    if let Some(cookie) = request.cookies().get_private(SESSION_COOKIE) {
        tokens.push(cookie.value().to_string());
    }

    let bearer = request
        .headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());
    if let Some(bearer) = bearer {
        if !tokens.contains(&bearer) {
            tokens.push(bearer);
        }
    }

    tokens
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        authenticate(request)
            .instrument(tracing::info_span!("auth_user_guard"))
            .await
    }
}

async fn authenticate(request: &Request<'_>) -> Outcome<AuthUser, ()> {
    let tokens = session_tokens(request);
    if tokens.is_empty() {
        return Outcome::Error((Status::Unauthorized, ()));
    }

    let (Some(pool), Some(config)) = (
        request.rocket().state::<SqlitePool>(),
        request.rocket().state::<AppConfig>(),
    ) else {
        tracing::error!("Database pool or config not found in managed state");
        return Outcome::Error((Status::InternalServerError, ()));
    };

    let backend = SqliteAuthBackend::new(pool.clone());

    // A stale cookie falls through to the bearer header.
    let mut resolved = None;
    for token in tokens {
        match backend.get_session(&token).await {
            Ok(Some(session)) => {
                resolved = Some((token, session));
                break;
            }
            Ok(None) => tracing::warn!("Unknown or expired session token"),
            Err(err) => {
                tracing::error!(error = %err, "Failed to resolve session");
                return Outcome::Error((Status::InternalServerError, ()));
            }
        }
    }
    let Some((token, session)) = resolved else {
        return Outcome::Error((Status::Unauthorized, ()));
    };

    match ensure_profile(&backend, &session.account, &config.profile_retry).await {
        Ok(profile) => {
            tracing::info!(
                email = %session.account.email,
                role = %profile.role,
                "User authenticated via session token"
            );
            Outcome::Success(AuthUser {
                account: session.account,
                profile,
                token,
            })
        }
        Err(err) => {
            tracing::error!(
                user_id = session.account.id,
                error = %err,
                "Failed to load profile for valid session"
            );
            Outcome::Error((Status::InternalServerError, ()))
        }
    }
}

#[catch(401)]
pub fn unauthorized(_req: &Request) -> Json<ValidationResponse> {
    Json(ValidationResponse::with_error(
        "authentication",
        "Authentication required",
    ))
}

#[catch(403)]
pub fn forbidden(req: &Request) -> Json<ValidationResponse> {
    tracing::warn!(uri = %req.uri(), "Forbidden access attempt");
    Json(ValidationResponse::with_error(
        "permission",
        "You don't have permission to perform this action",
    ))
}

#[catch(404)]
pub fn not_found(_req: &Request) -> Json<ValidationResponse> {
    Json(ValidationResponse::with_error("resource", "Resource not found"))
}

#[catch(422)]
pub fn unprocessable(_req: &Request) -> Json<ValidationResponse> {
    Json(ValidationResponse::with_error(
        "request",
        "The request body could not be parsed",
    ))
}

/// Whatever tokens the request carries, validated or not. Never fails.
pub struct PresentedToken(pub Vec<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for PresentedToken {
    type Error = std::convert::Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(PresentedToken(session_tokens(request)))
    }
}
