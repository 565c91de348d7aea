//! Registration, login and refresh token rotation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tally_core::validation::{validate_email, validate_password, validate_person_name};
use tally_core::{NewUser, Role, User, ValidationErrors};
use tally_db::DbError;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::ValidJson;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub token_type: &'static str,
}

/// Issues an access/refresh pair for `user` and stores the refresh token.
async fn issue_tokens(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let access_token = state.jwt.generate_access_token(&user.id, user.role)?;
    let (refresh_token, expires_at) = state.jwt.generate_refresh_token(&user.id, user.role)?;

    state
        .db
        .refresh_tokens()
        .insert(&refresh_token, &user.id, expires_at)
        .await?;

    Ok(AuthResponse {
        user,
        access_token,
        refresh_token,
        expires_in: state.jwt.access_lifetime_secs(),
        token_type: "Bearer",
    })
}

/// `POST /api/auth/register`. New accounts always get the `user` role.
pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let mut errors = ValidationErrors::new();
    errors.check(validate_person_name("firstName", &req.first_name));
    errors.check(validate_person_name("lastName", &req.last_name));
    let email = errors.check(validate_email(&req.email));
    errors.check(validate_password(&req.password));
    errors.into_result()?;

    let user = state
        .db
        .users()
        .create(NewUser {
            first_name: req.first_name,
            last_name: req.last_name,
            email: email.unwrap_or_default(),
            password_hash: hash_password(&req.password)?,
            role: Role::User,
        })
        .await?;

    info!(user_id = %user.id, "User registered");

    let response = issue_tokens(&state, user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /api/auth/login`.
///
/// Unknown email and wrong password produce the same 401.
pub async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let invalid = || ApiError::unauthenticated("Invalid email or password");

    let user = state
        .db
        .users()
        .find_by_email(&req.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &user.password_hash) {
        warn!(user_id = %user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    info!(user_id = %user.id, "User logged in");
    Ok(Json(issue_tokens(&state, user).await?))
}

/// `POST /api/auth/refresh`.
///
/// The presented token is deleted and its replacement stored in one
/// transaction. Presenting it again fails.
pub async fn refresh(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let claims = state.jwt.validate_refresh_token(&req.refresh_token)?;

    let (new_refresh, expires_at) = state.jwt.generate_refresh_token(&claims.sub, claims.role)?;

    let user_id = state
        .db
        .refresh_tokens()
        .rotate(&req.refresh_token, &new_refresh, expires_at, Utc::now())
        .await
        .map_err(|e| match e {
            DbError::NotFound { .. } => {
                warn!(user_id = %claims.sub, "Refresh rejected: token unknown or already used");
                ApiError::unauthenticated("Refresh token is invalid or has been used")
            }
            other => ApiError::from(other),
        })?;

    // current role, not the one baked into the old token
    let user = state.db.users().find_by_id(&user_id).await?;
    let access_token = state.jwt.generate_access_token(&user.id, user.role)?;

    info!(user_id = %user.id, "Token refreshed successfully");

    Ok(Json(AuthResponse {
        user,
        access_token,
        refresh_token: new_refresh,
        expires_in: state.jwt.access_lifetime_secs(),
        token_type: "Bearer",
    }))
}

/// `POST /api/auth/logout`. Idempotent: an unknown token still answers 204.
pub async fn logout(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RefreshRequest>,
) -> ApiResult<StatusCode> {
    if state.db.refresh_tokens().revoke(&req.refresh_token).await? {
        info!("Refresh token revoked");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/auth/me`.
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<User>> {
    match state.db.users().find_by_id(&user.id).await {
        Ok(found) => Ok(Json(found)),
        Err(DbError::NotFound { .. }) => Err(ApiError::unauthenticated("Account no longer exists")),
        Err(e) => Err(e.into()),
    }
}
