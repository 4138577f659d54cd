//! Authentication service routes

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use common::error::DatabaseError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    AppState,
    models::{LoginCredentials, NewUser, RegisterRequest, User},
    repositories::user::{hash_password, verify_password},
    validation::validate_registration,
};

/// Response for token generation
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Response for user login
#[derive(Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenResponse,
    pub user: User,
}

/// Request for token refresh and logout
#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/logout", post(logout))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);
    let redis = state.sessions.health_check().await.unwrap_or(false);

    let status = if database && redis {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "ok" } else { "degraded" },
            "service": "auth-service",
            "database": database,
            "redis": redis,
        })),
    )
}

/// User registration endpoint
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_string();

    let mut errors = Vec::new();
    let role = match validate_registration(&payload) {
        Ok(role) => Some(role),
        Err(found) => {
            errors = found;
            None
        }
    };
    if state.user_repository.username_exists(&username).await? {
        errors.push("Username is already taken".to_string());
    }
    if state.user_repository.email_exists(&email).await? {
        errors.push("Email is already registered".to_string());
    }

    let role = match role {
        Some(role) if errors.is_empty() => role,
        _ => return Err(AuthError::Validation(errors)),
    };

    let new_user = NewUser {
        username,
        email,
        password_hash: hash_password(&payload.password)?,
        role,
    };

    let user = match state.user_repository.create(&new_user).await {
        Ok(user) => user,
        Err(DatabaseError::UniqueViolation(_)) => {
            return Err(AuthError::Validation(vec![
                "Username or email is already taken".to_string(),
            ]));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, role = %user.role, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginCredentials>,
) -> Result<impl IntoResponse, AuthError> {
    let identifier = payload.username_or_email.trim();
    let limiter_key = identifier.to_lowercase();
    info!("Login attempt for user: {}", identifier);

    if !state.rate_limiter.is_allowed(&limiter_key).await {
        return Err(AuthError::TooManyAttempts);
    }

    let user = state
        .user_repository
        .find_by_username_or_email(identifier)
        .await?;
    let user = match user {
        Some(user) if verify_password(&user, &payload.password)? => user,
        _ => {
            state.rate_limiter.record_failure(&limiter_key).await;
            warn!("Failed login for user: {}", identifier);
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !user.is_active {
        return Err(AuthError::AccountDeactivated);
    }
    state.rate_limiter.reset(&limiter_key).await;

    let tokens = issue_tokens(&state, &user).await?;

    info!(user_id = %user.id, "User logged in");
    Ok(Json(LoginResponse { tokens, user }))
}

/// Issue a token pair and record the session
async fn issue_tokens(state: &AppState, user: &User) -> Result<TokenResponse, AuthError> {
    let access_token = state.jwt_service.generate_access_token(user)?;
    let refresh_token = state.jwt_service.generate_refresh_token(user)?;
    state.sessions.store_session(user.id, &refresh_token).await?;

    Ok(TokenResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    })
}

/// Refresh token endpoint
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let claims = state
        .jwt_service
        .validate_refresh_token(&payload.refresh_token)
        .map_err(|_| AuthError::Unauthorized)?;

    if state
        .jwt_service
        .is_token_revoked(&state.redis_pool, &payload.refresh_token)
        .await?
    {
        return Err(AuthError::Unauthorized);
    }
    if !state
        .sessions
        .is_session_valid(claims.sub, &payload.refresh_token)
        .await?
    {
        return Err(AuthError::Unauthorized);
    }

    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await?
        .ok_or(AuthError::Unauthorized)?;
    if !user.is_active {
        return Err(AuthError::AccountDeactivated);
    }

    let access_token = state.jwt_service.generate_access_token(&user)?;
    let refresh_token = state
        .jwt_service
        .rotate_refresh_token(&state.redis_pool, &user, &payload.refresh_token)
        .await?;
    state.sessions.store_session(user.id, &refresh_token).await?;

    info!(user_id = %user.id, "Token refreshed");
    Ok(Json(TokenResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    }))
}

/// Logout endpoint
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let claims = state
        .jwt_service
        .validate_refresh_token(&payload.refresh_token)
        .map_err(|_| AuthError::Unauthorized)?;

    state
        .jwt_service
        .revoke_token(&state.redis_pool, &payload.refresh_token, &claims)
        .await?;
    state.sessions.delete_session(claims.sub).await?;

    info!(user_id = %claims.sub, "User logged out");
    Ok(Json(json!({"message": "Logged out successfully"})))
}

/// Custom error type for authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{}", .0.join(" "))]
    Validation(Vec<String>),

    #[error("Invalid username/email or password")]
    InvalidCredentials,

    #[error("This account has been deactivated")]
    AccountDeactivated,

    #[error("Too many failed login attempts, try again later")]
    TooManyAttempts,

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::InvalidCredentials | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::AccountDeactivated => StatusCode::FORBIDDEN,
            AuthError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Database(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            AuthError::Validation(errors) => {
                json!({ "error": "Validation failed", "errors": errors })
            }
            AuthError::Database(_) | AuthError::Internal(_) => {
                error!(error.cause_chain = ?self, "Unexpected error happened");
                json!({ "error": "Internal server error" })
            }
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AuthError::Validation(vec![]).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::AccountDeactivated.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::TooManyAttempts.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let response = AuthError::Internal(anyhow::anyhow!("redis exploded")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
