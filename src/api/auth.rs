//! Authentication API endpoints
//!
//! - POST /api/v1/auth/signup - create an account, queue verification mail
//! - GET  /api/v1/auth/verify - consume a verification link
//! - POST /api/v1/auth/login - issue the access/refresh token pair
//! - POST /api/v1/auth/refresh - mint a new access token (refresh gate)
//! - POST /api/v1/auth/logout - revoke the presented token (access gate)
//! - GET  /api/v1/auth/me - current account (access gate)

use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedToken};
use crate::services::user::{LoginInput, SignupInput};

/// Request body for signup
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Query parameters for the verification link
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    pub token: String,
}

/// Response for account info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub is_verified: bool,
    pub created_at: String,
}

impl From<crate::models::User> for UserResponse {
    fn from(user: crate::models::User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email,
            is_verified: user.is_verified,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Response for successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

/// Response carrying a fresh access token
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Generic message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Build public auth routes (no gate)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/verify", get(verify))
        .route("/login", post(login))
}

/// Build routes behind the refresh-token gate
pub fn refresh_router() -> Router<AppState> {
    Router::new().route("/refresh", post(refresh))
}

/// Build routes behind the access-token gate
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// POST /api/v1/auth/signup
async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .user_service
        .signup(SignupInput {
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /api/v1/auth/verify?token=...
async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = state.user_service.verify_email(&params.token).await?;

    Ok(Json(MessageResponse {
        message: format!("Email address {} verified", user.email),
    }))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (user, pair) = state
        .user_service
        .login(LoginInput {
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok(Json(LoginResponse {
        user: UserResponse::from(user),
        access_token: pair.access,
        refresh_token: pair.refresh,
    }))
}

/// POST /api/v1/auth/refresh (refresh gate)
async fn refresh(
    State(state): State<AppState>,
    Extension(AuthenticatedToken(claims)): Extension<AuthenticatedToken>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let access_token = state.user_service.refresh_access_token(&claims).await?;
    Ok(Json(RefreshResponse { access_token }))
}

/// POST /api/v1/auth/logout (access gate)
async fn logout(
    State(state): State<AppState>,
    Extension(AuthenticatedToken(claims)): Extension<AuthenticatedToken>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.user_service.logout(&claims.jti).await?;
    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

/// GET /api/v1/auth/me (access gate)
async fn me(
    State(state): State<AppState>,
    Extension(AuthenticatedToken(claims)): Extension<AuthenticatedToken>,
) -> Result<Json<UserResponse>, ApiError> {
    let user_id = claims.user_id().map_err(|_| ApiError::invalid_token())?;
    let user = state
        .user_service
        .get_by_id(user_id)
        .await?
        .ok_or_else(ApiError::invalid_token)?;

    Ok(Json(UserResponse::from(user)))
}
