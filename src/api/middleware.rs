//! API middleware
//!
//! Contains the authentication gate: extract bearer token, verify
//! signature/expiry, check revocation, enforce the required token class,
//! then hand the claims to the handler. Every stage is terminal on
//! failure and each failure is a distinct machine-readable code, so a
//! revoked token or a wrong-class token is never collapsed into a generic
//! "unauthenticated".

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::services::investment::InvestmentServiceError;
use crate::services::revocation::RevocationRegistry;
use crate::services::token::{TokenClaims, TokenClass, TokenService};
use crate::services::user::UserServiceError;
use crate::services::{InvestmentService, UserService};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub investment_service: Arc<InvestmentService>,
    pub token_service: Arc<TokenService>,
    pub revocations: Arc<RevocationRegistry>,
}

/// Verified token claims extracted from the request
#[derive(Debug, Clone)]
pub struct AuthenticatedToken(pub TokenClaims);

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn invalid_token() -> Self {
        Self::new("INVALID_TOKEN", "Invalid or expired token")
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn code(&self) -> &str {
        &self.error.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "INVALID_TOKEN" | "TOKEN_REVOKED" | "ACCESS_TOKEN_REQUIRED"
            | "REFRESH_TOKEN_REQUIRED" | "INVALID_CREDENTIALS" => StatusCode::UNAUTHORIZED,
            "ACCOUNT_NOT_VERIFIED" => StatusCode::FORBIDDEN,
            "USER_EXISTS" | "POSITION_EXISTS" => StatusCode::CONFLICT,
            "NOT_FOUND" | "SCHEME_NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" | "INVALID_VERIFICATION_TOKEN" => StatusCode::BAD_REQUEST,
            "QUOTE_UNAVAILABLE" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::UserExists(email) => Self::new(
                "USER_EXISTS",
                format!("User with email '{}' already exists", email),
            ),
            UserServiceError::InvalidCredentials => {
                Self::new("INVALID_CREDENTIALS", "Invalid email or password")
            }
            UserServiceError::AccountNotVerified => Self::new(
                "ACCOUNT_NOT_VERIFIED",
                "Please verify your email address before logging in",
            ),
            UserServiceError::InvalidVerificationToken => Self::new(
                "INVALID_VERIFICATION_TOKEN",
                "Verification link is invalid or has expired",
            ),
            UserServiceError::ValidationError(message) => Self::new("VALIDATION_ERROR", message),
            UserServiceError::Internal(e) => {
                tracing::error!("User service error: {:#}", e);
                Self::internal_error("Internal server error")
            }
        }
    }
}

impl From<InvestmentServiceError> for ApiError {
    fn from(err: InvestmentServiceError) -> Self {
        match err {
            InvestmentServiceError::PositionExists(code) => Self::new(
                "POSITION_EXISTS",
                format!("A position for scheme {} already exists", code),
            ),
            InvestmentServiceError::PositionNotFound(code) => {
                Self::new("NOT_FOUND", format!("No position found for scheme {}", code))
            }
            InvestmentServiceError::SchemeNotFound(code) => Self::new(
                "SCHEME_NOT_FOUND",
                format!("Scheme {} not found at the quote provider", code),
            ),
            InvestmentServiceError::ValidationError(message) => {
                Self::new("VALIDATION_ERROR", message)
            }
            InvestmentServiceError::Quote(e) => {
                tracing::warn!("Quote fetch failed: {}", e);
                Self::new("QUOTE_UNAVAILABLE", "Could not price the scheme right now")
            }
            InvestmentServiceError::Internal(e) => {
                tracing::error!("Investment service error: {:#}", e);
                Self::internal_error("Internal server error")
            }
        }
    }
}

/// Extract the bearer token from the Authorization header.
fn extract_bearer_token(request: &Request) -> Option<String> {
    let auth_header = request.headers().get(header::AUTHORIZATION)?;
    let auth_str = auth_header.to_str().ok()?;
    auth_str.strip_prefix("Bearer ").map(str::to_string)
}

/// The authentication gate, shared by both class-specific middlewares.
///
/// Stages: verify signature/expiry, check the revocation registry by jti,
/// enforce the required class. Revocation is the only stage touching
/// shared state; it is a single O(1) lookup.
pub async fn authorize_token(
    tokens: &TokenService,
    revocations: &RevocationRegistry,
    token: &str,
    required: TokenClass,
) -> Result<TokenClaims, ApiError> {
    let claims = tokens
        .verify(token)
        .map_err(|_| ApiError::invalid_token())?;

    if revocations.is_revoked(&claims.jti).await {
        return Err(ApiError::new("TOKEN_REVOKED", "Token has been revoked"));
    }

    if claims.class() != required {
        return Err(match required {
            TokenClass::Access => {
                ApiError::new("ACCESS_TOKEN_REQUIRED", "An access token is required")
            }
            TokenClass::Refresh => {
                ApiError::new("REFRESH_TOKEN_REQUIRED", "A refresh token is required")
            }
        });
    }

    Ok(claims)
}

async fn run_gate(
    state: AppState,
    mut request: Request,
    next: Next,
    required: TokenClass,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&request).ok_or_else(ApiError::invalid_token)?;

    let claims = authorize_token(
        &state.token_service,
        &state.revocations,
        &token,
        required,
    )
    .await?;

    request.extensions_mut().insert(AuthenticatedToken(claims));
    Ok(next.run(request).await)
}

/// Middleware requiring an access-class token.
pub async fn require_access_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    run_gate(state, request, next, TokenClass::Access).await
}

/// Middleware requiring a refresh-class token.
pub async fn require_refresh_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    run_gate(state, request, next, TokenClass::Refresh).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use axum::body::Body;
    use chrono::Duration;

    fn token_service() -> TokenService {
        TokenService::new(
            "a-test-signing-secret-of-sufficient-length",
            Duration::hours(1),
            Duration::days(7),
        )
    }

    fn registry() -> RevocationRegistry {
        RevocationRegistry::new(std::time::Duration::from_secs(60))
    }

    fn test_user() -> User {
        User::new("investor@example.com", "hash")
    }

    #[test]
    fn test_extract_bearer_token() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer token-123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_bearer_token(&request), Some("token-123".to_string()));
    }

    #[test]
    fn test_extract_bearer_token_rejects_other_schemes() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();
        assert!(extract_bearer_token(&request).is_none());
    }

    #[test]
    fn test_extract_bearer_token_missing_header() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        assert!(extract_bearer_token(&request).is_none());
    }

    #[tokio::test]
    async fn test_valid_access_token_passes_access_gate() {
        let tokens = token_service();
        let revocations = registry();
        let token = tokens.issue(&test_user(), TokenClass::Access).unwrap();

        let claims = authorize_token(&tokens, &revocations, &token, TokenClass::Access)
            .await
            .unwrap();
        assert_eq!(claims.class(), TokenClass::Access);
    }

    #[tokio::test]
    async fn test_refresh_token_at_access_gate_is_distinct_error() {
        let tokens = token_service();
        let revocations = registry();
        let token = tokens.issue(&test_user(), TokenClass::Refresh).unwrap();

        let err = authorize_token(&tokens, &revocations, &token, TokenClass::Access)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ACCESS_TOKEN_REQUIRED");
    }

    #[tokio::test]
    async fn test_access_token_at_refresh_gate_is_distinct_error() {
        let tokens = token_service();
        let revocations = registry();
        let token = tokens.issue(&test_user(), TokenClass::Access).unwrap();

        let err = authorize_token(&tokens, &revocations, &token, TokenClass::Refresh)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "REFRESH_TOKEN_REQUIRED");
    }

    #[tokio::test]
    async fn test_garbage_token_is_invalid() {
        let tokens = token_service();
        let revocations = registry();

        let err = authorize_token(&tokens, &revocations, "garbage", TokenClass::Access)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_expired_token_is_invalid() {
        let expired_issuer = TokenService::new(
            "a-test-signing-secret-of-sufficient-length",
            Duration::seconds(-30),
            Duration::days(7),
        );
        let tokens = token_service();
        let revocations = registry();
        let token = expired_issuer.issue(&test_user(), TokenClass::Access).unwrap();

        let err = authorize_token(&tokens, &revocations, &token, TokenClass::Access)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_revoked_token_is_reported_revoked() {
        let tokens = token_service();
        let revocations = registry();
        let token = tokens.issue(&test_user(), TokenClass::Access).unwrap();
        let claims = tokens.verify(&token).unwrap();

        revocations.revoke(&claims.jti).await;

        let err = authorize_token(&tokens, &revocations, &token, TokenClass::Access)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TOKEN_REVOKED");
    }

    #[tokio::test]
    async fn test_revoking_one_token_leaves_the_other_usable() {
        let tokens = token_service();
        let revocations = registry();
        let user = test_user();

        let first = tokens.issue(&user, TokenClass::Access).unwrap();
        let second = tokens.issue(&user, TokenClass::Access).unwrap();
        let first_claims = tokens.verify(&first).unwrap();

        revocations.revoke(&first_claims.jti).await;

        assert!(
            authorize_token(&tokens, &revocations, &first, TokenClass::Access)
                .await
                .is_err()
        );
        assert!(
            authorize_token(&tokens, &revocations, &second, TokenClass::Access)
                .await
                .is_ok()
        );
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ApiError::invalid_token().into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::new("USER_EXISTS", "x").into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::new("SCHEME_NOT_FOUND", "x").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::new("QUOTE_UNAVAILABLE", "x").into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::internal_error("x").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
