//! API layer - HTTP handlers and routing
//!
//! - Auth endpoints (signup, verify, login, refresh, logout, me)
//! - Investment endpoints (CRUD + NAV refresh trigger)
//! - Authentication gate middleware

pub mod auth;
pub mod investments;
pub mod middleware;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedToken};

/// Build the application router.
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let refresh_routes = auth::refresh_router().layer(axum_middleware::from_fn_with_state(
        state.clone(),
        middleware::require_refresh_token,
    ));

    let protected_auth_routes = auth::protected_router().layer(
        axum_middleware::from_fn_with_state(state.clone(), middleware::require_access_token),
    );

    let investment_routes = investments::router().layer(axum_middleware::from_fn_with_state(
        state.clone(),
        middleware::require_access_token,
    ));

    let auth_routes = auth::public_router()
        .merge(refresh_routes)
        .merge(protected_auth_routes);

    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        Err(_) => {
            tracing::warn!(cors_origin, "Invalid CORS origin, using permissive defaults");
            CorsLayer::permissive()
        }
    };

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/investments", investment_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// GET /health - liveness probe
async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::db::repositories::{SqlxInvestmentRepository, SqlxUserRepository};
    use crate::services::quote::{QuoteError, QuoteSource, SchemeQuote};
    use crate::services::{
        InvestmentService, RevocationRegistry, SmtpMailer, TokenService, UserService,
    };
    use async_trait::async_trait;
    use axum_test::TestServer;
    use chrono::Duration;
    use serde_json::{json, Value};
    use std::sync::Arc;

    /// Quote source with one known scheme.
    struct SingleSchemeSource;

    #[async_trait]
    impl QuoteSource for SingleSchemeSource {
        async fn fetch(&self, scheme_code: i64) -> Result<Option<SchemeQuote>, QuoteError> {
            if scheme_code != 100034 {
                return Ok(None);
            }
            Ok(Some(SchemeQuote {
                scheme_code,
                scheme_name: "Aditya Birla Sun Life Equity Fund - Growth".to_string(),
                fund_family: "Aditya Birla Sun Life Mutual Fund".to_string(),
                nav: 163.694,
                as_of: "14-Feb-2025".to_string(),
            }))
        }
    }

    async fn test_server() -> (TestServer, AppState) {
        let pool = create_test_pool().await.unwrap();

        let token_service = Arc::new(TokenService::new(
            "a-test-signing-secret-of-sufficient-length",
            Duration::hours(1),
            Duration::days(7),
        ));
        let revocations = Arc::new(RevocationRegistry::new(std::time::Duration::from_secs(60)));

        let user_service = Arc::new(UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            token_service.clone(),
            revocations.clone(),
            SmtpMailer::boxed(crate::config::MailConfig::default()),
            "http://localhost:8000".to_string(),
        ));
        let investment_service = Arc::new(InvestmentService::new(
            SqlxInvestmentRepository::boxed(pool),
            Arc::new(SingleSchemeSource),
        ));

        let state = AppState {
            user_service,
            investment_service,
            token_service,
            revocations,
        };

        let server = TestServer::new(build_router(state.clone(), "http://localhost:3000")).unwrap();
        (server, state)
    }

    async fn signup_verify_login(server: &TestServer, state: &AppState) -> (String, String) {
        let response = server
            .post("/api/v1/auth/signup")
            .json(&json!({"email": "investor@example.com", "password": "a-strong-password"}))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let token = state
            .token_service
            .issue_email_token("investor@example.com")
            .unwrap();
        server
            .get("/api/v1/auth/verify")
            .add_query_param("token", token)
            .await
            .assert_status_ok();

        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({"email": "investor@example.com", "password": "a-strong-password"}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        (
            body["access_token"].as_str().unwrap().to_string(),
            body["refresh_token"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn test_login_before_verification_is_forbidden() {
        let (server, _state) = test_server().await;
        server
            .post("/api/v1/auth/signup")
            .json(&json!({"email": "new@example.com", "password": "a-strong-password"}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({"email": "new@example.com", "password": "a-strong-password"}))
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "ACCOUNT_NOT_VERIFIED");
    }

    #[tokio::test]
    async fn test_full_investment_flow() {
        let (server, state) = test_server().await;
        let (access, _refresh) = signup_verify_login(&server, &state).await;

        // Open a position: priced synchronously at the stub NAV.
        let response = server
            .post("/api/v1/investments")
            .authorization_bearer(&access)
            .json(&json!({"scheme_code": 100034, "units": 10.0}))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["current_value"], 1636.94);

        // Duplicate position is a conflict.
        let response = server
            .post("/api/v1/investments")
            .authorization_bearer(&access)
            .json(&json!({"scheme_code": 100034, "units": 1.0}))
            .await;
        response.assert_status(axum::http::StatusCode::CONFLICT);

        // Unknown scheme is a not-found, not a provider failure.
        let response = server
            .post("/api/v1/investments")
            .authorization_bearer(&access)
            .json(&json!({"scheme_code": 999999, "units": 1.0}))
            .await;
        response.assert_status(axum::http::StatusCode::NOT_FOUND);

        // Adjust units, revalued at last known NAV.
        let response = server
            .patch("/api/v1/investments")
            .authorization_bearer(&access)
            .json(&json!({"scheme_code": 100034, "units": 20.0}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["current_value"], 3273.88);

        // Trigger a refresh pass.
        let response = server
            .post("/api/v1/investments/refresh-all")
            .authorization_bearer(&access)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "completed");
        assert_eq!(body["updated"], 1);
        assert_eq!(body["failed"], 0);

        // Close the position.
        server
            .delete("/api/v1/investments/100034")
            .authorization_bearer(&access)
            .await
            .assert_status(axum::http::StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_token_class_enforcement_at_the_gates() {
        let (server, state) = test_server().await;
        let (access, refresh) = signup_verify_login(&server, &state).await;

        // Refresh token at an access-gated endpoint.
        let response = server
            .get("/api/v1/auth/me")
            .authorization_bearer(&refresh)
            .await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "ACCESS_TOKEN_REQUIRED");

        // Access token at the refresh-gated endpoint.
        let response = server
            .post("/api/v1/auth/refresh")
            .authorization_bearer(&access)
            .await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "REFRESH_TOKEN_REQUIRED");

        // Correct classes pass.
        server
            .get("/api/v1/auth/me")
            .authorization_bearer(&access)
            .await
            .assert_status_ok();
        let response = server
            .post("/api/v1/auth/refresh")
            .authorization_bearer(&refresh)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert!(body["access_token"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_logout_revokes_the_presented_token() {
        let (server, state) = test_server().await;
        let (access, _refresh) = signup_verify_login(&server, &state).await;

        server
            .post("/api/v1/auth/logout")
            .authorization_bearer(&access)
            .await
            .assert_status_ok();

        let response = server
            .get("/api/v1/auth/me")
            .authorization_bearer(&access)
            .await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "TOKEN_REVOKED");
    }

    #[tokio::test]
    async fn test_missing_token_is_invalid() {
        let (server, _state) = test_server().await;
        let response = server.get("/api/v1/investments").await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    }
}
