//! Investment API endpoints (all behind the access-token gate)
//!
//! - GET    /api/v1/investments - list the caller's positions
//! - POST   /api/v1/investments - open a position (priced synchronously)
//! - GET    /api/v1/investments/{scheme_code} - fetch one position
//! - PATCH  /api/v1/investments - adjust units
//! - DELETE /api/v1/investments/{scheme_code} - close a position
//! - POST   /api/v1/investments/refresh-all - trigger a NAV refresh pass

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState, AuthenticatedToken};
use crate::models::Investment;
use crate::services::investment::RefreshOutcome;

/// Request body for opening a position
#[derive(Debug, Deserialize)]
pub struct CreateInvestmentRequest {
    pub scheme_code: i64,
    pub units: f64,
}

/// Request body for adjusting units
#[derive(Debug, Deserialize)]
pub struct UpdateInvestmentRequest {
    pub scheme_code: i64,
    pub units: f64,
}

/// Response for a single position
#[derive(Debug, Serialize)]
pub struct InvestmentResponse {
    pub id: String,
    pub scheme_code: i64,
    pub scheme_name: String,
    pub fund_family: String,
    pub units: f64,
    pub nav: f64,
    pub nav_date: String,
    pub current_value: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Investment> for InvestmentResponse {
    fn from(investment: Investment) -> Self {
        Self {
            id: investment.id.to_string(),
            scheme_code: investment.scheme_code,
            scheme_name: investment.scheme_name,
            fund_family: investment.fund_family,
            units: investment.units,
            nav: investment.nav,
            nav_date: investment.nav_date,
            current_value: investment.current_value,
            created_at: investment.created_at.to_rfc3339(),
            updated_at: investment.updated_at.to_rfc3339(),
        }
    }
}

/// Build the investments router
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_investments)
                .post(create_investment)
                .patch(update_investment),
        )
        .route("/{scheme_code}", get(get_investment).delete(delete_investment))
        .route("/refresh-all", post(refresh_all))
}

fn caller_id(claims: &crate::services::token::TokenClaims) -> Result<Uuid, ApiError> {
    claims.user_id().map_err(|_| ApiError::invalid_token())
}

/// GET /api/v1/investments
async fn list_investments(
    State(state): State<AppState>,
    Extension(AuthenticatedToken(claims)): Extension<AuthenticatedToken>,
) -> Result<Json<Vec<InvestmentResponse>>, ApiError> {
    let user_id = caller_id(&claims)?;
    let positions = state.investment_service.list_positions(user_id).await?;

    Ok(Json(
        positions.into_iter().map(InvestmentResponse::from).collect(),
    ))
}

/// POST /api/v1/investments
async fn create_investment(
    State(state): State<AppState>,
    Extension(AuthenticatedToken(claims)): Extension<AuthenticatedToken>,
    Json(body): Json<CreateInvestmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = caller_id(&claims)?;
    let investment = state
        .investment_service
        .create_position(user_id, body.scheme_code, body.units)
        .await?;

    Ok((StatusCode::CREATED, Json(InvestmentResponse::from(investment))))
}

/// GET /api/v1/investments/{scheme_code}
async fn get_investment(
    State(state): State<AppState>,
    Extension(AuthenticatedToken(claims)): Extension<AuthenticatedToken>,
    Path(scheme_code): Path<i64>,
) -> Result<Json<InvestmentResponse>, ApiError> {
    let user_id = caller_id(&claims)?;
    let investment = state
        .investment_service
        .get_position(user_id, scheme_code)
        .await?;

    Ok(Json(InvestmentResponse::from(investment)))
}

/// PATCH /api/v1/investments
async fn update_investment(
    State(state): State<AppState>,
    Extension(AuthenticatedToken(claims)): Extension<AuthenticatedToken>,
    Json(body): Json<UpdateInvestmentRequest>,
) -> Result<Json<InvestmentResponse>, ApiError> {
    let user_id = caller_id(&claims)?;
    let investment = state
        .investment_service
        .update_units(user_id, body.scheme_code, body.units)
        .await?;

    Ok(Json(InvestmentResponse::from(investment)))
}

/// DELETE /api/v1/investments/{scheme_code}
async fn delete_investment(
    State(state): State<AppState>,
    Extension(AuthenticatedToken(claims)): Extension<AuthenticatedToken>,
    Path(scheme_code): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let user_id = caller_id(&claims)?;
    state
        .investment_service
        .delete_position(user_id, scheme_code)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/investments/refresh-all
///
/// Manual trigger for the NAV refresh pass; the scheduler calls the same
/// service method. An in-flight pass makes this a no-op.
async fn refresh_all(
    State(state): State<AppState>,
) -> Result<Json<RefreshOutcome>, ApiError> {
    let outcome = state.investment_service.refresh_all_navs().await?;
    Ok(Json(outcome))
}
