//! Investment service
//!
//! Business logic for investment positions and the NAV refresh pass.
//!
//! Creating a position prices it synchronously against the quote source; a
//! fetch failure there is surfaced to the caller so an unpriced position is
//! never silently created. The refresh pass is best effort per position:
//! one failing quote is logged and counted, the rest of the pass continues,
//! and all successfully re-priced positions are committed together at the
//! end.

use anyhow::Context;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::repositories::InvestmentRepository;
use crate::models::Investment;
use crate::services::quote::{QuoteError, QuoteSource};

/// Error types for investment operations
#[derive(Debug, thiserror::Error)]
pub enum InvestmentServiceError {
    /// The user already holds a position in this scheme
    #[error("A position for scheme {0} already exists")]
    PositionExists(i64),

    /// No position for this user and scheme
    #[error("No position found for scheme {0}")]
    PositionNotFound(i64),

    /// The provider's collection does not contain this scheme code
    #[error("Scheme {0} not found at the quote provider")]
    SchemeNotFound(i64),

    /// Quote fetch failed (timeout, non-2xx, malformed payload)
    #[error(transparent)]
    Quote(#[from] QuoteError),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Result of a NAV refresh pass.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// The pass ran to completion
    Completed {
        /// Positions re-priced and committed
        updated: usize,
        /// Positions skipped because their quote fetch failed
        failed: usize,
    },
    /// A pass was already in flight; this trigger was a no-op
    AlreadyRunning,
}

/// Investment service
pub struct InvestmentService {
    repo: Arc<dyn InvestmentRepository>,
    quotes: Arc<dyn QuoteSource>,
    /// Held for the duration of a refresh pass so triggers never overlap.
    refresh_guard: tokio::sync::Mutex<()>,
}

impl InvestmentService {
    pub fn new(repo: Arc<dyn InvestmentRepository>, quotes: Arc<dyn QuoteSource>) -> Self {
        Self {
            repo,
            quotes,
            refresh_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Open a position: fetch the scheme's latest quote, compute the
    /// initial valuation and persist.
    pub async fn create_position(
        &self,
        user_id: Uuid,
        scheme_code: i64,
        units: f64,
    ) -> Result<Investment, InvestmentServiceError> {
        Self::validate_units(units)?;

        if self
            .repo
            .get_by_user_and_scheme(user_id, scheme_code)
            .await
            .context("Failed to check for existing position")?
            .is_some()
        {
            return Err(InvestmentServiceError::PositionExists(scheme_code));
        }

        let quote = self
            .quotes
            .fetch(scheme_code)
            .await?
            .ok_or(InvestmentServiceError::SchemeNotFound(scheme_code))?;

        let now = chrono::Utc::now();
        let mut investment = Investment {
            id: Uuid::new_v4(),
            user_id,
            scheme_code,
            scheme_name: quote.scheme_name,
            fund_family: quote.fund_family,
            units,
            nav: 0.0,
            nav_date: String::new(),
            current_value: 0.0,
            created_at: now,
            updated_at: now,
        };
        investment.reprice(quote.nav, quote.as_of);

        // The UNIQUE(user_id, scheme_code) constraint backs the check above
        // against concurrent duplicate creations.
        let created = self
            .repo
            .create(&investment)
            .await
            .context("Failed to create position")?;

        Ok(created)
    }

    /// Get one of the user's positions.
    pub async fn get_position(
        &self,
        user_id: Uuid,
        scheme_code: i64,
    ) -> Result<Investment, InvestmentServiceError> {
        self.repo
            .get_by_user_and_scheme(user_id, scheme_code)
            .await
            .context("Failed to get position")?
            .ok_or(InvestmentServiceError::PositionNotFound(scheme_code))
    }

    /// List all of the user's positions.
    pub async fn list_positions(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Investment>, InvestmentServiceError> {
        Ok(self
            .repo
            .list_by_user(user_id)
            .await
            .context("Failed to list positions")?)
    }

    /// Adjust the unit count of a position, revaluing at the last known NAV.
    pub async fn update_units(
        &self,
        user_id: Uuid,
        scheme_code: i64,
        units: f64,
    ) -> Result<Investment, InvestmentServiceError> {
        Self::validate_units(units)?;

        let mut investment = self.get_position(user_id, scheme_code).await?;
        investment.set_units(units);

        let updated = self
            .repo
            .update(&investment)
            .await
            .context("Failed to update position")?;

        Ok(updated)
    }

    fn validate_units(units: f64) -> Result<(), InvestmentServiceError> {
        if units <= 0.0 || !units.is_finite() {
            return Err(InvestmentServiceError::ValidationError(
                "Units must be a positive number".to_string(),
            ));
        }
        Ok(())
    }

    /// Close a position.
    pub async fn delete_position(
        &self,
        user_id: Uuid,
        scheme_code: i64,
    ) -> Result<(), InvestmentServiceError> {
        let removed = self
            .repo
            .delete(user_id, scheme_code)
            .await
            .context("Failed to delete position")?;

        if !removed {
            return Err(InvestmentServiceError::PositionNotFound(scheme_code));
        }
        Ok(())
    }

    /// Re-price every stored position against the quote source.
    ///
    /// Per-position fetch failures are logged and counted but do not abort
    /// the pass; the failing position keeps its stored price. Successfully
    /// re-priced positions are committed together in one transaction. An
    /// error return means the pass as a whole failed (positions could not
    /// be loaded, or the commit failed) and is what the scheduler retries.
    ///
    /// A trigger arriving while a pass is in flight returns
    /// `AlreadyRunning` without touching any position.
    pub async fn refresh_all_navs(&self) -> Result<RefreshOutcome, InvestmentServiceError> {
        let _guard = match self.refresh_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => return Ok(RefreshOutcome::AlreadyRunning),
        };

        let positions = self
            .repo
            .list_all()
            .await
            .context("Failed to load positions for refresh")?;

        let mut staged = Vec::with_capacity(positions.len());
        let mut failed = 0usize;

        for mut investment in positions {
            match self.quotes.fetch(investment.scheme_code).await {
                Ok(Some(quote)) => {
                    investment.reprice(quote.nav, quote.as_of);
                    staged.push(investment);
                }
                Ok(None) => {
                    tracing::warn!(
                        scheme_code = investment.scheme_code,
                        "Scheme missing from provider collection, keeping stored price"
                    );
                    failed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        scheme_code = investment.scheme_code,
                        "Quote fetch failed, keeping stored price: {}",
                        e
                    );
                    failed += 1;
                }
            }
        }

        self.repo
            .update_valuations(&staged)
            .await
            .context("Failed to commit refreshed valuations")?;

        let updated = staged.len();
        tracing::info!(updated, failed, "NAV refresh pass finished");

        Ok(RefreshOutcome::Completed { updated, failed })
    }
}
