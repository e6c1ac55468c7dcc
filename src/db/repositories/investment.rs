//! Investment repository
//!
//! Database operations for investment positions. Positions are unique per
//! (user, scheme code); the refresh job's staged valuations are committed
//! in a single transaction via `update_valuations`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::Investment;

/// Investment repository trait
#[async_trait]
pub trait InvestmentRepository: Send + Sync {
    /// Create a new position. Fails if the user already holds the scheme.
    async fn create(&self, investment: &Investment) -> Result<Investment>;

    /// Get a position by owning user and scheme code
    async fn get_by_user_and_scheme(
        &self,
        user_id: Uuid,
        scheme_code: i64,
    ) -> Result<Option<Investment>>;

    /// List positions owned by a user, most recent first
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Investment>>;

    /// List all positions across all users (used by the NAV refresh job)
    async fn list_all(&self) -> Result<Vec<Investment>>;

    /// Update a single position
    async fn update(&self, investment: &Investment) -> Result<Investment>;

    /// Persist a batch of re-priced positions in one transaction
    async fn update_valuations(&self, investments: &[Investment]) -> Result<()>;

    /// Delete a position; returns whether a row was removed
    async fn delete(&self, user_id: Uuid, scheme_code: i64) -> Result<bool>;
}

/// SQLx-based investment repository implementation
pub struct SqlxInvestmentRepository {
    pool: SqlitePool,
}

impl SqlxInvestmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn InvestmentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl InvestmentRepository for SqlxInvestmentRepository {
    async fn create(&self, investment: &Investment) -> Result<Investment> {
        sqlx::query(
            r#"
            INSERT INTO investments
                (id, user_id, scheme_code, scheme_name, fund_family,
                 units, nav, nav_date, current_value, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(investment.id.to_string())
        .bind(investment.user_id.to_string())
        .bind(investment.scheme_code)
        .bind(&investment.scheme_name)
        .bind(&investment.fund_family)
        .bind(investment.units)
        .bind(investment.nav)
        .bind(&investment.nav_date)
        .bind(investment.current_value)
        .bind(investment.created_at)
        .bind(investment.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to create investment")?;

        Ok(investment.clone())
    }

    async fn get_by_user_and_scheme(
        &self,
        user_id: Uuid,
        scheme_code: i64,
    ) -> Result<Option<Investment>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, scheme_code, scheme_name, fund_family,
                   units, nav, nav_date, current_value, created_at, updated_at
            FROM investments
            WHERE user_id = ? AND scheme_code = ?
            "#,
        )
        .bind(user_id.to_string())
        .bind(scheme_code)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get investment")?;

        match row {
            Some(row) => Ok(Some(row_to_investment(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Investment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, scheme_code, scheme_name, fund_family,
                   units, nav, nav_date, current_value, created_at, updated_at
            FROM investments
            WHERE user_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list investments for user")?;

        rows.iter().map(row_to_investment).collect()
    }

    async fn list_all(&self) -> Result<Vec<Investment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, scheme_code, scheme_name, fund_family,
                   units, nav, nav_date, current_value, created_at, updated_at
            FROM investments
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list all investments")?;

        rows.iter().map(row_to_investment).collect()
    }

    async fn update(&self, investment: &Investment) -> Result<Investment> {
        sqlx::query(
            r#"
            UPDATE investments
            SET units = ?, nav = ?, nav_date = ?, current_value = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(investment.units)
        .bind(investment.nav)
        .bind(&investment.nav_date)
        .bind(investment.current_value)
        .bind(investment.updated_at)
        .bind(investment.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update investment")?;

        Ok(investment.clone())
    }

    async fn update_valuations(&self, investments: &[Investment]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin valuation transaction")?;

        for investment in investments {
            sqlx::query(
                r#"
                UPDATE investments
                SET nav = ?, nav_date = ?, current_value = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(investment.nav)
            .bind(&investment.nav_date)
            .bind(investment.current_value)
            .bind(investment.updated_at)
            .bind(investment.id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to stage valuation update")?;
        }

        tx.commit()
            .await
            .context("Failed to commit valuation updates")?;

        Ok(())
    }

    async fn delete(&self, user_id: Uuid, scheme_code: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM investments WHERE user_id = ? AND scheme_code = ?")
            .bind(user_id.to_string())
            .bind(scheme_code)
            .execute(&self.pool)
            .await
            .context("Failed to delete investment")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_investment(row: &sqlx::sqlite::SqliteRow) -> Result<Investment> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    Ok(Investment {
        id: Uuid::parse_str(&id).context("Invalid investment ID in database")?,
        user_id: Uuid::parse_str(&user_id).context("Invalid user ID in database")?,
        scheme_code: row.try_get("scheme_code")?,
        scheme_name: row.try_get("scheme_name")?,
        fund_family: row.try_get("fund_family")?,
        units: row.try_get("units")?,
        nav: row.try_get("nav")?,
        nav_date: row.try_get("nav_date")?,
        current_value: row.try_get("current_value")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}
