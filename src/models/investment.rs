//! Investment position model
//!
//! A position is identified by (owning user, scheme code); at most one open
//! position may exist per user per scheme, enforced by a uniqueness
//! constraint at the data layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Round a monetary value to two decimal places.
///
/// Valuations are `units × NAV` with plain f64 arithmetic; rounding keeps
/// stored values stable across repeated refresh passes at the same price.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Investment position entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investment {
    /// Position ID
    pub id: Uuid,
    /// Owning user ID
    pub user_id: Uuid,
    /// Numeric scheme code identifying the fund product
    pub scheme_code: i64,
    /// Scheme display name, as reported by the provider
    pub scheme_name: String,
    /// Fund family name, as reported by the provider
    pub fund_family: String,
    /// Number of units held
    pub units: f64,
    /// Last known net asset value per unit
    pub nav: f64,
    /// Pricing date reported by the provider alongside the NAV
    pub nav_date: String,
    /// Current valuation: `round_currency(units × nav)`
    pub current_value: f64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Investment {
    /// Re-price the position at a freshly fetched NAV.
    pub fn reprice(&mut self, nav: f64, nav_date: impl Into<String>) {
        self.nav = nav;
        self.nav_date = nav_date.into();
        self.current_value = round_currency(self.units * self.nav);
        self.updated_at = Utc::now();
    }

    /// Adjust the unit count, revaluing at the last known NAV.
    pub fn set_units(&mut self, units: f64) {
        self.units = units;
        self.current_value = round_currency(self.units * self.nav);
        self.updated_at = Utc::now();
    }
}
