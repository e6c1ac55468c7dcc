//! Market-data quote fetching
//!
//! The external provider exposes one endpoint returning a JSON array of
//! open-scheme records rather than a keyed lookup, so locating a scheme is
//! a linear scan of the returned collection. "Scheme not present in the
//! collection" is a distinct, non-error outcome; timeouts, non-2xx
//! responses and malformed payloads are fetch failures and are propagated.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::QuoteConfig;

/// Latest quote for a single scheme.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemeQuote {
    /// Numeric scheme code
    pub scheme_code: i64,
    /// Scheme display name
    pub scheme_name: String,
    /// Fund family name
    pub fund_family: String,
    /// Net asset value per unit
    pub nav: f64,
    /// Pricing date as reported by the provider
    pub as_of: String,
}

/// Error types for quote fetching
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    /// Transport-level failure, including request timeout
    #[error("Quote provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Provider answered with a non-2xx status
    #[error("Quote provider returned status {0}")]
    Status(u16),

    /// Provider payload did not match the expected shape
    #[error("Quote provider returned a malformed payload: {0}")]
    Malformed(String),
}

/// Source of scheme quotes.
///
/// `Ok(None)` means the provider's collection does not contain the scheme;
/// `Err` means the fetch itself failed.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch(&self, scheme_code: i64) -> Result<Option<SchemeQuote>, QuoteError>;
}

/// One scheme record as returned by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemeRecord {
    #[serde(rename = "Scheme_Code")]
    pub scheme_code: i64,
    #[serde(rename = "Scheme_Name")]
    pub scheme_name: String,
    #[serde(rename = "Mutual_Fund_Family")]
    pub fund_family: String,
    #[serde(rename = "Net_Asset_Value")]
    pub nav: f64,
    #[serde(rename = "Date")]
    pub date: String,
}

impl From<SchemeRecord> for SchemeQuote {
    fn from(record: SchemeRecord) -> Self {
        Self {
            scheme_code: record.scheme_code,
            scheme_name: record.scheme_name,
            fund_family: record.fund_family,
            nav: record.nav,
            as_of: record.date,
        }
    }
}

/// Linear scan of a provider response for a scheme code.
pub fn find_scheme(scheme_code: i64, records: &[SchemeRecord]) -> Option<&SchemeRecord> {
    records.iter().find(|r| r.scheme_code == scheme_code)
}

/// Quote source backed by the RapidAPI latest-NAV endpoint.
pub struct RapidApiQuoteSource {
    client: reqwest::Client,
    config: QuoteConfig,
}

impl RapidApiQuoteSource {
    /// Build the source with a client carrying the configured timeout.
    pub fn new(config: QuoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build quote HTTP client")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl QuoteSource for RapidApiQuoteSource {
    async fn fetch(&self, scheme_code: i64) -> Result<Option<SchemeQuote>, QuoteError> {
        let response = self
            .client
            .get(&self.config.api_url)
            .header("x-rapidapi-key", &self.config.api_key)
            .header("x-rapidapi-host", &self.config.api_host)
            .query(&[("Scheme_Type", "Open")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuoteError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let records: Vec<SchemeRecord> =
            serde_json::from_str(&body).map_err(|e| QuoteError::Malformed(e.to_string()))?;

        Ok(find_scheme(scheme_code, &records)
            .cloned()
            .map(SchemeQuote::from))
    }
}
