//! Configuration management
//!
//! This module handles loading and parsing configuration for the Fundtrack
//! service. Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings for secrets)
//!
//! Missing optional values are filled with sensible defaults. The JWT
//! signing secret is the one value without a default: a missing or short
//! secret fails validation, which aborts process startup.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Minimum accepted length of the JWT signing secret, in bytes.
const MIN_JWT_SECRET_LEN: usize = 32;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Token issuing / revocation configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Market-data provider configuration
    #[serde(default)]
    pub quote: QuoteConfig,
    /// Outbound mail configuration
    #[serde(default)]
    pub mail: MailConfig,
    /// NAV refresh scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// A missing file is not an error; defaults are used so that the service
    /// can be configured entirely through the environment.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides for deployment secrets.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("FUNDTRACK_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(secret) = std::env::var("FUNDTRACK_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(key) = std::env::var("FUNDTRACK_QUOTE_API_KEY") {
            self.quote.api_key = key;
        }
        if let Ok(password) = std::env::var("FUNDTRACK_SMTP_PASSWORD") {
            self.mail.smtp_password = password;
        }
    }

    /// Validate startup-fatal settings.
    ///
    /// The signing secret is process-wide and read-only after startup; a
    /// misconfigured secret must abort startup rather than fail per-request.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            bail!("auth.jwt_secret is not configured (set FUNDTRACK_JWT_SECRET)");
        }
        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            bail!(
                "auth.jwt_secret must be at least {} bytes, got {}",
                MIN_JWT_SECRET_LEN,
                self.auth.jwt_secret.len()
            );
        }
        if self.auth.access_ttl_minutes == 0 || self.auth.refresh_ttl_days == 0 {
            bail!("auth token TTLs must be non-zero");
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Public base URL used when building verification links in emails
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            public_url: default_public_url(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_public_url() -> String {
    "http://localhost:8000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/fundtrack.db".to_string()
}

/// Token issuing / revocation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens.
    /// No default: must be configured, validated at startup.
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token lifetime in minutes
    #[serde(default = "default_access_ttl_minutes")]
    pub access_ttl_minutes: i64,
    /// Refresh token lifetime in days
    #[serde(default = "default_refresh_ttl_days")]
    pub refresh_ttl_days: i64,
    /// Extra margin added to the revocation-entry TTL so an entry never
    /// expires before the token it blocks
    #[serde(default = "default_revocation_margin_secs")]
    pub revocation_margin_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_ttl_minutes: default_access_ttl_minutes(),
            refresh_ttl_days: default_refresh_ttl_days(),
            revocation_margin_secs: default_revocation_margin_secs(),
        }
    }
}

fn default_access_ttl_minutes() -> i64 {
    60
}

fn default_refresh_ttl_days() -> i64 {
    7
}

fn default_revocation_margin_secs() -> u64 {
    3600
}

/// Market-data provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    /// Provider endpoint returning the open-scheme collection
    #[serde(default = "default_quote_api_url")]
    pub api_url: String,
    /// Provider API key
    #[serde(default)]
    pub api_key: String,
    /// Provider API host header value
    #[serde(default = "default_quote_api_host")]
    pub api_host: String,
    /// Request timeout in seconds; a slow provider is a fetch failure,
    /// not an indefinite hang
    #[serde(default = "default_quote_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            api_url: default_quote_api_url(),
            api_key: String::new(),
            api_host: default_quote_api_host(),
            timeout_secs: default_quote_timeout_secs(),
        }
    }
}

fn default_quote_api_url() -> String {
    "https://latest-mutual-fund-nav.p.rapidapi.com/latest".to_string()
}

fn default_quote_api_host() -> String {
    "latest-mutual-fund-nav.p.rapidapi.com".to_string()
}

fn default_quote_timeout_secs() -> u64 {
    15
}

/// Outbound mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// SMTP relay host; when empty, mail delivery is disabled and
    /// verification links are logged instead
    #[serde(default)]
    pub smtp_host: String,
    /// SMTP port
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username
    #[serde(default)]
    pub smtp_username: String,
    /// SMTP password
    #[serde(default)]
    pub smtp_password: String,
    /// From address
    #[serde(default = "default_mail_from")]
    pub from_address: String,
    /// From display name
    #[serde(default = "default_mail_from_name")]
    pub from_name: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_address: default_mail_from(),
            from_name: default_mail_from_name(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_mail_from() -> String {
    "noreply@fundtrack.local".to_string()
}

fn default_mail_from_name() -> String {
    "Fundtrack".to_string()
}

/// NAV refresh scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the periodic refresh task is started at all
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,
    /// Interval between refresh passes in seconds (hourly in production)
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Maximum attempts per scheduled slot when the whole pass fails
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff between retry attempts in seconds
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            refresh_interval_secs: default_refresh_interval_secs(),
            max_attempts: default_max_attempts(),
            retry_backoff_secs: default_retry_backoff_secs(),
        }
    }
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_refresh_interval_secs() -> u64 {
    3600
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_secs() -> u64 {
    60
}
