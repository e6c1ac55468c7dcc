//! Fundtrack - REST backend for tracking personal mutual-fund investments

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fundtrack::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{SqlxInvestmentRepository, SqlxUserRepository},
    },
    services::{
        InvestmentService, NavRefreshScheduler, RapidApiQuoteSource, RevocationRegistry,
        SmtpMailer, TokenService, UserService,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fundtrack=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Fundtrack...");

    // Load configuration; a bad signing secret aborts startup here rather
    // than failing per-request later.
    let config = Config::load(Path::new("config.yml"))?;
    config.validate()?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {}", config.database.url);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Token issuing and revocation. Revocation entries outlive the
    // longest-lived token by the configured margin.
    let token_service = Arc::new(TokenService::from_config(&config.auth));
    let revocations = Arc::new(RevocationRegistry::new(
        token_service.max_token_lifetime()
            + std::time::Duration::from_secs(config.auth.revocation_margin_secs),
    ));

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let investment_repo = SqlxInvestmentRepository::boxed(pool.clone());

    // Initialize services
    let mailer = SmtpMailer::boxed(config.mail.clone());
    let user_service = Arc::new(UserService::new(
        user_repo,
        token_service.clone(),
        revocations.clone(),
        mailer,
        config.server.public_url.clone(),
    ));

    let quote_source = Arc::new(RapidApiQuoteSource::new(config.quote.clone())?);
    let investment_service = Arc::new(InvestmentService::new(investment_repo, quote_source));

    // Start the periodic NAV refresh task
    if config.scheduler.enabled {
        NavRefreshScheduler::new(investment_service.clone(), config.scheduler.clone()).spawn();
        tracing::info!(
            interval_secs = config.scheduler.refresh_interval_secs,
            "NAV refresh scheduler started"
        );
    } else {
        tracing::info!("NAV refresh scheduler disabled");
    }

    // Build application state
    let state = AppState {
        user_service,
        investment_service,
        token_service,
        revocations,
    };

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
