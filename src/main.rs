mod api;
mod auth;
mod config;
mod dates;
mod db;
mod error;
mod payments;
mod pricing;
mod ranking;
mod service;
mod types;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::{routes::router, AppState};
use crate::config::Config;
use crate::db::PoolStore;
use crate::error::Result;
use crate::payments::{HttpCheckoutGateway, PaymentGateway};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", cfg.db_path)).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    // --- Collaborators ---
    let store = PoolStore::new(pool);
    let gateway: Arc<dyn PaymentGateway> = Arc::new(HttpCheckoutGateway::new(&cfg));
    if cfg.checkout_secret_key.is_empty() {
        tracing::warn!("CHECKOUT_SECRET_KEY not set — checkout session creation will be rejected by the provider");
    }

    // --- HTTP API server ---
    let state = AppState { store, gateway };
    let app = router(state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
