mod admin;
mod catalog;
mod chat;
mod config;
mod errors;
mod llm_client;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::catalog::categories::CategoryCatalog;
use crate::catalog::store::CardStore;
use crate::chat::sessions::SessionLog;
use crate::config::{mask_key, Config};
use crate::llm_client::LlmClient;
use crate::routes::{build_router, cors_layer};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CardNinja API v{}", env!("CARGO_PKG_VERSION"));
    info!("LLM provider: {}", config.model_label());
    if !config.api_keys.is_empty() {
        let masked: Vec<String> = config.api_keys.iter().map(|k| mask_key(k)).collect();
        info!("API keys ({}): {}", masked.len(), masked.join(", "));
    }
    for warning in config.validate() {
        warn!("{warning}");
    }

    // Catalogs
    let categories = Arc::new(CategoryCatalog::builtin().context("invalid category catalog")?);
    let cards = Arc::new(CardStore::open(config.cards_file()).await);
    info!(
        "Catalog ready: {} categories, {} cards",
        categories.all().len(),
        cards.current().await.len()
    );

    // Chat model and session log
    let llm = LlmClient::new(
        config.llm_provider,
        config.llm_model.clone(),
        config.llm_base_url.clone(),
        config.api_keys.clone(),
    )
    .context("failed to build LLM HTTP client")?;
    let sessions = Arc::new(SessionLog::new(config.chat_log_file()));

    let state = AppState {
        config: config.clone(),
        categories,
        cards,
        llm: Arc::new(llm),
        sessions,
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&config.cors_origins)),
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
