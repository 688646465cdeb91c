mod chat;
mod config;
mod document;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod routes;
mod session;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::chat::{ChatResolver, KeywordChatResolver, LlmChatResolver};
use crate::config::Config;
use crate::extraction::{HeuristicDescriber, LlmPlaceholderDescriber, PlaceholderDescriber};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::session::{spawn_sweeper, InMemorySessionStore, SessionStore};
use crate::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting DocAssist API v{}", env!("CARGO_PKG_VERSION"));

    // Select LLM-backed or deterministic backends
    let (describer, resolver) = build_backends(&config)?;
    info!(
        "Backends: {} describer, {} resolver",
        describer.backend(),
        resolver.backend()
    );

    // Session store + background eviction
    let sessions: Arc<dyn SessionStore> =
        Arc::new(InMemorySessionStore::new(config.session_timeout()));
    spawn_sweeper(sessions.clone(), SWEEP_INTERVAL);
    info!(
        "Session store initialized (timeout: {} min)",
        config.session_timeout_minutes
    );

    let state = AppState {
        config: config.clone(),
        sessions,
        describer,
        resolver,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config)?);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_backends(
    config: &Config,
) -> Result<(Arc<dyn PlaceholderDescriber>, Arc<dyn ChatResolver>)> {
    let Some(api_key) = config.anthropic_api_key.clone() else {
        warn!("ANTHROPIC_API_KEY not set; using heuristic describer and keyword resolver");
        return Ok((Arc::new(HeuristicDescriber), Arc::new(KeywordChatResolver)));
    };

    let llm = LlmClient::new(api_key, config.llm_api_url.clone(), config.llm_model.clone())
        .context("Failed to build LLM client")?;
    info!("LLM client initialized (model: {})", llm.model());

    Ok((
        Arc::new(LlmPlaceholderDescriber(llm.clone())),
        Arc::new(LlmChatResolver(llm)),
    ))
}

/// Permissive unless CORS_ALLOW_ORIGIN pins a single origin.
fn cors_layer(config: &Config) -> Result<CorsLayer> {
    let Some(origin) = &config.cors_allow_origin else {
        return Ok(CorsLayer::permissive());
    };

    let origin: HeaderValue = origin
        .parse()
        .with_context(|| format!("CORS_ALLOW_ORIGIN is not a valid origin: {origin}"))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([header::CONTENT_DISPOSITION]))
}
