mod annotation;
mod config;
mod db;
mod digest;
mod dossier;
mod errors;
mod feed;
mod llm_client;
mod models;
mod routes;
mod state;
mod store;
mod swipes;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::build_store;
use crate::digest::scheduler::run_digest_scheduler;
use crate::feed::reddit::RedditClient;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting DNA API v{}", env!("CARGO_PKG_VERSION"));

    let store = build_store(&config).await?;

    let llm = LlmClient::new(config.anthropic_api_key.clone(), config.synthesis_timeout)?;
    info!(
        "LLM client initialized (model: {}, timeout: {}s)",
        llm_client::MODEL,
        config.synthesis_timeout.as_secs()
    );

    let reddit = RedditClient::new(
        config.reddit_base_url.clone(),
        &config.reddit_user_agent,
        config.request_timeout,
    )?;

    let state = AppState {
        store,
        synthesizer: Arc::new(llm),
        content: Arc::new(reddit),
        config: config.clone(),
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let scheduler = if config.digest_scheduler_interval.is_zero() {
        info!("Digest scheduler disabled");
        None
    } else {
        Some(tokio::spawn(run_digest_scheduler(
            state.clone(),
            config.digest_scheduler_interval,
            shutdown_tx.subscribe(),
        )))
    };

    let app = build_router(state)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(());
    if let Some(handle) = scheduler {
        let _ = handle.await;
    }
    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
