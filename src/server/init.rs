//! Server initialization and main run loop

use super::config::AppConfig;
use super::loader::load_config;
use super::providers::build_registry;
use crate::api::{api_router, AppState};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tandem_core::{
    ContentGuard, EventBus, GuardConfig, InMemoryStore, Orchestrator, RateLimiter, RoomStore,
    SqliteStore, StoreBackend,
};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

/// Listener overrides from the command line
#[derive(Debug, Default, Clone)]
pub struct ServeOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Open the configured room store
async fn init_store(config: &AppConfig) -> Result<Arc<dyn RoomStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory store; rooms are lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StoreBackend::Sqlite => {
            let path = Path::new(&config.store.path);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let store = SqliteStore::new(path)
                .await
                .context("Failed to open SQLite store")?;
            info!("SQLite store: {}", path.display());
            Ok(Arc::new(store))
        }
    }
}

/// Build the orchestrator and everything it owns
pub async fn build_orchestrator(config: &AppConfig) -> Result<Arc<Orchestrator>> {
    let store = init_store(config).await?;
    let registry = build_registry(
        &config.llm,
        &config.agents,
        &config.coordinator,
        &config.orchestrator.default_agent,
    )?;

    let guard = ContentGuard::new(GuardConfig {
        max_chars: config.orchestrator.max_content_chars,
        deny_terms: config.moderation.deny_terms.clone(),
        block_injection: config.moderation.block_injection,
    });

    let orchestrator = Orchestrator::new(Arc::new(registry), store)
        .with_config(config.orchestrator.clone())
        .with_guard(guard)
        .with_rate_limiter(RateLimiter::new(config.rate_limit.clone()))
        .with_event_bus(EventBus::new(config.events.capacity));

    orchestrator
        .seed_personas()
        .await
        .context("Failed to seed agent personas")?;

    Ok(Arc::new(orchestrator))
}

/// Periodically drop idle rate limiter keys
fn start_rate_limit_cleanup(limiter: RateLimiter, shutdown: CancellationToken) {
    let interval = limiter.config().window().max(Duration::from_secs(1));
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let removed = limiter.cleanup().await;
                    if removed > 0 {
                        debug!(removed, "Rate limiter cleanup");
                    }
                }
                _ = shutdown.cancelled() => {
                    debug!("Rate limiter cleanup shutting down");
                    break;
                }
            }
        }
    });
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }
    token.cancel();
}

/// Run the server
pub async fn run(options: ServeOptions) -> Result<()> {
    info!("Starting Tandem v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config().context("Failed to load configuration")?;
    if let Some(host) = options.host {
        config.server.host = host;
    }
    if let Some(port) = options.port {
        config.server.port = port;
    }
    info!(profile = %super::loader::profile(), "Configuration loaded");

    let orchestrator = build_orchestrator(&config).await?;
    let shutdown = CancellationToken::new();
    start_rate_limit_cleanup(orchestrator.rate_limiter().clone(), shutdown.clone());

    let state = AppState::new(orchestrator)
        .with_keep_alive(Duration::from_secs(config.events.keep_alive_secs))
        .with_shutdown(shutdown.clone());
    let app = api_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown))
    .await
    .context("HTTP server error")?;

    info!("Tandem shutdown complete");
    Ok(())
}
