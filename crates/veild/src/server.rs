//! HTTP server for veild

use crate::routes;
use crate::supervisor::OllamaSupervisor;
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use veil_common::{CompletionBackend, Config};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub backend: Arc<dyn CompletionBackend>,
    pub supervisor: Arc<OllamaSupervisor>,
    /// How long a request waits for its completion
    pub sanitize_timeout: Duration,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: Config,
        backend: Arc<dyn CompletionBackend>,
        supervisor: Arc<OllamaSupervisor>,
    ) -> Self {
        let sanitize_timeout = config.sanitize.timeout();
        Self {
            config,
            backend,
            supervisor,
            sanitize_timeout,
            start_time: Instant::now(),
        }
    }

    /// Override the completion wait (finer than the config's whole seconds)
    pub fn with_sanitize_timeout(mut self, timeout: Duration) -> Self {
        self.sanitize_timeout = timeout;
        self
    }
}

/// Assemble the router. Every response, errors included, allows any origin so
/// that browser extensions can call the service.
pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.server.max_body_bytes;
    let state = Arc::new(state);

    Router::new()
        .merge(routes::health_routes())
        .merge(routes::sanitize_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until Ctrl-C or SIGTERM, then stop any backend we started
pub async fn run(state: AppState) -> Result<()> {
    let addr = state.config.bind_addr();
    let supervisor = state.supervisor.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Shutting down gracefully");
    supervisor.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
