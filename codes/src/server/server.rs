//! HTTP server lifecycle for the code service.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Notify;

use super::config::CodeServerConfig;
use super::handlers::{
    AppState, handle_dump, handle_healthy, handle_info, handle_issue, handle_metrics,
    handle_status,
};
use super::metrics::Metrics;
use super::middleware::{MetricsLayer, TracingLayer};
use crate::CodeDb;

/// Builds the router with all routes and middleware.
pub fn build_router(db: Arc<CodeDb>, metrics: Arc<Metrics>) -> Router {
    let state = AppState {
        db,
        metrics: metrics.clone(),
    };

    Router::new()
        .route("/api/v1/code", get(handle_issue))
        .route("/api/v1/code/{code}", get(handle_status).put(handle_dump))
        .route("/api/v1/info", get(handle_info))
        .route("/-/healthy", get(handle_healthy))
        .route("/metrics", get(handle_metrics))
        .layer(TracingLayer::new())
        .layer(MetricsLayer::new(metrics))
        .with_state(state)
}

/// HTTP server for the code service.
pub struct CodeServer {
    db: Arc<CodeDb>,
    config: CodeServerConfig,
}

impl CodeServer {
    pub fn new(db: Arc<CodeDb>, config: CodeServerConfig) -> Self {
        Self { db, config }
    }

    /// Serves until ctrl-c or SIGTERM, then closes the database.
    ///
    /// After the signal, in-flight requests get the configured shutdown
    /// timeout to finish. Connections still open after that are dropped.
    pub async fn run(self) -> anyhow::Result<()> {
        let metrics = Arc::new(Metrics::new());
        let app = build_router(self.db.clone(), metrics);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "code server listening");

        let stop = Arc::new(Notify::new());
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown({
                let stop = stop.clone();
                async move { stop.notified().await }
            })
            .into_future();
        drain_with_limit(serve, shutdown_signal(), &stop, self.config.shutdown_timeout).await?;

        tracing::info!("server stopped, closing code store");
        self.db.close().await?;
        Ok(())
    }
}

/// Drives `serve` until `signal` fires, then wakes `stop` and waits at most
/// `limit` for `serve` to finish draining.
///
/// Returns `Ok(false)` if the limit was hit and `serve` was dropped.
async fn drain_with_limit<F, E>(
    serve: F,
    signal: impl Future<Output = ()>,
    stop: &Notify,
    limit: Duration,
) -> Result<bool, E>
where
    F: Future<Output = Result<(), E>>,
{
    tokio::pin!(serve);
    tokio::select! {
        result = &mut serve => return result.map(|()| true),
        () = signal => stop.notify_one(),
    }

    match tokio::time::timeout(limit, serve).await {
        Ok(result) => result.map(|()| true),
        Err(_) => {
            tracing::warn!(
                timeout_secs = limit.as_secs_f64(),
                "in-flight requests did not finish in time, dropping them"
            );
            Ok(false)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
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

    tracing::info!("shutdown signal received");
}
