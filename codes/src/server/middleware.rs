//! HTTP middleware for Axum.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use tower::{Layer, Service};

use super::metrics::{HttpLabels, HttpLabelsWithStatus, HttpMethod, Metrics};

const CODE_PATH_PREFIX: &str = "/api/v1/code/";

/// Decrements the in-flight gauge when the request future is dropped,
/// whether it completed, failed or was cancelled.
struct InFlightGuard {
    metrics: Arc<Metrics>,
}

impl InFlightGuard {
    fn new(metrics: Arc<Metrics>) -> Self {
        metrics.http_requests_in_flight.inc();
        Self { metrics }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.metrics.http_requests_in_flight.dec();
    }
}

/// Layer that wraps services with metrics collection.
#[derive(Clone)]
pub struct MetricsLayer {
    metrics: Arc<Metrics>,
}

impl MetricsLayer {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            metrics: self.metrics.clone(),
        }
    }
}

/// Service that collects HTTP metrics.
#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    metrics: Arc<Metrics>,
}

impl<S, ResBody> Service<Request<Body>> for MetricsService<S>
where
    S: Service<Request<Body>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ResBody: Send,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let method = HttpMethod::from(request.method());
        let endpoint = normalize_endpoint(request.uri().path());
        let metrics = self.metrics.clone();

        let guard = InFlightGuard::new(metrics.clone());
        let start = Instant::now();
        let future = self.inner.call(request);

        Box::pin(async move {
            let _guard = guard;
            let response = future.await?;
            let status = response.status().as_u16();

            metrics
                .http_requests
                .get_or_create(&HttpLabelsWithStatus {
                    method: method.clone(),
                    endpoint: endpoint.clone(),
                    status,
                })
                .inc();
            metrics
                .http_request_duration_seconds
                .get_or_create(&HttpLabels { method, endpoint })
                .observe(start.elapsed().as_secs_f64());

            Ok(response)
        })
    }
}

/// Collapses per-code paths into one endpoint label.
fn normalize_endpoint(path: &str) -> String {
    match path.strip_prefix(CODE_PATH_PREFIX) {
        Some(code) if !code.is_empty() => format!("{}{{code}}", CODE_PATH_PREFIX),
        _ => path.to_string(),
    }
}

/// Layer that wraps services with request tracing.
#[derive(Clone, Default)]
pub struct TracingLayer;

impl TracingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService { inner }
    }
}

/// Service that logs HTTP requests and responses at debug level.
#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
}

impl<S, ResBody> Service<Request<Body>> for TracingService<S>
where
    S: Service<Request<Body>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ResBody: Send,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let method = request.method().clone();
        let uri = request.uri().clone();
        let user_agent = request
            .headers()
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::debug!(
            method = %method,
            uri = %uri,
            user_agent = %user_agent,
            "HTTP request received"
        );

        let start = Instant::now();
        let future = self.inner.call(request);

        Box::pin(async move {
            let response = future.await?;
            tracing::debug!(
                method = %method,
                uri = %uri,
                status = %response.status().as_u16(),
                duration_ms = %start.elapsed().as_millis(),
                "HTTP request completed"
            );
            Ok(response)
        })
    }
}
