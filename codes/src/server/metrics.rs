//! Prometheus metrics for the code server.

use axum::http::Method;
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

/// Labels for code operation metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OperationLabels {
    pub operation: Operation,
    pub status: OperationStatus,
}

/// Code service operation.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Operation {
    Issue,
    Dump,
    Status,
    Info,
}

/// Outcome of an operation. Errors are split by kind so that exhaustion and
/// user errors can be told apart from storage failures.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum OperationStatus {
    Success,
    NotFound,
    AlreadyDumped,
    Exhausted,
    Unavailable,
    Corrupt,
    Invalid,
}

impl From<&crate::Error> for OperationStatus {
    fn from(err: &crate::Error) -> Self {
        use crate::Error;
        match err {
            Error::NotFound(_) => OperationStatus::NotFound,
            Error::AlreadyDumped(_) => OperationStatus::AlreadyDumped,
            Error::Exhausted => OperationStatus::Exhausted,
            Error::Transaction(_) => OperationStatus::Unavailable,
            Error::StateCorruption(_) => OperationStatus::Corrupt,
            Error::InvalidInput(_) => OperationStatus::Invalid,
        }
    }
}

/// Labels for HTTP request metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabels {
    pub method: HttpMethod,
    pub endpoint: String,
}

/// Labels for HTTP request metrics, including the response status.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabelsWithStatus {
    pub method: HttpMethod,
    pub endpoint: String,
    pub status: u16,
}

/// HTTP method label value.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Other,
}

impl From<&Method> for HttpMethod {
    fn from(method: &Method) -> Self {
        match *method {
            Method::GET => HttpMethod::Get,
            Method::PUT => HttpMethod::Put,
            Method::POST => HttpMethod::Post,
            Method::DELETE => HttpMethod::Delete,
            _ => HttpMethod::Other,
        }
    }
}

fn duration_histogram() -> Histogram {
    Histogram::new(exponential_buckets(0.0005, 2.0, 16))
}

/// Container for all Prometheus metrics.
pub struct Metrics {
    registry: Registry,

    /// Codes issued.
    pub codes_issued: Counter,

    /// Codes dumped.
    pub codes_dumped: Counter,

    /// Code operations by operation and outcome.
    pub code_requests: Family<OperationLabels, Counter>,

    /// HTTP requests by method, endpoint and status.
    pub http_requests: Family<HttpLabelsWithStatus, Counter>,

    /// HTTP request latency in seconds.
    pub http_request_duration_seconds: Family<HttpLabels, Histogram, fn() -> Histogram>,

    /// HTTP requests currently being served.
    pub http_requests_in_flight: Gauge,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics registry with all metrics registered.
    ///
    /// Counters are registered without the `_total` suffix; the text encoder
    /// appends it.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let codes_issued = Counter::default();
        registry.register(
            "codes_issued",
            "Total number of codes issued",
            codes_issued.clone(),
        );

        let codes_dumped = Counter::default();
        registry.register(
            "codes_dumped",
            "Total number of codes dumped",
            codes_dumped.clone(),
        );

        let code_requests = Family::<OperationLabels, Counter>::default();
        registry.register(
            "code_requests",
            "Total number of code operations by operation and status",
            code_requests.clone(),
        );

        let http_requests = Family::<HttpLabelsWithStatus, Counter>::default();
        registry.register(
            "http_requests",
            "Total number of HTTP requests",
            http_requests.clone(),
        );

        let http_request_duration_seconds =
            Family::<HttpLabels, Histogram, fn() -> Histogram>::new_with_constructor(
                duration_histogram,
            );
        registry.register(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
            http_request_duration_seconds.clone(),
        );

        let http_requests_in_flight = Gauge::default();
        registry.register(
            "http_requests_in_flight",
            "Number of HTTP requests currently being served",
            http_requests_in_flight.clone(),
        );

        Self {
            registry,
            codes_issued,
            codes_dumped,
            code_requests,
            http_requests,
            http_request_duration_seconds,
            http_requests_in_flight,
        }
    }

    /// Counts one finished code operation.
    pub fn record<T>(&self, operation: Operation, result: &crate::Result<T>) {
        let status = match result {
            Ok(_) => OperationStatus::Success,
            Err(err) => OperationStatus::from(err),
        };
        self.code_requests
            .get_or_create(&OperationLabels { operation, status })
            .inc();
    }

    /// Encode all metrics to Prometheus text format.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if let Err(err) = prometheus_client::encoding::text::encode(&mut buffer, &self.registry) {
            tracing::error!(error = %err, "failed to encode metrics");
        }
        buffer
    }
}
