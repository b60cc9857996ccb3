//! HTTP server for the code service.
//!
//! This module exposes code issuance, dumping, status checks and capacity
//! reporting as REST endpoints, plus health and Prometheus metrics endpoints.

mod config;
mod error;
mod handlers;
mod metrics;
mod middleware;
mod response;
mod server;

pub use config::{CliArgs, CodeServerConfig};
pub use metrics::Metrics;
pub use server::{CodeServer, build_router};
