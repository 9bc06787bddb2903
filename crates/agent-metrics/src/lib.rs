//! # Agent Metrics
//!
//! Fetches the Prometheus text exposition an agent's collector publishes
//! about itself and extracts the handful of values the fleet monitor needs.
//! Stateless: every call is one HTTP GET plus parsing.

pub use overseer_core;

mod client;
mod exposition;

pub use client::{HttpMetricsClient, MetricsSource};
pub use exposition::{names, parse_exposition, CollectorSample, MetricSet};
