//! # Adapters
//!
//! Port implementations the node supplies to the orchestrator.

pub mod metrics;

pub use metrics::PrometheusQueryMetrics;
