//! Metrics and Monitoring Adapters
//!
//! Prometheus counters behind the `WorkerTelemetry` port, plus the
//! axum server exposing /metrics, /live and /ready.

pub mod health;
pub mod prometheus;

pub use self::health::{HealthServer, HealthState};
pub use self::prometheus::MetricsRegistry;
