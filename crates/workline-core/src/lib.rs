//! workline-core: Shared support components for workline.
//!
//! - `config/` - YAML loading, environment variable interpolation, CLI args
//! - `metrics/` - Internal metric events and the Prometheus exporter
//! - `signal` - Signal handling for graceful interruption
//! - `tracing` - Subscriber setup
//! - `error` - Common error types

pub mod config;
pub mod error;
pub mod metrics;
pub mod signal;
pub mod tracing;

pub use config::{CliArgs, MetricsConfig, interpolate, load_yaml_file, parse_yaml};
pub use error::{ConfigError, MetricsError};
pub use metrics::{
    MetricsController, init_global as init_metrics, init_test as init_metrics_test,
};
pub use signal::shutdown_signal;
pub use tracing::init_tracing;
