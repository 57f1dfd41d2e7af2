//! Common error types shared by the workline crates.
//!
//! Configuration loading and metrics initialization live here so the engine
//! crate and the command line application report them the same way.

use snafu::prelude::*;

// ============ Config Errors ============

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Unsupported config file format.
    #[snafu(display("Unsupported config format for {}: only .yaml/.yml supported", path.display()))]
    UnsupportedFormat { path: std::path::PathBuf },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file {}: {source}", path.display()))]
    ReadFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// The pipeline declares no stages.
    #[snafu(display("Pipeline '{pipeline}' must declare at least one stage"))]
    EmptyStages { pipeline: String },

    /// A stage was declared with zero workers.
    #[snafu(display("Stage {index} of pipeline '{pipeline}' has degree 0 (must be at least 1)"))]
    ZeroDegree { pipeline: String, index: usize },

    /// A `match` stage carries a pattern that does not compile.
    #[snafu(display("Stage {index} has an invalid pattern: {source}"))]
    InvalidPattern { index: usize, source: regex::Error },
}

// ============ Metrics Errors ============

/// Errors that can occur during metrics initialization.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to parse the exporter listen address.
    #[snafu(display("Failed to parse metrics address '{address}': {source}"))]
    AddressParse {
        address: String,
        source: std::net::AddrParseError,
    },

    /// Failed to initialize the Prometheus recorder or listener.
    #[snafu(display("Failed to initialize Prometheus exporter: {source}"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },

    /// Metrics already initialized (double-init attempted).
    #[snafu(display("Metrics already initialized"))]
    AlreadyInitialized,

    /// Metrics not initialized (controller accessed before init).
    #[snafu(display("Metrics not initialized"))]
    NotInitialized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ZeroDegree {
            pipeline: "lines".to_string(),
            index: 2,
        };
        assert_eq!(
            err.to_string(),
            "Stage 2 of pipeline 'lines' has degree 0 (must be at least 1)"
        );

        let err = ConfigError::UnsupportedFormat {
            path: "pipeline.toml".into(),
        };
        assert!(err.to_string().contains("pipeline.toml"));
    }
}
