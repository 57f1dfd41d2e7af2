//! Configuration types shared by workline applications.

mod loader;
mod path;
mod vars;

pub use loader::{load_yaml_file, parse_yaml};
pub use path::{CliArgs, is_yaml_file};
pub use vars::{InterpolationResult, interpolate};

use serde::{Deserialize, Serialize};

/// Metrics configuration for the Prometheus endpoint.
///
/// The exporter is only started when an address is given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener (e.g. "0.0.0.0:9090").
    #[serde(default)]
    pub address: Option<String>,
}

impl MetricsConfig {
    /// Whether a metrics endpoint was requested.
    pub fn enabled(&self) -> bool {
        self.address.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_config_default_disabled() {
        let config: MetricsConfig = serde_yaml::from_str("{}").unwrap();
        assert!(!config.enabled());
    }

    #[test]
    fn test_metrics_config_with_address() {
        let config: MetricsConfig = serde_yaml::from_str("address: 127.0.0.1:9100").unwrap();
        assert_eq!(config.address.as_deref(), Some("127.0.0.1:9100"));
        assert!(config.enabled());
    }

    #[test]
    fn test_metrics_config_rejects_unknown_fields() {
        let result: Result<MetricsConfig, _> = serde_yaml::from_str("port: 9090");
        assert!(result.is_err());
    }
}
