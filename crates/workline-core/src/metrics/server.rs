//! Prometheus exporter initialization.
//!
//! `init_global` installs the process-wide recorder together with the
//! exporter's HTTP listener. `init_test` installs a recorder without a listener
//! and keeps its handle so tests can render what was recorded.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use snafu::prelude::*;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing::info;

use crate::error::{AddressParseSnafu, MetricsError, NotInitializedSnafu, PrometheusInitSnafu};

/// Histogram buckets for action and run durations (in seconds).
const DURATION_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0,
];

static CONTROLLER: OnceLock<MetricsController> = OnceLock::new();

/// Access to the recorder installed by [`init_test`].
pub struct MetricsController {
    handle: PrometheusHandle,
}

/// Install the global recorder and serve `/metrics` on `address`.
///
/// Must be called from within a tokio runtime; the listener runs as a task on it.
pub fn init_global(address: &str) -> Result<(), MetricsError> {
    let addr: SocketAddr = address.parse().context(AddressParseSnafu { address })?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(DURATION_BUCKETS)
        .context(PrometheusInitSnafu)?
        .install()
        .context(PrometheusInitSnafu)?;

    info!(%addr, "Metrics exporter started");
    Ok(())
}

/// Initialize the metrics recorder for tests.
///
/// Safe to call repeatedly and from several test threads at once: the first
/// caller installs the recorder and the rest wait until it is available.
pub fn init_test() {
    if install_test_recorder().is_err() {
        while CONTROLLER.get().is_none() {
            std::hint::spin_loop();
        }
    }
}

fn install_test_recorder() -> Result<(), MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets(DURATION_BUCKETS)
        .context(PrometheusInitSnafu)?
        .install_recorder()
        .context(PrometheusInitSnafu)?;

    CONTROLLER
        .set(MetricsController { handle })
        .map_err(|_| MetricsError::AlreadyInitialized)
}

impl MetricsController {
    /// Get the controller installed by [`init_test`].
    pub fn get() -> Result<&'static Self, MetricsError> {
        CONTROLLER.get().context(NotInitializedSnafu)
    }

    /// Render metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::counter;
    use std::thread;

    #[test]
    fn test_init_test_is_idempotent() {
        init_test();
        init_test();
        assert!(MetricsController::get().is_ok());
    }

    #[test]
    fn test_controller_render() {
        init_test();

        counter!("workline_test_counter").increment(7);

        let output = MetricsController::get().unwrap().render();
        assert!(output.contains("workline_test_counter"));
    }

    #[test]
    fn test_concurrent_init_test() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                thread::spawn(|| {
                    init_test();
                    MetricsController::get().unwrap();
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn test_init_global_rejects_bad_address() {
        let err = init_global("not-an-address").unwrap_err();
        assert!(matches!(err, MetricsError::AddressParse { .. }));
    }
}
