//! OS signal handling for graceful interruption.

use tracing::{info, warn};

/// Wait for a shutdown signal (SIGINT, SIGTERM or SIGQUIT on Unix).
///
/// A signal whose handler cannot be installed is logged and ignored; the
/// remaining ones are still awaited.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{Signal, SignalKind, signal};

    fn install(kind: SignalKind, name: &'static str) -> Option<Signal> {
        match signal(kind) {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!(signal = name, error = %e, "Failed to install signal handler");
                None
            }
        }
    }

    async fn recv(stream: &mut Option<Signal>) {
        match stream {
            Some(s) => {
                s.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    let mut sigint = install(SignalKind::interrupt(), "SIGINT");
    let mut sigterm = install(SignalKind::terminate(), "SIGTERM");
    let mut sigquit = install(SignalKind::quit(), "SIGQUIT");

    tokio::select! {
        _ = recv(&mut sigint) => info!(message = "Signal received.", signal = "SIGINT"),
        _ = recv(&mut sigterm) => info!(message = "Signal received.", signal = "SIGTERM"),
        _ = recv(&mut sigquit) => info!(message = "Signal received.", signal = "SIGQUIT"),
    }
}

/// Wait for Ctrl-C on platforms without Unix signals.
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!(message = "Signal received.", signal = "ctrl-c"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await
        }
    }
}
