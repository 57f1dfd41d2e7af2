//! Workline CLI: run a line pipeline from stdin to stdout.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use workline::{CliArgs, Config, app, init_tracing};

fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();
    info!("Loading config from {}", args.config.display());

    let config = match Config::from_path(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(app::run(config));

    // A pending stdin read cannot be cancelled; don't wait for it.
    runtime.shutdown_timeout(Duration::from_millis(100));

    match result {
        Ok(stats) => {
            info!(
                lines_read = stats.lines_read,
                lines_written = stats.lines_written,
                "Done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Pipeline failed: {e}");
            ExitCode::FAILURE
        }
    }
}
