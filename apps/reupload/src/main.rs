//! Portal re-upload entry point.

mod app;
mod config;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let config = config::Config::load();
    let debug = config.as_ref().is_ok_and(|c| c.debug) || config::runner_debug();

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(app::default_filter(debug))),
        )
        .init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            app::report_failure(&format!("{e:#}"));
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        "starting portal re-upload"
    );

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            app::report_failure(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(app::run(config, config::inputs_from_env())) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            app::report_failure(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
