//! Wires configuration to the pipeline and reports the outcome.

use reupload_browser::ChromeLauncher;
use reupload_pipeline::{
    PipelineController, PipelineError, PortalClientConnector, RunInputs, UploadEvent,
};
use tokio::sync::mpsc;

use crate::config::Config;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_filter(debug: bool) -> &'static str {
    if debug { "info,reupload=debug" } else { "info" }
}

/// Runs one upload.
pub async fn run(config: Config, inputs: RunInputs) -> Result<(), PipelineError> {
    let launcher = ChromeLauncher::new(config.launch_options());
    let (events_tx, mut events_rx) = mpsc::channel(64);

    let progress = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if let UploadEvent::ChunkUploaded {
                bytes_sent,
                total_bytes,
                ..
            } = event
            {
                tracing::debug!(
                    progress = %format!("{:.1}%", percent(bytes_sent, total_bytes)),
                    "upload progress"
                );
            }
        }
    });

    let mut controller = PipelineController::new(
        config.endpoints(),
        Box::new(launcher),
        Box::new(PortalClientConnector),
    )
    .with_events(events_tx);

    let result = controller.run(&inputs).await;
    // Dropping the controller closes the event channel.
    drop(controller);
    let _ = progress.await;

    match &result {
        Ok(()) => tracing::info!(asset_id = %inputs.asset_id, "re-upload finished"),
        Err(e) => tracing::debug!(kind = ?e.kind(), "run stopped"),
    }
    result
}

fn percent(sent: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    sent as f64 * 100.0 / total as f64
}

/// Reports a failed run once: as an error log line and, under GitHub
/// Actions, as an `::error::` workflow command.
pub fn report_failure(message: &str) {
    tracing::error!("{message}");
    if std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true") {
        println!("{}", workflow_error(message));
    }
}

/// `::error::` workflow command for `message`.
fn workflow_error(message: &str) -> String {
    let escaped = message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    format!("::error::{escaped}")
}
