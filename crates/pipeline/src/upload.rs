//! Chunked transfer: initiate, send every chunk in order, complete.

use reupload_portal_api::PortalApi;
use reupload_transfer::{ChunkReader, ThroughputMeter, UploadSession};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::types::{Phase, UploadEvent, UploadPhase};

/// Runs the upload protocol for one [`UploadSession`].
///
/// Chunks go out strictly one at a time. The first failure aborts the
/// transfer; the completion request is only sent after every chunk was
/// accepted.
pub struct ChunkedUploadOrchestrator<'a> {
    api: &'a dyn PortalApi,
    events: Option<mpsc::Sender<UploadEvent>>,
    phase: UploadPhase,
}

impl<'a> ChunkedUploadOrchestrator<'a> {
    pub fn new(api: &'a dyn PortalApi) -> Self {
        Self {
            api,
            events: None,
            phase: UploadPhase::Idle,
        }
    }

    /// Reports progress on `events`.
    pub fn with_events(mut self, events: mpsc::Sender<UploadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn phase(&self) -> &UploadPhase {
        &self.phase
    }

    pub async fn upload(&mut self, session: &UploadSession) -> Result<(), PipelineError> {
        match self.run(session).await {
            Ok(()) => {
                self.emit(UploadEvent::Completed).await;
                Ok(())
            }
            Err(e) => {
                let error = e.to_string();
                if !self.phase.is_terminal() {
                    self.phase = UploadPhase::Failed(error.clone());
                }
                self.emit(UploadEvent::Failed { error }).await;
                Err(e)
            }
        }
    }

    async fn run(&mut self, session: &UploadSession) -> Result<(), PipelineError> {
        let asset_id = session.asset_id();
        let plan = *session.plan();
        let total = plan.chunk_count();

        info!("Starting upload ...");
        debug!("Total size: {}", plan.total_size());
        debug!("File name: {}", session.original_file_name());
        debug!("Chunk size: {}", plan.chunk_size());
        debug!("Chunk count: {total}");

        let response = self
            .api
            .re_upload(asset_id, &session.re_upload_request())
            .await?;
        if !response.is_accepted() {
            match response.errors() {
                Some(errors) => debug!(%errors, "portal rejected re-upload"),
                None => debug!("re-upload response has no errors field"),
            }
            return Err(PipelineError::UploadInitiation);
        }
        self.phase.advance(UploadPhase::Initiated)?;
        self.emit(UploadEvent::Initiated { chunk_count: total })
            .await;

        let mut reader = ChunkReader::open(session.zip_path(), plan).await?;
        let mut meter = ThroughputMeter::default();
        meter.record(0);
        let mut bytes_sent = 0u64;

        while let Some(chunk) = reader.next_chunk().await? {
            let index = chunk.index;
            let len = chunk.len() as u64;
            self.phase.advance(UploadPhase::Uploading(index))?;

            self.api
                .upload_chunk(asset_id, index, chunk.data)
                .await
                .map_err(|source| PipelineError::ChunkTransfer { index, source })?;

            bytes_sent += len;
            meter.record(len);
            info!("Uploaded chunk {}/{}", index + 1, total);
            debug!(
                bytes_sent,
                bytes_per_second = meter.bytes_per_second() as u64,
                eta_secs = meter.eta(plan.total_size() - bytes_sent).map(|d| d.as_secs()),
                "chunk accepted"
            );
            self.emit(UploadEvent::ChunkUploaded {
                index,
                total,
                bytes_sent,
                total_bytes: plan.total_size(),
            })
            .await;
        }

        self.api
            .complete_upload(asset_id)
            .await
            .map_err(PipelineError::Completion)?;
        self.phase.advance(UploadPhase::Completed)?;
        info!("Upload completed.");
        Ok(())
    }

    async fn emit(&self, event: UploadEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}
