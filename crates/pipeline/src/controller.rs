//! Top-level run: validate, authenticate, check the portal, upload.

use std::path::PathBuf;

use reupload_browser::{Browser, BrowserLauncher};
use reupload_portal_api::{ApiError, PortalApi, PortalClient};
use reupload_protocol::PortalEndpoints;
use reupload_transfer::{UploadSession, parse_chunk_size};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::auth::AuthenticationBridge;
use crate::error::PipelineError;
use crate::types::{Phase, PipelinePhase, UploadEvent};
use crate::upload::ChunkedUploadOrchestrator;

/// Builds the upload client once the cookie header is known.
pub trait ApiConnector: Send + Sync {
    fn connect(
        &self,
        endpoints: &PortalEndpoints,
        cookie_header: &str,
    ) -> Result<Box<dyn PortalApi>, ApiError>;
}

/// Connects with the reqwest-backed [`PortalClient`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PortalClientConnector;

impl ApiConnector for PortalClientConnector {
    fn connect(
        &self,
        endpoints: &PortalEndpoints,
        cookie_header: &str,
    ) -> Result<Box<dyn PortalApi>, ApiError> {
        Ok(Box::new(PortalClient::new(endpoints.clone(), cookie_header)?))
    }
}

/// Raw inputs for one run.
#[derive(Debug, Clone, Default)]
pub struct RunInputs {
    pub asset_id: String,
    pub zip_path: PathBuf,
    /// Unparsed; validated before the browser is launched.
    pub chunk_size: String,
    /// Forum session token, planted as the `_t` cookie.
    pub cookie: String,
}

/// Runs the whole pipeline once.
pub struct PipelineController {
    endpoints: PortalEndpoints,
    launcher: Box<dyn BrowserLauncher>,
    connector: Box<dyn ApiConnector>,
    events: Option<mpsc::Sender<UploadEvent>>,
    phase: PipelinePhase,
}

impl PipelineController {
    pub fn new(
        endpoints: PortalEndpoints,
        launcher: Box<dyn BrowserLauncher>,
        connector: Box<dyn ApiConnector>,
    ) -> Self {
        Self {
            endpoints,
            launcher,
            connector,
            events: None,
            phase: PipelinePhase::Start,
        }
    }

    /// Forwards upload progress to `events`.
    pub fn with_events(mut self, events: mpsc::Sender<UploadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Phase the last run reached.
    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    /// Runs the pipeline. The browser, once launched, is closed exactly once
    /// before this returns.
    pub async fn run(&mut self, inputs: &RunInputs) -> Result<(), PipelineError> {
        self.phase = PipelinePhase::Start;
        let result = self.execute(inputs).await;
        if result.is_err() && !self.phase.is_terminal() {
            self.phase = PipelinePhase::Failed;
        }
        result
    }

    async fn execute(&mut self, inputs: &RunInputs) -> Result<(), PipelineError> {
        self.phase.advance(PipelinePhase::InputValidation)?;
        let chunk_size =
            parse_chunk_size(&inputs.chunk_size).map_err(|_| PipelineError::InvalidConfiguration)?;

        self.phase.advance(PipelinePhase::Authenticating)?;
        let mut browser = self.launcher.launch().await?;
        let outcome = self.drive(browser.as_mut(), inputs, chunk_size).await;
        if let Err(e) = browser.close().await {
            warn!(error = %e, "failed to close browser");
        }
        outcome
    }

    async fn drive(
        &mut self,
        browser: &mut dyn Browser,
        inputs: &RunInputs,
        chunk_size: u64,
    ) -> Result<(), PipelineError> {
        let sso_url = self.endpoints.sso_url();
        let auth = AuthenticationBridge::new(browser, &self.endpoints)
            .sign_in(&sso_url, &inputs.cookie)
            .await?;

        self.phase.advance(PipelinePhase::PortalCheck)?;
        if !auth.verified {
            return Err(PipelineError::AuthenticationFailure {
                location: auth.location,
            });
        }
        info!(
            "Redirected to {}. Uploading file ...",
            self.endpoints.portal_host
        );

        let session = UploadSession::prepare(
            inputs.asset_id.clone(),
            inputs.zip_path.clone(),
            chunk_size,
            auth.cookie_header,
        )
        .await?;
        let api = self
            .connector
            .connect(&self.endpoints, session.cookie_header())?;

        self.phase.advance(PipelinePhase::Uploading)?;
        let mut orchestrator = ChunkedUploadOrchestrator::new(api.as_ref());
        if let Some(tx) = &self.events {
            orchestrator = orchestrator.with_events(tx.clone());
        }
        orchestrator.upload(&session).await?;

        self.phase.advance(PipelinePhase::Completed)?;
        Ok(())
    }
}
