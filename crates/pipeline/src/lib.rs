//! Authenticated chunked upload flow.
//!
//! This crate holds the **business logic** for re-uploading an asset to the
//! portal. It has no direct dependency on a particular browser or HTTP
//! stack: the browser comes from a [`BrowserLauncher`] and the upload
//! endpoints from an [`ApiConnector`], so tests can script both.
//!
//! # Pipeline
//!
//! 1. **Validate**: parse the chunk size before anything is opened
//! 2. **Authenticate**: follow the SSO redirect chain in the browser and
//!    plant the forum session cookie
//! 3. **Portal check**: confirm the browser landed on the portal
//! 4. **Upload**: initiate, send every chunk in order, complete
//!
//! The browser is closed exactly once whichever step fails.
//!
//! [`BrowserLauncher`]: reupload_browser::BrowserLauncher

pub mod auth;
pub mod controller;
pub mod error;
pub mod types;
pub mod upload;

pub use auth::AuthenticationBridge;
pub use controller::{ApiConnector, PipelineController, PortalClientConnector, RunInputs};
pub use error::{ErrorKind, PipelineError};
pub use types::{AuthPhase, AuthSession, Phase, PhaseError, PipelinePhase, UploadEvent, UploadPhase};
pub use upload::ChunkedUploadOrchestrator;

#[cfg(test)]
pub(crate) mod testing;
