//! Pipeline error types.

use reupload_browser::BrowserError;
use reupload_portal_api::ApiError;
use reupload_transfer::TransferError;

use crate::types::PhaseError;

/// Failure categories a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidConfiguration,
    AuthenticationFailure,
    ProtocolViolation,
    UploadInitiation,
    ChunkTransfer,
    Completion,
    /// Browser, file or transport failures outside the protocol steps.
    Unexpected,
}

/// Errors that end a pipeline run. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid chunk size. Must be a number.")]
    InvalidConfiguration,

    #[error("Redirect failed. Make sure the provided Cookie is valid.")]
    AuthenticationFailure { location: String },

    #[error("unexpected SSO response: {0}")]
    ProtocolViolation(String),

    #[error("Failed to re-upload file. See debug logs for more information.")]
    UploadInitiation,

    #[error("failed to upload chunk {index}: {source}")]
    ChunkTransfer { index: u64, source: ApiError },

    #[error("failed to complete upload: {0}")]
    Completion(#[source] ApiError),

    #[error("portal API error: {0}")]
    Api(#[from] ApiError),

    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("transfer error: {0}")]
    Transfer(TransferError),

    #[error(transparent)]
    Phase(#[from] PhaseError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfiguration => ErrorKind::InvalidConfiguration,
            Self::AuthenticationFailure { .. } => ErrorKind::AuthenticationFailure,
            Self::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
            Self::UploadInitiation => ErrorKind::UploadInitiation,
            Self::ChunkTransfer { .. } => ErrorKind::ChunkTransfer,
            Self::Completion(_) => ErrorKind::Completion,
            Self::Api(_) | Self::Browser(_) | Self::Transfer(_) | Self::Phase(_) => {
                ErrorKind::Unexpected
            }
        }
    }
}

impl From<TransferError> for PipelineError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::InvalidChunkSize(_) => Self::InvalidConfiguration,
            other => Self::Transfer(other),
        }
    }
}
