//! Portal asset upload API.
//!
//! Three endpoints drive a re-upload: `re-upload` announces the file and its
//! chunk layout, `upload-chunk` receives each chunk as multipart form data,
//! and `complete-upload` finalizes the asset. Every request carries the
//! browser session's `Cookie` header.

mod client;

pub use client::PortalClient;

use futures_util::future::BoxFuture;
use reupload_protocol::{ReUploadRequest, ReUploadResponse};

/// Errors from the portal API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cookie header contains characters not allowed in HTTP headers")]
    InvalidCookie,
}

/// The portal upload endpoints.
///
/// Object-safe so the pipeline can run against a scripted stand-in.
pub trait PortalApi: Send + Sync {
    /// `POST /v1/assets/{id}/re-upload` with the chunk layout.
    fn re_upload<'a>(
        &'a self,
        asset_id: &'a str,
        request: &'a ReUploadRequest,
    ) -> BoxFuture<'a, Result<ReUploadResponse, ApiError>>;

    /// `POST /v1/assets/{id}/upload-chunk` with fields `chunk_id` and `chunk`.
    fn upload_chunk<'a>(
        &'a self,
        asset_id: &'a str,
        chunk_id: u64,
        data: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), ApiError>>;

    /// `POST /v1/assets/{id}/complete-upload` with an empty JSON object.
    fn complete_upload<'a>(&'a self, asset_id: &'a str) -> BoxFuture<'a, Result<(), ApiError>>;
}
