use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reupload_protocol::constants::{CHUNK_CONTENT_TYPE, CHUNK_FILE_NAME};
use reupload_protocol::{PortalEndpoints, ReUploadRequest, ReUploadResponse};
use tracing::debug;

use crate::{ApiError, PortalApi};

/// reqwest-backed portal client authenticated by a session cookie header.
pub struct PortalClient {
    http: reqwest::Client,
    endpoints: PortalEndpoints,
}

impl PortalClient {
    /// Creates a client that sends `cookie_header` on every request.
    pub fn new(endpoints: PortalEndpoints, cookie_header: &str) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut cookie = HeaderValue::from_str(cookie_header).map_err(|_| ApiError::InvalidCookie)?;
        cookie.set_sensitive(true);
        headers.insert(COOKIE, cookie);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { http, endpoints })
    }

    pub fn endpoints(&self) -> &PortalEndpoints {
        &self.endpoints
    }

    /// Sends a request and returns the body, or [`ApiError::Api`] for any
    /// non-2xx status.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let resp = request.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.bytes().await?.to_vec())
    }

    pub async fn re_upload(
        &self,
        asset_id: &str,
        request: &ReUploadRequest,
    ) -> Result<ReUploadResponse, ApiError> {
        let url = self.endpoints.re_upload_url(asset_id);
        debug!(%url, chunk_count = request.chunk_count, "initiating re-upload");
        let body = self.send(self.http.post(&url).json(request)).await?;
        // An empty body carries no `errors: null`, so it is not an acceptance.
        if body.iter().all(u8::is_ascii_whitespace) {
            debug!("re-upload response body is empty");
            return Ok(ReUploadResponse::default());
        }
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn upload_chunk(
        &self,
        asset_id: &str,
        chunk_id: u64,
        data: Vec<u8>,
    ) -> Result<(), ApiError> {
        let url = self.endpoints.upload_chunk_url(asset_id);
        let len = data.len();
        let chunk = Part::bytes(data)
            .file_name(CHUNK_FILE_NAME)
            .mime_str(CHUNK_CONTENT_TYPE)?;
        let form = Form::new()
            .text("chunk_id", chunk_id.to_string())
            .part("chunk", chunk);

        debug!(chunk_id, len, "sending chunk");
        self.send(self.http.post(&url).multipart(form)).await?;
        Ok(())
    }

    pub async fn complete_upload(&self, asset_id: &str) -> Result<(), ApiError> {
        let url = self.endpoints.complete_upload_url(asset_id);
        self.send(self.http.post(&url).json(&serde_json::json!({})))
            .await?;
        Ok(())
    }
}

impl PortalApi for PortalClient {
    fn re_upload<'a>(
        &'a self,
        asset_id: &'a str,
        request: &'a ReUploadRequest,
    ) -> BoxFuture<'a, Result<ReUploadResponse, ApiError>> {
        PortalClient::re_upload(self, asset_id, request).boxed()
    }

    fn upload_chunk<'a>(
        &'a self,
        asset_id: &'a str,
        chunk_id: u64,
        data: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), ApiError>> {
        PortalClient::upload_chunk(self, asset_id, chunk_id, data).boxed()
    }

    fn complete_upload<'a>(&'a self, asset_id: &'a str) -> BoxFuture<'a, Result<(), ApiError>> {
        PortalClient::complete_upload(self, asset_id).boxed()
    }
}
