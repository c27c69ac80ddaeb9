//! Portal, portal API and forum addresses derived from a single host.

use crate::constants::DEFAULT_HOST;

/// Addresses for one portal deployment.
///
/// Everything is derived from the host (`cfx.re` by default), but the API
/// base can be overridden so tests can point the client at a local server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalEndpoints {
    /// `https://portal-api.<host>` without a trailing slash.
    pub api_base: String,
    /// Domain the forum session cookie is scoped to.
    pub forum_domain: String,
    /// Host the browser must land on after the authenticated redirect.
    pub portal_host: String,
}

impl PortalEndpoints {
    /// Derives all endpoints from `host`.
    pub fn for_host(host: &str) -> Self {
        let host = host.trim().trim_end_matches('/');
        Self {
            api_base: format!("https://portal-api.{host}"),
            forum_domain: format!("forum.{host}"),
            portal_host: format!("portal.{host}"),
        }
    }

    /// Replaces the API base (tests, staging).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// SSO entry point. Its rendered body is JSON `{ "url": ... }`.
    pub fn sso_url(&self) -> String {
        format!("{}/v1/auth/discourse?return=", self.api_base)
    }

    pub fn re_upload_url(&self, asset_id: &str) -> String {
        format!("{}/v1/assets/{asset_id}/re-upload", self.api_base)
    }

    pub fn upload_chunk_url(&self, asset_id: &str) -> String {
        format!("{}/v1/assets/{asset_id}/upload-chunk", self.api_base)
    }

    pub fn complete_upload_url(&self, asset_id: &str) -> String {
        format!("{}/v1/assets/{asset_id}/complete-upload", self.api_base)
    }

    /// Returns `true` if `host` is the portal (the landing page after a
    /// successful redirect).
    pub fn is_portal_host(&self, host: &str) -> bool {
        host.contains(&self.portal_host)
    }
}

impl Default for PortalEndpoints {
    fn default() -> Self {
        Self::for_host(DEFAULT_HOST)
    }
}
