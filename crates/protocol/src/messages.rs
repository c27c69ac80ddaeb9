use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// SSO
// ---------------------------------------------------------------------------

/// Body rendered by the SSO endpoint once the provider redirect chain settles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsoResponse {
    /// Forum-side redirect target carrying the SSO payload.
    pub url: String,
}

// ---------------------------------------------------------------------------
// Upload payloads
// ---------------------------------------------------------------------------

/// Starts a chunked re-upload of an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReUploadRequest {
    pub chunk_count: u64,
    pub chunk_size: u64,
    pub name: String,
    pub original_file_name: String,
    pub total_size: u64,
}

/// Reply to [`ReUploadRequest`].
///
/// The portal accepts the upload only when `errors` is present and `null`.
/// `None` here means the key was missing from the body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReUploadResponse {
    #[serde(default)]
    pub asset_id: serde_json::Value,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub errors: Option<serde_json::Value>,
}

/// Keeps an explicit `null` as `Some(Value::Null)`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl ReUploadResponse {
    /// Whether the portal accepted the upload.
    pub fn is_accepted(&self) -> bool {
        matches!(self.errors, Some(serde_json::Value::Null))
    }

    /// Returns the server-reported errors, if a non-null value was sent.
    pub fn errors(&self) -> Option<&serde_json::Value> {
        self.errors.as_ref().filter(|e| !e.is_null())
    }
}
