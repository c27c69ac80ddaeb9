use std::path::{Path, PathBuf};

use reupload_protocol::ReUploadRequest;

use crate::TransferError;
use crate::planner::ChunkPlan;

/// A slice of the upload file as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: u64,
    pub offset: u64,
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Everything needed to upload one file as one asset.
///
/// Built once per run by [`UploadSession::prepare`], which stats the file
/// and fixes the chunk layout; the session is read-only afterwards.
#[derive(Debug, Clone)]
pub struct UploadSession {
    asset_id: String,
    zip_path: PathBuf,
    original_file_name: String,
    plan: ChunkPlan,
    cookie_header: String,
}

impl UploadSession {
    /// Stats `zip_path` and plans its chunks.
    ///
    /// Fails when the path does not exist, is not a regular file, or has no
    /// file name component.
    pub async fn prepare(
        asset_id: impl Into<String>,
        zip_path: impl Into<PathBuf>,
        chunk_size: u64,
        cookie_header: impl Into<String>,
    ) -> Result<Self, TransferError> {
        let zip_path = zip_path.into();
        let metadata = tokio::fs::metadata(&zip_path).await?;
        if !metadata.is_file() {
            return Err(TransferError::NotAFile(zip_path.display().to_string()));
        }
        let original_file_name = zip_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| TransferError::NotAFile(zip_path.display().to_string()))?;
        let plan = ChunkPlan::new(metadata.len(), chunk_size)?;

        Ok(Self {
            asset_id: asset_id.into(),
            zip_path,
            original_file_name,
            plan,
            cookie_header: cookie_header.into(),
        })
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn zip_path(&self) -> &Path {
        &self.zip_path
    }

    /// Base name of the file, sent as both `name` and `original_file_name`.
    pub fn original_file_name(&self) -> &str {
        &self.original_file_name
    }

    pub fn plan(&self) -> &ChunkPlan {
        &self.plan
    }

    pub fn cookie_header(&self) -> &str {
        &self.cookie_header
    }

    /// Body of the initiation request for this session.
    pub fn re_upload_request(&self) -> ReUploadRequest {
        ReUploadRequest {
            chunk_count: self.plan.chunk_count(),
            chunk_size: self.plan.chunk_size(),
            name: self.original_file_name.clone(),
            original_file_name: self.original_file_name.clone(),
            total_size: self.plan.total_size(),
        }
    }
}
