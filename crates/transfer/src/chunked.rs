use std::path::Path;

use tokio::io::AsyncReadExt;

use crate::TransferError;
use crate::planner::ChunkPlan;
use crate::types::Chunk;

/// Reads a file in the chunks laid out by a [`ChunkPlan`].
///
/// Chunks come out in index order and only one is held in memory at a time.
/// A file that turns out shorter than planned fails with
/// [`TransferError::UnexpectedEof`] instead of producing a short chunk.
pub struct ChunkReader {
    file: tokio::fs::File,
    plan: ChunkPlan,
    next_index: u64,
}

impl ChunkReader {
    pub async fn open(path: &Path, plan: ChunkPlan) -> Result<Self, TransferError> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self {
            file,
            plan,
            next_index: 0,
        })
    }

    /// Reads the next chunk. Returns `None` once every planned chunk was read.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>, TransferError> {
        let Some(range) = self.plan.range(self.next_index) else {
            return Ok(None);
        };

        let mut data = vec![0u8; range.len as usize];
        let mut filled = 0;
        while filled < data.len() {
            let n = self.file.read(&mut data[filled..]).await?;
            if n == 0 {
                return Err(TransferError::UnexpectedEof {
                    index: range.index,
                    expected: range.len,
                    read: filled as u64,
                });
            }
            filled += n;
        }

        self.next_index += 1;
        Ok(Some(Chunk {
            index: range.index,
            offset: range.offset,
            data,
        }))
    }

    /// Index of the chunk the next call will return.
    pub fn position(&self) -> u64 {
        self.next_index
    }

    pub fn plan(&self) -> &ChunkPlan {
        &self.plan
    }
}
