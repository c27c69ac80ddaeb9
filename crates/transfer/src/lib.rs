//! Chunk planning and streaming reads for chunked uploads.
//!
//! A file of any size is split into ceil(total / chunk_size) pieces (at
//! least one), read lazily in index order and handed out one at a time.

mod chunked;
mod planner;
mod progress;
mod types;

pub use chunked::ChunkReader;
pub use planner::{ChunkPlan, ChunkRange, parse_chunk_size, plan};
pub use progress::ThroughputMeter;
pub use types::{Chunk, UploadSession};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid chunk size: {0:?}")]
    InvalidChunkSize(String),

    #[error("not a regular file: {0}")]
    NotAFile(String),

    #[error("chunk {index}: expected {expected} bytes, file ended after {read}")]
    UnexpectedEof { index: u64, expected: u64, read: u64 },
}
