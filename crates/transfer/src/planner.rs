use crate::TransferError;

/// Parses the chunk size input: a decimal integer greater than zero.
pub fn parse_chunk_size(input: &str) -> Result<u64, TransferError> {
    match input.trim().parse::<u64>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(TransferError::InvalidChunkSize(input.to_string())),
    }
}

/// Number of chunks needed for `total_size` bytes: `ceil(total / chunk)`,
/// never less than one.
pub fn plan(total_size: u64, chunk_size: u64) -> Result<u64, TransferError> {
    Ok(ChunkPlan::new(total_size, chunk_size)?.chunk_count())
}

/// Byte range of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub index: u64,
    pub offset: u64,
    pub len: u64,
}

/// How a file of `total_size` bytes splits into `chunk_size` pieces.
///
/// Every chunk is exactly `chunk_size` long except the last, which holds
/// the remainder. An empty file is a single zero-length chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    total_size: u64,
    chunk_size: u64,
    chunk_count: u64,
}

impl ChunkPlan {
    pub fn new(total_size: u64, chunk_size: u64) -> Result<Self, TransferError> {
        if chunk_size == 0 {
            return Err(TransferError::InvalidChunkSize(chunk_size.to_string()));
        }
        Ok(Self {
            total_size,
            chunk_size,
            chunk_count: total_size.div_ceil(chunk_size).max(1),
        })
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    /// Range of chunk `index`, or `None` past the end.
    pub fn range(&self, index: u64) -> Option<ChunkRange> {
        if index >= self.chunk_count {
            return None;
        }
        let offset = index * self.chunk_size;
        let len = self.chunk_size.min(self.total_size - offset);
        Some(ChunkRange { index, offset, len })
    }

    /// All ranges in ascending index order.
    pub fn ranges(&self) -> impl Iterator<Item = ChunkRange> + '_ {
        (0..self.chunk_count).filter_map(|i| self.range(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_positive_integers() {
        assert_eq!(parse_chunk_size("1024").unwrap(), 1024);
        assert_eq!(parse_chunk_size(" 5242880\n").unwrap(), 5_242_880);
    }

    #[test]
    fn parse_rejects_non_numbers() {
        for input in ["invalid", "", "  ", "1.5", "10MB", "0x10", "1e6"] {
            assert!(
                matches!(parse_chunk_size(input), Err(TransferError::InvalidChunkSize(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn parse_rejects_zero_and_negative() {
        assert!(parse_chunk_size("0").is_err());
        assert!(parse_chunk_size("-1024").is_err());
    }

    #[test]
    fn zero_chunk_size_is_invalid() {
        assert!(ChunkPlan::new(100, 0).is_err());
        assert!(plan(100, 0).is_err());
    }

    #[test]
    fn count_is_ceiling_division() {
        assert_eq!(plan(2500, 1024).unwrap(), 3);
        assert_eq!(plan(2048, 1024).unwrap(), 2);
        assert_eq!(plan(2049, 1024).unwrap(), 3);
        assert_eq!(plan(1, 1024).unwrap(), 1);
        assert_eq!(plan(1024, 1).unwrap(), 1024);
    }

    #[test]
    fn empty_file_is_one_chunk() {
        let p = ChunkPlan::new(0, 1024).unwrap();
        assert_eq!(p.chunk_count(), 1);
        let ranges: Vec<_> = p.ranges().collect();
        assert_eq!(ranges, vec![ChunkRange { index: 0, offset: 0, len: 0 }]);
    }

    #[test]
    fn ranges_cover_file_exactly() {
        let p = ChunkPlan::new(2500, 1024).unwrap();
        let ranges: Vec<_> = p.ranges().collect();
        let lens: Vec<_> = ranges.iter().map(|r| r.len).collect();
        let offsets: Vec<_> = ranges.iter().map(|r| r.offset).collect();
        let indices: Vec<_> = ranges.iter().map(|r| r.index).collect();
        assert_eq!(lens, [1024, 1024, 452]);
        assert_eq!(offsets, [0, 1024, 2048]);
        assert_eq!(indices, [0, 1, 2]);
    }

    #[test]
    fn exact_multiple_has_full_last_chunk() {
        let p = ChunkPlan::new(4096, 1024).unwrap();
        assert_eq!(p.chunk_count(), 4);
        assert_eq!(p.range(3).unwrap().len, 1024);
        assert!(p.range(4).is_none());
    }

    #[test]
    fn plan_invariant_holds_across_sizes() {
        for total in [0u64, 1, 7, 1023, 1024, 1025, 99_999] {
            for chunk in [1u64, 3, 512, 1024, 100_000] {
                let p = ChunkPlan::new(total, chunk).unwrap();
                assert!(p.chunk_count() >= 1);
                assert!(p.chunk_count() * chunk >= total);
                let sum: u64 = p.ranges().map(|r| r.len).sum();
                assert_eq!(sum, total, "total={total} chunk={chunk}");
                if total > 0 {
                    assert!(p.ranges().all(|r| r.len > 0));
                }
            }
        }
    }
}
