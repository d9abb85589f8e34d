//! Block arithmetic for sliced uploads

use std::ops::Range;

/// Number of blocks needed for `total_size` bytes (ceiling division).
///
/// An empty payload has zero blocks. A payload that is an exact multiple of
/// the block size has no trailing empty block.
pub fn block_count(total_size: u64, block_size: u64) -> u64 {
    if block_size == 0 {
        return 0;
    }
    total_size.div_ceil(block_size)
}

/// Byte range of block `index`; the last block may be short
pub fn block_range(index: u64, block_size: u64, total_size: u64) -> Range<u64> {
    let start = index.saturating_mul(block_size).min(total_size);
    let end = start.saturating_add(block_size).min(total_size);
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_block_count_edges() {
        assert_eq!(block_count(0, MB), 0);
        assert_eq!(block_count(MB, MB), 1);
        assert_eq!(block_count(MB + 1, MB), 2);
        assert_eq!(block_count(2 * MB, MB), 2);
        assert_eq!(block_count(1, MB), 1);
    }

    #[test]
    fn test_two_and_a_half_megabytes() {
        let total = 5 * MB / 2;
        assert_eq!(block_count(total, MB), 3);
        assert_eq!(block_range(0, MB, total), 0..MB);
        assert_eq!(block_range(1, MB, total), MB..2 * MB);
        assert_eq!(block_range(2, MB, total), 2 * MB..total);
        assert_eq!(block_range(2, MB, total).end - block_range(2, MB, total).start, MB / 2);
    }

    #[test]
    fn test_range_past_end_is_empty() {
        assert!(block_range(5, MB, 2 * MB).is_empty());
    }

    proptest! {
        #[test]
        fn prop_blocks_cover_payload(total in 0u64..20_000_000, block in 1024u64..5_000_000) {
            let count = block_count(total, block);
            let mut covered = 0u64;
            for i in 0..count {
                let r = block_range(i, block, total);
                prop_assert_eq!(r.start, covered);
                prop_assert!(!r.is_empty());
                prop_assert!(r.end - r.start <= block);
                covered = r.end;
            }
            prop_assert_eq!(covered, total);
        }
    }
}
