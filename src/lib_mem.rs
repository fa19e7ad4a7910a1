#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use crate::domain::SAMPLE_INDEX;

pub fn allocate_block(size: usize) -> Vec<u8> {
    vec![0u8; size]
}

/// Length plus the sampled byte, so every block has to be touched.
pub fn block_checksum(block: &[u8]) -> u64 {
    let sampled = block.get(SAMPLE_INDEX).copied().unwrap_or(0);
    (block.len() as u64).wrapping_add(u64::from(sampled))
}

pub fn batch_checksum(batch: &[Vec<u8>]) -> u64 {
    batch
        .iter()
        .fold(0u64, |acc, block| acc.wrapping_add(block_checksum(block)))
}
