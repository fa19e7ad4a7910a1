#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use heap_pressure::domain::{DEFAULT_BLOCKS_PER_BATCH, DEFAULT_BLOCK_SIZE, SAMPLE_INDEX};
use heap_pressure::lib_mem::{allocate_block, batch_checksum, block_checksum};

#[test]
fn full_batch_checksum_counts_every_block() {
    let mut batch = Vec::new();
    let mut sampled = 0u64;
    for i in 0..DEFAULT_BLOCKS_PER_BATCH {
        let mut block = allocate_block(DEFAULT_BLOCK_SIZE);
        let b = u8::try_from(i % 7).unwrap();
        block[SAMPLE_INDEX] = b;
        sampled += u64::from(b);
        batch.push(block);
    }
    assert_eq!(batch_checksum(&batch), 200 * 8_000_000 + sampled);
}

#[test]
fn short_block_has_no_sample() {
    let block = vec![9u8; 10];
    assert_eq!(block_checksum(&block), 10);
}

#[test]
fn fresh_block_is_zeroed() {
    let block = allocate_block(2048);
    assert_eq!(block.len(), 2048);
    assert_eq!(block_checksum(&block), 2048);
}

#[test]
fn empty_batch() {
    assert_eq!(batch_checksum(&[]), 0);
}
