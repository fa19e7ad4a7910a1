#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use clap::Parser;
use sysinfo::System;

use crate::domain::{
    PressureSettings, DEFAULT_BLOCKS_PER_BATCH, DEFAULT_BLOCK_SIZE, DEFAULT_BYTES_PER_MAP,
    DEFAULT_LIMIT_PERMILLE, DEFAULT_PAUSE_MS,
};

/// Fills the heap with a retained object graph plus bursts of large blocks,
/// then reports whether usage stays above the high-water mark after a pause.
///
/// Report lines go to stdout; structured logs go to stderr and are filtered
/// with `RUST_LOG`.
#[derive(Debug, Parser, Clone)]
#[command(name = "heap-pressure", version)]
pub struct Opts {
    /// Maximum heap size, e.g. `8g` or `512m`. Defaults to one batch of
    /// blocks, capped at a quarter of physical memory.
    #[arg(long, value_name = "SIZE", value_parser = parse_size, env = "HEAP_PRESSURE_MAX_HEAP")]
    pub max_heap: Option<u64>,

    /// Refuse allocations past the maximum heap size instead of only
    /// measuring against it.
    #[arg(long, env = "HEAP_PRESSURE_ENFORCE_MAX_HEAP")]
    pub enforce_max_heap: bool,

    /// Estimated footprint of one root mapping node.
    #[arg(long, default_value_t = DEFAULT_BYTES_PER_MAP, env = "HEAP_PRESSURE_BYTES_PER_MAP")]
    pub bytes_per_map: u64,

    /// High-water mark in thousandths of the maximum heap.
    #[arg(long, default_value_t = DEFAULT_LIMIT_PERMILLE, env = "HEAP_PRESSURE_LIMIT_PERMILLE")]
    pub limit_permille: u32,

    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_BLOCK_SIZE, env = "HEAP_PRESSURE_BLOCK_SIZE")]
    pub block_size: usize,

    #[arg(long, default_value_t = DEFAULT_BLOCKS_PER_BATCH, env = "HEAP_PRESSURE_BLOCKS_PER_BATCH")]
    pub blocks_per_batch: usize,

    /// How long to hold once the limit is crossed.
    #[arg(long, value_name = "MILLIS", default_value_t = DEFAULT_PAUSE_MS, env = "HEAP_PRESSURE_PAUSE_MS")]
    pub pause_ms: u64,

    /// Stop after this many batches. Runs until interrupted when absent.
    #[arg(long, env = "HEAP_PRESSURE_MAX_ITERATIONS")]
    pub max_iterations: Option<u64>,
}

impl Opts {
    pub fn settings(&self) -> PressureSettings {
        PressureSettings {
            bytes_per_map: self.bytes_per_map,
            limit_permille: self.limit_permille,
            block_size: self.block_size,
            blocks_per_batch: self.blocks_per_batch,
            pause_ms: self.pause_ms,
            max_iterations: self.max_iterations,
        }
    }

    pub fn max_heap_bytes(&self) -> u64 {
        self.max_heap
            .unwrap_or_else(|| default_max_heap(physical_memory(), &self.settings()))
    }
}

pub fn physical_memory() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.total_memory()
}

/// One full batch of blocks, capped at a quarter of `physical`.
///
/// Batches are freed as soon as they end, so usage peaks at the root graph
/// plus one batch; a larger heap would never see the limit crossed.
pub fn default_max_heap(physical: u64, settings: &PressureSettings) -> u64 {
    let batch = (settings.block_size as u64).saturating_mul(settings.blocks_per_batch as u64);
    batch.min(physical / 4)
}

/// Parses a byte count with an optional binary `k`, `m`, `g` or `t` suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let (digits, shift) = match s.chars().last().map(|c| c.to_ascii_lowercase()) {
        Some('k') => (&s[..s.len() - 1], 10),
        Some('m') => (&s[..s.len() - 1], 20),
        Some('g') => (&s[..s.len() - 1], 30),
        Some('t') => (&s[..s.len() - 1], 40),
        _ => (s, 0),
    };
    let value: u64 = digits
        .parse()
        .map_err(|e| format!("invalid size {s:?}: {e}"))?;
    value
        .checked_mul(1u64 << shift)
        .ok_or_else(|| format!("size {s:?} overflows"))
}
