#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use chrono::{DateTime, Local};
use serde::Serialize;

/// Rough footprint of one chained mapping node, used to size the root structure.
pub const DEFAULT_BYTES_PER_MAP: u64 = 300;
pub const DEFAULT_LIMIT_PERMILLE: u32 = 950;
pub const DEFAULT_BLOCK_SIZE: usize = 8_000_000;
pub const DEFAULT_BLOCKS_PER_BATCH: usize = 200;
pub const DEFAULT_PAUSE_MS: u64 = 5000;

/// Byte read from every block when computing a batch checksum.
pub const SAMPLE_INDEX: usize = 1000;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PressureSettings {
    pub bytes_per_map: u64,
    pub limit_permille: u32,
    pub block_size: usize,
    pub blocks_per_batch: usize,
    pub pause_ms: u64,
    /// `None` runs until cancelled.
    pub max_iterations: Option<u64>,
}

impl Default for PressureSettings {
    fn default() -> Self {
        Self {
            bytes_per_map: DEFAULT_BYTES_PER_MAP,
            limit_permille: DEFAULT_LIMIT_PERMILLE,
            block_size: DEFAULT_BLOCK_SIZE,
            blocks_per_batch: DEFAULT_BLOCKS_PER_BATCH,
            pause_ms: DEFAULT_PAUSE_MS,
            max_iterations: None,
        }
    }
}

/// Number of chained mapping nodes whose estimated footprint is a tenth of `max`.
pub fn map_count(max: u64, bytes_per_map: u64) -> usize {
    if bytes_per_map == 0 {
        return 0;
    }
    usize::try_from(max / 10 / bytes_per_map).unwrap_or(usize::MAX)
}

/// High-water mark: `floor(max * permille / 1000)`.
pub fn heap_limit(max: u64, permille: u32) -> u64 {
    let scaled = u128::from(max) * u128::from(permille) / 1000;
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// `used / max` scaled by 10000.
pub fn occupancy_ratio(used: u64, max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    u64::try_from(u128::from(used) * 10_000 / u128::from(max)).unwrap_or(u64::MAX)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThresholdOutcome {
    /// Usage stayed above the limit through the pause.
    Sustained,
    /// Usage dropped back under the limit during the pause.
    Recovered,
}

impl std::fmt::Display for ThresholdOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThresholdOutcome::Sustained => f.write_str("SUSTAINED"),
            ThresholdOutcome::Recovered => f.write_str("RECOVERED"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ThresholdEvent {
    pub at: DateTime<Local>,
    pub before: u64,
    pub after: u64,
    pub limit: u64,
    pub max: u64,
}

impl ThresholdEvent {
    /// Decided by the post-pause reading alone.
    pub fn outcome(&self) -> ThresholdOutcome {
        if self.after > self.limit {
            ThresholdOutcome::Sustained
        } else {
            ThresholdOutcome::Recovered
        }
    }

    pub fn report_line(&self) -> String {
        let ts = self.at.format(TIMESTAMP_FORMAT);
        match self.outcome() {
            ThresholdOutcome::Sustained => format!(
                "{ts} After wait exceeded limit: {}/{} ({})",
                self.before,
                self.limit,
                occupancy_ratio(self.before, self.max)
            ),
            ThresholdOutcome::Recovered => format!(
                "{ts} Before wait only exceeded limit: {}/{}",
                self.before, self.limit
            ),
        }
    }
}

/// Result of appending one block to the batch.
#[derive(Clone, Debug)]
pub enum StepOutcome {
    BelowLimit { usage: u64 },
    Crossed {
        event: ThresholdEvent,
        side_sum: u64,
        /// Node count of the discarded side structure, seed included.
        side_nodes: usize,
    },
}

impl StepOutcome {
    /// Amount this step folds into the run's accumulator.
    pub fn contribution(&self) -> u64 {
        match self {
            StepOutcome::BelowLimit { .. } => 0,
            StepOutcome::Crossed { side_sum, .. } => *side_sum,
        }
    }

    pub fn crossed(&self) -> bool {
        matches!(self, StepOutcome::Crossed { .. })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IterationSummary {
    pub checksum: u64,
    pub usage: u64,
    pub crossings: usize,
    pub contribution: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopTotals {
    pub iterations: u64,
    pub crossings: u64,
    pub side_sum: u64,
}

/// The hold-and-observe pause was cut short by a stop request.
#[derive(Debug, Clone)]
pub struct PauseInterrupted {
    pub at: DateTime<Local>,
    pub usage: u64,
}

impl std::fmt::Display for PauseInterrupted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pause started at {} interrupted with {} bytes in use",
            self.at.format(TIMESTAMP_FORMAT),
            self.usage
        )
    }
}

impl std::error::Error for PauseInterrupted {}
