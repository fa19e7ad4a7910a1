#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

//! The allocation loop.
//!
//! [`HeapPressureDriver::initialize`] builds and retains the root graph,
//! [`HeapPressureDriver::run_burst_loop`] fills batches of large blocks and
//! holds whenever usage crosses the limit, and
//! [`HeapPressureDriver::finalize_and_report`] prints a value derived from
//! the root graph so it stays in use until the very end.

use anyhow::{Context, Result as AnyResult};
use chrono::Local;
use std::io::Write;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{
    heap_limit, map_count, IterationSummary, LoopTotals, PauseInterrupted, PressureSettings,
    StepOutcome, ThresholdEvent,
};
use crate::graph::{MapGraph, NodeId};
use crate::heap::HeapReporter;
use crate::lib_mem::{allocate_block, batch_checksum};
use crate::validation::{validate_max_heap, validate_settings};

pub struct HeapPressureDriver<R, W> {
    reporter: R,
    out: W,
    settings: PressureSettings,
    max: u64,
    limit: u64,
    map_count: usize,
    root: MapGraph,
    root_head: NodeId,
}

impl<R: HeapReporter, W: Write> HeapPressureDriver<R, W> {
    pub fn initialize(reporter: R, mut out: W, settings: PressureSettings) -> AnyResult<Self> {
        validate_settings(&settings)?;
        let max = reporter.max_bytes();
        validate_max_heap(max)?;
        let begin = reporter.used_bytes();
        let map_count = map_count(max, settings.bytes_per_map);
        info!(max, map_count, "building root structure");

        let mut root = MapGraph::with_capacity(map_count.saturating_add(1));
        let seed = root.empty_map();
        let root_head = root.build_chained(seed, map_count);

        let after_root = reporter.used_bytes();
        let delta = after_root.saturating_sub(begin);
        let percent = u128::from(delta) * 100 / u128::from(max);
        writeln!(out, "Root takes up around: {delta}: {percent}%").context("write root report")?;

        let limit = heap_limit(max, settings.limit_permille);
        info!(limit, root_nodes = root.len(), root_bytes = delta, "root structure retained");
        Ok(Self {
            reporter,
            out,
            settings,
            max,
            limit,
            map_count,
            root,
            root_head,
        })
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn map_count(&self) -> usize {
        self.map_count
    }

    pub fn root(&self) -> (&MapGraph, NodeId) {
        (&self.root, self.root_head)
    }

    pub fn sample_current_usage(&self) -> u64 {
        self.reporter.used_bytes()
    }

    /// Appends one block and, if usage is over the limit, holds and re-samples.
    pub async fn burst_step(
        &mut self,
        batch: &mut Vec<Vec<u8>>,
        cancel: &CancellationToken,
    ) -> AnyResult<StepOutcome> {
        batch.push(allocate_block(self.settings.block_size));
        let usage = self.sample_current_usage();
        debug!(blocks = batch.len(), usage, "block allocated");
        if usage <= self.limit {
            return Ok(StepOutcome::BelowLimit { usage });
        }

        let at = Local::now();
        self.hold(cancel, PauseInterrupted { at, usage }).await?;
        let after = self.sample_current_usage();
        let event = ThresholdEvent {
            at,
            before: usage,
            after,
            limit: self.limit,
            max: self.max,
        };
        warn!(before = usage, after, limit = self.limit, outcome = %event.outcome(), "heap limit exceeded");
        writeln!(self.out, "{}", event.report_line()).context("write threshold report")?;

        let (side_sum, side_nodes) = self.side_allocation();
        Ok(StepOutcome::Crossed {
            event,
            side_sum,
            side_nodes,
        })
    }

    /// Fills one batch, reports its checksum and drops it.
    pub async fn run_iteration(&mut self, cancel: &CancellationToken) -> AnyResult<IterationSummary> {
        let mut batch = Vec::with_capacity(self.settings.blocks_per_batch);
        let mut summary = IterationSummary::default();
        for _ in 0..self.settings.blocks_per_batch {
            let step = self.burst_step(&mut batch, cancel).await?;
            if step.crossed() {
                summary.crossings += 1;
            }
            summary.contribution = summary.contribution.wrapping_add(step.contribution());
        }
        summary.checksum = batch_checksum(&batch);
        summary.usage = self.sample_current_usage();
        writeln!(self.out, "sum: {}, mem: {}/{}", summary.checksum, summary.usage, self.limit)
            .context("write batch summary")?;
        Ok(summary)
    }

    /// Runs batches until `cancel` fires or the configured iteration bound is hit.
    pub async fn run_burst_loop(&mut self, cancel: &CancellationToken) -> AnyResult<LoopTotals> {
        let mut totals = LoopTotals::default();
        loop {
            // lets the signal listener run on a single-threaded runtime
            tokio::task::yield_now().await;
            if cancel.is_cancelled() {
                info!(iterations = totals.iterations, "stop requested");
                break;
            }
            if self
                .settings
                .max_iterations
                .is_some_and(|bound| totals.iterations >= bound)
            {
                info!(iterations = totals.iterations, "iteration bound reached");
                break;
            }
            let summary = self.run_iteration(cancel).await?;
            totals.iterations += 1;
            totals.crossings += summary.crossings as u64;
            totals.side_sum = totals.side_sum.wrapping_add(summary.contribution);
            info!(
                iteration = totals.iterations,
                checksum = summary.checksum,
                usage = summary.usage,
                crossings = summary.crossings,
                "burst iteration finished"
            );
        }
        Ok(totals)
    }

    /// Prints the root graph's sum next to the accumulated side sums.
    pub fn finalize_and_report(mut self, side_sum: u64) -> AnyResult<u64> {
        let root_sum = self.root.sum(self.root_head);
        writeln!(self.out, "root sum: {root_sum} {side_sum}").context("write final report")?;
        self.out.flush().context("flush report output")?;
        Ok(root_sum)
    }

    async fn hold(&self, cancel: &CancellationToken, pending: PauseInterrupted) -> Result<(), PauseInterrupted> {
        tokio::select! {
            () = cancel.cancelled() => Err(pending),
            () = sleep(Duration::from_millis(self.settings.pause_ms)) => Ok(()),
        }
    }

    /// A fresh chain shaped like the root one.
    pub fn side_structure(&self) -> (MapGraph, NodeId) {
        let mut side = MapGraph::with_capacity(self.map_count.saturating_add(1));
        let seed = side.empty_map();
        let head = side.build_chained(seed, self.map_count);
        (side, head)
    }

    /// Builds a side structure, folds its sum and drops it.
    fn side_allocation(&self) -> (u64, usize) {
        let (side, head) = self.side_structure();
        let sum = side.sum(head);
        debug!(nodes = side.len(), sum, "side structure discarded");
        (sum, side.len())
    }
}
