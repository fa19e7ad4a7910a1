#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use anyhow::Result as AnyResult;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::domain::{LoopTotals, PauseInterrupted, PressureSettings};
use crate::driver::HeapPressureDriver;
use crate::heap::HeapReporter;

pub struct PressureRunner<R> {
    reporter: R,
    settings: PressureSettings,
    cancel: CancellationToken,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed { totals: LoopTotals, root_sum: u64 },
    Interrupted(PauseInterrupted),
}

impl<R: HeapReporter> PressureRunner<R> {
    pub fn new(reporter: R, settings: PressureSettings) -> Self {
        Self {
            reporter,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Runs all three phases. An interrupted pause ends the run without the
    /// final report; any other failure is returned.
    pub async fn run_to_completion<W: Write>(self, out: W) -> AnyResult<RunOutcome> {
        let mut driver = HeapPressureDriver::initialize(self.reporter, out, self.settings)?;
        match driver.run_burst_loop(&self.cancel).await {
            Ok(totals) => {
                let root_sum = driver.finalize_and_report(totals.side_sum)?;
                info!(
                    iterations = totals.iterations,
                    crossings = totals.crossings,
                    root_sum,
                    "run finished"
                );
                Ok(RunOutcome::Completed { totals, root_sum })
            }
            Err(e) => match e.downcast::<PauseInterrupted>() {
                Ok(interrupted) => {
                    error!(error = %interrupted, "pause interrupted");
                    Ok(RunOutcome::Interrupted(interrupted))
                }
                Err(other) => Err(other),
            },
        }
    }
}

/// Cancels `cancel` on Ctrl-C, or SIGTERM on unix.
pub fn stop_on_signal(cancel: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("termination signal received");
        cancel.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            error!(error = %e, "install SIGTERM handler failed");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
