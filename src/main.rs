#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use anyhow::Context;
use clap::Parser;
use heap_pressure::{stop_on_signal, AllocatorReporter, Opts, PressureRunner, RunOutcome, TrackingAlloc};
use tracing::info;

#[global_allocator]
static ALLOC: TrackingAlloc = TrackingAlloc::new();

fn init_tracing() {
    let fmt = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    fmt.json().init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let opts = Opts::parse();
    let max = opts.max_heap_bytes();
    let settings = opts.settings();
    if opts.enforce_max_heap {
        let budget = usize::try_from(max).context("max heap does not fit in usize")?;
        ALLOC.set_budget(Some(budget));
    }
    info!(
        max_heap = max,
        enforce = opts.enforce_max_heap,
        settings = %serde_json::to_string(&settings)?,
        "starting heap pressure driver"
    );

    let runner = PressureRunner::new(AllocatorReporter::new(&ALLOC, max), settings);
    stop_on_signal(runner.cancel_token());
    match runner.run_to_completion(std::io::stdout()).await? {
        RunOutcome::Completed { totals, .. } => {
            info!(iterations = totals.iterations, "done");
        }
        RunOutcome::Interrupted(e) => {
            eprintln!("heap-pressure: {e}");
        }
    }
    Ok(())
}
