#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod domain;
pub mod driver;
pub mod graph;
pub mod heap;
pub mod lib_mem;
pub mod service;
pub mod validation;

pub use config::Opts;
pub use domain::{PauseInterrupted, PressureSettings, ThresholdEvent, ThresholdOutcome};
pub use driver::HeapPressureDriver;
pub use heap::{AllocatorReporter, HeapReporter, TrackingAlloc};
pub use service::{stop_on_signal, PressureRunner, RunOutcome};
pub use validation::validate_settings;
