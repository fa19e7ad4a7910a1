//! Shared test helpers.

#![allow(dead_code)]

use heap_pressure::HeapReporter;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::Relaxed;

/// Replays a fixed sequence of usage readings; the last one repeats once
/// the sequence runs out.
pub struct ScriptedReporter {
    max: u64,
    readings: Mutex<VecDeque<u64>>,
    last: Mutex<u64>,
    samples: AtomicUsize,
}

impl ScriptedReporter {
    pub fn new(max: u64, readings: impl IntoIterator<Item = u64>) -> Self {
        Self {
            max,
            readings: Mutex::new(readings.into_iter().collect()),
            last: Mutex::new(0),
            samples: AtomicUsize::new(0),
        }
    }

    pub fn samples_taken(&self) -> usize {
        self.samples.load(Relaxed)
    }

    pub fn remaining(&self) -> usize {
        self.readings.lock().len()
    }
}

impl HeapReporter for ScriptedReporter {
    fn max_bytes(&self) -> u64 {
        self.max
    }

    fn used_bytes(&self) -> u64 {
        self.samples.fetch_add(1, Relaxed);
        let mut last = self.last.lock();
        if let Some(next) = self.readings.lock().pop_front() {
            *last = next;
        }
        *last
    }
}
