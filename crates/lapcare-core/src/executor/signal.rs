/// Cooperative cancellation: a shared one-way stop flag plus a pacing helper
/// that long-running scanner loops call once per enumerated item.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Number of items between voluntary yields inside a scanner loop.
pub const YIELD_EVERY: u64 = 100;

/// Pause taken at each voluntary yield.
const YIELD_PAUSE: Duration = Duration::from_millis(1);

/// Stop flag shared between the executor and one worker.
///
/// Only the owner side (executor or caller) ever sets it; scanners only read.
/// Once set it stays set.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    flag: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the worker to stop as soon as possible.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// A pacing helper for one scanner loop.
    pub fn checkpoint(&self) -> Checkpoint<'_> {
        Checkpoint {
            signal: self,
            items: 0,
        }
    }
}

/// Per-loop cancellation poll.
///
/// `tick()` reads the flag on every item and sleeps briefly every
/// [`YIELD_EVERY`] items so a tight enumeration loop cannot starve other
/// workers sharing the machine.
pub struct Checkpoint<'a> {
    signal: &'a CancelSignal,
    items: u64,
}

impl Checkpoint<'_> {
    /// Account for one item. Returns `true` when the scan must stop.
    pub fn tick(&mut self) -> bool {
        self.items += 1;
        if self.items.is_multiple_of(YIELD_EVERY) {
            thread::sleep(YIELD_PAUSE);
        }
        self.signal.is_cancelled()
    }

    /// Number of items seen so far.
    pub fn items(&self) -> u64 {
        self.items
    }
}
