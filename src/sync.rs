//! Brings an externally-driven line into the local tick domain.

use core::cell::Cell;
use critical_section::Mutex;

/// The number of sampling stages used by default.
pub const SYNC_DEPTH: usize = 2;

/// A shift register that resamples an asynchronous input at the local tick rate.
///
/// Every value the synchronizer outputs was present on the input exactly `DEPTH` ticks earlier.
/// This is a pass-through delay, not a debouncer: short pulses are delayed, never filtered.
#[derive(Clone, Debug)]
pub struct InputSynchronizer<const DEPTH: usize = SYNC_DEPTH> {
    /// Stage 0 holds the most recent sample, stage `DEPTH - 1` the oldest.
    stages: [bool; DEPTH],
}

impl<const DEPTH: usize> InputSynchronizer<DEPTH> {
    const NON_EMPTY: () = assert!(DEPTH > 0, "a synchronizer needs at least one stage");

    /// Creates a new instance with all stages cleared.
    pub const fn new() -> InputSynchronizer<DEPTH> {
        let () = Self::NON_EMPTY;
        InputSynchronizer {
            stages: [false; DEPTH],
        }
    }

    /// The number of ticks between a value entering and leaving the synchronizer.
    pub const fn latency(&self) -> usize {
        DEPTH
    }

    /// Samples `raw` and returns the value sampled `DEPTH` ticks ago.
    pub fn tick(&mut self, raw: bool) -> bool {
        let synchronized = self.stages[DEPTH - 1];
        self.stages.rotate_right(1);
        self.stages[0] = raw;
        synchronized
    }

    /// Returns the value that the next call to [InputSynchronizer::tick] will output.
    pub fn peek(&self) -> bool {
        self.stages[DEPTH - 1]
    }

    pub fn reset(&mut self) {
        self.stages = [false; DEPTH];
    }
}

impl<const DEPTH: usize> Default for InputSynchronizer<DEPTH> {
    fn default() -> Self {
        Self::new()
    }
}

/// A line level that is written from one context (e.g. an interrupt routine watching the
/// receiver's squelch output) and sampled once per tick from another.
///
/// To use this you generally will define a static instance of this type, which is [Sync].
pub struct AsyncLine {
    level: Mutex<Cell<bool>>,
}

impl AsyncLine {
    /// Creates a new instance, initially low.
    pub const fn new() -> AsyncLine {
        AsyncLine {
            level: Mutex::new(Cell::new(false)),
        }
    }

    /// Creates a new instance with the given initial level.
    pub const fn with_level(level: bool) -> AsyncLine {
        AsyncLine {
            level: Mutex::new(Cell::new(level)),
        }
    }

    /// Drives the line to `level`. May be called from any context.
    pub fn set(&self, level: bool) {
        critical_section::with(|cs| self.level.borrow(cs).set(level));
    }

    /// Reads the current line level.
    pub fn sample(&self) -> bool {
        critical_section::with(|cs| self.level.borrow(cs).get())
    }
}

impl Default for AsyncLine {
    fn default() -> Self {
        Self::new()
    }
}
