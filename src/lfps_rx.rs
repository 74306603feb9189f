//! Implements LFPS reception: recognizing the Polling LFPS burst/repeat cadence on an incoming
//! line.
//!
//! The line is observed through the receiver's "idle" indication, which is asserted whenever the
//! link partner is *not* bursting. A valid cadence is one where the time from one burst start to the
//! next equals the typical repeat duration, with the burst itself lasting the typical burst
//! duration.
//!
//! Note that only the typical durations are matched. The min/max windows from the timing table are
//! not used for detection, so a link partner whose timing is off by even a single tick will not be
//! recognized. See [crate::ticks::TickWindow] for the tick-converted windows.

use crate::error::Result;
use crate::sync::{InputSynchronizer, SYNC_DEPTH};
use crate::ticks::CadenceTicks;
use crate::timing::{LfpsDefinition, USB3_TIMING_TABLE};
use log::{debug, trace};

/// A configuration struct for use with the [LfpsReceiver] and [BurstCadenceDetector]
/// constructors.
#[derive(Copy, Clone, Debug)]
pub struct ReceiverConfig<'a> {
    /// The rate at which the receiver will be ticked.
    pub tick_rate_hz: f64,
    /// The (periodic) LFPS signal to detect.
    pub lfps: &'a LfpsDefinition,
}

impl ReceiverConfig<'static> {
    /// A configuration detecting the USB3 Polling LFPS.
    pub const fn polling(tick_rate_hz: f64) -> ReceiverConfig<'static> {
        ReceiverConfig {
            tick_rate_hz,
            lfps: &USB3_TIMING_TABLE.polling,
        }
    }
}

/// The two phases of a cadence.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DetectorPhase {
    /// Waiting for, or inside of, a burst.
    Burst,
    /// Counting down the silent remainder of the repeat window.
    Repeat,
}

/// A snapshot of a [BurstCadenceDetector]'s registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DetectorState {
    pub phase: DetectorPhase,
    pub counter: u32,
    /// Set when a correctly-timed cycle just completed, and cleared once the next burst starts.
    pub pending_found: bool,
}

impl DetectorState {
    const INITIAL: DetectorState = DetectorState {
        phase: DetectorPhase::Burst,
        counter: 0,
        pending_found: false,
    };
}

/// Various reception-related stats. The counters wrap around on overflow.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxStats {
    /// The number of cadences that were recognized (i.e. the number of `polling` pulses emitted).
    pub cadences_detected: u32,
    /// The number of repeat windows that were cut short by a burst starting early. The first burst
    /// seen after a reset usually counts towards this, since the detector isn't aligned to the
    /// link partner's bursts yet.
    pub cadences_aborted: u32,
}

/// A two-phase counting state machine that recognizes a burst/repeat cadence on an already
/// synchronized idle line.
///
/// Use [LfpsReceiver] to observe a line driven from outside the local tick domain.
#[derive(Clone, Debug)]
pub struct BurstCadenceDetector {
    cadence: CadenceTicks,
    state: DetectorState,
    stats: RxStats,
}

impl BurstCadenceDetector {
    /// Creates a new instance from the typical timings of `config.lfps`.
    pub fn new(config: ReceiverConfig) -> Result<BurstCadenceDetector> {
        let cadence = CadenceTicks::from_definition(config.tick_rate_hz, config.lfps)?;
        Ok(Self::from_cadence(cadence))
    }

    /// Creates a new instance counting the given number of ticks.
    pub fn from_cadence(cadence: CadenceTicks) -> BurstCadenceDetector {
        debug!(
            "LFPS detector: burst {} ticks, repeat {} ticks",
            cadence.burst, cadence.repeat
        );
        BurstCadenceDetector {
            cadence,
            state: DetectorState::INITIAL,
            stats: RxStats::default(),
        }
    }

    /// Advances the state machine by one tick, given the (synchronized) idle level for that tick.
    ///
    /// Returns `true` for exactly one tick when a correctly-timed cycle has completed and the next
    /// burst has started. The pulse isn't latched: callers must sample it every tick.
    pub fn tick(&mut self, idle: bool) -> bool {
        let cadence = self.cadence;
        let state = &mut self.state;
        let mut found = false;
        match state.phase {
            DetectorPhase::Burst => {
                if state.counter == 0 {
                    if idle {
                        // The burst ended, so start counting the rest of the repeat window.
                        state.counter = cadence.repeat - cadence.burst - 1;
                        state.phase = DetectorPhase::Repeat;
                    } else {
                        state.counter = cadence.burst - 1;
                    }
                } else {
                    state.counter -= 1;
                }
                // Report a previously completed cycle once the next burst begins, so that the
                // pulse lines up with a burst edge.
                if state.pending_found && !idle {
                    found = true;
                    state.pending_found = false;
                }
            }
            DetectorPhase::Repeat => {
                let remaining = state.counter;
                let window_elapsed = remaining == 0;
                if window_elapsed || !idle {
                    // Only a repeat window that ran to completion counts. A burst that starts early
                    // disarms the detector until another full cycle has been observed.
                    state.pending_found = window_elapsed;
                    state.counter = cadence.burst - 1;
                    state.phase = DetectorPhase::Burst;
                    if window_elapsed {
                        trace!("LFPS repeat window elapsed, cadence armed");
                    } else {
                        trace!("LFPS burst started {remaining} ticks early, cadence disarmed");
                        self.stats.cadences_aborted = self.stats.cadences_aborted.wrapping_add(1);
                    }
                } else {
                    state.counter -= 1;
                }
            }
        }
        if found {
            trace!("LFPS cadence detected");
            self.stats.cadences_detected = self.stats.cadences_detected.wrapping_add(1);
        }
        found
    }

    /// Returns a snapshot of the state machine's registers.
    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn cadence(&self) -> CadenceTicks {
        self.cadence
    }

    /// Returns stats about this instance's activity so far.
    pub fn stats(&self) -> RxStats {
        self.stats
    }

    /// Returns the state machine to its initial state. Stats are kept.
    pub fn reset(&mut self) {
        self.state = DetectorState::INITIAL;
    }
}

/// The receive side of an LFPS link endpoint: resynchronizes the raw idle line into the local tick
/// domain and feeds it to a [BurstCadenceDetector].
#[derive(Clone, Debug)]
pub struct LfpsReceiver<const DEPTH: usize = SYNC_DEPTH> {
    synchronizer: InputSynchronizer<DEPTH>,
    detector: BurstCadenceDetector,
}

impl<const DEPTH: usize> LfpsReceiver<DEPTH> {
    /// Creates a new instance. No instance is created if `config` is unusable.
    pub fn new(config: ReceiverConfig) -> Result<LfpsReceiver<DEPTH>> {
        Ok(Self::from_detector(BurstCadenceDetector::new(config)?))
    }

    pub fn from_detector(detector: BurstCadenceDetector) -> LfpsReceiver<DEPTH> {
        LfpsReceiver {
            synchronizer: InputSynchronizer::new(),
            detector,
        }
    }

    /// Samples the raw idle line and advances the detector by one tick, returning the `polling`
    /// output for this tick.
    ///
    /// Any change on the raw line reaches the detector `DEPTH` ticks later.
    pub fn tick(&mut self, raw_idle: bool) -> bool {
        let idle = self.synchronizer.tick(raw_idle);
        self.detector.tick(idle)
    }

    pub fn detector(&self) -> &BurstCadenceDetector {
        &self.detector
    }

    /// Returns stats about this instance's activity so far.
    pub fn stats(&self) -> RxStats {
        self.detector.stats()
    }

    pub fn reset(&mut self) {
        self.synchronizer.reset();
        self.detector.reset();
    }
}
