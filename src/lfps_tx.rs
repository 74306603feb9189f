//! Implements LFPS transmission: generating the Polling LFPS burst/repeat cadence for an outgoing
//! line.
//!
//! The generator doesn't drive the line itself. Every tick it reports whether the line should be
//! idle, and a parallel [Pattern] bus carrying the current value of the LFPS clock, which a
//! transceiver driver is expected to serialize onto the line.

use crate::error::{ConfigurationError, Result};
use crate::ticks::{validate_tick_rate, CadenceTicks};
use crate::timing::{LfpsDefinition, LFPS_CLK_FREQ_MAX_HZ, LFPS_CLK_FREQ_MIN_HZ, USB3_TIMING_TABLE};
use bitvec::prelude::*;
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};
use num_traits::Float;

/// The width of the pattern bus handed to the transceiver, in bits.
pub const PATTERN_WIDTH: usize = 40;
/// The width of the pattern bus, in bytes.
pub const PATTERN_BYTES: usize = PATTERN_WIDTH / 8;

type PatternBits = BitArr!(for PATTERN_WIDTH, in u8, Lsb0);

/// One tick's worth of transceiver data: every bit carries the same LFPS clock level.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pattern(PatternBits);

impl Pattern {
    /// The pattern sent while the line is idle.
    pub const IDLE: Pattern = Pattern(BitArray::ZERO);

    /// Returns a pattern with every bit set to `level`.
    pub fn replicate(level: bool) -> Pattern {
        let mut bits = PatternBits::ZERO;
        bits.fill(level);
        Pattern(bits)
    }

    pub fn bits(&self) -> &BitSlice<u8, Lsb0> {
        self.0.as_bitslice()
    }

    /// Returns the bus in the byte layout a transceiver expects, with bit 0 in the LSB of the
    /// first byte.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_raw_slice()
    }

    /// Returns the bus as a little-endian word, for transceivers with a 40-bit data register.
    pub fn to_word(&self) -> u64 {
        LittleEndian::read_uint(self.as_bytes(), PATTERN_BYTES)
    }
}

/// A free-running square wave, toggling every `half_period` ticks.
#[derive(Clone, Debug)]
pub struct Oscillator {
    half_period: u32,
    counter: u32,
    bit: bool,
}

impl Oscillator {
    /// Creates an oscillator approximating `freq_hz` at the given tick rate.
    ///
    /// The frequency must lie within the LFPS clock range of [LFPS_CLK_FREQ_MIN_HZ] to
    /// [LFPS_CLK_FREQ_MAX_HZ], and the tick rate must be at least twice the frequency.
    pub fn new(tick_rate_hz: f64, freq_hz: f64) -> Result<Oscillator> {
        validate_tick_rate(tick_rate_hz)?;
        if !(LFPS_CLK_FREQ_MIN_HZ..=LFPS_CLK_FREQ_MAX_HZ).contains(&freq_hz) {
            return Err(ConfigurationError::FrequencyOutOfRange(
                freq_hz,
                LFPS_CLK_FREQ_MIN_HZ,
                LFPS_CLK_FREQ_MAX_HZ,
            ));
        }
        let half_period = Float::floor(tick_rate_hz / (2.0 * freq_hz));
        if half_period < 1.0 {
            return Err(ConfigurationError::TickRateTooLow(tick_rate_hz, freq_hz));
        }
        let half_period = if half_period >= u32::MAX as f64 {
            u32::MAX
        } else {
            half_period as u32
        };
        Ok(Oscillator {
            half_period,
            counter: 0,
            bit: false,
        })
    }

    /// The number of ticks between two toggles.
    pub fn half_period(&self) -> u32 {
        self.half_period
    }

    /// Returns the level for this tick and advances by one tick.
    pub fn tick(&mut self) -> bool {
        let bit = self.bit;
        self.counter += 1;
        if self.counter == self.half_period {
            self.counter = 0;
            self.bit = !self.bit;
        }
        bit
    }

    pub fn reset(&mut self) {
        self.counter = 0;
        self.bit = false;
    }
}

/// A configuration struct for use with the [BurstCadenceGenerator] constructor.
#[derive(Copy, Clone, Debug)]
pub struct TransmitterConfig<'a> {
    /// The rate at which the generator will be ticked.
    pub tick_rate_hz: f64,
    /// The LFPS clock frequency to toggle the pattern at during a burst.
    pub lfps_clk_freq_hz: f64,
    /// The (periodic) LFPS signal to generate.
    pub lfps: &'a LfpsDefinition,
}

impl TransmitterConfig<'static> {
    /// A configuration generating the USB3 Polling LFPS.
    pub const fn polling(tick_rate_hz: f64, lfps_clk_freq_hz: f64) -> TransmitterConfig<'static> {
        TransmitterConfig {
            tick_rate_hz,
            lfps_clk_freq_hz,
            lfps: &USB3_TIMING_TABLE.polling,
        }
    }
}

/// The generator's outputs for one tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GeneratorOutput {
    /// Asserted while the line should be idle, i.e. outside of a burst.
    pub idle: bool,
    /// The LFPS clock level during a burst, or [Pattern::IDLE] outside of one.
    pub pattern: Pattern,
}

/// A snapshot of a [BurstCadenceGenerator]'s registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GeneratorState {
    pub oscillator_bit: bool,
    pub oscillator_counter: u32,
    /// Ticks elapsed in the current burst, saturating at the burst length.
    pub burst_elapsed_counter: u32,
    /// Ticks elapsed in the current repeat window.
    pub repeat_elapsed_counter: u32,
}

/// Various transmission-related stats. The counters wrap around on overflow.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxStats {
    /// The number of bursts that have been started.
    pub bursts_started: u32,
    /// The number of full repeat windows that have been generated.
    pub periods_completed: u32,
}

/// Generates a burst/repeat cadence: the oscillator is passed through for the first `burst` ticks
/// of every `repeat`-tick window, and the line is idle for the remainder.
#[derive(Clone, Debug)]
pub struct BurstCadenceGenerator {
    cadence: CadenceTicks,
    oscillator: Oscillator,
    burst_elapsed: u32,
    repeat_elapsed: u32,
    stats: TxStats,
}

impl BurstCadenceGenerator {
    /// Creates a new instance. No instance is created if `config` is unusable, e.g. if the LFPS
    /// clock frequency is out of range.
    pub fn new(config: TransmitterConfig) -> Result<BurstCadenceGenerator> {
        let cadence = CadenceTicks::from_definition(config.tick_rate_hz, config.lfps)?;
        let oscillator = Oscillator::new(config.tick_rate_hz, config.lfps_clk_freq_hz)?;
        Ok(Self::from_parts(cadence, oscillator))
    }

    pub fn from_parts(cadence: CadenceTicks, oscillator: Oscillator) -> BurstCadenceGenerator {
        debug!(
            "LFPS generator: burst {} ticks, repeat {} ticks, LFPS clock toggling every {} ticks",
            cadence.burst, cadence.repeat, oscillator.half_period
        );
        BurstCadenceGenerator {
            cadence,
            oscillator,
            burst_elapsed: 0,
            repeat_elapsed: 0,
            stats: TxStats::default(),
        }
    }

    /// Returns the outputs for this tick and advances by one tick.
    pub fn tick(&mut self) -> GeneratorOutput {
        let burst_active = self.burst_elapsed < self.cadence.burst;
        if self.repeat_elapsed == 0 {
            trace!("LFPS burst started");
            self.stats.bursts_started = self.stats.bursts_started.wrapping_add(1);
        }
        let level = self.oscillator.tick();

        // Advance the gate timers. The burst timer only runs until it has covered the burst, and
        // restarts together with the repeat timer.
        self.repeat_elapsed += 1;
        if self.repeat_elapsed == self.cadence.repeat {
            self.repeat_elapsed = 0;
            self.burst_elapsed = 0;
            self.stats.periods_completed = self.stats.periods_completed.wrapping_add(1);
        } else if burst_active {
            self.burst_elapsed += 1;
        }

        GeneratorOutput {
            idle: !burst_active,
            pattern: if burst_active {
                Pattern::replicate(level)
            } else {
                Pattern::IDLE
            },
        }
    }

    /// Returns a snapshot of the generator's registers.
    pub fn state(&self) -> GeneratorState {
        GeneratorState {
            oscillator_bit: self.oscillator.bit,
            oscillator_counter: self.oscillator.counter,
            burst_elapsed_counter: self.burst_elapsed,
            repeat_elapsed_counter: self.repeat_elapsed,
        }
    }

    pub fn cadence(&self) -> CadenceTicks {
        self.cadence
    }

    /// Returns stats about this instance's activity so far.
    pub fn stats(&self) -> TxStats {
        self.stats
    }

    /// Restarts the cadence (and the oscillator) from the start of a burst. Stats are kept.
    pub fn reset(&mut self) {
        self.oscillator.reset();
        self.burst_elapsed = 0;
        self.repeat_elapsed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_generator() -> BurstCadenceGenerator {
        BurstCadenceGenerator::from_parts(
            CadenceTicks::new(3, 10).unwrap(),
            Oscillator::new(500e6, 25e6).unwrap(),
        )
    }

    #[test]
    fn oscillator_flips_every_ten_ticks_at_500mhz() {
        let mut oscillator = Oscillator::new(500e6, 25e6).unwrap();
        assert_eq!(oscillator.half_period(), 10);
        let levels: Vec<bool> = (0..40).map(|_| oscillator.tick()).collect();
        for (tick, level) in levels.into_iter().enumerate() {
            assert_eq!(level, (tick / 10) % 2 == 1, "tick {tick}");
        }
    }

    #[rstest::rstest]
    #[test]
    #[case::min(Ok(25), 500e6, 10e6)]
    #[case::max(Ok(5), 500e6, 50e6)]
    #[case::rounds_down(Ok(3), 100e6, 15e6)]
    #[case::too_fast(
        Err(ConfigurationError::FrequencyOutOfRange(60e6, 10e6, 50e6)),
        500e6,
        60e6
    )]
    #[case::too_slow(
        Err(ConfigurationError::FrequencyOutOfRange(9e6, 10e6, 50e6)),
        500e6,
        9e6
    )]
    #[case::tick_rate_too_low(Err(ConfigurationError::TickRateTooLow(50e6, 40e6)), 50e6, 40e6)]
    #[case::bad_tick_rate(Err(ConfigurationError::InvalidTickRate(0.0)), 0.0, 25e6)]
    fn oscillator_half_period(
        #[case] expected: Result<u32>,
        #[case] tick_rate_hz: f64,
        #[case] freq_hz: f64,
    ) {
        assert_eq!(
            expected,
            Oscillator::new(tick_rate_hz, freq_hz).map(|oscillator| oscillator.half_period())
        );
    }

    #[test]
    fn generator_rejects_out_of_range_frequency() {
        let config = TransmitterConfig::polling(500e6, 60e6);
        assert_eq!(
            Err(ConfigurationError::FrequencyOutOfRange(60e6, 10e6, 50e6)),
            BurstCadenceGenerator::new(config).map(|_| ())
        );
    }

    // The line must be active for the first `burst` ticks of every period and idle for the rest,
    // for as many periods as we care to look at.
    #[rstest::rstest]
    #[test]
    #[case::small(small_generator(), 50)]
    #[case::polling_100mhz(
        BurstCadenceGenerator::new(TransmitterConfig::polling(100e6, 25e6)).unwrap(),
        8
    )]
    fn idle_covers_repeat_remainder(
        #[case] generator: BurstCadenceGenerator,
        #[case] periods: u32,
    ) {
        let mut generator = generator;
        let cadence = generator.cadence();
        for tick in 0..periods * cadence.repeat {
            let output = generator.tick();
            assert_eq!(output.idle, tick % cadence.repeat >= cadence.burst, "tick {tick}");
        }
        assert_eq!(
            generator.stats(),
            TxStats {
                bursts_started: periods,
                periods_completed: periods,
            }
        );
        assert_eq!(generator.state().repeat_elapsed_counter, 0);
    }

    #[test]
    fn pattern_carries_oscillator_only_during_burst() {
        let mut generator =
            BurstCadenceGenerator::new(TransmitterConfig::polling(500e6, 25e6)).unwrap();
        let cadence = generator.cadence();
        assert_eq!(cadence, CadenceTicks::new(500, 5_000).unwrap());
        for tick in 0..2 * cadence.repeat {
            let output = generator.tick();
            if output.idle {
                assert_eq!(output.pattern, Pattern::IDLE);
            } else {
                // The oscillator runs freely, so its phase is simply a function of the tick count.
                let level = (tick / 10) % 2 == 1;
                assert_eq!(output.pattern, Pattern::replicate(level), "tick {tick}");
            }
        }
    }

    #[test]
    fn pattern_word_replicates_level() {
        assert_eq!(Pattern::replicate(true).to_word(), 0xFF_FFFF_FFFF);
        assert_eq!(Pattern::replicate(false).to_word(), 0);
        assert_eq!(Pattern::IDLE.as_bytes(), &[0; PATTERN_BYTES]);
        assert_eq!(Pattern::replicate(true).bits().count_ones(), PATTERN_WIDTH);
    }

    // The generator runs indefinitely, so its stats must wrap instead of overflowing.
    #[test]
    fn stats_wrap_around() {
        let mut generator = small_generator();
        generator.stats = TxStats {
            bursts_started: u32::MAX,
            periods_completed: u32::MAX,
        };
        let cadence = generator.cadence();
        for tick in 0..2 * cadence.repeat {
            assert_eq!(generator.tick().idle, tick % cadence.repeat >= cadence.burst);
        }
        assert_eq!(
            generator.stats(),
            TxStats {
                bursts_started: 1,
                periods_completed: 1,
            }
        );
    }

    #[test]
    fn state_tracks_gate_timers() {
        let mut generator = small_generator();
        for _ in 0..5 {
            generator.tick();
        }
        assert_eq!(
            generator.state(),
            GeneratorState {
                oscillator_bit: false,
                oscillator_counter: 5,
                burst_elapsed_counter: 3,
                repeat_elapsed_counter: 5,
            }
        );
        generator.reset();
        assert_eq!(generator.state().repeat_elapsed_counter, 0);
        assert!(!generator.tick().idle);
    }
}
