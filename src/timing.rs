//! Defines the USB3 LFPS signal timings: how long a burst lasts, and how often it repeats, for each
//! of the LFPS signals exchanged during link training and power state transitions.

use crate::error::{ConfigurationError, Result};
use core::time::Duration;

/// The lowest supported LFPS clock frequency (a 100ns period).
pub const LFPS_CLK_FREQ_MIN_HZ: f64 = 10_000_000.0;
/// The highest supported LFPS clock frequency (a 20ns period).
pub const LFPS_CLK_FREQ_MAX_HZ: f64 = 50_000_000.0;

/// A duration window with an optional typical value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SignalTiming {
    pub typical: Option<Duration>,
    pub min: Duration,
    pub max: Duration,
}

impl SignalTiming {
    pub const fn new(typical: Option<Duration>, min: Duration, max: Duration) -> Self {
        Self { typical, min, max }
    }

    /// Checks that the typical value, if any, lies within `[min, max]`.
    ///
    /// Note that the min/max bounds themselves aren't checked against each other: some entries in
    /// the USB3 table (U2, U3 wakeup) list a maximum below their minimum, and they're kept as
    /// published.
    pub fn validate(&self) -> Result<()> {
        match self.typical {
            Some(typical) if typical < self.min || typical > self.max => {
                Err(ConfigurationError::TypicalOutOfRange)
            }
            _ => Ok(()),
        }
    }

    /// Returns the typical duration, or [ConfigurationError::MissingTypical] if there is none.
    pub fn typical_or_err(&self) -> Result<Duration> {
        self.typical.ok_or(ConfigurationError::MissingTypical)
    }

    /// Returns the `(min, max)` window.
    pub const fn range(&self) -> (Duration, Duration) {
        (self.min, self.max)
    }
}

/// A single LFPS signal definition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LfpsDefinition {
    pub burst: SignalTiming,
    /// Absent for one-shot signals.
    pub repeat: Option<SignalTiming>,
    /// The number of bursts in the pattern. Reserved metadata; no detector or generator uses it.
    pub cycles: Option<u32>,
}

impl LfpsDefinition {
    pub const fn new(burst: SignalTiming, repeat: Option<SignalTiming>, cycles: Option<u32>) -> Self {
        Self {
            burst,
            repeat,
            cycles,
        }
    }

    /// Whether this signal is made up of repeating bursts.
    pub const fn is_periodic(&self) -> bool {
        self.repeat.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        self.burst.validate()?;
        if let Some(repeat) = &self.repeat {
            repeat.validate()?;
        }
        Ok(())
    }
}

/// Identifies one of the LFPS signals in a [TimingTable].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LfpsKind {
    Polling,
    Ping,
    Reset,
    U1Exit,
    U2,
    LoopbackExit,
    U3Wakeup,
}

impl LfpsKind {
    pub const ALL: [LfpsKind; 7] = [
        LfpsKind::Polling,
        LfpsKind::Ping,
        LfpsKind::Reset,
        LfpsKind::U1Exit,
        LfpsKind::U2,
        LfpsKind::LoopbackExit,
        LfpsKind::U3Wakeup,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            LfpsKind::Polling => "Polling",
            LfpsKind::Ping => "Ping",
            LfpsKind::Reset => "Reset",
            LfpsKind::U1Exit => "U1Exit",
            LfpsKind::U2 => "U2",
            LfpsKind::LoopbackExit => "LoopbackExit",
            LfpsKind::U3Wakeup => "U3Wakeup",
        }
    }
}

impl core::fmt::Display for LfpsKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of LFPS signal definitions a link endpoint works with. Constructed once and passed by
/// reference into the components that need it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimingTable {
    pub polling: LfpsDefinition,
    pub ping: LfpsDefinition,
    pub reset: LfpsDefinition,
    pub u1_exit: LfpsDefinition,
    pub u2: LfpsDefinition,
    pub u3_wakeup: LfpsDefinition,
}

impl TimingTable {
    /// Returns the definition for the given signal. [LfpsKind::LoopbackExit] shares the U2
    /// definition.
    pub const fn get(&self, kind: LfpsKind) -> &LfpsDefinition {
        match kind {
            LfpsKind::Polling => &self.polling,
            LfpsKind::Ping => &self.ping,
            LfpsKind::Reset => &self.reset,
            LfpsKind::U1Exit => &self.u1_exit,
            LfpsKind::U2 | LfpsKind::LoopbackExit => &self.u2,
            LfpsKind::U3Wakeup => &self.u3_wakeup,
        }
    }

    /// Iterates over every signal, including aliases, in [LfpsKind::ALL] order.
    pub fn iter(&self) -> impl Iterator<Item = (LfpsKind, &LfpsDefinition)> + '_ {
        LfpsKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }

    /// Validates every definition in the table.
    pub fn validate(&self) -> Result<()> {
        self.iter().try_for_each(|(_, definition)| definition.validate())
    }
}

const fn us(value: u64) -> Duration {
    Duration::from_nanos(value * 1_000)
}

const fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// The LFPS timings from the USB 3.x specification.
// TODO: add the LFPS handshake timings (tPollingLFPSTimeout and friends) once a link training
// state machine needs them.
pub const USB3_TIMING_TABLE: TimingTable = TimingTable {
    polling: LfpsDefinition::new(
        SignalTiming::new(Some(us(1)), Duration::from_nanos(600), Duration::from_nanos(1_400)),
        Some(SignalTiming::new(Some(us(10)), us(6), us(14))),
        None,
    ),
    ping: LfpsDefinition::new(
        SignalTiming::new(None, Duration::from_nanos(40), Duration::from_nanos(200)),
        Some(SignalTiming::new(Some(ms(200)), ms(160), ms(240))),
        Some(2),
    ),
    reset: LfpsDefinition::new(SignalTiming::new(Some(ms(100)), ms(80), ms(120)), None, None),
    // The maximum is 2us in some USB 3.x revisions.
    u1_exit: LfpsDefinition::new(
        SignalTiming::new(None, Duration::from_nanos(300), Duration::from_nanos(900)),
        None,
        None,
    ),
    u2: LfpsDefinition::new(SignalTiming::new(None, ms(80), ms(2)), None, None),
    u3_wakeup: LfpsDefinition::new(SignalTiming::new(None, ms(80), ms(10)), None, None),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usb3_table_is_valid() {
        assert_eq!(Ok(()), USB3_TIMING_TABLE.validate());
    }

    #[test]
    fn polling_timings_match_usb3_values() {
        let polling = USB3_TIMING_TABLE.get(LfpsKind::Polling);
        assert_eq!(polling.burst.typical, Some(Duration::from_micros(1)));
        assert_eq!(
            polling.burst.range(),
            (Duration::from_nanos(600), Duration::from_nanos(1_400))
        );
        let repeat = polling.repeat.unwrap();
        assert_eq!(repeat.typical, Some(Duration::from_micros(10)));
        assert_eq!(
            repeat.range(),
            (Duration::from_micros(6), Duration::from_micros(14))
        );
        assert!(polling.is_periodic());
    }

    #[test]
    fn loopback_exit_aliases_u2() {
        assert_eq!(
            USB3_TIMING_TABLE.get(LfpsKind::LoopbackExit),
            USB3_TIMING_TABLE.get(LfpsKind::U2)
        );
    }

    #[test]
    fn ping_carries_cycle_count() {
        assert_eq!(USB3_TIMING_TABLE.get(LfpsKind::Ping).cycles, Some(2));
        assert_eq!(USB3_TIMING_TABLE.get(LfpsKind::Polling).cycles, None);
    }

    #[test]
    fn one_shot_signals_have_no_repeat() {
        for kind in [
            LfpsKind::Reset,
            LfpsKind::U1Exit,
            LfpsKind::U2,
            LfpsKind::LoopbackExit,
            LfpsKind::U3Wakeup,
        ] {
            assert!(!USB3_TIMING_TABLE.get(kind).is_periodic(), "{kind}");
        }
    }

    #[rstest::rstest]
    #[test]
    #[case::below_min(Err(ConfigurationError::TypicalOutOfRange), 5)]
    #[case::at_min(Ok(()), 6)]
    #[case::inside(Ok(()), 10)]
    #[case::at_max(Ok(()), 14)]
    #[case::above_max(Err(ConfigurationError::TypicalOutOfRange), 15)]
    fn typical_must_lie_within_window(#[case] expected: Result<()>, #[case] typical_us: u64) {
        let timing = SignalTiming::new(
            Some(Duration::from_micros(typical_us)),
            Duration::from_micros(6),
            Duration::from_micros(14),
        );
        assert_eq!(expected, timing.validate());
    }

    // A table with a single bad entry must be rejected as a whole.
    #[test]
    fn table_validation_finds_bad_repeat() {
        let mut table = USB3_TIMING_TABLE;
        table.ping.repeat = Some(SignalTiming::new(Some(ms(300)), ms(160), ms(240)));
        assert_eq!(Err(ConfigurationError::TypicalOutOfRange), table.validate());
    }

    #[test]
    fn iter_visits_every_kind_in_order() {
        let kinds: Vec<LfpsKind> = USB3_TIMING_TABLE.iter().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, LfpsKind::ALL);
        assert_eq!("LoopbackExit", LfpsKind::LoopbackExit.to_string());
    }
}
