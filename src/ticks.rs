//! Converts the seconds-based LFPS timings into tick counts for a fixed-rate tick domain.
//!
//! Conversions always round up, so that a counter that has counted down the returned number of
//! ticks has waited at least the requested duration. They're meant to run once, at configuration
//! time, rather than on every tick.

use crate::error::{ConfigurationError, Result};
use crate::timing::{LfpsDefinition, SignalTiming};
use core::time::Duration;
use log::debug;
use num_traits::Float;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Returns `ceil(seconds * tick_rate_hz)`, saturating at [u32::MAX].
///
/// The caller is responsible for passing a positive tick rate and a non-negative duration. A
/// product that is negative or NaN yields zero ticks.
pub fn to_ticks(tick_rate_hz: f64, seconds: f64) -> u32 {
    let ticks = Float::ceil(seconds * tick_rate_hz);
    if ticks.is_nan() || ticks <= 0.0 {
        0
    } else if ticks >= u32::MAX as f64 {
        u32::MAX
    } else {
        ticks as u32
    }
}

/// Returns the number of ticks needed to cover `duration`, rounding up.
///
/// Unlike [to_ticks] this starts from the duration's integer nanosecond count, which avoids the
/// binary rounding error that `1e-5 * 1e8` would otherwise pick up (yielding 1001 ticks rather than
/// 1000). Integral tick rates are converted exactly. The result saturates at [u32::MAX].
pub fn duration_to_ticks(tick_rate_hz: f64, duration: Duration) -> u32 {
    let nanos = duration.as_nanos();
    let integral_rate = Float::fract(tick_rate_hz) == 0.0;
    if tick_rate_hz > 0.0 && integral_rate && tick_rate_hz < u64::MAX as f64 {
        nanos
            .checked_mul(tick_rate_hz as u128)
            .map_or(u32::MAX, |product| {
                u32::try_from(product.div_ceil(NANOS_PER_SEC)).unwrap_or(u32::MAX)
            })
    } else {
        to_ticks(tick_rate_hz, nanos as f64 / NANOS_PER_SEC as f64)
    }
}

/// Checks that a tick rate can be used to count anything at all.
pub fn validate_tick_rate(tick_rate_hz: f64) -> Result<()> {
    if tick_rate_hz.is_finite() && tick_rate_hz > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidTickRate(tick_rate_hz))
    }
}

/// A [SignalTiming] window, converted to ticks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TickWindow {
    pub typical: Option<u32>,
    pub min: u32,
    pub max: u32,
}

impl TickWindow {
    /// Whether the given number of elapsed ticks lies inside `[min, max]`.
    pub fn contains(&self, ticks: u32) -> bool {
        (self.min..=self.max).contains(&ticks)
    }
}

impl SignalTiming {
    /// Converts this window to ticks at the given rate.
    pub fn to_ticks(&self, tick_rate_hz: f64) -> TickWindow {
        TickWindow {
            typical: self
                .typical
                .map(|typical| duration_to_ticks(tick_rate_hz, typical)),
            min: duration_to_ticks(tick_rate_hz, self.min),
            max: duration_to_ticks(tick_rate_hz, self.max),
        }
    }
}

/// The typical burst and repeat durations of a periodic LFPS signal, in ticks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CadenceTicks {
    /// How many ticks a burst lasts.
    pub burst: u32,
    /// How many ticks there are between the starts of two consecutive bursts.
    pub repeat: u32,
}

impl CadenceTicks {
    /// Constructs a new instance from raw tick counts.
    ///
    /// The repeat window must be longer than the burst, and the burst must be at least one tick
    /// long, since both counters reload to `count - 1`.
    pub fn new(burst: u32, repeat: u32) -> Result<CadenceTicks> {
        if burst == 0 || repeat <= burst {
            return Err(ConfigurationError::RepeatNotLongerThanBurst { burst, repeat });
        }
        Ok(CadenceTicks { burst, repeat })
    }

    /// Derives the tick counts from the typical burst and repeat durations of `lfps`.
    pub fn from_definition(tick_rate_hz: f64, lfps: &LfpsDefinition) -> Result<CadenceTicks> {
        validate_tick_rate(tick_rate_hz)?;
        lfps.validate()?;
        let repeat = lfps.repeat.ok_or(ConfigurationError::MissingRepeat)?;
        let burst_ticks = duration_to_ticks(tick_rate_hz, lfps.burst.typical_or_err()?);
        let repeat_ticks = duration_to_ticks(tick_rate_hz, repeat.typical_or_err()?);
        let cadence = CadenceTicks::new(burst_ticks, repeat_ticks)?;
        debug!(
            "LFPS cadence at {tick_rate_hz} Hz: burst {burst_ticks} ticks, repeat {repeat_ticks} \
                ticks"
        );
        Ok(cadence)
    }

    /// The number of silent ticks after each burst.
    pub const fn gap(&self) -> u32 {
        self.repeat - self.burst
    }
}
