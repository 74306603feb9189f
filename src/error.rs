use thiserror::Error;

/// An error produced while configuring an LFPS component. No instance is created when one of these
/// is returned.
#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum ConfigurationError {
    /// The tick rate is zero, negative, or not a finite number.
    #[error("Tick rate ({0} Hz) must be a positive, finite number")]
    InvalidTickRate(f64),
    /// The target LFPS oscillation frequency lies outside the supported range.
    #[error("LFPS clock frequency ({0} Hz) is out of range ([{1} Hz, {2} Hz])")]
    FrequencyOutOfRange(f64, f64, f64),
    /// The tick rate is too low to toggle the oscillator at the requested frequency.
    #[error("Tick rate ({0} Hz) is too low to generate a {1} Hz LFPS clock")]
    TickRateTooLow(f64, f64),
    /// A typical duration lies outside its own min/max window.
    #[error("Typical duration must lie within the [min, max] window")]
    TypicalOutOfRange,
    /// The definition has no typical duration to count towards.
    #[error("Signal timing has no typical duration")]
    MissingTypical,
    /// The definition is one-shot, but a periodic cadence was requested.
    #[error("LFPS definition has no repeat window")]
    MissingRepeat,
    /// The repeat window converts to no more ticks than the burst itself (or the burst converts
    /// to zero ticks), so no silent gap can be counted.
    #[error("Repeat ({repeat} ticks) must be longer than a non-empty burst ({burst} ticks)")]
    RepeatNotLongerThanBurst { burst: u32, repeat: u32 },
}

pub type Result<T> = core::result::Result<T, ConfigurationError>;
