//! Contains debug utilities that may be useful for users of this crate.

use bitvec::prelude::*;

/// The number of samples printed per row by [FormatWaveform].
const SAMPLES_PER_ROW: usize = 64;
/// The number of samples in each group within a row.
const SAMPLES_PER_GROUP: usize = 8;

/// A wrapper struct whose [core::fmt::Display] implementation prints the provided line samples in
/// rows, with each row containing 64 samples in groups of 8. Each row is prefixed with the
/// (hexadecimal) tick offset of its first sample, and each sample is printed as `0` or `1`, with
/// the earliest sample on the left.
pub struct FormatWaveform<'a>(pub &'a BitSlice<u8, Lsb0>);

impl core::fmt::Display for FormatWaveform<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (row_idx, row_samples) in self.0.chunks(SAMPLES_PER_ROW).enumerate() {
            if row_idx > 0 {
                writeln!(f)?;
            }
            let offset = row_idx * SAMPLES_PER_ROW;
            write!(f, "{offset:04x}: ")?;

            for (group_idx, group_samples) in row_samples.chunks(SAMPLES_PER_GROUP).enumerate() {
                if group_idx > 0 {
                    write!(f, " ")?;
                }
                for sample in group_samples.iter().by_vals() {
                    write!(f, "{}", u8::from(sample))?;
                }
            }
        }
        Ok(())
    }
}

/// Logs the given line samples in a human-readable format (see [FormatWaveform]).
pub fn log_waveform(log_level: log::Level, samples: &BitSlice<u8, Lsb0>) {
    log::log!(
        log_level,
        "Length: {} samples\n{}",
        samples.len(),
        FormatWaveform(samples)
    );
}

/// Captures one line sample per tick, up to `8 * BYTES` samples, without allocating.
///
/// This is useful for capturing e.g. the generator's `idle` output or a receiver's input around
/// an event of interest, and dumping it to the log afterwards.
#[derive(Clone, Debug)]
pub struct WaveformRecorder<const BYTES: usize> {
    samples: BitArray<[u8; BYTES], Lsb0>,
    len: usize,
}

impl<const BYTES: usize> WaveformRecorder<BYTES> {
    pub const fn new() -> WaveformRecorder<BYTES> {
        WaveformRecorder {
            samples: BitArray::ZERO,
            len: 0,
        }
    }

    /// The maximum number of samples that can be recorded.
    pub const fn capacity(&self) -> usize {
        BYTES * 8
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Records a sample. Returns `false` (and drops the sample) if the recorder is already full.
    pub fn record(&mut self, sample: bool) -> bool {
        if self.is_full() {
            return false;
        }
        self.samples.set(self.len, sample);
        self.len += 1;
        true
    }

    /// Returns the samples recorded so far, oldest first.
    pub fn samples(&self) -> &BitSlice<u8, Lsb0> {
        &self.samples[..self.len]
    }

    pub fn clear(&mut self) {
        self.samples = BitArray::ZERO;
        self.len = 0;
    }

    /// Logs the recorded samples, if the given level is enabled.
    pub fn log(&self, log_level: log::Level) {
        if log::log_enabled!(log_level) {
            log_waveform(log_level, self.samples());
        }
    }
}

impl<const BYTES: usize> Default for WaveformRecorder<BYTES> {
    fn default() -> Self {
        Self::new()
    }
}
