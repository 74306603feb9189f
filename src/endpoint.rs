//! Combines the receive and transmit sides of an LFPS link endpoint, so that an owner only has to
//! advance a single object per tick.

use crate::error::Result;
use crate::lfps_rx::{LfpsReceiver, ReceiverConfig, RxStats};
use crate::lfps_tx::{BurstCadenceGenerator, GeneratorOutput, Pattern, TransmitterConfig, TxStats};
use crate::sync::{AsyncLine, SYNC_DEPTH};
use crate::timing::{TimingTable, USB3_TIMING_TABLE};
use log::debug;

/// A configuration struct for use with the [LfpsEndpoint] constructor.
#[derive(Copy, Clone, Debug)]
pub struct EndpointConfig<'a> {
    /// The rate at which the endpoint will be ticked.
    pub tick_rate_hz: f64,
    /// The LFPS clock frequency used when generating bursts.
    pub lfps_clk_freq_hz: f64,
    /// The LFPS timings to use. Both sides use the table's Polling definition.
    pub table: &'a TimingTable,
}

impl EndpointConfig<'static> {
    /// A configuration using the USB3 timings.
    pub const fn usb3(tick_rate_hz: f64, lfps_clk_freq_hz: f64) -> EndpointConfig<'static> {
        EndpointConfig {
            tick_rate_hz,
            lfps_clk_freq_hz,
            table: &USB3_TIMING_TABLE,
        }
    }
}

/// The endpoint's outputs for one tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EndpointOutputs {
    /// Pulses for one tick whenever a Polling LFPS cadence was recognized on the incoming line.
    pub polling: bool,
    /// Whether the outgoing line should be idle.
    pub idle: bool,
    /// The data to hand to the transceiver.
    pub pattern: Pattern,
}

/// An LFPS link endpoint: detects the Polling cadence on the incoming line while generating it on
/// the outgoing line.
#[derive(Clone, Debug)]
pub struct LfpsEndpoint<const DEPTH: usize = SYNC_DEPTH> {
    receiver: LfpsReceiver<DEPTH>,
    generator: BurstCadenceGenerator,
}

impl<const DEPTH: usize> LfpsEndpoint<DEPTH> {
    /// Creates a new instance. No instance is created if the timing table is invalid, or if either
    /// side can't be built from it.
    pub fn new(config: EndpointConfig) -> Result<LfpsEndpoint<DEPTH>> {
        config.table.validate()?;
        let receiver = LfpsReceiver::new(ReceiverConfig {
            tick_rate_hz: config.tick_rate_hz,
            lfps: &config.table.polling,
        })?;
        let generator = BurstCadenceGenerator::new(TransmitterConfig {
            tick_rate_hz: config.tick_rate_hz,
            lfps_clk_freq_hz: config.lfps_clk_freq_hz,
            lfps: &config.table.polling,
        })?;
        debug!(
            "LFPS endpoint ticking at {} Hz, LFPS clock at {} Hz",
            config.tick_rate_hz, config.lfps_clk_freq_hz
        );
        Ok(Self::from_parts(receiver, generator))
    }

    pub fn from_parts(
        receiver: LfpsReceiver<DEPTH>,
        generator: BurstCadenceGenerator,
    ) -> LfpsEndpoint<DEPTH> {
        LfpsEndpoint {
            receiver,
            generator,
        }
    }

    /// Advances both sides by one tick, given the raw (unsynchronized) idle level of the incoming
    /// line.
    pub fn tick(&mut self, raw_idle: bool) -> EndpointOutputs {
        let polling = self.receiver.tick(raw_idle);
        let GeneratorOutput { idle, pattern } = self.generator.tick();
        EndpointOutputs {
            polling,
            idle,
            pattern,
        }
    }

    /// Like [LfpsEndpoint::tick], but samples the incoming line from a shared [AsyncLine].
    pub fn tick_line(&mut self, line: &AsyncLine) -> EndpointOutputs {
        self.tick(line.sample())
    }

    pub fn receiver(&self) -> &LfpsReceiver<DEPTH> {
        &self.receiver
    }

    pub fn generator(&self) -> &BurstCadenceGenerator {
        &self.generator
    }

    /// Returns the receive-side stats.
    pub fn rx_stats(&self) -> RxStats {
        self.receiver.stats()
    }

    /// Returns the transmit-side stats.
    pub fn tx_stats(&self) -> TxStats {
        self.generator.stats()
    }

    pub fn reset(&mut self) {
        self.receiver.reset();
        self.generator.reset();
    }
}
