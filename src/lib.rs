//! Implements the Low-Frequency Periodic Signaling (LFPS) layer used during USB3 SuperSpeed link
//! training: detection of the Polling LFPS burst/repeat cadence on an incoming line, and generation
//! of that same cadence on an outgoing line.
//!
//! Everything in this crate advances in fixed-rate ticks. Durations from the USB3 timing table are
//! converted into tick counts once, at construction time, after which each component is advanced
//! exactly once per tick by its owner.

#![cfg_attr(not(test), no_std)]

pub mod debug_util;
pub mod endpoint;
pub mod error;
pub mod lfps_rx;
pub mod lfps_tx;
pub mod sync;
pub mod ticks;
pub mod timing;

pub use error::{ConfigurationError, Result};
