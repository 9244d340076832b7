//! Tachometer acquisition and signal shaping for a fan controller.
//!
//! Pulses are counted from interrupt context by [`pulse_counter::PulseCounters`],
//! turned into frequencies once per second by [`freq_counter::FreqCounter`],
//! optionally smoothed by a [`filters::PwmFilter`] and finally pushed out as
//! square waves through [`tacho_output::TachoOutputs`].
//!
//! Everything here is hardware independent; the RP2040 glue lives in the firmware binary.

#![cfg_attr(not(test), no_std)]

// must stay first so the macros are visible to the other modules
mod fmt;

pub mod clock;
pub mod config;
pub mod control;
pub mod errors;
pub mod filters;
pub mod freq_counter;
pub mod pulse_counter;
pub mod tacho_output;

pub use errors::FanTachError;
