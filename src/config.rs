//! Board configuration. Everything is fixed at compile time; the firmware binds the
//! matching peripherals with `assign_resources!`, so keep the pin numbers in sync with main.rs.

use embassy_time::Duration;

use crate::errors::FanTachError;
use crate::pulse_counter::Edge;

/// number of fan tachometer inputs
pub const FAN_COUNT: usize = 8;

/// number of motherboard fan tachometer outputs (square wave generators)
pub const MBFAN_COUNT: usize = 4;

/// Size of the gpio -> channel lookup. Pins at or above this can never be mapped.
pub const PIN_SPACE: usize = 32;

/// GPIO pin of each fan tachometer input, by fan index
pub const FAN_TACHO_READ_PINS: [u8; FAN_COUNT] = [4, 5, 6, 7, 8, 9, 10, 11];

/// GPIO pin of each motherboard fan tachometer output, by output index
pub const MBFAN_TACHO_GEN_PINS: [u8; MBFAN_COUNT] = [12, 13, 14, 15];

/// Frequencies are only recomputed once at least this much time has passed.
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// how often the control loop wakes up. Much shorter than `MIN_SAMPLE_INTERVAL` on purpose,
/// the sampler throttles itself
pub const CONTROL_LOOP_INTERVAL: Duration = Duration::from_millis(100);

/// standard PC fans give two tachometer pulses per revolution
pub const PULSES_PER_REV: u8 = 2;

/// Edge that counts as a pulse on each input channel.
/// The reference board counts falling edges on the first fan and rising edges on the rest;
/// both give the same frequency for a square tach signal.
pub const fn input_edge(channel: usize) -> Edge {
    if channel == 0 {
        Edge::Falling
    } else {
        Edge::Rising
    }
}

/// Where a motherboard fan output takes its signal from
#[derive(Clone, Copy, Debug)]
pub struct OutputLink {
    /// fan input whose measured frequency is mirrored
    pub source_fan: usize,
    /// filter selector name, see `filters::FilterKind::from_name`
    pub filter: &'static str,
    /// filter argument text, ignored by "none"
    pub filter_args: &'static str,
}

pub const OUTPUT_LINKS: [OutputLink; MBFAN_COUNT] = [
    OutputLink { source_fan: 0, filter: "lossypeak", filter_args: "2.0,0.5" },
    OutputLink { source_fan: 1, filter: "none", filter_args: "" },
    OutputLink { source_fan: 2, filter: "none", filter_args: "" },
    OutputLink { source_fan: 3, filter: "none", filter_args: "" },
];

/// Checks that every input pin is addressable and that no two channels share a pin.
pub fn validate_input_pins(pins: &[u8]) -> Result<(), FanTachError> {
    for (channel, &pin) in pins.iter().enumerate() {
        if pin as usize >= PIN_SPACE {
            return Err(FanTachError::InputPinOutOfRange { pin, channel });
        }
        if let Some(first) = pins[..channel].iter().position(|&p| p == pin) {
            return Err(FanTachError::DuplicateInputPin { pin, first, second: channel });
        }
    }
    Ok(())
}
