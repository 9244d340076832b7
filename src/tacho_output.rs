//! Motherboard facing side: fake tachometer signals generated as square waves.

use crate::errors::FanTachError;

/// Hardware that emits a square wave per output channel (PIO state machines on the RP2040).
/// A frequency of zero switches the output off.
#[cfg_attr(test, mockall::automock)]
pub trait SquareWaveGen {
    fn set_output_frequency(&mut self, channel: usize, frequency_hz: f64);
}

/// Remembers the commanded frequency of each output and forwards only changes to the generator.
pub struct TachoOutputs<G: SquareWaveGen, const M: usize> {
    generator: G,
    target_freq: [f64; M],
}

impl<G: SquareWaveGen, const M: usize> TachoOutputs<G, M> {
    /// Takes over `generator` with every output at 0 Hz
    pub fn new(mut generator: G) -> Self {
        for channel in 0..M {
            generator.set_output_frequency(channel, 0.0);
        }
        Self {
            generator,
            target_freq: [0.0; M],
        }
    }

    pub fn set_tacho_output_freq(&mut self, channel: usize, frequency: f64) -> Result<(), FanTachError> {
        let target = self
            .target_freq
            .get_mut(channel)
            .ok_or(FanTachError::OutputChannelOutOfRange(channel))?;
        // negative or NaN would make no sense to the hardware
        let frequency = if frequency.is_finite() && frequency > 0.0 { frequency } else { 0.0 };
        // reprogramming restarts the wave, so only touch the hardware on a change
        if *target == frequency {
            return Ok(());
        }
        debug!("tacho output {}: {} Hz", channel, frequency);
        *target = frequency;
        self.generator.set_output_frequency(channel, frequency);
        Ok(())
    }

    pub fn frequency(&self, channel: usize) -> Option<f64> {
        self.target_freq.get(channel).copied()
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }
}
