//! Interrupt side of the tachometer: one free running pulse counter per fan.
//!
//! Each counter has exactly one writer (the edge handler of its pin) and one reader
//! (the sampler). Increments are a plain load + store of one machine word, so a
//! concurrent read sees either the old or the new value. Nothing here ever locks.

use portable_atomic::{AtomicU32, AtomicU8, Ordering};

use crate::config::{validate_input_pins, PIN_SPACE};
use crate::errors::FanTachError;

/// Which transition of the tach signal counts as one pulse
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Rising,
    Falling,
}

/// map entry for a pin that belongs to no channel
const UNMAPPED: u8 = 0;

pub struct PulseCounters<const N: usize> {
    /// pin -> channel index + 1, `UNMAPPED` otherwise
    pin_map: [AtomicU8; PIN_SPACE],
    counters: [AtomicU32; N],
}

impl<const N: usize> PulseCounters<N> {
    #[allow(clippy::declare_interior_mutable_const)]
    pub const fn new() -> Self {
        const EMPTY_ENTRY: AtomicU8 = AtomicU8::new(UNMAPPED);
        const ZERO: AtomicU32 = AtomicU32::new(0);
        Self {
            pin_map: [EMPTY_ENTRY; PIN_SPACE],
            counters: [ZERO; N],
        }
    }

    /// Binds `pins[i]` to channel `i` and zeroes every counter.
    ///
    /// Validation happens before anything is written, so a rejected configuration
    /// leaves the previous mapping in place. Must run before edge detection is armed.
    pub fn configure(&self, pins: &[u8; N]) -> Result<(), FanTachError> {
        if let Err(e) = validate_input_pins(pins) {
            error!("Rejected tacho input configuration: {:?}", e);
            return Err(e);
        }

        for entry in self.pin_map.iter() {
            entry.store(UNMAPPED, Ordering::Relaxed);
        }
        for (channel, &pin) in pins.iter().enumerate() {
            self.pin_map[pin as usize].store(channel as u8 + 1, Ordering::Relaxed);
            self.counters[channel].store(0, Ordering::Relaxed);
        }
        info!("Configured {} tacho inputs", N);
        Ok(())
    }

    /// Edge handler. O(1), no floats, no logging; unknown pins are dropped.
    #[inline]
    pub fn on_edge(&self, pin: u8) {
        let entry = match self.pin_map.get(pin as usize) {
            Some(entry) => entry.load(Ordering::Relaxed),
            None => return,
        };
        if entry == UNMAPPED {
            return;
        }
        if let Some(counter) = self.counters.get(entry as usize - 1) {
            // single writer per counter, so no read-modify-write is needed
            let count = counter.load(Ordering::Relaxed);
            counter.store(count.wrapping_add(1), Ordering::Release);
        }
    }

    /// Channel bound to `pin`, if any
    pub fn channel_for_pin(&self, pin: u8) -> Option<usize> {
        match self.pin_map.get(pin as usize)?.load(Ordering::Relaxed) {
            UNMAPPED => None,
            entry => Some(entry as usize - 1),
        }
    }

    pub fn count(&self, channel: usize) -> Option<u32> {
        self.counters
            .get(channel)
            .map(|counter| counter.load(Ordering::Acquire))
    }

    /// Reads every counter, one after the other.
    pub fn snapshot(&self) -> [u32; N] {
        let mut counts = [0u32; N];
        for (count, counter) in counts.iter_mut().zip(self.counters.iter()) {
            *count = counter.load(Ordering::Acquire);
        }
        counts
    }
}

impl<const N: usize> Default for PulseCounters<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PINS: [u8; 3] = [2, 7, 30];

    fn configured() -> PulseCounters<3> {
        let counters = PulseCounters::new();
        counters.configure(&PINS).unwrap();
        counters
    }

    #[test]
    fn edges_land_on_their_own_channel() {
        let counters = configured();
        for _ in 0..5 {
            counters.on_edge(7);
        }
        counters.on_edge(30);
        assert_eq!(counters.snapshot(), [0, 5, 1]);
    }

    #[test]
    fn unmapped_and_out_of_range_pins_are_ignored() {
        let counters = configured();
        counters.on_edge(0);
        counters.on_edge(31);
        counters.on_edge(32);
        counters.on_edge(255);
        assert_eq!(counters.snapshot(), [0, 0, 0]);
    }

    #[test]
    fn mapping_is_one_to_one() {
        let counters = configured();
        for (channel, &pin) in PINS.iter().enumerate() {
            assert_eq!(counters.channel_for_pin(pin), Some(channel));
        }
        let mapped = (0..PIN_SPACE as u8)
            .filter(|&pin| counters.channel_for_pin(pin).is_some())
            .count();
        assert_eq!(mapped, PINS.len());
    }

    #[test]
    fn reconfigure_starts_from_zero() {
        let counters = configured();
        counters.on_edge(2);
        counters.on_edge(2);
        counters.configure(&[3, 7, 30]).unwrap();
        assert_eq!(counters.snapshot(), [0, 0, 0]);
        // old pin is gone
        counters.on_edge(2);
        assert_eq!(counters.count(0), Some(0));
        counters.on_edge(3);
        assert_eq!(counters.count(0), Some(1));
    }

    #[test]
    fn rejected_configuration_keeps_previous_mapping() {
        let counters = configured();
        counters.on_edge(2);
        assert_eq!(
            counters.configure(&[5, 5, 6]),
            Err(FanTachError::DuplicateInputPin { pin: 5, first: 0, second: 1 })
        );
        assert_eq!(counters.channel_for_pin(2), Some(0));
        assert_eq!(counters.channel_for_pin(5), None);
        assert_eq!(counters.count(0), Some(1));
    }

    #[test]
    fn count_of_missing_channel() {
        let counters = configured();
        assert_eq!(counters.count(3), None);
    }

    #[test]
    fn counters_can_live_in_a_static() {
        static COUNTERS: PulseCounters<2> = PulseCounters::new();
        COUNTERS.configure(&[0, 1]).unwrap();
        COUNTERS.on_edge(1);
        assert_eq!(COUNTERS.count(1), Some(1));
    }
}
