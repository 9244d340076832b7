//! Main loop side of the tachometer: pulse counts in, frequencies out.

use embassy_time::{Duration, Instant};

use crate::clock::{as_secs_f64, Monotonic};
use crate::config::MIN_SAMPLE_INTERVAL;
use crate::pulse_counter::PulseCounters;

/// Turns free running pulse counts into per channel frequencies.
///
/// Safe to poll as often as you like: new values are only produced once
/// `min_interval` has passed since the last accepted sample, until then the
/// previous frequencies stay in place.
pub struct FreqCounter<const N: usize> {
    baseline: [u32; N],
    freq: [f64; N],
    last_read: Instant,
    min_interval: Duration,
}

impl<const N: usize> FreqCounter<N> {
    /// All channels start at 0 Hz with the measurement window opening at `now`.
    pub fn new(now: Instant) -> Self {
        Self::with_interval(now, MIN_SAMPLE_INTERVAL)
    }

    pub fn with_interval(now: Instant, min_interval: Duration) -> Self {
        Self {
            baseline: [0; N],
            freq: [0.0; N],
            last_read: now,
            min_interval,
        }
    }

    /// Same as a fresh `new`, use after the pulse counters were reconfigured.
    pub fn reset(&mut self, now: Instant) {
        self.baseline = [0; N];
        self.freq = [0.0; N];
        self.last_read = now;
    }

    /// Samples `counters` if enough time has passed. Returns true when the frequencies were updated.
    pub fn update(&mut self, counters: &PulseCounters<N>, now: Instant) -> bool {
        self.update_from_counts(&counters.snapshot(), now)
    }

    /// `update` against an injected clock
    pub fn poll(&mut self, counters: &PulseCounters<N>, clock: &impl Monotonic) -> bool {
        let counts = counters.snapshot();
        self.update_from_counts(&counts, clock.now())
    }

    /// Core of the sampler, working on an already taken snapshot of the counters.
    pub fn update_from_counts(&mut self, counts: &[u32; N], now: Instant) -> bool {
        // a clock that went backwards reads as "not enough time yet"
        let elapsed = match now.checked_duration_since(self.last_read) {
            Some(elapsed) if elapsed >= self.min_interval && elapsed.as_micros() > 0 => elapsed,
            _ => return false,
        };

        let secs = as_secs_f64(elapsed);
        for ((freq, baseline), &count) in self.freq.iter_mut().zip(self.baseline.iter_mut()).zip(counts.iter()) {
            // wrapping: counters are free running and may overflow between samples
            let pulses = count.wrapping_sub(*baseline);
            *freq = pulses as f64 / secs;
            *baseline = count;
        }
        self.last_read = now;
        trace!("tacho sample after {} us: {:?}", elapsed.as_micros(), self.freq);
        true
    }

    /// Last computed frequency in Hz. Stale between samples.
    pub fn frequency(&self, channel: usize) -> Option<f64> {
        self.freq.get(channel).copied()
    }

    pub fn frequencies(&self) -> &[f64; N] {
        &self.freq
    }

    pub fn rpm(&self, channel: usize, pulses_per_rev: u8) -> Option<f64> {
        self.frequency(channel)
            .map(|freq| tacho_freq_to_rpm(freq, pulses_per_rev))
    }

    /// Time of the last accepted sample
    pub fn last_sample(&self) -> Instant {
        self.last_read
    }
}

pub fn tacho_freq_to_rpm(freq: f64, pulses_per_rev: u8) -> f64 {
    if pulses_per_rev == 0 {
        return 0.0;
    }
    freq * 60.0 / pulses_per_rev as f64
}

pub fn rpm_to_tacho_freq(rpm: f64, pulses_per_rev: u8) -> f64 {
    rpm * pulses_per_rev as f64 / 60.0
}
