use core::fmt::Write;

use embassy_time::{Duration, Instant};

use super::{FilterArgs, SignalFilter};
use crate::clock::{as_secs_f64, elapsed_between};
use crate::errors::FanTachError;

/// Longest hold delay that still fits a `Duration` at the configured tick rate
const MAX_DELAY_US: u64 = u64::MAX / (embassy_time::TICK_HZ / 1_000_000);

/// Where a `LossyPeak` is in its hold/decay cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// holding the last peak until the hold delay runs out
    Tracking,
    /// peak is dropping by `decay` units per second
    Decaying,
}

/// Peak hold with linear decay, like the needle of a VU meter.
///
/// A new maximum is taken immediately. A lower input leaves the peak alone for
/// `delay`, after that the peak drops by `decay` units per second until the
/// input catches up. Decay is applied step by step from the time between
/// calls, so irregular sampling gives (slightly) path dependent results.
#[derive(Clone, Debug, PartialEq)]
pub struct LossyPeak {
    peak: f32,
    decay: f32,
    delay: Duration,
    last_update: Instant,
    peak_time: Instant,
    phase: Phase,
}

impl LossyPeak {
    /// `decay` in units per second, `delay` before decay starts
    pub fn new(decay: f32, delay: Duration, now: Instant) -> Self {
        Self {
            peak: 0.0,
            decay,
            delay,
            last_update: now,
            peak_time: Instant::from_ticks(0),
            phase: Phase::Tracking,
        }
    }

    /// Parses `"<decay>,<delay seconds>"`, e.g. `"2.0,0.5"`.
    /// Empty fields are skipped and anything after the second field is ignored.
    pub fn parse_args(args: &str, now: Instant) -> Result<Self, FanTachError> {
        let mut fields = args.split(',').filter(|field| !field.is_empty());

        let decay = parse_number(fields.next())? as f32;
        if !decay.is_finite() {
            return Err(FanTachError::MalformedFilterArgs());
        }
        let delay = parse_number(fields.next())?;

        Ok(Self::new(decay, Duration::from_micros(delay_to_micros(delay)), now))
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn decay(&self) -> f32 {
        self.decay
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Seconds to whole microseconds, rounded. Negative delays behave like no delay at all,
/// absurdly long ones are capped at `MAX_DELAY_US`.
fn delay_to_micros(delay: f64) -> u64 {
    if delay <= 0.0 {
        return 0;
    }
    // float to int casts saturate
    ((delay * 1_000_000.0 + 0.5) as u64).min(MAX_DELAY_US)
}

fn parse_number(field: Option<&str>) -> Result<f64, FanTachError> {
    match field.map(str::parse::<f64>) {
        Some(Ok(value)) if value.is_finite() => Ok(value),
        _ => Err(FanTachError::MalformedFilterArgs()),
    }
}

impl SignalFilter for LossyPeak {
    fn filter(&mut self, input: f32, now: Instant) -> f32 {
        // time available for decay this step
        let mut decay_time = elapsed_between(self.last_update, now);

        if input >= self.peak {
            self.peak = input;
            self.phase = Phase::Tracking;
            self.peak_time = now;
        } else {
            if self.phase == Phase::Tracking {
                if self.delay.as_ticks() > 0 {
                    let since_peak = elapsed_between(self.peak_time, now);
                    if since_peak > self.delay {
                        self.phase = Phase::Decaying;
                        // only the part past the hold delay counts
                        decay_time = since_peak - self.delay;
                    }
                } else {
                    self.phase = Phase::Decaying;
                }
            }
            if self.phase == Phase::Decaying {
                let decay = as_secs_f64(decay_time) * self.decay as f64;
                let decayed = self.peak as f64 - decay;
                if input as f64 > decayed {
                    self.peak = input;
                } else {
                    self.peak = decayed as f32;
                }
            }
        }
        self.last_update = now;

        self.peak
    }

    fn print_args(&self) -> Option<FilterArgs> {
        let mut args = FilterArgs::new();
        let delay_us = self.delay.as_micros();
        write!(args, "{:.6},{}.{:06}", self.decay, delay_us / 1_000_000, delay_us % 1_000_000).ok()?;
        Some(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: u64) -> Instant {
        Instant::from_millis(millis)
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn holds_then_decays() {
        let mut f = LossyPeak::parse_args("2.0,0.5", at(0)).unwrap();
        assert_eq!(f.filter(10.0, at(0)), 10.0);
        // inside the hold window
        assert_eq!(f.filter(0.0, at(300)), 10.0);
        assert_eq!(f.phase(), Phase::Tracking);
        // 1.3s since the peak, 0.5s of it held: 0.8s * 2.0/s
        assert!(close(f.filter(0.0, at(1300)), 8.4));
        assert_eq!(f.phase(), Phase::Decaying);
        // decaying from now on by the time between calls
        assert!(close(f.filter(0.0, at(2300)), 6.4));
    }

    #[test]
    fn new_peak_restarts_the_hold() {
        let mut f = LossyPeak::parse_args("2.0,0.5", at(0)).unwrap();
        f.filter(10.0, at(0));
        f.filter(0.0, at(1000));
        assert_eq!(f.phase(), Phase::Decaying);
        assert_eq!(f.filter(20.0, at(1100)), 20.0);
        assert_eq!(f.phase(), Phase::Tracking);
        assert_eq!(f.filter(5.0, at(1500)), 20.0);
    }

    #[test]
    fn decay_stops_at_the_input() {
        let mut f = LossyPeak::parse_args("10,0", at(0)).unwrap();
        f.filter(10.0, at(0));
        // would decay to 0.0, but the input is higher
        assert_eq!(f.filter(6.0, at(1000)), 6.0);
        assert_eq!(f.phase(), Phase::Decaying);
        assert!(close(f.filter(0.0, at(1100)), 5.0));
    }

    #[test]
    fn zero_decay_holds_forever() {
        let mut f = LossyPeak::parse_args("0,0.5", at(0)).unwrap();
        f.filter(42.0, at(0));
        assert_eq!(f.filter(1.0, at(10_000)), 42.0);
        assert_eq!(f.filter(1.0, at(86_400_000)), 42.0);
        assert_eq!(f.phase(), Phase::Decaying);
    }

    #[test]
    fn zero_delay_decays_on_the_next_sample() {
        let mut f = LossyPeak::parse_args("2.0,0", at(0)).unwrap();
        f.filter(10.0, at(0));
        let y = f.filter(0.0, at(100));
        assert!(y < 10.0);
        assert!(close(y, 9.8));
    }

    #[test]
    fn clock_skew_means_no_decay() {
        let mut f = LossyPeak::parse_args("2.0,0", at(5000)).unwrap();
        f.filter(10.0, at(5000));
        assert_eq!(f.filter(0.0, at(4000)), 10.0);
    }

    #[test]
    fn fresh_filter_tracks_upwards() {
        let f = LossyPeak::parse_args("1.5,2", at(0)).unwrap();
        assert_eq!(f.peak(), 0.0);
        assert_eq!(f.phase(), Phase::Tracking);
        assert_eq!(f.delay(), Duration::from_secs(2));
        assert_eq!(f.decay(), 1.5);
    }

    #[test]
    fn malformed_arguments() {
        for args in ["", "2.0", "2.0,", ",", "a,1", "1,b", "1,nan", "inf,1", " 2.0,0.5"] {
            assert_eq!(
                LossyPeak::parse_args(args, at(0)),
                Err(FanTachError::MalformedFilterArgs()),
                "{args:?}"
            );
        }
    }

    #[test]
    fn tokenizer_skips_empty_fields_and_ignores_extras() {
        let f = LossyPeak::parse_args(",3,,0.25,99", at(0)).unwrap();
        assert_eq!(f.decay(), 3.0);
        assert_eq!(f.delay(), Duration::from_millis(250));
    }

    #[test]
    fn delay_is_kept_to_the_microsecond() {
        let f = LossyPeak::parse_args("2.0,0.7", at(0)).unwrap();
        assert_eq!(f.delay().as_micros(), 700_000);
        assert_eq!(f.print_args().unwrap().as_str(), "2.000000,0.700000");
        let f = LossyPeak::parse_args("1,0.3", at(0)).unwrap();
        assert_eq!(f.delay().as_micros(), 300_000);
    }

    #[test]
    fn huge_delay_is_capped() {
        let f = LossyPeak::parse_args("1,1e12", at(0)).unwrap();
        assert_eq!(f.delay(), Duration::from_micros(MAX_DELAY_US));
        let again = LossyPeak::parse_args(&f.print_args().unwrap(), at(0)).unwrap();
        assert_eq!(again.delay(), f.delay());
        // still a working filter
        let mut f = f;
        f.filter(5.0, at(0));
        assert_eq!(f.filter(1.0, at(3_600_000)), 5.0);
    }

    #[test]
    fn decay_too_large_for_f32_is_malformed() {
        assert_eq!(LossyPeak::parse_args("1e39,1", at(0)), Err(FanTachError::MalformedFilterArgs()));
    }

    #[test]
    fn negative_delay_is_no_delay() {
        let f = LossyPeak::parse_args("1,-3", at(0)).unwrap();
        assert_eq!(f.delay().as_ticks(), 0);
    }

    #[test]
    fn printed_args_parse_back() {
        for args in ["2.0,0.5", "0,0", "12.75,3.000001", "0.001,120", "2.0,0.7", "1,0.3"] {
            let f = LossyPeak::parse_args(args, at(0)).unwrap();
            let printed = f.print_args().unwrap();
            let again = LossyPeak::parse_args(&printed, at(0)).unwrap();
            assert!(close(again.decay(), f.decay()), "{printed}");
            assert_eq!(again.delay().as_micros(), f.delay().as_micros(), "{printed}");
            assert_eq!(again.print_args().unwrap(), printed);
        }
        let f = LossyPeak::parse_args("2,0.5", at(0)).unwrap();
        assert_eq!(f.print_args().unwrap().as_str(), "2.000000,0.500000");
    }
}
