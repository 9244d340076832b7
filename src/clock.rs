use embassy_time::{Duration, Instant};

/// Monotonic time source handed to everything that measures intervals.
/// Must never jump backwards; wall clock (SNTP) time is not an acceptable source.
pub trait Monotonic {
    fn now(&self) -> Instant;
}

/// Reads the embassy time driver, i.e. the RP2040 64 bit microsecond timer.
#[cfg(feature = "rp2040")]
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

#[cfg(feature = "rp2040")]
impl Monotonic for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Time from `earlier` to `now`. A clock that appears to have gone backwards counts as no time at all.
pub fn elapsed_between(earlier: Instant, now: Instant) -> Duration {
    now.checked_duration_since(earlier)
        .unwrap_or(Duration::from_ticks(0))
}

/// `duration` in seconds, at microsecond resolution
pub fn as_secs_f64(duration: Duration) -> f64 {
    duration.as_micros() as f64 / 1_000_000.0
}
