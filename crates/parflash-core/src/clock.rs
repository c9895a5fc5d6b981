//! Busy-wait delays
//!
//! The JEDEC command protocol only specifies minimum dwell times, so every
//! [`Clock`] implementation may delay longer than asked but never shorter.
//!
//! Two implementations live here:
//! - [`CalibratedClock`] (`std`): a spin loop calibrated against the wall
//!   clock once per process run
//! - [`TickClock`]: counts ticks of a hardware [`TickTimer`]

/// Dwell time after entering or leaving software-ID mode (10 ms)
pub const IDENTIFY_DELAY_US: u32 = 10_000;
/// Delay between completion polls during erase and program (50 us)
pub const WRITE_DELAY_US: u32 = 50;
/// Page erase polling budget: 100 ms worth of polls
pub const ERASE_TIMEOUT_POLLS: u32 = 100_000 / WRITE_DELAY_US;
/// Page write polling budget: 100 ms worth of polls
pub const PAGE_WRITE_TIMEOUT_POLLS: u32 = 100_000 / WRITE_DELAY_US;
/// Byte write polling budget: 10 ms worth of polls
pub const BYTE_WRITE_TIMEOUT_POLLS: u32 = 10_000 / WRITE_DELAY_US;

/// A delay source
pub trait Clock {
    /// Wait for at least `us` microseconds
    fn wait_us(&mut self, us: u32);
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn wait_us(&mut self, us: u32) {
        (**self).wait_us(us)
    }
}

/// A free-running hardware timer that can be armed for a tick count
pub trait TickTimer {
    /// Timer input frequency in Hz
    fn frequency_hz(&self) -> u32;

    /// Block until `ticks` timer ticks have elapsed
    fn wait_ticks(&mut self, ticks: u16);
}

/// [`Clock`] backed by a hardware tick counter
#[derive(Debug)]
pub struct TickClock<T> {
    timer: T,
}

impl<T: TickTimer> TickClock<T> {
    /// Wrap a timer
    pub fn new(timer: T) -> Self {
        Self { timer }
    }

    /// Timer ticks per millisecond (rounded down)
    pub fn ticks_per_ms(&self) -> u32 {
        self.timer.frequency_hz() / 1000
    }

    /// Number of ticks covering at least `us` microseconds
    pub fn ticks_for_us(&self, us: u32) -> u64 {
        let hz = self.timer.frequency_hz() as u64;
        (us as u64 * hz).div_ceil(1_000_000)
    }

    /// Give the timer back
    pub fn into_inner(self) -> T {
        self.timer
    }
}

impl<T: TickTimer> Clock for TickClock<T> {
    fn wait_us(&mut self, us: u32) {
        let mut ticks = self.ticks_for_us(us);
        while ticks > 0 {
            let chunk = ticks.min(u16::MAX as u64);
            self.timer.wait_ticks(chunk as u16);
            ticks -= chunk;
        }
    }
}

#[cfg(feature = "std")]
pub use calibrated::CalibratedClock;

#[cfg(feature = "std")]
mod calibrated {
    use std::time::{Duration, Instant};

    use super::Clock;
    use crate::error::{Error, Result};

    /// Iterations of the calibration loop
    pub const CALIBRATION_LOOPS: u64 = 2_000_000;

    /// Spin loop delay calibrated against the wall clock
    ///
    /// Calibrate once per run: the result depends on the current CPU
    /// frequency.
    #[derive(Debug, Clone, Copy)]
    pub struct CalibratedClock {
        loops_per_ms: u64,
    }

    impl CalibratedClock {
        /// Time a fixed spin loop and derive loops per millisecond
        pub fn calibrate() -> Result<Self> {
            let start = Instant::now();
            spin(CALIBRATION_LOOPS);
            let clock = Self::from_measurement(CALIBRATION_LOOPS, start.elapsed())?;
            log::debug!("Delay loop calibrated: {} loops/ms", clock.loops_per_ms);
            Ok(clock)
        }

        /// Build from a measured loop count and elapsed time
        pub fn from_measurement(loops: u64, elapsed: Duration) -> Result<Self> {
            let nanos = elapsed.as_nanos();
            if nanos == 0 {
                return Err(Error::CalibrationFailure);
            }
            let loops_per_ms = (loops as u128 * 1_000_000 / nanos).max(1);
            Ok(Self {
                loops_per_ms: u64::try_from(loops_per_ms).unwrap_or(u64::MAX),
            })
        }

        /// Calibrated spin iterations per millisecond
        pub fn ticks_per_ms(&self) -> u64 {
            self.loops_per_ms
        }
    }

    impl Clock for CalibratedClock {
        fn wait_us(&mut self, us: u32) {
            let start = Instant::now();
            let target = Duration::from_micros(us as u64);
            spin((us as u64).saturating_mul(self.loops_per_ms) / 1000);
            // CPU may have sped up since calibration
            while start.elapsed() < target {
                core::hint::spin_loop();
            }
        }
    }

    fn spin(loops: u64) {
        for i in 0..loops {
            core::hint::black_box(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeTimer {
        hz: u32,
        waits: alloc::vec::Vec<u16>,
    }

    impl TickTimer for FakeTimer {
        fn frequency_hz(&self) -> u32 {
            self.hz
        }

        fn wait_ticks(&mut self, ticks: u16) {
            self.waits.push(ticks);
        }
    }

    #[test]
    fn test_timing_budgets() {
        assert_eq!(ERASE_TIMEOUT_POLLS, 2000);
        assert_eq!(PAGE_WRITE_TIMEOUT_POLLS, 2000);
        assert_eq!(BYTE_WRITE_TIMEOUT_POLLS, 200);
    }

    #[test]
    fn test_tick_clock_rounds_up() {
        let mut clock = TickClock::new(FakeTimer {
            hz: 1_193_182,
            waits: alloc::vec::Vec::new(),
        });
        assert_eq!(clock.ticks_per_ms(), 1193);
        // 50 us is 59.66 ticks; never under-delay
        assert_eq!(clock.ticks_for_us(50), 60);
        clock.wait_us(50);
        assert_eq!(clock.into_inner().waits, [60]);
    }

    #[test]
    fn test_tick_clock_splits_long_waits() {
        let mut clock = TickClock::new(FakeTimer {
            hz: 1_193_182,
            waits: alloc::vec::Vec::new(),
        });
        // 100 ms is 119319 ticks, more than one 16-bit count
        clock.wait_us(100_000);
        let waits = clock.into_inner().waits;
        assert_eq!(waits.len(), 2);
        assert_eq!(waits.iter().map(|&t| t as u64).sum::<u64>(), 119_319);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_calibration_rejects_zero_elapsed() {
        use std::time::Duration;
        assert_eq!(
            CalibratedClock::from_measurement(1000, Duration::ZERO).unwrap_err(),
            crate::error::Error::CalibrationFailure
        );
        let clock = CalibratedClock::from_measurement(1000, Duration::from_micros(500)).unwrap();
        assert_eq!(clock.ticks_per_ms(), 2000);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_calibrated_wait_lower_bound() {
        use std::time::{Duration, Instant};
        let mut clock = CalibratedClock::calibrate().unwrap();
        let start = Instant::now();
        clock.wait_us(2000);
        assert!(start.elapsed() >= Duration::from_micros(2000));
    }
}
