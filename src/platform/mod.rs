//! Hardware seams of the rangefinder.
//!
//! The ranging protocol, the command line and the reporter only talk to the hardware through
//! these traits. The ESP-IDF drivers in [crate::gpio], [crate::serial] and [crate::timer_driver]
//! implement them on the microcontroller, and [mock] implements them over a simulated clock.

mod wall_clock;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use wall_clock::SystemWallClock;

use crate::{ranging::CycleId, utils::rangefinder_error::RangefinderError};

/// Digital output wired to the sensor trigger
pub trait TriggerOutput {
    fn set_high(&mut self) -> Result<(), RangefinderError>;

    fn set_low(&mut self) -> Result<(), RangefinderError>;
}

/// Free running microsecond counter, never set back while the program runs
pub trait MonotonicClock {
    fn now_us(&self) -> u64;
}

/// Blocking delays
pub trait Delay {
    fn delay_us(&mut self, micro_seconds: u32);

    fn delay_ms(&mut self, mili_seconds: u32);
}

/// One shot alarm backing the echo timeout guard.
///
/// Once armed, the implementation must call [crate::ranging::EchoHandler::on_timeout] with the
/// given cycle after `after_us` microseconds. Arming again replaces the previous alarm.
pub trait TimeoutGuard {
    fn arm(&mut self, cycle: CycleId, after_us: u64) -> Result<(), RangefinderError>;
}

/// Serial character stream read one byte at a time
pub trait CharSource {
    /// Waits at most `timeout_ms` for the next byte. `Ok(None)` means the wait timed out.
    fn read_char(&mut self, timeout_ms: u32) -> Result<Option<u8>, RangefinderError>;
}

/// Time of day as shown on each report line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8, second: u8) -> Self {
        TimeOfDay { hour, minute, second }
    }

    /// Builds the time of day from seconds elapsed since midnight, wrapping every 24 hours
    pub fn from_seconds_of_day(seconds: u64) -> Self {
        let seconds = seconds % 86_400;
        TimeOfDay {
            hour: (seconds / 3_600) as u8,
            minute: (seconds % 3_600 / 60) as u8,
            second: (seconds % 60) as u8,
        }
    }
}

/// Real time clock used to timestamp reports
pub trait WallClock {
    fn time_of_day(&self) -> TimeOfDay;
}
