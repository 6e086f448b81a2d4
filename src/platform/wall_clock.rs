use std::time::{SystemTime, UNIX_EPOCH};

use super::{TimeOfDay, WallClock};

/// Wall clock backed by the system time.
///
/// On ESP-IDF the system time is kept by the RTC timer and starts at the epoch on boot, so
/// until someone sets it the reports show the time elapsed since power up.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn time_of_day(&self) -> TimeOfDay {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);
        TimeOfDay::from_seconds_of_day(seconds)
    }
}
