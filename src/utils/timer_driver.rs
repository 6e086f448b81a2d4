use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use esp_idf_svc::{
    hal::{
        delay::Delay as HalDelay,
        timer::{self, config::Config as TimerConfig},
    },
    sys::esp_timer_get_time,
};

use crate::{
    microcontroller_src::peripherals::{Peripheral, TimerPeripheral},
    platform::{Delay, MonotonicClock, TimeoutGuard},
    ranging::{CycleId, EchoHandler},
};

use super::{
    auxiliary::micro_to_counter,
    rangefinder_error::{RangefinderError, TimerDriverError},
};

/// One shot alarm on a hardware timer, used as the echo timeout guard.
///
/// The timer counts freely from creation, arming sets the alarm `after_us` past the current
/// counter. When the alarm goes off the timer interrupt calls the handler with the cycle of
/// the last arm. Arming is safe from the echo pin interrupt: it only reads the counter and
/// writes the alarm registers.
pub struct OneShotTimer<'a> {
    driver: timer::TimerDriver<'a>,
    armed_cycle: Arc<AtomicU32>,
}

impl<'a> OneShotTimer<'a> {
    /// Creates a new OneShotTimer whose alarm reports to `handler`
    ///
    /// # Arguments
    ///
    /// - `timer`: A Peripheral of kind Timer
    /// - `handler`: The handler receiving the timeouts, shared with the echo interrupt
    ///
    /// # Returns
    ///
    /// A `Result` with the new OneShotTimer, already counting, or a `TimerDriverError`
    ///
    /// # Errors
    ///
    /// - `TimerDriverError::InvalidTimer`: If the peripheral is not an available timer
    /// - `TimerDriverError::SubscriptionError`: If the alarm interrupt could not be subscribed
    /// - `TimerDriverError::CouldNotSetTimer`: If the timer could not be started
    pub fn new<H: EchoHandler + 'static>(timer: Peripheral, handler: Arc<H>) -> Result<OneShotTimer<'a>, TimerDriverError> {
        let config = TimerConfig::new().auto_reload(false);
        let driver = match timer.into_timer().map_err(|_| TimerDriverError::InvalidTimer)? {
            TimerPeripheral::Group0(timer) => timer::TimerDriver::new(timer, &config),
            TimerPeripheral::Group1(timer) => timer::TimerDriver::new(timer, &config),
        }
        .map_err(|_| TimerDriverError::InvalidTimer)?;

        let mut one_shot = OneShotTimer { driver, armed_cycle: Arc::new(AtomicU32::new(0)) };
        one_shot.subscribe_alarm(handler)?;
        one_shot.start()?;
        Ok(one_shot)
    }

    fn subscribe_alarm<H: EchoHandler + 'static>(&mut self, handler: Arc<H>) -> Result<(), TimerDriverError> {
        let armed_cycle = self.armed_cycle.clone();
        let alarm_callback = move || {
            handler.on_timeout(armed_cycle.load(Ordering::Acquire));
        };
        unsafe {
            self.driver
                .subscribe(alarm_callback)
                .map_err(|_| TimerDriverError::SubscriptionError)?;
        }
        self.driver.enable_interrupt().map_err(|_| TimerDriverError::CouldNotSetTimer)
    }

    fn start(&mut self) -> Result<(), TimerDriverError> {
        self.driver.set_counter(0).map_err(|_| TimerDriverError::CannotSetTimerCounter)?;
        self.driver.enable(true).map_err(|_| TimerDriverError::CouldNotSetTimer)
    }

    /// Sets the alarm `micro_seconds` after the current counter value
    fn alarm_after(&mut self, micro_seconds: u64) -> Result<(), TimerDriverError> {
        let current = self.driver.counter().map_err(|_| TimerDriverError::ErrorReadingTimer)?;
        let after = micro_to_counter(micro_seconds, self.driver.tick_hz());
        self.driver.set_alarm(current + after).map_err(|_| TimerDriverError::CouldNotSetTimer)?;
        self.driver.enable_alarm(true).map_err(|_| TimerDriverError::CouldNotSetTimer)
    }
}

impl<'a> TimeoutGuard for OneShotTimer<'a> {
    fn arm(&mut self, cycle: CycleId, after_us: u64) -> Result<(), RangefinderError> {
        self.armed_cycle.store(cycle, Ordering::Release);
        self.alarm_after(after_us).map_err(RangefinderError::TimerDriver)
    }
}

/// Microsecond clock and delays of the ESP-IDF system timer. Delays spin only when shorter
/// than a tick and yield to FreeRTOS otherwise.
#[derive(Clone)]
pub struct EspClock {
    delay: HalDelay,
}

impl Default for EspClock {
    fn default() -> Self {
        Self::new()
    }
}

impl EspClock {
    pub fn new() -> Self {
        EspClock { delay: HalDelay::new_default() }
    }
}

impl MonotonicClock for EspClock {
    fn now_us(&self) -> u64 {
        // esp_timer_get_time counts up from boot and never goes negative
        unsafe { esp_timer_get_time() as u64 }
    }
}

impl Delay for EspClock {
    fn delay_us(&mut self, micro_seconds: u32) {
        self.delay.delay_us(micro_seconds);
    }

    fn delay_ms(&mut self, mili_seconds: u32) {
        self.delay.delay_ms(mili_seconds);
    }
}
