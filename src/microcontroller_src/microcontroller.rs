use std::sync::Arc;

use esp_idf_svc::hal::delay::FreeRtos;

use crate::{
    gpio::{DigitalIn, DigitalOut},
    microcontroller_src::peripherals::Peripherals,
    ranging::{EchoCapture, EchoChannel},
    serial::UART,
    utils::{
        rangefinder_error::{DigitalInError, DigitalOutError, UARTError},
        timer_driver::{EspClock, OneShotTimer},
    },
};

/// Primary abstraction for interacting with the microcontroller, handing out the drivers the
/// rangefinder is built from.
///
/// - `peripherals`: An instance of `Peripherals`, keeping track of what was already taken.
pub struct Microcontroller {
    peripherals: Peripherals,
}

impl Default for Microcontroller {
    fn default() -> Self {
        Self::new()
    }
}

impl Microcontroller {
    /// Creates a new Microcontroller instance
    ///
    /// # Returns
    ///
    /// The new Microcontroller
    pub fn new() -> Self {
        esp_idf_svc::sys::link_patches();
        Microcontroller { peripherals: Peripherals::new() }
    }

    /// Creates a DigitalOut on the ESP pin with number 'pin_num' to drive the sensor trigger.
    ///
    /// # Arguments
    ///
    /// - `pin_num`: The number of the pin on the microcontroller wired to the trigger.
    ///
    /// # Returns
    ///
    /// A `DigitalOut` instance, starting low.
    ///
    /// # Errors
    ///
    /// - `DigitalOutError`: If the pin was already taken or cannot be used as output.
    pub fn set_pin_as_trigger<'a>(&mut self, pin_num: usize) -> Result<DigitalOut<'a>, DigitalOutError> {
        let pin_peripheral = self.peripherals.get_digital_pin(pin_num);
        DigitalOut::new(pin_peripheral)
    }

    /// Creates a DigitalIn on the ESP pin with number 'pin_num' whose edges are captured into
    /// `capture`. The next free timer becomes the timeout guard of every cycle, going off
    /// `timeout_us` after the rising edge.
    ///
    /// The returned DigitalIn must be kept alive, dropping it stops the capture.
    ///
    /// # Errors
    ///
    /// - `DigitalInError::TimerDriverError`: If no timer is left or it cannot be started
    /// - `DigitalInError`: If the pin was already taken or its interrupt cannot be subscribed
    pub fn set_pin_as_echo(&mut self, pin_num: usize, capture: Arc<EchoCapture>, timeout_us: u64) -> Result<DigitalIn<'static>, DigitalInError> {
        let timer = self.peripherals.get_next_timer();
        let guard: OneShotTimer<'static> = OneShotTimer::new(timer, capture.clone()).map_err(DigitalInError::TimerDriverError)?;

        let pin_peripheral = self.peripherals.get_digital_pin(pin_num);
        let mut echo = DigitalIn::new(pin_peripheral)?;
        echo.subscribe_edges(EchoChannel::new(capture, guard, timeout_us), EspClock::new())?;
        Ok(echo)
    }

    /// Creates a UART on the given pins for the command line
    ///
    /// # Errors
    ///
    /// - `UARTError`: If any pin or the uart was already taken, or the driver cannot be installed
    pub fn set_pins_for_uart<'a>(&mut self, tx_pin: usize, rx_pin: usize, uart_num: usize, baudrate: u32) -> Result<UART<'a>, UARTError> {
        let tx_peripheral = self.peripherals.get_digital_pin(tx_pin);
        let rx_peripheral = self.peripherals.get_digital_pin(rx_pin);
        let uart_peripheral = self.peripherals.get_uart(uart_num);
        UART::new(tx_peripheral, rx_peripheral, uart_peripheral, baudrate)
    }

    /// Microsecond clock and delays of the system timer
    pub fn clock(&self) -> EspClock {
        EspClock::new()
    }

    pub fn sleep(&self, miliseconds: u32) {
        FreeRtos::delay_ms(miliseconds)
    }
}
