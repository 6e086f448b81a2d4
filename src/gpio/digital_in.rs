use esp_idf_svc::{
    hal::gpio::*,
    sys::{gpio_get_level, gpio_intr_enable},
};

use crate::{
    microcontroller_src::peripherals::Peripheral,
    platform::{MonotonicClock, TimeoutGuard},
    ranging::{EchoChannel, EchoHandler, Edge},
    utils::rangefinder_error::DigitalInError,
};

/// Driver for the echo pin, reporting both edges to an [EchoChannel] from the interrupt
/// - `pin_driver`: An instance of PinDriver that implements AnyIOPin
/// - `pin_num`: The gpio number, needed inside the interrupt where the driver is not reachable
pub struct DigitalIn<'a> {
    pin_driver: PinDriver<'a, AnyIOPin, Input>,
    pin_num: i32,
}

impl<'a> DigitalIn<'a> {
    /// Create a new DigitalIn for a Pin, pull is set to Down so a disconnected sensor reads low.
    ///
    /// # Arguments
    ///
    /// - `per`: A Peripheral capable of transforming into an AnyIOPin.
    ///
    /// # Returns
    ///
    /// A `Result` containing the new `DigitalIn` instance, or a `DigitalInError` if initialization fails.
    ///
    /// # Errors
    ///
    /// - `DigitalInError::InvalidPeripheral`: If per parameter is not capable of transforming into an AnyIOPin,
    ///   or pin has already been used for another driver.
    /// - `DigitalInError::CannotSetPinAsInput`: If the per parameter is not capable of supporting input
    /// - `DigitalInError::CannotSetPullForPin`: If the pull down cannot be set
    pub fn new(per: Peripheral) -> Result<DigitalIn<'a>, DigitalInError> {
        let gpio = per.into_any_io_pin().map_err(DigitalInError::InvalidPeripheral)?;
        let pin_num = gpio.pin();
        let pin_driver = PinDriver::input(gpio).map_err(|_| DigitalInError::CannotSetPinAsInput)?;

        let mut digital_in = DigitalIn { pin_driver, pin_num };
        digital_in.set_pull(Pull::Down)?;
        Ok(digital_in)
    }

    /// Set the pin Pull either to Pull Up or Down
    pub fn set_pull(&mut self, pull_type: Pull) -> Result<(), DigitalInError> {
        self.pin_driver
            .set_pull(pull_type)
            .map_err(|_| DigitalInError::CannotSetPullForPin)
    }

    /// Forwards every edge of the pin to `channel`, timestamped with `clock`.
    ///
    /// The HAL disables the pin interrupt each time it fires, the callback enables it again
    /// itself so the falling edge that closely follows a rising edge is not lost. The level is
    /// read inside the callback to tell both edges apart.
    ///
    /// # Errors
    ///
    /// - `DigitalInError::InvalidPin`: If the interrupt type cannot be set or the subscription fails
    /// - `DigitalInError::StateAlreadySet`: If the interrupt could not be enabled
    pub fn subscribe_edges<H, G, C>(&mut self, mut channel: EchoChannel<H, G>, clock: C) -> Result<(), DigitalInError>
    where
        H: EchoHandler + 'static,
        G: TimeoutGuard + Send + 'static,
        C: MonotonicClock + Send + 'static,
    {
        self.pin_driver
            .set_interrupt_type(InterruptType::AnyEdge)
            .map_err(|_| DigitalInError::InvalidPin)?;

        let pin_num = self.pin_num;
        let callback = move || {
            let now_us = clock.now_us();
            let edge = if unsafe { gpio_get_level(pin_num) } != 0 { Edge::Rising } else { Edge::Falling };
            // A failed arm cannot be reported from here, the protocol expires the cycle itself.
            let _ = channel.on_edge(edge, now_us);
            unsafe {
                gpio_intr_enable(pin_num);
            }
        };

        unsafe {
            self.pin_driver
                .subscribe(callback)
                .map_err(|_| DigitalInError::InvalidPin)?;
        }
        self.pin_driver
            .enable_interrupt()
            .map_err(|_| DigitalInError::StateAlreadySet)
    }
}
