use esp_idf_svc::hal::gpio::*;

use crate::{
    microcontroller_src::peripherals::Peripheral,
    platform::TriggerOutput,
    utils::rangefinder_error::{DigitalOutError, RangefinderError},
};

/// Driver to handle a digital output for a particular Pin, used as the sensor trigger
pub struct DigitalOut<'a> {
    pin_driver: PinDriver<'a, AnyIOPin, Output>,
}

impl<'a> DigitalOut<'a> {
    /// Creates a new DigitalOut for a Pin, starting at low level.
    ///
    /// # Arguments
    ///
    /// - `per`: A Peripheral capable of transforming into an AnyIOPin.
    ///
    /// # Returns
    ///
    /// A `Result` containing the new `DigitalOut` instance, or a `DigitalOutError` if initialization fails.
    ///
    /// # Errors
    ///
    /// - `DigitalOutError::InvalidPeripheral`: If per parameter is not capable of transforming into an AnyIOPin,
    ///   or pin has already been used for another driver.
    /// - `DigitalOutError::CannotSetPinAsOutput`: If the pin cannot be set as an output.
    /// - `DigitalOutError::InvalidPin`: If the initial level cannot be set.
    pub fn new(per: Peripheral) -> Result<DigitalOut<'a>, DigitalOutError> {
        let gpio = per.into_any_io_pin().map_err(DigitalOutError::InvalidPeripheral)?;
        let pin_driver = PinDriver::output(gpio).map_err(|_| DigitalOutError::CannotSetPinAsOutput)?;
        let mut digital_out = DigitalOut { pin_driver };
        digital_out.set_level(Level::Low)?;
        Ok(digital_out)
    }

    /// Sets the pin level either to High or Low
    pub fn set_level(&mut self, level: Level) -> Result<(), DigitalOutError> {
        self.pin_driver.set_level(level).map_err(|_| DigitalOutError::InvalidPin)
    }
}

impl<'a> TriggerOutput for DigitalOut<'a> {
    fn set_high(&mut self) -> Result<(), RangefinderError> {
        self.set_level(Level::High).map_err(RangefinderError::Trigger)
    }

    fn set_low(&mut self) -> Result<(), RangefinderError> {
        self.set_level(Level::Low).map_err(RangefinderError::Trigger)
    }
}
