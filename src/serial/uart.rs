use esp_idf_svc::hal::{
    delay::TickType,
    gpio::{Gpio0, Gpio1},
    uart::{config, UartDriver},
    units::Hertz,
};

use crate::{
    microcontroller_src::peripherals::{Peripheral, UartPeripheral},
    platform::CharSource,
    utils::rangefinder_error::{RangefinderError, UARTError},
};

/// UART driver the command line reads from
pub struct UART<'a> {
    driver: UartDriver<'a>,
}

impl<'a> UART<'a> {
    /// Creates a new UART on the given pins, 8N1 without flow control.
    ///
    /// # Arguments
    ///
    /// - `tx`: Peripheral of the transmit pin
    /// - `rx`: Peripheral of the receive pin
    /// - `uart_peripheral`: Peripheral of kind Uart
    /// - `baudrate`: Baudrate of the line
    ///
    /// # Errors
    ///
    /// - `UARTError::InvalidPeripheral`: If a pin is not available
    /// - `UARTError::InvalidUartNumber`: If `uart_peripheral` is not an available uart
    /// - `UARTError::InvalidPin`: If the driver cannot be installed on the given pins
    pub fn new(tx: Peripheral, rx: Peripheral, uart_peripheral: Peripheral, baudrate: u32) -> Result<UART<'a>, UARTError> {
        let tx_peripheral = tx.into_any_io_pin().map_err(UARTError::InvalidPeripheral)?;
        let rx_peripheral = rx.into_any_io_pin().map_err(UARTError::InvalidPeripheral)?;
        let config = config::Config::new().baudrate(Hertz(baudrate));

        let driver = match uart_peripheral.into_uart().map_err(|_| UARTError::InvalidUartNumber)? {
            UartPeripheral::Uart0(uart) => UartDriver::new(
                uart,
                tx_peripheral,
                rx_peripheral,
                Option::<Gpio0>::None,
                Option::<Gpio1>::None,
                &config,
            ),
            UartPeripheral::Uart1(uart) => UartDriver::new(
                uart,
                tx_peripheral,
                rx_peripheral,
                Option::<Gpio0>::None,
                Option::<Gpio1>::None,
                &config,
            ),
        }
        .map_err(|_| UARTError::InvalidPin)?;

        Ok(UART { driver })
    }

    /// Reads into `buffer`, waiting at most `timeout_ms`. Returns the amount of bytes read.
    pub fn read_with_timeout(&mut self, buffer: &mut [u8], timeout_ms: u32) -> Result<usize, UARTError> {
        let ticks = TickType::new_millis(timeout_ms as u64).ticks();
        self.driver.read(buffer, ticks).map_err(|_| UARTError::ReadError)
    }
}

impl<'a> CharSource for UART<'a> {
    fn read_char(&mut self, timeout_ms: u32) -> Result<Option<u8>, RangefinderError> {
        let mut buffer = [0_u8; 1];
        match self.read_with_timeout(&mut buffer, timeout_ms).map_err(RangefinderError::Uart)? {
            0 => Ok(None),
            _ => Ok(Some(buffer[0])),
        }
    }
}
