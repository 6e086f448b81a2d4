use std::mem;
use esp_idf_svc::hal::gpio::*;
use esp_idf_svc::hal::timer::{TIMER00, TIMER10};
use esp_idf_svc::hal::uart::{UART0, UART1};

use crate::utils::rangefinder_error::PeripheralError;

const PIN_COUNT: usize = 24;
const TIMERS_COUNT: usize = 2;
const UART_COUNT: usize = 2;
const DIGITAL_PINS_BOUNDS: (usize, usize) = (0, 23);

/// Represents an esp32 Peripheral that can be turned into its HAL counterpart once
#[derive(Debug, Default, PartialEq, Eq)]
pub enum Peripheral {
    Pin(u8),
    Timer(u8),
    Uart(u8),
    #[default]
    None,
}

impl Peripheral {
    fn take(&mut self) -> Peripheral {
        mem::take(self)
    }

    /// If the Peripheral is a Pin returns the corresponding AnyIOPin.
    ///
    /// # Errors
    ///
    /// - `PeripheralError::AlreadyTaken`: If the pin was already handed to another driver
    /// - `PeripheralError::NotAPin`: If the Peripheral is not a pin of the ESP32-C6
    pub fn into_any_io_pin(self) -> Result<AnyIOPin, PeripheralError> {
        let pin = match self {
            Peripheral::Pin(pin_num) => match pin_num {
                0 => unsafe { Gpio0::new().downgrade() },
                1 => unsafe { Gpio1::new().downgrade() },
                2 => unsafe { Gpio2::new().downgrade() },
                3 => unsafe { Gpio3::new().downgrade() },
                4 => unsafe { Gpio4::new().downgrade() },
                5 => unsafe { Gpio5::new().downgrade() },
                6 => unsafe { Gpio6::new().downgrade() },
                7 => unsafe { Gpio7::new().downgrade() },
                8 => unsafe { Gpio8::new().downgrade() },
                9 => unsafe { Gpio9::new().downgrade() },
                10 => unsafe { Gpio10::new().downgrade() },
                11 => unsafe { Gpio11::new().downgrade() },
                12 => unsafe { Gpio12::new().downgrade() },
                13 => unsafe { Gpio13::new().downgrade() },
                15 => unsafe { Gpio15::new().downgrade() },
                16 => unsafe { Gpio16::new().downgrade() },
                17 => unsafe { Gpio17::new().downgrade() },
                18 => unsafe { Gpio18::new().downgrade() },
                19 => unsafe { Gpio19::new().downgrade() },
                20 => unsafe { Gpio20::new().downgrade() },
                21 => unsafe { Gpio21::new().downgrade() },
                22 => unsafe { Gpio22::new().downgrade() },
                23 => unsafe { Gpio23::new().downgrade() },
                _ => return Err(PeripheralError::NotAPin),
            },
            Peripheral::None => return Err(PeripheralError::AlreadyTaken),
            _ => return Err(PeripheralError::NotAPin),
        };
        Ok(pin)
    }

    /// Timer 0 of group 0 or timer 0 of group 1
    pub fn into_timer(self) -> Result<TimerPeripheral, PeripheralError> {
        match self {
            Peripheral::Timer(0) => Ok(TimerPeripheral::Group0(unsafe { TIMER00::new() })),
            Peripheral::Timer(1) => Ok(TimerPeripheral::Group1(unsafe { TIMER10::new() })),
            Peripheral::None => Err(PeripheralError::AlreadyTaken),
            _ => Err(PeripheralError::NotATimer),
        }
    }

    pub fn into_uart(self) -> Result<UartPeripheral, PeripheralError> {
        match self {
            Peripheral::Uart(0) => Ok(UartPeripheral::Uart0(unsafe { UART0::new() })),
            Peripheral::Uart(1) => Ok(UartPeripheral::Uart1(unsafe { UART1::new() })),
            Peripheral::None => Err(PeripheralError::AlreadyTaken),
            _ => Err(PeripheralError::NotAUart),
        }
    }
}

pub enum TimerPeripheral {
    Group0(TIMER00),
    Group1(TIMER10),
}

pub enum UartPeripheral {
    Uart0(UART0),
    Uart1(UART1),
}

/// Represents the peripherals of the esp32C6 the rangefinder uses. Subsequent gets of the same
/// peripheral will return Peripheral::None.
pub struct Peripherals {
    pins: [Peripheral; PIN_COUNT],
    timers: [Peripheral; TIMERS_COUNT],
    uart: [Peripheral; UART_COUNT],
}

impl Default for Peripherals {
    fn default() -> Self {
        Self::new()
    }
}

impl Peripherals {
    pub fn new() -> Peripherals {
        // Gpio14 is not bonded out on the ESP32-C6
        let pins: [Peripheral; PIN_COUNT] = std::array::from_fn(|pin_num| match pin_num {
            14 => Peripheral::None,
            _ => Peripheral::Pin(pin_num as u8),
        });
        let timers: [Peripheral; TIMERS_COUNT] = [Peripheral::Timer(0), Peripheral::Timer(1)];
        let uart: [Peripheral; UART_COUNT] = [Peripheral::Uart(0), Peripheral::Uart(1)];
        Peripherals { pins, timers, uart }
    }

    pub fn get_digital_pin(&mut self, pin_num: usize) -> Peripheral {
        if pin_num >= DIGITAL_PINS_BOUNDS.0 && pin_num <= DIGITAL_PINS_BOUNDS.1 {
            return self.pins[pin_num].take();
        }
        Peripheral::None
    }

    /// Returns the first timer not handed out yet
    pub fn get_next_timer(&mut self) -> Peripheral {
        match self.timers.iter_mut().find(|timer| **timer != Peripheral::None) {
            Some(timer) => timer.take(),
            None => Peripheral::None,
        }
    }

    pub fn get_uart(&mut self, uart_num: usize) -> Peripheral {
        match self.uart.get_mut(uart_num) {
            Some(uart) => uart.take(),
            None => Peripheral::None,
        }
    }
}
