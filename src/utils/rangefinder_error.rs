use std::{fmt, io};

/// Enums the different errors possible when working with the trigger output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitalOutError {
    CannotSetPinAsOutput,
    InvalidPin,
    InvalidPeripheral(PeripheralError),
}

/// Enums the different errors possible when working with the echo input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitalInError {
    CannotSetPinAsInput,
    CannotSetPullForPin,
    InvalidPeripheral(PeripheralError),
    InvalidPin,
    StateAlreadySet,
    TimerDriverError(TimerDriverError),
}

/// Enums the different errors possible when working with the timeout alarm timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerDriverError {
    CouldNotSetTimer,
    CannotSetTimerCounter,
    ErrorReadingTimer,
    InvalidTimer,
    SubscriptionError,
}

/// Enums the different errors possible when working with the serial line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UARTError {
    InvalidPin,
    InvalidPeripheral(PeripheralError),
    InvalidUartNumber,
    ReadError,
}

/// Errors of the peripheral bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralError {
    AlreadyTaken,
    NotAPin,
    NotATimer,
    NotAUart,
}

/// Crate wide error, wraps the error of every driver the rangefinder uses
#[derive(Debug)]
pub enum RangefinderError {
    Trigger(DigitalOutError),
    Echo(DigitalInError),
    TimerDriver(TimerDriverError),
    Uart(UARTError),
    Report(io::Error),
}

impl fmt::Display for RangefinderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangefinderError::Trigger(err) => write!(f, "trigger output error: {:?}", err),
            RangefinderError::Echo(err) => write!(f, "echo input error: {:?}", err),
            RangefinderError::TimerDriver(err) => write!(f, "timer driver error: {:?}", err),
            RangefinderError::Uart(err) => write!(f, "uart error: {:?}", err),
            RangefinderError::Report(err) => write!(f, "could not write report: {}", err),
        }
    }
}

impl std::error::Error for RangefinderError {}

impl From<io::Error> for RangefinderError {
    fn from(err: io::Error) -> Self {
        RangefinderError::Report(err)
    }
}
