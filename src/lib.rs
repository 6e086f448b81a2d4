mod utils;
#[cfg(target_os = "espidf")]
mod microcontroller_src;

pub mod config;
#[cfg(target_os = "espidf")]
pub mod gpio;
pub mod platform;
pub mod rangefinder;
pub mod ranging;
pub mod serial;

#[cfg(target_os = "espidf")]
pub use microcontroller_src::{peripherals, Microcontroller};
pub use rangefinder::Rangefinder;
#[cfg(target_os = "espidf")]
pub use utils::timer_driver;
pub use utils::rangefinder_error;
