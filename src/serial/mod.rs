mod command_line;
mod reporter;
#[cfg(target_os = "espidf")]
mod uart;

pub use command_line::*;
pub use reporter::*;
#[cfg(target_os = "espidf")]
pub use uart::*;
