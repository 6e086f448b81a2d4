pub mod auxiliary;
pub mod rangefinder_error;
#[cfg(target_os = "espidf")]
pub mod timer_driver;
