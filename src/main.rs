//! HC-SR04 rangefinder firmware, trigger on GPIO5 and echo on GPIO6.
//! Type `Start` on the serial console to begin ranging every half second, `Stop` to pause.

#[cfg(target_os = "espidf")]
fn main() {
    use esp32_rangefinder::{
        config::RangefinderConfig,
        platform::SystemWallClock,
        ranging::{EchoCapture, RangingProtocol},
        rangefinder_error::RangefinderError,
        serial::{CommandLine, Reporter},
        Microcontroller, Rangefinder,
    };
    use esp_idf_svc::log::EspLogger;
    use log::{error, info};
    use std::sync::Arc;

    let mut micro = Microcontroller::new();
    EspLogger::initialize_default();

    let config = RangefinderConfig::default();
    let capture = Arc::new(EchoCapture::new());

    let mut setup = || -> Result<_, RangefinderError> {
        let trigger = micro.set_pin_as_trigger(config.trigger_pin).map_err(RangefinderError::Trigger)?;
        let echo = micro
            .set_pin_as_echo(config.echo_pin, capture.clone(), config.echo_timeout_us)
            .map_err(RangefinderError::Echo)?;
        let uart = micro
            .set_pins_for_uart(config.uart_tx_pin, config.uart_rx_pin, config.uart_num, config.baudrate)
            .map_err(RangefinderError::Uart)?;
        Ok((trigger, echo, uart))
    };

    let (trigger, _echo, uart) = match setup() {
        Ok(drivers) => drivers,
        Err(err) => {
            error!("Could not set up the rangefinder: {}", err);
            micro.sleep(1_000);
            unsafe { esp_idf_svc::sys::esp_restart() }
        }
    };
    info!("Trigger on GPIO{}, echo on GPIO{}", config.trigger_pin, config.echo_pin);

    let protocol = RangingProtocol::new(trigger, micro.clock(), micro.clock(), capture, &config);
    let command_line = CommandLine::new(uart, &config);
    let reporter = Reporter::new(std::io::stdout(), SystemWallClock);
    let mut rangefinder = Rangefinder::new(protocol, command_line, reporter, &config);

    if let Err(err) = rangefinder.run() {
        error!("Rangefinder stopped: {}", err);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("This firmware runs on ESP-IDF targets, build it for riscv32imac-esp-espidf");
}
