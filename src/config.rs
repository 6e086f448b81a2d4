//! Pin assignment and timing of the rangefinder.
//!
//! There is no configuration file, the configuration is built in code. Every field has a
//! default matching the HC-SR04 datasheet and the serial console of the board.

const DEFAULT_TRIGGER_PIN: usize = 5;
const DEFAULT_ECHO_PIN: usize = 6;
const DEFAULT_UART_NUM: usize = 0;
const DEFAULT_UART_TX_PIN: usize = 16;
const DEFAULT_UART_RX_PIN: usize = 17;
const DEFAULT_BAUDRATE: u32 = 115_200;
const DEFAULT_TRIGGER_PULSE_US: u32 = 10;
const DEFAULT_ECHO_TIMEOUT_US: u64 = 30_000;
const DEFAULT_SETTLE_DELAY_MS: u32 = 30;
const DEFAULT_LOOP_PERIOD_MS: u32 = 500;
const DEFAULT_CHAR_TIMEOUT_MS: u32 = 100;
const DEFAULT_MAX_COMMAND_LEN: usize = 9;

/// Configuration of the rangefinder
/// - `trigger_pin`: Pin wired to the sensor trigger
/// - `echo_pin`: Pin wired to the sensor echo, must support edge interrupts
/// - `uart_num`: UART used for the command line
/// - `uart_tx_pin`, `uart_rx_pin`: Pins of that UART, the console pins of the board by default
/// - `baudrate`: Baudrate of the command line
/// - `trigger_pulse_us`: Width of the trigger pulse
/// - `echo_timeout_us`: Time after the rising edge before the cycle is considered failed
/// - `settle_delay_ms`: Wait after the trigger pulse before evaluating the cycle
/// - `loop_period_ms`: Wait between loop iterations
/// - `char_timeout_ms`: Maximum wait for each command character
/// - `max_command_len`: Maximum command length, excluding the line terminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangefinderConfig {
    pub trigger_pin: usize,
    pub echo_pin: usize,
    pub uart_num: usize,
    pub uart_tx_pin: usize,
    pub uart_rx_pin: usize,
    pub baudrate: u32,
    pub trigger_pulse_us: u32,
    pub echo_timeout_us: u64,
    pub settle_delay_ms: u32,
    pub loop_period_ms: u32,
    pub char_timeout_ms: u32,
    pub max_command_len: usize,
}

impl Default for RangefinderConfig {
    fn default() -> Self {
        RangefinderConfig {
            trigger_pin: DEFAULT_TRIGGER_PIN,
            echo_pin: DEFAULT_ECHO_PIN,
            uart_num: DEFAULT_UART_NUM,
            uart_tx_pin: DEFAULT_UART_TX_PIN,
            uart_rx_pin: DEFAULT_UART_RX_PIN,
            baudrate: DEFAULT_BAUDRATE,
            trigger_pulse_us: DEFAULT_TRIGGER_PULSE_US,
            echo_timeout_us: DEFAULT_ECHO_TIMEOUT_US,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            loop_period_ms: DEFAULT_LOOP_PERIOD_MS,
            char_timeout_ms: DEFAULT_CHAR_TIMEOUT_MS,
            max_command_len: DEFAULT_MAX_COMMAND_LEN,
        }
    }
}

impl RangefinderConfig {
    pub fn with_pins(mut self, trigger_pin: usize, echo_pin: usize) -> Self {
        self.trigger_pin = trigger_pin;
        self.echo_pin = echo_pin;
        self
    }

    pub fn with_loop_period_ms(mut self, loop_period_ms: u32) -> Self {
        self.loop_period_ms = loop_period_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_sensor_timing() {
        let config = RangefinderConfig::default();
        assert_eq!((config.trigger_pin, config.echo_pin), (5, 6));
        assert_eq!(config.trigger_pulse_us, 10);
        assert_eq!(config.echo_timeout_us, 30_000);
        assert_eq!(config.settle_delay_ms, 30);
        assert_eq!(config.loop_period_ms, 500);
        assert_eq!(config.char_timeout_ms, 100);
        assert_eq!(config.max_command_len, 9);
    }

    #[test]
    fn builders_override_single_fields() {
        let config = RangefinderConfig::default().with_pins(2, 3).with_loop_period_ms(1_000);
        assert_eq!((config.trigger_pin, config.echo_pin), (2, 3));
        assert_eq!((config.uart_tx_pin, config.uart_rx_pin), (16, 17));
        assert_eq!(config.loop_period_ms, 1_000);
        assert_eq!(config.settle_delay_ms, 30);
    }
}
