use std::{
    io::Write,
    sync::atomic::{AtomicBool, Ordering},
};

use log::info;

use crate::{
    config::RangefinderConfig,
    platform::{CharSource, WallClock},
    utils::rangefinder_error::RangefinderError,
};

use super::Reporter;

const START_COMMAND: &[u8] = b"Start";
const STOP_COMMAND: &[u8] = b"Stop";

/// Commands understood over the serial line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Unknown,
}

impl Command {
    /// Matches a whole token, byte by byte. Case and trailing bytes matter: `"start"`,
    /// `"Start "` and `"Start\0"` are all unknown.
    pub fn parse(token: &[u8]) -> Command {
        match token {
            START_COMMAND => Command::Start,
            STOP_COMMAND => Command::Stop,
            _ => Command::Unknown,
        }
    }
}

/// Whether periodic ranging is enabled. Only the command line changes it.
#[derive(Debug, Default)]
pub struct RunState {
    enabled: AtomicBool,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

/// Reads commands from a character stream, one bounded token per call
pub struct CommandLine<S: CharSource> {
    source: S,
    char_timeout_ms: u32,
    max_len: usize,
}

impl<S: CharSource> CommandLine<S> {
    pub fn new(source: S, config: &RangefinderConfig) -> Self {
        CommandLine {
            source,
            char_timeout_ms: config.char_timeout_ms,
            max_len: config.max_command_len,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Reads one token: characters are accumulated until a line terminator, a read that times
    /// out, or the maximum length. Whatever was accumulated is the token.
    pub fn read_token(&mut self) -> Result<Vec<u8>, RangefinderError> {
        let mut token = Vec::with_capacity(self.max_len);
        while token.len() < self.max_len {
            match self.source.read_char(self.char_timeout_ms)? {
                None | Some(b'\n') | Some(b'\r') => break,
                Some(byte) => token.push(byte),
            }
        }
        Ok(token)
    }

    pub fn read_command(&mut self) -> Result<Command, RangefinderError> {
        Ok(Command::parse(&self.read_token()?))
    }

    /// Reads a command and applies it to the run state, acknowledging Start and Stop.
    ///
    /// # Returns
    ///
    /// The recognised command, `None` if the token was empty or unknown.
    pub fn poll<W: Write, K: WallClock>(&mut self, run_state: &RunState, reporter: &mut Reporter<W, K>) -> Result<Option<Command>, RangefinderError> {
        let command = self.read_command()?;
        match command {
            Command::Start => run_state.set_enabled(true),
            Command::Stop => run_state.set_enabled(false),
            Command::Unknown => return Ok(None),
        }
        info!("Received {:?}, ranging enabled: {}", command, run_state.is_enabled());
        reporter.acknowledge(command)?;
        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::{MockSerial, MockWallClock, Simulation};

    fn command_line(input: &str) -> CommandLine<MockSerial> {
        let mut serial = MockSerial::new();
        serial.feed(input);
        CommandLine::new(serial, &RangefinderConfig::default())
    }

    #[test]
    fn parse_is_exact_and_case_sensitive() {
        assert_eq!(Command::parse(b"Start"), Command::Start);
        assert_eq!(Command::parse(b"Stop"), Command::Stop);
        assert_eq!(Command::parse(b"start"), Command::Unknown);
        assert_eq!(Command::parse(b"START "), Command::Unknown);
        assert_eq!(Command::parse(b"Start\0extra"), Command::Unknown);
        assert_eq!(Command::parse(b"Star"), Command::Unknown);
        assert_eq!(Command::parse(b""), Command::Unknown);
    }

    #[test]
    fn token_ends_on_newline_or_carriage_return() {
        assert_eq!(command_line("Start\nStop").read_command().unwrap(), Command::Start);
        assert_eq!(command_line("Stop\r\n").read_command().unwrap(), Command::Stop);
    }

    #[test]
    fn token_ends_when_a_read_times_out() {
        let mut serial = MockSerial::new();
        serial.feed("Sto");
        serial.feed_pause();
        serial.feed("p\n");
        let mut command_line = CommandLine::new(serial, &RangefinderConfig::default());

        assert_eq!(command_line.read_token().unwrap(), b"Sto".to_vec());
        assert_eq!(command_line.read_token().unwrap(), b"p".to_vec());
    }

    #[test]
    fn command_without_terminator_is_matched_after_the_timeout() {
        let mut command_line = command_line("Start");
        assert_eq!(command_line.read_command().unwrap(), Command::Start);
        assert_eq!(command_line.source().reads(), 6);
    }

    #[test]
    fn unterminated_command_costs_one_character_timeout() {
        let sim = Simulation::new(30_000);
        let mut serial = sim.serial();
        serial.feed("Start");
        let mut command_line = CommandLine::new(serial, &RangefinderConfig::default());

        assert_eq!(command_line.read_command().unwrap(), Command::Start);

        assert_eq!(sim.now_us(), 100_000);
        assert_eq!(command_line.source().timeouts_ms(), &[100; 6]);
    }

    #[test]
    fn character_timeout_follows_the_configuration() {
        let mut config = RangefinderConfig::default();
        config.char_timeout_ms = 250;
        let mut command_line = CommandLine::new(MockSerial::new(), &config);

        assert_eq!(command_line.read_token().unwrap(), Vec::<u8>::new());
        assert_eq!(command_line.source().timeouts_ms(), &[250]);
    }

    #[test]
    fn token_is_bounded_to_the_maximum_length() {
        let mut command_line = command_line("StartStartStart\n");
        assert_eq!(command_line.read_token().unwrap(), b"StartStar".to_vec());
        assert_eq!(command_line.source().pending(), 7);
    }

    #[test]
    fn embedded_nul_does_not_match() {
        let mut serial = MockSerial::new();
        serial.feed_bytes(b"Start\0ex\n");
        let mut command_line = CommandLine::new(serial, &RangefinderConfig::default());
        assert_eq!(command_line.read_command().unwrap(), Command::Unknown);
    }

    #[test]
    fn poll_toggles_the_run_state_and_acknowledges() {
        let run_state = RunState::new();
        let mut reporter = Reporter::new(Vec::new(), MockWallClock::default());
        let mut command_line = command_line("Start\nStop\nstart\n");

        assert_eq!(command_line.poll(&run_state, &mut reporter).unwrap(), Some(Command::Start));
        assert!(run_state.is_enabled());
        assert_eq!(command_line.poll(&run_state, &mut reporter).unwrap(), Some(Command::Stop));
        assert!(!run_state.is_enabled());
        assert_eq!(command_line.poll(&run_state, &mut reporter).unwrap(), None);
        assert!(!run_state.is_enabled());

        let output = String::from_utf8(reporter.output().clone()).unwrap();
        assert_eq!(output, "Leitura iniciada.\nLeitura parada.\n");
    }
}
