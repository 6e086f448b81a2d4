use std::io::Write;

use crate::{
    platform::{TimeOfDay, WallClock},
    ranging::CycleOutcome,
    utils::rangefinder_error::RangefinderError,
};

use super::Command;

pub const BANNER: &str = "Digite 'Start' para iniciar e 'Stop' para parar.";
pub const STARTED_ACK: &str = "Leitura iniciada.";
pub const STOPPED_ACK: &str = "Leitura parada.";
pub const FAILURE_MARKER: &str = "Falha";

/// Formats the report line of a cycle, `None` when there is nothing to report
///
/// # Example
///
/// ```
/// use esp32_rangefinder::{platform::TimeOfDay, ranging::CycleOutcome, serial::format_report_line};
///
/// let line = format_report_line(TimeOfDay::new(9, 5, 7), &CycleOutcome::TimedOut);
/// assert_eq!(line.as_deref(), Some("09:05:07 - Falha"));
/// ```
pub fn format_report_line(time: TimeOfDay, outcome: &CycleOutcome) -> Option<String> {
    let timestamp = format!("{:02}:{:02}:{:02}", time.hour, time.minute, time.second);
    match outcome {
        CycleOutcome::Distance(distance) => Some(format!("{} - {}", timestamp, distance)),
        CycleOutcome::TimedOut => Some(format!("{} - {}", timestamp, FAILURE_MARKER)),
        CycleOutcome::NoEcho => None,
    }
}

/// Writes the banner, the acknowledgments and the timestamped results to a text stream
pub struct Reporter<W: Write, K: WallClock> {
    output: W,
    clock: K,
}

impl<W: Write, K: WallClock> Reporter<W, K> {
    pub fn new(output: W, clock: K) -> Self {
        Reporter { output, clock }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn banner(&mut self) -> Result<(), RangefinderError> {
        self.write_line(BANNER)
    }

    pub fn acknowledge(&mut self, command: Command) -> Result<(), RangefinderError> {
        match command {
            Command::Start => self.write_line(STARTED_ACK),
            Command::Stop => self.write_line(STOPPED_ACK),
            Command::Unknown => Ok(()),
        }
    }

    /// Prints the outcome of a cycle stamped with the current time of day
    pub fn report(&mut self, outcome: &CycleOutcome) -> Result<(), RangefinderError> {
        match format_report_line(self.clock.time_of_day(), outcome) {
            Some(line) => self.write_line(&line),
            None => Ok(()),
        }
    }

    fn write_line(&mut self, line: &str) -> Result<(), RangefinderError> {
        writeln!(self.output, "{}", line)?;
        self.output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{platform::mock::MockWallClock, ranging::Distance};

    fn written(reporter: &Reporter<Vec<u8>, MockWallClock>) -> String {
        String::from_utf8(reporter.output().clone()).unwrap()
    }

    #[test]
    fn distance_line_has_two_decimals_and_unit() {
        let line = format_report_line(TimeOfDay::new(14, 3, 9), &CycleOutcome::Distance(Distance::from_echo_us(2_000)));
        assert_eq!(line.as_deref(), Some("14:03:09 - 34.30 cm"));
    }

    #[test]
    fn no_echo_is_not_reported() {
        let mut reporter = Reporter::new(Vec::new(), MockWallClock::at(1, 2, 3));
        reporter.report(&CycleOutcome::NoEcho).unwrap();
        assert!(reporter.output().is_empty());
    }

    #[test]
    fn report_uses_the_wall_clock() {
        let mut reporter = Reporter::new(Vec::new(), MockWallClock::at(23, 59, 1));
        reporter.report(&CycleOutcome::TimedOut).unwrap();
        reporter.report(&CycleOutcome::Distance(Distance::from_echo_us(58))).unwrap();
        assert_eq!(written(&reporter), "23:59:01 - Falha\n23:59:01 - 0.99 cm\n");
    }

    #[test]
    fn banner_and_acknowledgments() {
        let mut reporter = Reporter::new(Vec::new(), MockWallClock::default());
        reporter.banner().unwrap();
        reporter.acknowledge(Command::Unknown).unwrap();
        reporter.acknowledge(Command::Stop).unwrap();
        assert_eq!(written(&reporter), format!("{}\n{}\n", BANNER, STOPPED_ACK));
    }
}
