use std::io::Write;

use log::{error, info};

use crate::{
    config::RangefinderConfig,
    platform::{CharSource, Delay, MonotonicClock, TriggerOutput, WallClock},
    ranging::{CycleOutcome, RangingProtocol},
    serial::{CommandLine, Reporter, RunState},
    utils::rangefinder_error::RangefinderError,
};

/// The whole application: serial commands toggle periodic ranging, and every cycle is reported
/// on the output stream.
///
/// - `run_state`: Whether ranging is enabled, only changed by the command line
/// - `protocol`: Ranging protocol of the sensor, its delay also paces the loop
/// - `command_line`: Source of the Start and Stop commands
/// - `reporter`: Destination of acknowledgments and report lines
/// - `loop_period_ms`: Wait at the end of every loop iteration
pub struct Rangefinder<T, C, D, S, W, K>
where
    T: TriggerOutput,
    C: MonotonicClock,
    D: Delay,
    S: CharSource,
    W: Write,
    K: WallClock,
{
    run_state: RunState,
    protocol: RangingProtocol<T, C, D>,
    command_line: CommandLine<S>,
    reporter: Reporter<W, K>,
    loop_period_ms: u32,
}

impl<T, C, D, S, W, K> Rangefinder<T, C, D, S, W, K>
where
    T: TriggerOutput,
    C: MonotonicClock,
    D: Delay,
    S: CharSource,
    W: Write,
    K: WallClock,
{
    /// Creates a new Rangefinder, disabled until a Start command arrives
    pub fn new(protocol: RangingProtocol<T, C, D>, command_line: CommandLine<S>, reporter: Reporter<W, K>, config: &RangefinderConfig) -> Self {
        Rangefinder {
            run_state: RunState::new(),
            protocol,
            command_line,
            reporter,
            loop_period_ms: config.loop_period_ms,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.run_state.is_enabled()
    }

    pub fn reporter(&self) -> &Reporter<W, K> {
        &self.reporter
    }

    pub fn command_line_mut(&mut self) -> &mut CommandLine<S> {
        &mut self.command_line
    }

    /// Runs one loop iteration: reads a command, ranges once if enabled and waits the loop
    /// period. The wait happens even when the iteration fails.
    ///
    /// # Returns
    ///
    /// A `Result` with the outcome of the cycle, `None` if ranging is disabled.
    ///
    /// # Errors
    ///
    /// - `RangefinderError::Uart`: If the command could not be read
    /// - `RangefinderError::Trigger`: If the trigger pulse could not be emitted
    /// - `RangefinderError::Report`: If the output stream failed
    pub fn tick(&mut self) -> Result<Option<CycleOutcome>, RangefinderError> {
        let result = self.step();
        self.protocol.delay_mut().delay_ms(self.loop_period_ms);
        result
    }

    fn step(&mut self) -> Result<Option<CycleOutcome>, RangefinderError> {
        self.command_line.poll(&self.run_state, &mut self.reporter)?;
        if !self.run_state.is_enabled() {
            return Ok(None);
        }
        let outcome = self.protocol.measure()?;
        self.reporter.report(&outcome)?;
        Ok(Some(outcome))
    }

    /// Prints the banner and loops forever. Failed iterations are logged and the loop goes on.
    ///
    /// # Errors
    ///
    /// - `RangefinderError::Report`: If the banner could not be written
    pub fn run(&mut self) -> Result<(), RangefinderError> {
        self.reporter.banner()?;
        info!("Rangefinder ready");
        loop {
            if let Err(err) = self.tick() {
                error!("Loop iteration failed: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        platform::mock::{EchoResponse, MockClock, MockDelay, MockSerial, MockTrigger, MockWallClock, Simulation},
        ranging::{Distance, Edge},
        utils::rangefinder_error::DigitalOutError,
    };

    type TestRangefinder = Rangefinder<MockTrigger, MockClock, MockDelay, MockSerial, Vec<u8>, MockWallClock>;

    fn rangefinder(sim: &Simulation, input: &str) -> TestRangefinder {
        let config = RangefinderConfig::default();
        let protocol = RangingProtocol::new(sim.trigger(), sim.clock(), sim.delay(), sim.capture(), &config);
        let mut serial = sim.serial();
        serial.feed(input);
        let command_line = CommandLine::new(serial, &config);
        let reporter = Reporter::new(Vec::new(), MockWallClock::at(12, 34, 56));
        Rangefinder::new(protocol, command_line, reporter, &config)
    }

    fn output(rangefinder: &TestRangefinder) -> String {
        String::from_utf8(rangefinder.reporter().output().clone()).unwrap()
    }

    #[test]
    fn start_then_echo_reports_the_distance() {
        let sim = Simulation::new(30_000);
        sim.schedule_edge_at(1_000, Edge::Rising);
        sim.schedule_edge_at(1_058, Edge::Falling);
        let mut rangefinder = rangefinder(&sim, "Start\n");

        let outcome = rangefinder.tick().unwrap();

        assert_eq!(outcome, Some(CycleOutcome::Distance(Distance::from_echo_us(58))));
        assert_eq!(output(&rangefinder), "Leitura iniciada.\n12:34:56 - 0.99 cm\n");
        assert!(rangefinder.is_enabled());
        assert_eq!(sim.pulse_widths(), vec![10]);
    }

    #[test]
    fn start_then_missing_falling_edge_reports_failure() {
        let sim = Simulation::new(30_000);
        sim.schedule_edge_at(1_000, Edge::Rising);
        let mut rangefinder = rangefinder(&sim, "Start\n");

        let outcome = rangefinder.tick().unwrap();

        assert_eq!(outcome, Some(CycleOutcome::TimedOut));
        assert_eq!(output(&rangefinder), "Leitura iniciada.\n12:34:56 - Falha\n");
        assert_eq!(sim.fired_alarms(), 1);
    }

    #[test]
    fn stop_without_start_only_acknowledges() {
        let sim = Simulation::new(30_000);
        let mut rangefinder = rangefinder(&sim, "Stop\n");

        assert_eq!(rangefinder.tick().unwrap(), None);

        assert_eq!(output(&rangefinder), "Leitura parada.\n");
        assert!(!rangefinder.is_enabled());
        assert!(sim.pulse_widths().is_empty());
    }

    #[test]
    fn disabled_loop_never_triggers_but_keeps_its_cadence() {
        let sim = Simulation::new(30_000);
        let mut rangefinder = rangefinder(&sim, "start\n");

        for _ in 0..3 {
            assert_eq!(rangefinder.tick().unwrap(), None);
        }

        // The first token ends on its terminator, the other two reads wait out their timeout
        assert!(sim.pulse_widths().is_empty());
        assert_eq!(output(&rangefinder), "");
        assert_eq!(sim.now_us(), 3 * 500_000 + 2 * 100_000);
    }

    #[test]
    fn ranging_continues_until_stop() {
        let sim = Simulation::new(30_000);
        sim.push_echo(EchoResponse::Echo { delay_us: 500, width_us: 2_000 });
        sim.push_echo(EchoResponse::NoFallingEdge { delay_us: 500 });
        let mut rangefinder = rangefinder(&sim, "Start\n");

        assert_eq!(rangefinder.tick().unwrap(), Some(CycleOutcome::Distance(Distance::from_echo_us(2_000))));
        assert_eq!(rangefinder.tick().unwrap(), Some(CycleOutcome::TimedOut));
        rangefinder.command_line_mut().source_mut().feed("Stop\n");
        assert_eq!(rangefinder.tick().unwrap(), None);

        assert_eq!(sim.pulse_widths().len(), 2);
        assert_eq!(
            output(&rangefinder),
            "Leitura iniciada.\n12:34:56 - 34.30 cm\n12:34:56 - Falha\nLeitura parada.\n"
        );
    }

    #[test]
    fn failed_iteration_still_waits_the_loop_period() {
        let sim = Simulation::new(30_000);
        sim.fail_trigger(DigitalOutError::InvalidPin);
        let mut rangefinder = rangefinder(&sim, "Start\n");

        let result = rangefinder.tick();

        assert!(matches!(result, Err(RangefinderError::Trigger(DigitalOutError::InvalidPin))));
        assert_eq!(sim.now_us(), 500_000);
        assert_eq!(output(&rangefinder), "Leitura iniciada.\n");
    }
}
