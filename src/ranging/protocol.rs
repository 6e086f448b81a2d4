use std::sync::Arc;

use log::{debug, warn};

use crate::{
    config::RangefinderConfig,
    platform::{Delay, MonotonicClock, TriggerOutput},
    utils::rangefinder_error::RangefinderError,
};

use super::{CycleId, CycleOutcome, EchoCapture, EchoHandler, Phase};

/// Trigger is held low this long before the pulse to get a clean rising edge
const CLEAN_EDGE_US: u32 = 2;
/// Extra wait after the guard deadline so its interrupt has surely been served
const GUARD_GRACE_US: u32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    Idle,
    Triggered,
}

/// Trigger and echo ranging protocol of the HC-SR04.
///
/// Each call to [RangingProtocol::measure] runs one cycle: the trigger pulse is emitted, the
/// echo is captured asynchronously by the interrupts feeding the shared [EchoCapture] and,
/// once the settle delay has passed, the result of the cycle is read and the cycle closed.
/// The protocol never writes the capture while a cycle is open, it only opens and closes it.
pub struct RangingProtocol<T: TriggerOutput, C: MonotonicClock, D: Delay> {
    trigger: T,
    clock: C,
    delay: D,
    capture: Arc<EchoCapture>,
    state: ProtocolState,
    trigger_pulse_us: u32,
    settle_delay_ms: u32,
    echo_timeout_us: u64,
}

impl<T: TriggerOutput, C: MonotonicClock, D: Delay> RangingProtocol<T, C, D> {
    /// Creates a new RangingProtocol. The capture must be the one the echo interrupt feeds.
    pub fn new(trigger: T, clock: C, delay: D, capture: Arc<EchoCapture>, config: &RangefinderConfig) -> Self {
        RangingProtocol {
            trigger,
            clock,
            delay,
            capture,
            state: ProtocolState::Idle,
            trigger_pulse_us: config.trigger_pulse_us,
            settle_delay_ms: config.settle_delay_ms,
            echo_timeout_us: config.echo_timeout_us,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn capture(&self) -> &Arc<EchoCapture> {
        &self.capture
    }

    pub fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }

    /// Runs one measurement cycle.
    ///
    /// # Returns
    ///
    /// A `Result` with the `CycleOutcome` of the cycle. A timeout is a normal outcome, not an
    /// error.
    ///
    /// # Errors
    ///
    /// - `RangefinderError::Trigger`: If the trigger pulse could not be emitted. The cycle is
    ///   closed anyway so the next one starts clean.
    pub fn measure(&mut self) -> Result<CycleOutcome, RangefinderError> {
        let ignored_before = self.capture.ignored_events();
        let cycle = self.capture.open_cycle();
        self.state = ProtocolState::Triggered;

        let result = self.run_cycle(cycle);

        self.capture.close_cycle();
        self.state = ProtocolState::Idle;
        if let Ok(outcome) = &result {
            debug!("Cycle {} finished: {:?}", cycle, outcome);
        }
        // The callbacks cannot log from interrupt context, spurious edges are reported here
        let ignored = self.capture.ignored_events().wrapping_sub(ignored_before);
        if ignored > 0 {
            debug!("Cycle {} ignored {} spurious edges", cycle, ignored);
        }
        result
    }

    fn run_cycle(&mut self, cycle: CycleId) -> Result<CycleOutcome, RangefinderError> {
        self.emit_pulse()?;
        self.delay.delay_ms(self.settle_delay_ms);
        self.wait_for_guard(cycle);
        Ok(self.capture.outcome())
    }

    fn emit_pulse(&mut self) -> Result<(), RangefinderError> {
        self.trigger.set_low()?;
        self.delay.delay_us(CLEAN_EDGE_US);
        self.trigger.set_high()?;
        self.delay.delay_us(self.trigger_pulse_us);
        self.trigger.set_low()
    }

    /// The guard is armed on the rising edge, which comes after the trigger, so it can outlive
    /// the settle delay. Waits for its deadline and, if the platform alarm still did not fire,
    /// expires the cycle through the same transition the guard uses.
    fn wait_for_guard(&mut self, cycle: CycleId) {
        if self.capture.phase() != Phase::Echoing {
            return;
        }
        let Some(start_us) = self.capture.start_us() else {
            return;
        };

        let elapsed_us = (self.clock.now_us() as u32).wrapping_sub(start_us) as u64;
        if elapsed_us < self.echo_timeout_us {
            let remaining_us = (self.echo_timeout_us - elapsed_us).min(u32::MAX as u64) as u32;
            self.delay.delay_us(remaining_us.saturating_add(GUARD_GRACE_US));
        }

        if self.capture.phase() == Phase::Echoing {
            warn!("Timeout guard of cycle {} did not fire, expiring it", cycle);
            self.capture.on_timeout(cycle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        platform::mock::{EchoResponse, Simulation},
        ranging::Distance,
        utils::rangefinder_error::DigitalOutError,
    };

    fn protocol(sim: &Simulation) -> RangingProtocol<crate::platform::mock::MockTrigger, crate::platform::mock::MockClock, crate::platform::mock::MockDelay> {
        RangingProtocol::new(sim.trigger(), sim.clock(), sim.delay(), sim.capture(), &RangefinderConfig::default())
    }

    #[test]
    fn measure_emits_a_single_ten_microsecond_pulse() {
        let sim = Simulation::new(30_000);
        let mut protocol = protocol(&sim);

        protocol.measure().unwrap();

        assert_eq!(sim.pulse_widths(), vec![10]);
        assert_eq!(protocol.state(), ProtocolState::Idle);
    }

    #[test]
    fn echo_inside_the_window_gives_its_distance() {
        let sim = Simulation::new(30_000);
        sim.schedule_edge_at(1_000, crate::ranging::Edge::Rising);
        sim.schedule_edge_at(1_058, crate::ranging::Edge::Falling);
        let mut protocol = protocol(&sim);

        let outcome = protocol.measure().unwrap();

        assert_eq!(outcome, CycleOutcome::Distance(Distance::from_echo_us(58)));
    }

    #[test]
    fn missing_falling_edge_times_out_after_the_guard_deadline() {
        let sim = Simulation::new(30_000);
        sim.schedule_edge_at(1_000, crate::ranging::Edge::Rising);
        let mut protocol = protocol(&sim);

        let outcome = protocol.measure().unwrap();

        assert_eq!(outcome, CycleOutcome::TimedOut);
        assert!(sim.now_us() >= 31_000);
        assert_eq!(sim.fired_alarms(), 1);
    }

    #[test]
    fn cycle_expires_even_if_the_alarm_never_fires() {
        let sim = Simulation::new(30_000);
        sim.disable_alarms();
        sim.push_echo(EchoResponse::NoFallingEdge { delay_us: 400 });
        let mut protocol = protocol(&sim);

        assert_eq!(protocol.measure().unwrap(), CycleOutcome::TimedOut);
    }

    #[test]
    fn silent_sensor_reports_nothing() {
        let sim = Simulation::new(30_000);
        sim.push_echo(EchoResponse::Silent);
        let mut protocol = protocol(&sim);

        assert_eq!(protocol.measure().unwrap(), CycleOutcome::NoEcho);
        assert_eq!(sim.now_us(), 30_012);
    }

    #[test]
    fn consecutive_cycles_do_not_leak_into_each_other() {
        let sim = Simulation::new(30_000);
        sim.push_echo(EchoResponse::Echo { delay_us: 400, width_us: 2_000 });
        sim.push_echo(EchoResponse::NoFallingEdge { delay_us: 400 });
        sim.push_echo(EchoResponse::Echo { delay_us: 400, width_us: 583 });
        let mut protocol = protocol(&sim);

        assert_eq!(protocol.measure().unwrap(), CycleOutcome::Distance(Distance::from_echo_us(2_000)));
        assert_eq!(protocol.measure().unwrap(), CycleOutcome::TimedOut);
        assert_eq!(protocol.measure().unwrap(), CycleOutcome::Distance(Distance::from_echo_us(583)));
    }

    #[test]
    fn guard_alarm_after_a_captured_echo_is_a_late_timeout() {
        let sim = Simulation::new(30_000);
        let mut protocol = protocol(&sim);

        for _ in 0..3 {
            sim.push_echo(EchoResponse::Echo { delay_us: 400, width_us: 1_000 });
            assert_eq!(protocol.measure().unwrap(), CycleOutcome::Distance(Distance::from_echo_us(1_000)));
            protocol.delay_mut().delay_ms(500);
        }

        assert_eq!(sim.fired_alarms(), 3);
        assert_eq!(sim.capture().late_timeouts(), 3);
        assert_eq!(sim.capture().ignored_events(), 0);
    }

    #[test]
    fn trigger_failure_closes_the_cycle() {
        let sim = Simulation::new(30_000);
        sim.fail_trigger(DigitalOutError::InvalidPin);
        let mut protocol = protocol(&sim);

        let err = protocol.measure().unwrap_err();

        assert!(matches!(err, RangefinderError::Trigger(DigitalOutError::InvalidPin)));
        assert_eq!(sim.capture().phase(), Phase::Idle);
        assert_eq!(protocol.state(), ProtocolState::Idle);
    }
}
