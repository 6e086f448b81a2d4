//! Simulated platform for host tests.
//!
//! Time is virtual: it only moves when the code under test calls [Delay]. While time moves,
//! the scheduled echo edges and the armed timeout alarm are dispatched in time order exactly
//! as the interrupts would be, so whole measurement cycles run deterministically.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, VecDeque},
    sync::Arc,
};

use crate::{
    ranging::{CycleId, EchoCapture, EchoChannel, EchoHandler, Edge},
    utils::{
        auxiliary::{SharableRef, SharableRefExt},
        rangefinder_error::{DigitalOutError, RangefinderError},
    },
};

use super::{CharSource, Delay, MonotonicClock, TimeOfDay, TimeoutGuard, TriggerOutput, WallClock};

/// How the simulated sensor answers a trigger pulse. Delays count from the end of the pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoResponse {
    Echo { delay_us: u64, width_us: u64 },
    NoFallingEdge { delay_us: u64 },
    Silent,
}

struct SimState {
    now_us: u64,
    next_seq: u64,
    edges: BinaryHeap<Reverse<(u64, u64, EdgeCode)>>,
    alarm: Option<(u64, CycleId)>,
    alarms_enabled: bool,
    fired_alarms: usize,
    responses: VecDeque<EchoResponse>,
    trigger_high_since: Option<u64>,
    pulse_widths: Vec<u64>,
    trigger_error: Option<DigitalOutError>,
}

/// `Edge` is not `Ord`, the heap stores it as a code
type EdgeCode = u8;

const RISING: EdgeCode = 0;
const FALLING: EdgeCode = 1;

enum SimEvent {
    Edge(Edge),
    Alarm(CycleId),
}

impl SimState {
    fn schedule_edge(&mut self, at_us: u64, edge: Edge) {
        let code = match edge {
            Edge::Rising => RISING,
            Edge::Falling => FALLING,
        };
        self.edges.push(Reverse((at_us, self.next_seq, code)));
        self.next_seq += 1;
    }

    /// Pops the earliest event due at or before `until_us`. Edges win ties against the alarm.
    fn pop_due(&mut self, until_us: u64) -> Option<SimEvent> {
        let next_edge = self.edges.peek().map(|Reverse((at, _, _))| *at);
        let next_alarm = self.alarm.map(|(at, _)| at);

        let take_edge = match (next_edge, next_alarm) {
            (Some(edge_at), Some(alarm_at)) => edge_at <= alarm_at,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return None,
        };

        if take_edge {
            let Reverse((at, _, code)) = *self.edges.peek()?;
            if at > until_us {
                return None;
            }
            self.edges.pop();
            self.now_us = at;
            let edge = if code == RISING { Edge::Rising } else { Edge::Falling };
            Some(SimEvent::Edge(edge))
        } else {
            let (at, cycle) = self.alarm?;
            if at > until_us {
                return None;
            }
            self.alarm = None;
            self.now_us = at;
            self.fired_alarms += 1;
            Some(SimEvent::Alarm(cycle))
        }
    }

    fn answer_pulse(&mut self) {
        let end_us = self.now_us;
        match self.responses.pop_front() {
            Some(EchoResponse::Echo { delay_us, width_us }) => {
                self.schedule_edge(end_us + delay_us, Edge::Rising);
                self.schedule_edge(end_us + delay_us + width_us, Edge::Falling);
            }
            Some(EchoResponse::NoFallingEdge { delay_us }) => {
                self.schedule_edge(end_us + delay_us, Edge::Rising);
            }
            Some(EchoResponse::Silent) | None => {}
        }
    }
}

/// Owner of the simulated platform. Hands out the trigger, clock and delay handles, which all
/// share the same virtual time.
#[derive(Clone)]
pub struct Simulation {
    state: SharableRef<SimState>,
    channel: SharableRef<EchoChannel<EchoCapture, MockAlarm>>,
    capture: Arc<EchoCapture>,
}

impl Simulation {
    /// Creates a simulation whose echo interrupt arms a `timeout_us` guard on rising edges
    pub fn new(timeout_us: u64) -> Self {
        let state = SharableRef::new_sharable(SimState {
            now_us: 0,
            next_seq: 0,
            edges: BinaryHeap::new(),
            alarm: None,
            alarms_enabled: true,
            fired_alarms: 0,
            responses: VecDeque::new(),
            trigger_high_since: None,
            pulse_widths: Vec::new(),
            trigger_error: None,
        });
        let capture = Arc::new(EchoCapture::new());
        let alarm = MockAlarm { state: state.clone() };
        let channel = SharableRef::new_sharable(EchoChannel::new(capture.clone(), alarm, timeout_us));
        Simulation { state, channel, capture }
    }

    pub fn trigger(&self) -> MockTrigger {
        MockTrigger { state: self.state.clone() }
    }

    pub fn clock(&self) -> MockClock {
        MockClock { state: self.state.clone() }
    }

    /// Serial input whose timed out reads move the virtual time
    pub fn serial(&self) -> MockSerial {
        MockSerial { sim: Some(self.clone()), ..MockSerial::default() }
    }

    pub fn delay(&self) -> MockDelay {
        MockDelay { sim: self.clone() }
    }

    pub fn capture(&self) -> Arc<EchoCapture> {
        self.capture.clone()
    }

    pub fn now_us(&self) -> u64 {
        self.state.deref().now_us
    }

    /// Schedules an edge at an absolute time
    pub fn schedule_edge_at(&self, at_us: u64, edge: Edge) {
        self.state.deref_mut().schedule_edge(at_us, edge);
    }

    /// Queues the answer to the next trigger pulse. Pulses without a queued answer stay silent.
    pub fn push_echo(&self, response: EchoResponse) {
        self.state.deref_mut().responses.push_back(response);
    }

    /// Widths of the trigger pulses emitted so far
    pub fn pulse_widths(&self) -> Vec<u64> {
        self.state.deref().pulse_widths.clone()
    }

    pub fn fired_alarms(&self) -> usize {
        self.state.deref().fired_alarms
    }

    /// Arming the guard succeeds but the alarm never fires
    pub fn disable_alarms(&self) {
        self.state.deref_mut().alarms_enabled = false;
    }

    /// Every trigger level change fails with `error`
    pub fn fail_trigger(&self, error: DigitalOutError) {
        self.state.deref_mut().trigger_error = Some(error);
    }

    /// Moves virtual time to `until_us`, dispatching every due event on the way. The state is
    /// never borrowed while a callback runs, callbacks may arm the alarm.
    fn advance_to(&self, until_us: u64) {
        loop {
            let event = self.state.deref_mut().pop_due(until_us);
            match event {
                Some(SimEvent::Edge(edge)) => {
                    let now_us = self.now_us();
                    // The echo interrupt has nowhere to report a failed arm, the protocol
                    // expires the cycle on its own in that case.
                    let _ = self.channel.deref_mut().on_edge(edge, now_us);
                }
                Some(SimEvent::Alarm(cycle)) => self.capture.on_timeout(cycle),
                None => break,
            }
        }
        let mut state = self.state.deref_mut();
        state.now_us = state.now_us.max(until_us);
    }
}

struct MockAlarm {
    state: SharableRef<SimState>,
}

impl TimeoutGuard for MockAlarm {
    fn arm(&mut self, cycle: CycleId, after_us: u64) -> Result<(), RangefinderError> {
        let mut state = self.state.deref_mut();
        if state.alarms_enabled {
            let at_us = state.now_us + after_us;
            state.alarm = Some((at_us, cycle));
        }
        Ok(())
    }
}

/// Trigger pin recording the pulses and answering them with the queued echo responses
pub struct MockTrigger {
    state: SharableRef<SimState>,
}

impl MockTrigger {
    fn check(&self) -> Result<(), RangefinderError> {
        match self.state.deref().trigger_error {
            Some(error) => Err(RangefinderError::Trigger(error)),
            None => Ok(()),
        }
    }
}

impl TriggerOutput for MockTrigger {
    fn set_high(&mut self) -> Result<(), RangefinderError> {
        self.check()?;
        let mut state = self.state.deref_mut();
        if state.trigger_high_since.is_none() {
            state.trigger_high_since = Some(state.now_us);
        }
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), RangefinderError> {
        self.check()?;
        let mut state = self.state.deref_mut();
        if let Some(since) = state.trigger_high_since.take() {
            let width = state.now_us - since;
            state.pulse_widths.push(width);
            state.answer_pulse();
        }
        Ok(())
    }
}

pub struct MockClock {
    state: SharableRef<SimState>,
}

impl MonotonicClock for MockClock {
    fn now_us(&self) -> u64 {
        self.state.deref().now_us
    }
}

pub struct MockDelay {
    sim: Simulation,
}

impl Delay for MockDelay {
    fn delay_us(&mut self, micro_seconds: u32) {
        let until_us = self.sim.now_us() + micro_seconds as u64;
        self.sim.advance_to(until_us);
    }

    fn delay_ms(&mut self, mili_seconds: u32) {
        self.delay_us(mili_seconds.saturating_mul(1_000));
    }
}

/// Scripted serial input. Every queued entry answers one read: a byte, or a read that times
/// out. Once the script is exhausted every read times out. When created from a [Simulation]
/// a read that times out spends its whole timeout of virtual time.
#[derive(Default)]
pub struct MockSerial {
    input: VecDeque<Option<u8>>,
    timeouts_ms: Vec<u32>,
    sim: Option<Simulation>,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, text: &str) {
        self.feed_bytes(text.as_bytes());
    }

    pub fn feed_bytes(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied().map(Some));
    }

    /// The next read times out
    pub fn feed_pause(&mut self) {
        self.input.push_back(None);
    }

    pub fn pending(&self) -> usize {
        self.input.len()
    }

    pub fn reads(&self) -> usize {
        self.timeouts_ms.len()
    }

    /// Timeout passed to every read so far, in order
    pub fn timeouts_ms(&self) -> &[u32] {
        &self.timeouts_ms
    }
}

impl CharSource for MockSerial {
    fn read_char(&mut self, timeout_ms: u32) -> Result<Option<u8>, RangefinderError> {
        self.timeouts_ms.push(timeout_ms);
        let read = self.input.pop_front().flatten();
        if let (None, Some(sim)) = (read, &self.sim) {
            MockDelay { sim: sim.clone() }.delay_ms(timeout_ms);
        }
        Ok(read)
    }
}

/// Wall clock stuck at a fixed time
#[derive(Debug, Clone, Copy, Default)]
pub struct MockWallClock {
    pub time: TimeOfDay,
}

impl MockWallClock {
    pub fn at(hour: u8, minute: u8, second: u8) -> Self {
        MockWallClock { time: TimeOfDay::new(hour, minute, second) }
    }
}

impl WallClock for MockWallClock {
    fn time_of_day(&self) -> TimeOfDay {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranging::Phase;

    #[test]
    fn delay_moves_virtual_time() {
        let sim = Simulation::new(30_000);
        let mut delay = sim.delay();
        delay.delay_us(15);
        delay.delay_ms(2);
        assert_eq!(sim.clock().now_us(), 2_015);
    }

    #[test]
    fn pulse_is_answered_with_the_queued_echo() {
        let sim = Simulation::new(30_000);
        sim.push_echo(EchoResponse::Echo { delay_us: 100, width_us: 50 });
        let capture = sim.capture();
        capture.open_cycle();
        let (mut trigger, mut delay) = (sim.trigger(), sim.delay());

        trigger.set_high().unwrap();
        delay.delay_us(10);
        trigger.set_low().unwrap();
        delay.delay_us(120);
        assert_eq!(capture.phase(), Phase::Echoing);
        delay.delay_us(100);

        assert_eq!(capture.phase(), Phase::Captured);
        assert_eq!(sim.pulse_widths(), vec![10]);
    }

    #[test]
    fn alarm_fires_once_after_the_rising_edge() {
        let sim = Simulation::new(1_000);
        let capture = sim.capture();
        capture.open_cycle();
        sim.schedule_edge_at(100, Edge::Rising);

        sim.delay().delay_us(1_099);
        assert_eq!(capture.phase(), Phase::Echoing);
        sim.delay().delay_us(1);

        assert_eq!(capture.phase(), Phase::TimedOut);
        assert_eq!(sim.fired_alarms(), 1);
    }

    #[test]
    fn serial_script_times_out_when_exhausted() {
        let mut serial = MockSerial::new();
        serial.feed("ab");
        serial.feed_pause();
        assert_eq!(serial.read_char(100).unwrap(), Some(b'a'));
        assert_eq!(serial.read_char(100).unwrap(), Some(b'b'));
        assert_eq!(serial.read_char(100).unwrap(), None);
        assert_eq!(serial.read_char(100).unwrap(), None);
        assert_eq!(serial.reads(), 4);
    }

    #[test]
    fn timed_out_read_spends_its_timeout_in_the_simulation() {
        let sim = Simulation::new(30_000);
        let mut serial = sim.serial();
        serial.feed("a");

        assert_eq!(serial.read_char(100).unwrap(), Some(b'a'));
        assert_eq!(sim.now_us(), 0);
        assert_eq!(serial.read_char(100).unwrap(), None);

        assert_eq!(sim.now_us(), 100_000);
        assert_eq!(serial.timeouts_ms(), &[100, 100]);
    }
}
