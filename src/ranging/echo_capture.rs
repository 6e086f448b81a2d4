use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use super::Distance;

type AtomicPhaseCode = AtomicU8;

/// Identifies a measurement cycle. Wraps around, only equality between ids is meaningful.
pub type CycleId = u32;

/// Transitions of the echo pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

/// Callbacks of the echo pin interrupt and of the timeout guard. Implementations must be
/// callable from interrupt context: no blocking, no allocation, no logging.
pub trait EchoHandler: Send + Sync {
    /// Returns the cycle the timeout guard must be armed for, or `None` if the edge was ignored
    fn on_rising_edge(&self, now_us: u64) -> Option<CycleId>;

    fn on_falling_edge(&self, now_us: u64);

    fn on_timeout(&self, cycle: CycleId);
}

/// Result of one measurement cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    Distance(Distance),
    TimedOut,
    /// Nothing usable was captured, there is nothing to report
    NoEcho,
}

/// Where the current cycle is. Stored as a code in an atomic, every transition done by a
/// callback is a compare and swap from the phase it expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingEcho,
    Echoing,
    Captured,
    TimedOut,
}

impl Phase {
    fn get_code(self) -> u8 {
        self as u8
    }

    fn get_atomic_code(self) -> AtomicPhaseCode {
        AtomicPhaseCode::new(self.get_code())
    }

    fn from_code(code: u8) -> Self {
        match code {
            x if x == Self::AwaitingEcho.get_code() => Self::AwaitingEcho,
            x if x == Self::Echoing.get_code() => Self::Echoing,
            x if x == Self::Captured.get_code() => Self::Captured,
            x if x == Self::TimedOut.get_code() => Self::TimedOut,
            _ => Self::Idle,
        }
    }
}

/// State of the measurement cycle shared between the main loop and the interrupts.
///
/// - `phase`: Written by the main loop only when opening and closing a cycle, when no edge can
///   be in flight. Callbacks advance it with compare and swap.
/// - `cycle`: Id of the open cycle. Written only when opening a cycle.
/// - `start_us` / `end_us`: Written by the rising and falling edge callbacks before the phase
///   transition that publishes them. Cleared when opening a cycle so a value from a previous
///   cycle can never be read.
/// - `ignored`: Amount of edges discarded by the spurious event policy.
/// - `late_timeouts`: Amount of guard alarms that found their cycle already resolved or closed.
///   Every cycle with a captured echo ends with one.
///
/// Timestamps are wrapping 32 bit microseconds, the ESP32-C6 has no 64 bit atomics. An echo
/// lasts at most a few tens of milliseconds so the wrap around is harmless.
#[derive(Debug)]
pub struct EchoCapture {
    phase: AtomicPhaseCode,
    cycle: AtomicU32,
    start_us: AtomicU32,
    end_us: AtomicU32,
    ignored: AtomicU32,
    late_timeouts: AtomicU32,
}

impl Default for EchoCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl EchoCapture {
    pub fn new() -> Self {
        EchoCapture {
            phase: Phase::Idle.get_atomic_code(),
            cycle: AtomicU32::new(0),
            start_us: AtomicU32::new(0),
            end_us: AtomicU32::new(0),
            ignored: AtomicU32::new(0),
            late_timeouts: AtomicU32::new(0),
        }
    }

    pub fn phase(&self) -> Phase {
        Phase::from_code(self.phase.load(Ordering::Acquire))
    }

    pub fn current_cycle(&self) -> CycleId {
        self.cycle.load(Ordering::Acquire)
    }

    /// Amount of edges that did not belong to an open cycle
    pub fn ignored_events(&self) -> u32 {
        self.ignored.load(Ordering::Relaxed)
    }

    /// Amount of timeouts that arrived once their cycle was already resolved or closed
    pub fn late_timeouts(&self) -> u32 {
        self.late_timeouts.load(Ordering::Relaxed)
    }

    /// Rising edge timestamp of the open cycle, if one was seen
    pub fn start_us(&self) -> Option<u32> {
        match self.phase() {
            Phase::Echoing | Phase::Captured | Phase::TimedOut => Some(self.start_us.load(Ordering::Acquire)),
            Phase::Idle | Phase::AwaitingEcho => None,
        }
    }

    /// Opens a new cycle and returns its id. Must be called before the trigger pulse.
    pub fn open_cycle(&self) -> CycleId {
        self.start_us.store(0, Ordering::Relaxed);
        self.end_us.store(0, Ordering::Relaxed);
        let cycle = self.cycle.load(Ordering::Relaxed).wrapping_add(1);
        self.cycle.store(cycle, Ordering::Release);
        self.phase.store(Phase::AwaitingEcho.get_code(), Ordering::Release);
        cycle
    }

    /// Reads the result of the open cycle
    ///
    /// # Returns
    ///
    /// - `CycleOutcome::TimedOut` if the timeout guard resolved the cycle.
    /// - `CycleOutcome::Distance` if the falling edge resolved it after the rising edge.
    /// - `CycleOutcome::NoEcho` otherwise, including a cycle that is still echoing.
    pub fn outcome(&self) -> CycleOutcome {
        match self.phase() {
            Phase::TimedOut => CycleOutcome::TimedOut,
            Phase::Captured => {
                let start = self.start_us.load(Ordering::Acquire);
                let end = self.end_us.load(Ordering::Acquire);
                match end.wrapping_sub(start) {
                    0 => CycleOutcome::NoEcho,
                    echo_us => CycleOutcome::Distance(Distance::from_echo_us(echo_us)),
                }
            }
            Phase::Idle | Phase::AwaitingEcho | Phase::Echoing => CycleOutcome::NoEcho,
        }
    }

    /// Closes the cycle. Any callback arriving afterwards is ignored until the next cycle opens.
    pub fn close_cycle(&self) {
        self.phase.store(Phase::Idle.get_code(), Ordering::Release);
    }

    fn advance(&self, from: Phase, to: Phase) -> bool {
        self.phase
            .compare_exchange(from.get_code(), to.get_code(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn ignore(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }
}

impl EchoHandler for EchoCapture {
    fn on_rising_edge(&self, now_us: u64) -> Option<CycleId> {
        // The timestamp is written before the phase is published, a second rising edge
        // fails the swap and leaves the first start time untouched.
        if self.phase() != Phase::AwaitingEcho {
            self.ignore();
            return None;
        }
        self.start_us.store(now_us as u32, Ordering::Release);
        if self.advance(Phase::AwaitingEcho, Phase::Echoing) {
            Some(self.current_cycle())
        } else {
            self.ignore();
            None
        }
    }

    fn on_falling_edge(&self, now_us: u64) {
        if self.phase() != Phase::Echoing {
            self.ignore();
            return;
        }
        self.end_us.store(now_us as u32, Ordering::Release);
        if !self.advance(Phase::Echoing, Phase::Captured) {
            self.ignore();
        }
    }

    fn on_timeout(&self, cycle: CycleId) {
        if cycle != self.current_cycle() || !self.advance(Phase::Echoing, Phase::TimedOut) {
            self.late_timeouts.fetch_add(1, Ordering::Relaxed);
        }
    }
}
