//! Synthetic caliper for host tests.
//!
//! Every handle shares one simulated clock. Reading a pin or the timer costs
//! one microsecond, delays advance the clock by exactly their duration, and a
//! falling clock edge crossed while the edge interrupt is enabled runs the
//! session's interrupt entry point on the spot.
//!
//! Signal shape, per 120 ms interval starting at the first frame:
//! - 24 cells of 400 us: clock low for the first half, high for the second,
//!   data valid from the falling edge that opens the cell
//! - after the last cell's falling edge the data line holds bit 23 for 150 us,
//!   then the standard flag until 800 us, then low
//! - clock high for the rest of the interval
//!
//! A powered-off caliper reads low on both lines.

use core::convert::Infallible;
use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin};

use crate::capture::CaptureCoordinator;
use crate::config::Calibration;
use crate::consts::FRAME_BITS;
use crate::line::{CaliperLines, EdgeInterrupt, Line, NoDebugPin};
use crate::session::Session;
use crate::timer::Monotonic;

pub(crate) const FRAME_INTERVAL_US: u64 = 120_000;
pub(crate) const CELL_US: u64 = 400;
const HALF_CELL_US: u64 = CELL_US / 2;
const CELLS: u64 = FRAME_BITS as u64;
const LAST_BIT_HOLD_US: u64 = 150;
const FLAG_HOLD_US: u64 = 800;
const ACCESS_COST_US: u64 = 1;
const DEFAULT_FIRST_FRAME_US: u64 = 10_000;

pub(crate) type SimLines = CaliperLines<SimPin, SimPin, NoDebugPin>;
pub(crate) type SimCoordinator = CaptureCoordinator<'static, SimLines, SimTimer, SimDelay, SimIrq>;

/// A session that outlives the test, as a `static` would.
pub(crate) fn leak_session() -> &'static Session {
    Box::leak(Box::new(Session::new()))
}

#[derive(Debug)]
struct State {
    now_us: u64,
    first_frame_us: u64,
    frame: u32,
    inch: bool,
    powered: bool,
    irq_enabled: bool,
    interrupts: u32,
    session: Option<&'static Session>,
}

impl State {
    /// Position inside the current frame interval, once the first frame has begun.
    fn offset(&self) -> Option<u64> {
        (self.powered && self.now_us >= self.first_frame_us)
            .then(|| (self.now_us - self.first_frame_us) % FRAME_INTERVAL_US)
    }

    fn clock(&self) -> bool {
        if !self.powered {
            return false;
        }
        match self.offset() {
            Some(offset) if offset < CELLS * CELL_US => offset % CELL_US >= HALF_CELL_US,
            _ => true,
        }
    }

    fn data(&self) -> bool {
        let Some(offset) = self.offset() else {
            return false;
        };
        let cell = offset / CELL_US;
        let last = CELLS - 1;
        if cell < last {
            return self.frame & (1 << cell) != 0;
        }
        let since_last_edge = offset - last * CELL_US;
        if since_last_edge < LAST_BIT_HOLD_US {
            self.frame & (1 << last) != 0
        } else if since_last_edge < FLAG_HOLD_US {
            self.inch
        } else {
            false
        }
    }

    /// Falling clock edges up to and including `at_us`.
    fn edges_until(&self, at_us: u64) -> u64 {
        if !self.powered || at_us < self.first_frame_us {
            return 0;
        }
        let since_first = at_us - self.first_frame_us;
        let in_frame = (since_first % FRAME_INTERVAL_US / CELL_US + 1).min(CELLS);
        since_first / FRAME_INTERVAL_US * CELLS + in_frame
    }
}

/// Handle on the simulated caliper; clones share state.
#[derive(Debug, Clone)]
pub(crate) struct Sim {
    state: Rc<RefCell<State>>,
}

impl Sim {
    fn new(powered: bool, frame: u32, inch: bool) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                now_us: 0,
                first_frame_us: DEFAULT_FIRST_FRAME_US,
                frame,
                inch,
                powered,
                irq_enabled: false,
                interrupts: 0,
                session: None,
            })),
        }
    }

    /// A transmitting caliper sending `frame` every interval.
    pub(crate) fn powered(frame: u32, inch: bool) -> Self {
        Self::new(true, frame, inch)
    }

    /// A caliper that is switched off.
    pub(crate) fn powered_off() -> Self {
        Self::new(false, 0, false)
    }

    pub(crate) fn with_first_frame_at(self, at_us: u64) -> Self {
        self.state.borrow_mut().first_frame_us = at_us;
        self
    }

    pub(crate) fn with_frame(self, frame: u32, inch: bool) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.frame = frame;
            state.inch = inch;
        }
        self
    }

    /// Current simulated time, without advancing it.
    pub(crate) fn now_us(&self) -> u64 {
        self.state.borrow().now_us
    }

    pub(crate) fn set_now(&self, at_us: u64) {
        self.state.borrow_mut().now_us = at_us;
    }

    /// Interrupts delivered so far.
    pub(crate) fn interrupts(&self) -> u32 {
        self.state.borrow().interrupts
    }

    pub(crate) fn lines(&self) -> SimLines {
        CaliperLines::new(
            SimPin {
                sim: self.clone(),
                line: Line::Clock,
            },
            SimPin {
                sim: self.clone(),
                line: Line::Data,
            },
            None,
        )
    }

    pub(crate) fn timer(&self) -> SimTimer {
        SimTimer { sim: self.clone() }
    }

    pub(crate) fn delay(&self) -> SimDelay {
        SimDelay { sim: self.clone() }
    }

    pub(crate) fn irq(&self) -> SimIrq {
        SimIrq { sim: self.clone() }
    }

    /// A coordinator wired to this caliper through a fresh session.
    pub(crate) fn coordinator(&self) -> SimCoordinator {
        let session = leak_session();
        self.state.borrow_mut().session = Some(session);
        CaptureCoordinator::new(
            session,
            self.lines(),
            self.timer(),
            self.delay(),
            self.irq(),
            Calibration::default(),
        )
    }

    fn level(&self, line: Line) -> bool {
        let state = self.state.borrow();
        match line {
            Line::Clock => state.clock(),
            Line::Data => state.data(),
            Line::Debug => false,
        }
    }

    fn advance(&self, us: u64) {
        let session = {
            let mut state = self.state.borrow_mut();
            let before = state.edges_until(state.now_us);
            state.now_us += us;
            let fired = state.irq_enabled && state.edges_until(state.now_us) > before;
            if fired {
                state.interrupts += 1;
            }
            state.session.filter(|_| fired)
        };
        if let Some(session) = session {
            let _ = session.on_clock_edge(&mut self.irq());
        }
    }
}

#[derive(Debug)]
pub(crate) struct SimPin {
    sim: Sim,
    line: Line,
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let level = self.sim.level(self.line);
        self.sim.advance(ACCESS_COST_US);
        Ok(level)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|level| !level)
    }
}

#[derive(Debug)]
pub(crate) struct SimTimer {
    sim: Sim,
}

impl Monotonic for SimTimer {
    fn now_us(&mut self) -> u64 {
        let now = self.sim.now_us();
        self.sim.advance(ACCESS_COST_US);
        now
    }
}

#[derive(Debug)]
pub(crate) struct SimDelay {
    sim: Sim,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.sim.advance(u64::from(ns).div_ceil(1_000));
    }

    fn delay_us(&mut self, us: u32) {
        self.sim.advance(u64::from(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.sim.advance(u64::from(ms) * 1_000);
    }
}

#[derive(Debug)]
pub(crate) struct SimIrq {
    sim: Sim,
}

impl EdgeInterrupt for SimIrq {
    fn enable_falling_edge(&mut self) {
        self.sim.state.borrow_mut().irq_enabled = true;
    }

    fn disable(&mut self) {
        self.sim.state.borrow_mut().irq_enabled = false;
    }
}

/// A timer that ticks one microsecond per query, for scripted pin tests.
#[derive(Debug, Default)]
pub(crate) struct TickTimer(u64);

impl Monotonic for TickTimer {
    fn now_us(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

/// A delay that only adds up what it was asked to wait.
#[derive(Debug, Default)]
pub(crate) struct RecordingDelay {
    total_ns: u64,
}

impl RecordingDelay {
    pub(crate) fn total_ns(&self) -> u64 {
        self.total_ns
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_shape_around_first_frame() {
        let sim = Sim::powered(0b101, true);
        let pin = |line| SimPin {
            sim: sim.clone(),
            line,
        };

        sim.set_now(DEFAULT_FIRST_FRAME_US - 1);
        assert!(pin(Line::Clock).is_high().unwrap());

        sim.set_now(DEFAULT_FIRST_FRAME_US);
        assert!(pin(Line::Clock).is_low().unwrap());
        assert!(pin(Line::Data).is_high().unwrap());

        sim.set_now(DEFAULT_FIRST_FRAME_US + CELL_US + HALF_CELL_US);
        assert!(pin(Line::Clock).is_high().unwrap());
        assert!(pin(Line::Data).is_low().unwrap());

        sim.set_now(DEFAULT_FIRST_FRAME_US + (CELLS - 1) * CELL_US + 280);
        assert!(pin(Line::Data).is_high().unwrap());

        sim.set_now(DEFAULT_FIRST_FRAME_US + (CELLS - 1) * CELL_US + FLAG_HOLD_US);
        assert!(pin(Line::Clock).is_high().unwrap());
        assert!(pin(Line::Data).is_low().unwrap());
    }

    #[test]
    fn test_edges_are_counted_per_frame() {
        let sim = Sim::powered(0, false);
        let state = sim.state.borrow();
        assert_eq!(state.edges_until(0), 0);
        assert_eq!(state.edges_until(DEFAULT_FIRST_FRAME_US), 1);
        assert_eq!(state.edges_until(DEFAULT_FIRST_FRAME_US + FRAME_INTERVAL_US - 1), CELLS);
        assert_eq!(state.edges_until(DEFAULT_FIRST_FRAME_US + FRAME_INTERVAL_US), CELLS + 1);
    }
}
