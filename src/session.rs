//! State shared between the capture API, the decode step and the clock ISR.
//!
//! A [`Session`] is meant to live in a `static` so the interrupt handler can
//! reach it:
//!
//! ```rust,ignore
//! use caliper_link::session::Session;
//!
//! static CALIPER: Session = Session::new();
//!
//! #[interrupt]
//! fn GPIOTE() {
//!     let _ = CALIPER.on_clock_edge(&mut ClockIrq);
//! }
//! ```
//!
//! It tracks the last known power state of the caliper and the capture state
//! machine (`Idle -> ArmedForCapture -> Capturing -> Idle`). The handoff from
//! interrupt to decode and from decode back to the waiting caller goes through
//! two single-slot signals.

use core::cell::Cell;
use core::convert::Infallible;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;

use crate::error::CaptureInFlight;
use crate::line::EdgeInterrupt;
use crate::measurement::DecodedMeasurement;
use crate::signal::Signal;

/// Where the capture state machine currently is.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum CapturePhase {
    /// No capture requested.
    #[default]
    Idle,
    /// The clock-edge interrupt is enabled and waiting for a frame to start.
    ArmedForCapture,
    /// The interrupt fired; the frame is being (or is about to be) decoded.
    Capturing,
}

/// Per-caliper session state.
pub struct Session {
    powered: AtomicBool,
    phase: Mutex<Cell<CapturePhase>>,
    edge: Signal<()>,
    completion: Signal<DecodedMeasurement>,
}

impl Session {
    /// Creates a session. The caliper is assumed to be on until proven otherwise.
    pub const fn new() -> Self {
        Self {
            powered: AtomicBool::new(true),
            phase: Mutex::new(Cell::new(CapturePhase::Idle)),
            edge: Signal::new(),
            completion: Signal::new(),
        }
    }

    /// Last known power state of the caliper.
    pub fn is_powered(&self) -> bool {
        self.powered.load(Ordering::Acquire)
    }

    /// Current capture phase.
    pub fn phase(&self) -> CapturePhase {
        critical_section::with(|cs| self.phase.borrow(cs).get())
    }

    /// Clock-line interrupt entry point.
    ///
    /// Disables the edge interrupt and, if a capture is armed, moves it to
    /// [`CapturePhase::Capturing`] and wakes the decode step. Does no decoding
    /// itself. Returns whether a capture was released.
    pub fn on_clock_edge<I: EdgeInterrupt>(&self, irq: &mut I) -> bool {
        irq.disable();
        let released = critical_section::with(|cs| {
            let phase = self.phase.borrow(cs);
            if phase.get() == CapturePhase::ArmedForCapture {
                phase.set(CapturePhase::Capturing);
                true
            } else {
                false
            }
        });
        if released {
            self.edge.release(());
        }
        released
    }

    pub(crate) fn set_powered(&self, powered: bool) {
        // Load and store rather than swap: not every target has atomic RMW.
        if self.powered.load(Ordering::Acquire) != powered {
            self.powered.store(powered, Ordering::Release);
            if powered {
                info!("Caliper is ON");
            } else {
                info!("Caliper is OFF");
            }
        }
    }

    /// `Idle -> ArmedForCapture`, discarding stale signals.
    pub(crate) fn arm(&self) -> Result<(), CaptureInFlight> {
        let armed = critical_section::with(|cs| {
            let phase = self.phase.borrow(cs);
            if phase.get() == CapturePhase::Idle {
                phase.set(CapturePhase::ArmedForCapture);
                true
            } else {
                false
            }
        });
        if !armed {
            return Err(CaptureInFlight);
        }
        self.edge.clear();
        self.completion.clear();
        Ok(())
    }

    /// `ArmedForCapture -> Idle`. A capture the interrupt already released stays put.
    pub(crate) fn disarm(&self) -> bool {
        critical_section::with(|cs| {
            let phase = self.phase.borrow(cs);
            if phase.get() == CapturePhase::ArmedForCapture {
                phase.set(CapturePhase::Idle);
                true
            } else {
                false
            }
        })
    }

    /// Consumes the wake-up released by [`on_clock_edge`](Session::on_clock_edge).
    pub(crate) fn take_edge(&self) -> bool {
        self.edge.try_take().is_ok()
    }

    pub(crate) fn complete(&self, measurement: DecodedMeasurement) {
        self.completion.release(measurement);
    }

    /// Hands out a finished measurement and returns to [`CapturePhase::Idle`].
    pub(crate) fn take_completion(&self) -> nb::Result<DecodedMeasurement, Infallible> {
        let measurement = self.completion.try_take()?;
        critical_section::with(|cs| self.phase.borrow(cs).set(CapturePhase::Idle));
        Ok(measurement)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("powered", &self.is_powered())
            .field("phase", &self.phase())
            .field("edge", &self.edge)
            .field("completion", &self.completion)
            .finish()
    }
}
