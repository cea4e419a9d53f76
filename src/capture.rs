//! The public capture API.
//!
//! [`CaptureCoordinator`] ties the synchronizer, the decoder and the clock
//! interrupt together around a shared [`Session`]. A consumer calls
//! [`find_interframe_gap`](CaptureCoordinator::find_interframe_gap) before
//! each reading and then [`read_value`](CaptureCoordinator::read_value):
//!
//! ```rust,ignore
//! use caliper_link::capture::CaptureCoordinator;
//! use caliper_link::config::Calibration;
//! use caliper_link::line::{CaliperLines, NoDebugPin};
//! use caliper_link::session::Session;
//!
//! static CALIPER: Session = Session::new();
//!
//! let lines = CaliperLines::new(clock, data, None::<NoDebugPin>);
//! let mut caliper =
//!     CaptureCoordinator::new(&CALIPER, lines, timer, delay, clock_irq, Calibration::default());
//!
//! match caliper.find_interframe_gap() {
//!     Ok(()) => send(caliper.read_value().to_text()),
//!     Err(PowerOff) => beep(),
//! }
//! ```
//!
//! ## Capture flow
//!
//! 1. `read_value` arms the session, starts the power-off bookkeeping
//!    countdown and enables the falling-edge interrupt.
//! 2. The interrupt handler calls [`Session::on_clock_edge`], which disables
//!    the interrupt and releases the edge signal. Nothing else happens in
//!    interrupt context.
//! 3. The next [`poll_capture`](CaptureCoordinator::poll_capture) takes the
//!    edge signal, runs the decoder to completion and releases the completion
//!    signal, which the same poll hands back to the caller.
//!
//! `read_value` drives step 3 with [`nb::block!`]. Callers that need to do
//! other work while waiting can use `start_capture` and `poll_capture`
//! directly. The `&mut self` receiver keeps one capture in flight per
//! coordinator; the session rejects a second arm.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use nb::block;

use crate::config::Calibration;
use crate::decoder::FrameDecoder;
use crate::error::{CaptureInFlight, PowerOff};
use crate::line::{EdgeInterrupt, LineReader};
use crate::measurement::DecodedMeasurement;
use crate::session::Session;
use crate::sync::FrameSynchronizer;
use crate::timer::{Countdown, MICROSECONDS_PER_MILLISECOND, Monotonic};

/// Caliper capture front end.
///
/// ## Type Parameters
///
/// - `L`: line access, usually [`CaliperLines`](crate::line::CaliperLines)
/// - `T`: microsecond [`Monotonic`] clock
/// - `D`: [`DelayNs`] provider for busy-waits and sleeps
/// - `I`: handle to enable the clock-line [`EdgeInterrupt`]
#[derive(Debug)]
pub struct CaptureCoordinator<'a, L, T, D, I>
where
    L: LineReader,
    T: Monotonic,
    D: DelayNs,
    I: EdgeInterrupt,
{
    session: &'a Session,
    lines: L,
    timer: T,
    delay: D,
    irq: I,
    synchronizer: FrameSynchronizer,
    decoder: FrameDecoder,
    power_off_timeout_us: u64,
    power_watch: Option<Countdown>,
}

impl<'a, L, T, D, I> CaptureCoordinator<'a, L, T, D, I>
where
    L: LineReader,
    T: Monotonic,
    D: DelayNs,
    I: EdgeInterrupt,
{
    /// Creates a coordinator. The clock-line interrupt is disabled until a capture is started.
    pub fn new(
        session: &'a Session,
        lines: L,
        timer: T,
        delay: D,
        irq: I,
        calibration: Calibration,
    ) -> Self {
        if !calibration.is_consistent() {
            warn!("caliper calibration leaves no margin around the interframe gap");
        }
        let mut irq = irq;
        irq.disable();
        Self {
            session,
            lines,
            timer,
            delay,
            irq,
            synchronizer: FrameSynchronizer::new(calibration),
            decoder: FrameDecoder::new(calibration),
            power_off_timeout_us: u64::from(calibration.power_off_timeout_ms)
                * MICROSECONDS_PER_MILLISECOND,
            power_watch: None,
        }
    }

    /// Aligns to the interframe gap so the next [`read_value`](Self::read_value)
    /// starts exactly at a frame boundary.
    ///
    /// Returns [`PowerOff`] if the caliper did not transmit within the
    /// power-off window. The caller decides whether to retry.
    pub fn find_interframe_gap(&mut self) -> Result<(), PowerOff> {
        self.synchronizer.find_interframe_gap(
            &mut self.lines,
            &mut self.timer,
            &mut self.delay,
            self.session,
        )
    }

    /// Blocks until one full frame has been captured and decoded.
    ///
    /// Meant to follow a successful [`find_interframe_gap`](Self::find_interframe_gap);
    /// a caliper that is off will keep this waiting. If a capture is already in
    /// flight this waits for that one instead of starting another.
    pub fn read_value(&mut self) -> DecodedMeasurement {
        if self.start_capture().is_err() {
            debug!("joining the capture already in flight");
        }
        match block!(self.poll_capture()) {
            Ok(measurement) => measurement,
            Err(never) => match never {},
        }
    }

    /// Last known power state of the caliper.
    pub fn is_powered(&self) -> bool {
        self.session.is_powered()
    }

    /// Arms a capture and enables the falling-edge interrupt.
    pub fn start_capture(&mut self) -> Result<(), CaptureInFlight> {
        self.session.arm()?;
        self.power_watch = Some(Countdown::start(
            self.timer.now_us(),
            self.power_off_timeout_us,
        ));
        self.irq.enable_falling_edge();
        Ok(())
    }

    /// Advances a started capture.
    ///
    /// Runs the decoder if the interrupt has fired, and returns the
    /// measurement once it is complete. Otherwise keeps the power state
    /// up to date and returns `WouldBlock`. Polling with no capture started
    /// always returns `WouldBlock`.
    pub fn poll_capture(&mut self) -> nb::Result<DecodedMeasurement, Infallible> {
        if self.session.take_edge() {
            self.power_watch = None;
            self.session.set_powered(true);
            let measurement = self
                .decoder
                .decode(&mut self.lines, &mut self.timer, &mut self.delay);
            self.session.complete(measurement);
        }

        if let Ok(measurement) = self.session.take_completion() {
            return Ok(measurement);
        }

        // Bookkeeping only: a silent caliper is reported, the caller keeps waiting.
        if let Some(watch) = self.power_watch {
            if watch.expired(self.timer.now_us()) {
                self.power_watch = None;
                self.session.set_powered(false);
            }
        }
        Err(nb::Error::WouldBlock)
    }

    /// Cancels a capture whose interrupt has not fired yet.
    ///
    /// Returns `false` if there is nothing to cancel or decoding has already
    /// begun; a running decode always completes.
    pub fn cancel_capture(&mut self) -> bool {
        if !self.session.disarm() {
            return false;
        }
        self.irq.disable();
        self.power_watch = None;
        true
    }

    /// The shared session.
    pub fn session(&self) -> &'a Session {
        self.session
    }

    /// The frame synchronizer, for its last outcome and retry count.
    pub fn synchronizer(&self) -> &FrameSynchronizer {
        &self.synchronizer
    }

    /// The frame decoder, for its frame and overrun counters.
    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    /// Gives the hardware back.
    pub fn release(self) -> (L, T, D, I) {
        (self.lines, self.timer, self.delay, self.irq)
    }
}
