//! Bit-level capture of a single caliper frame.
//!
//! The decoder is entered right after the falling clock edge that opens a
//! frame. That edge is bit 0's clock transition, so bit 0 is sampled
//! immediately. Every following bit waits for one full clock cell (low, high,
//! back low) and samples the data line on the falling edge.
//!
//! ## Timing
//!
//! Each of the 23 remaining cells is waited for inside
//! [`critical_section::with`]: all interrupts are held off from the moment the
//! wait starts until the data line has been sampled. This keeps the sample
//! atomic with respect to the clock edge. The window is bounded by
//! [`Calibration::bit_cell_timeout_us`]; if the clock stalls the bit is
//! sampled anyway and the overrun is counted.
//!
//! After the last cell the decoder busy-waits
//! [`Calibration::standard_settle_us`] and samples the data line once more to
//! read the measurement standard, which the caliper emits just outside the
//! 24-cell frame.
//!
//! ## Integrity
//!
//! The protocol has no checksum. Glitches during a spin end up as whatever
//! level the data line had, and the decoder cannot tell. It never fails.

use embedded_hal::delay::DelayNs;

use crate::config::Calibration;
use crate::consts::{FRAME_BITS, HIGH, LOW, SIGN_BIT, VALUE_BITS};
use crate::line::{Line, LineReader};
use crate::measurement::{DecodedMeasurement, Standard};
use crate::timer::{Countdown, Monotonic, spin_while};

/// The 24 sampled bits of one frame, bit 0 first.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct RawFrame {
    bits: u32,
}

impl RawFrame {
    const VALUE_MASK: u32 = (1 << VALUE_BITS) - 1;

    /// An all-low frame.
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    /// Records the level sampled for bit `index`. Indices past the frame are ignored.
    pub fn set(&mut self, index: usize, level: bool) {
        if index >= FRAME_BITS {
            return;
        }
        if level {
            self.bits |= 1 << index;
        } else {
            self.bits &= !(1 << index);
        }
    }

    /// Level sampled for bit `index`.
    pub fn bit(&self, index: usize) -> bool {
        index < FRAME_BITS && self.bits & (1 << index) != 0
    }

    /// All sampled bits, bit 0 in the least-significant position.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// The raw magnitude carried in bits 0 to 15, least-significant bit first.
    pub fn magnitude(&self) -> u16 {
        u16::try_from(self.bits & Self::VALUE_MASK).unwrap_or(u16::MAX)
    }

    /// Whether the sign bit was sampled high.
    pub fn is_negative(&self) -> bool {
        self.bit(SIGN_BIT)
    }
}

/// Captures frames and turns them into [`DecodedMeasurement`]s.
#[derive(Debug)]
pub struct FrameDecoder {
    calibration: Calibration,
    frames: u32,
    overruns: u32,
}

impl FrameDecoder {
    /// Creates a decoder using the given timing calibration.
    pub fn new(calibration: Calibration) -> Self {
        Self {
            calibration,
            frames: 0,
            overruns: 0,
        }
    }

    /// Number of frames decoded so far.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Number of bit cells whose clock did not complete within the bit window.
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Captures one frame starting at the falling edge that opens it.
    ///
    /// Blocks for the duration of the frame plus the standard settle delay.
    /// There is no cancellation point once started.
    pub fn decode<L, T, D>(
        &mut self,
        lines: &mut L,
        timer: &mut T,
        delay: &mut D,
    ) -> DecodedMeasurement
    where
        L: LineReader,
        T: Monotonic,
        D: DelayNs,
    {
        let mut frame = RawFrame::new();

        // The triggering edge already clocked bit 0 out.
        frame.set(0, lines.read(Line::Data));

        for index in 1..FRAME_BITS {
            let level = critical_section::with(|_| {
                self.await_bit_cell(lines, timer);
                lines.read(Line::Data)
            });
            frame.set(index, level);

            #[cfg(feature = "debug-pulse")]
            lines.pulse(Line::Debug);
        }

        // The standard flag trails the frame; the settle time is empirical.
        delay.delay_us(self.calibration.standard_settle_us);
        let standard = Standard::from_flag(lines.read(Line::Data));

        self.frames = self.frames.wrapping_add(1);
        let measurement = DecodedMeasurement::from_frame(&frame, standard);
        trace!(
            "frame {} decoded to {} ({})",
            frame.bits(),
            measurement.magnitude,
            standard.suffix()
        );
        measurement
    }

    /// Waits for one clock cell: low to high, then high to low.
    fn await_bit_cell<L, T>(&mut self, lines: &mut L, timer: &mut T)
    where
        L: LineReader,
        T: Monotonic,
    {
        let window = Countdown::start(
            timer.now_us(),
            u64::from(self.calibration.bit_cell_timeout_us),
        );
        for level in [LOW, HIGH] {
            let waited = spin_while(lines, Line::Clock, level, timer, |now| {
                window.expired(now).then_some(())
            });
            if waited.is_err() {
                self.overruns = self.overruns.wrapping_add(1);
                warn!(
                    "bit cell overran its {} us window",
                    self.calibration.bit_cell_timeout_us
                );
                return;
            }
        }
    }
}
