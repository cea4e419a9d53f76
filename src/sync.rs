//! Locating the start of a caliper frame in a marker-free bitstream.
//!
//! The caliper sends a 24-cell frame every ~120 ms and holds the clock high in
//! between. There is no start symbol, so the only landmark is the interframe
//! gap. [`FrameSynchronizer::find_interframe_gap`] finds it by timing passes
//! over 24 clock cells:
//!
//! - a pass that completes all 24 cells inside the alignment window started
//!   just before a frame, so the caller is now at the end of that frame
//! - a pass that runs out of its window started inside a frame (or too early
//!   in the gap); the synchronizer sleeps into the gap and tries again
//! - if no pass completes within the power-off window the caliper is off
//!
//! Once aligned it waits for the clock to return high, then sleeps until just
//! before the next frame so the decoder can be armed without a search of its own.
//!
//! Retries are unbounded; only the power-off countdown ends a search that
//! never aligns.

use embedded_hal::delay::DelayNs;

use crate::config::Calibration;
use crate::consts::{FRAME_BITS, HIGH, LOW};
use crate::error::PowerOff;
use crate::line::{Line, LineReader};
use crate::session::Session;
use crate::timer::{Countdown, Monotonic, spin_while};

/// Outcome of the most recent search.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum SyncPhase {
    /// No search has run yet.
    #[default]
    Idle,
    /// A search is in progress.
    Searching,
    /// The last search found the interframe gap.
    Aligned,
    /// The last search timed out: the caliper is not transmitting.
    PowerOff,
}

/// Whether the current pass over the clock cells started at a frame boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Alignment {
    /// All 24 cells were seen within the alignment window.
    Aligned,
    /// The alignment window ran out mid-pass.
    Misaligned,
}

/// Whether the search as a whole may continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum SearchStatus {
    /// The power-off countdown is still running.
    Active,
    /// The power-off countdown ran out.
    PowerOff,
}

/// State of one pass, scoped to a single search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct SyncState {
    /// Alignment of the pass.
    pub alignment: Alignment,
    /// Status of the search.
    pub status: SearchStatus,
}

impl SyncState {
    const ALIGNED: Self = Self {
        alignment: Alignment::Aligned,
        status: SearchStatus::Active,
    };

    const MISALIGNED: Self = Self {
        alignment: Alignment::Misaligned,
        status: SearchStatus::Active,
    };

    const POWER_OFF: Self = Self {
        alignment: Alignment::Misaligned,
        status: SearchStatus::PowerOff,
    };
}

/// Finds the interframe gap and pre-positions the caller for the next frame.
#[derive(Debug)]
pub struct FrameSynchronizer {
    calibration: Calibration,
    phase: SyncPhase,
    misalignments: u32,
}

impl FrameSynchronizer {
    /// Creates a synchronizer using the given timing calibration.
    pub fn new(calibration: Calibration) -> Self {
        Self {
            calibration,
            phase: SyncPhase::Idle,
            misalignments: 0,
        }
    }

    /// Outcome of the most recent search.
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Number of misaligned passes retried during the most recent search.
    pub fn misalignments(&self) -> u32 {
        self.misalignments
    }

    /// Aligns to a frame boundary, or reports that the caliper is off.
    ///
    /// On success the caliper is marked powered and the call returns shortly
    /// before the next frame starts. On [`PowerOff`] the session is marked
    /// unpowered. Blocks for at most the power-off window plus one backoff
    /// and one pre-positioning sleep.
    pub fn find_interframe_gap<L, T, D>(
        &mut self,
        lines: &mut L,
        timer: &mut T,
        delay: &mut D,
        session: &Session,
    ) -> Result<(), PowerOff>
    where
        L: LineReader,
        T: Monotonic,
        D: DelayNs,
    {
        debug!("searching for the interframe gap");
        self.phase = SyncPhase::Searching;
        self.misalignments = 0;

        let power_off = Countdown::start_ms(timer.now_us(), self.calibration.power_off_timeout_ms);

        loop {
            let state = self.traverse_frame(lines, timer, &power_off);
            if state.status == SearchStatus::PowerOff {
                return Err(self.declare_power_off(session));
            }
            match state.alignment {
                Alignment::Aligned => break,
                Alignment::Misaligned => {
                    self.misalignments = self.misalignments.wrapping_add(1);
                    debug!("misaligned pass {}, backing off", self.misalignments);

                    #[cfg(feature = "debug-pulse")]
                    lines.pulse(Line::Debug);

                    delay.delay_ms(self.calibration.misalignment_backoff_ms);
                }
            }
        }

        // The last cell ends low; the gap starts when the clock returns high.
        let gap = spin_while(lines, Line::Clock, LOW, timer, |now| {
            power_off.expired(now).then_some(())
        });
        if gap.is_err() {
            return Err(self.declare_power_off(session));
        }

        session.set_powered(true);
        self.phase = SyncPhase::Aligned;
        debug!("aligned after {} misaligned passes", self.misalignments);

        delay.delay_ms(self.calibration.pre_position_ms);
        Ok(())
    }

    /// One pass over 24 clock cells under a fresh alignment window.
    fn traverse_frame<L, T>(&self, lines: &mut L, timer: &mut T, power_off: &Countdown) -> SyncState
    where
        L: LineReader,
        T: Monotonic,
    {
        let now = timer.now_us();
        if power_off.expired(now) {
            return SyncState::POWER_OFF;
        }
        let alignment = Countdown::start_ms(now, self.calibration.alignment_timeout_ms);

        for _ in 0..FRAME_BITS {
            for level in [LOW, HIGH] {
                let cell = spin_while(lines, Line::Clock, level, timer, |now| {
                    if power_off.expired(now) {
                        Some(SyncState::POWER_OFF)
                    } else if alignment.expired(now) {
                        Some(SyncState::MISALIGNED)
                    } else {
                        None
                    }
                });
                if let Err(state) = cell {
                    return state;
                }
            }
        }
        SyncState::ALIGNED
    }

    fn declare_power_off(&mut self, session: &Session) -> PowerOff {
        self.phase = SyncPhase::PowerOff;
        session.set_powered(false);
        PowerOff
    }
}
