//! Calibration of the caliper timing.
//!
//! None of these values can be derived from the protocol; they were measured
//! on real hardware and may need retuning for a different caliper model.

use crate::consts::{
    ALIGNMENT_TIMEOUT_MS, BIT_CELL_TIMEOUT_US, FRAME_INTERVAL_MS, MISALIGNMENT_BACKOFF_MS,
    POWER_OFF_TIMEOUT_MS, PRE_POSITION_MS, STANDARD_SETTLE_US,
};

/// Timing constants used by the synchronizer, the decoder and the coordinator.
///
/// ```rust,ignore
/// use caliper_link::config::Calibration;
///
/// let calibration = Calibration {
///     standard_settle_us: 300,
///     ..Calibration::DEFAULT
/// };
/// assert!(calibration.is_consistent());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Calibration {
    /// Window in which a frame must be observed before the caliper is declared off.
    pub power_off_timeout_ms: u32,
    /// Window for one pass over all 24 bit cells during synchronization.
    pub alignment_timeout_ms: u32,
    /// Sleep after a pass that ran out of its alignment window.
    pub misalignment_backoff_ms: u32,
    /// Sleep between finding the interframe gap and returning to the caller.
    pub pre_position_ms: u32,
    /// Busy-wait between the last bit cell and the standard flag sample.
    pub standard_settle_us: u32,
    /// Upper bound on the interrupts-off spin for a single bit cell.
    pub bit_cell_timeout_us: u32,
}

impl Calibration {
    /// Values measured on the reference caliper.
    pub const DEFAULT: Self = Self {
        power_off_timeout_ms: POWER_OFF_TIMEOUT_MS,
        alignment_timeout_ms: ALIGNMENT_TIMEOUT_MS,
        misalignment_backoff_ms: MISALIGNMENT_BACKOFF_MS,
        pre_position_ms: PRE_POSITION_MS,
        standard_settle_us: STANDARD_SETTLE_US,
        bit_cell_timeout_us: BIT_CELL_TIMEOUT_US,
    };

    /// Checks that the constants can work together with the caliper's frame interval.
    ///
    /// - the pre-positioning sleep must end before the next frame starts
    /// - one alignment window must fit inside a frame interval
    /// - a misaligned pass plus its backoff must fit inside the power-off window
    pub fn is_consistent(&self) -> bool {
        self.pre_position_ms < FRAME_INTERVAL_MS
            && self.alignment_timeout_ms < FRAME_INTERVAL_MS
            && self.alignment_timeout_ms + self.misalignment_backoff_ms < self.power_off_timeout_ms
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::DEFAULT
    }
}
