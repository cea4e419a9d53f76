//! Constants describing the caliper's serial frame and its default timing.
//!
//! The caliper clocks out one frame of 24 bit cells roughly every 120 ms and
//! keeps the clock line high for the rest of the interval. Nothing in the
//! bitstream marks where a frame starts, so every timing value below is an
//! empirical calibration taken from logic analyzer traces rather than a
//! protocol field.
//!
//! ## Frame layout
//!
//! | Bits    | Meaning                                   |
//! |---------|-------------------------------------------|
//! | 0 - 15  | Raw magnitude, least-significant bit first |
//! | 16 - 20 | Unused flags                              |
//! | 21      | Sign (high = negative)                    |
//! | 22 - 23 | Unused flags                              |
//!
//! The measurement standard (mm / inch) is not part of the 24 cells; it is
//! sampled on the data line a short, fixed delay after the last cell.

/// Logic high, as returned by [`LineReader::read`](crate::line::LineReader::read).
pub const HIGH: bool = true;

/// Logic low, as returned by [`LineReader::read`](crate::line::LineReader::read).
pub const LOW: bool = false;

/// Number of bit cells in one caliper frame.
pub const FRAME_BITS: usize = 24;

/// Number of leading bits that carry the raw magnitude.
pub const VALUE_BITS: usize = 16;

/// Index of the sign bit within a frame.
pub const SIGN_BIT: usize = 21;

/// Nominal time between the starts of two consecutive frames.
pub const FRAME_INTERVAL_MS: u32 = 120;

/// Time without a completed frame after which the caliper is considered off.
pub const POWER_OFF_TIMEOUT_MS: u32 = 500;

/// Longest time one pass over 24 bit cells may take before the pass is
/// treated as having started in the middle of a frame.
pub const ALIGNMENT_TIMEOUT_MS: u32 = 30;

/// Sleep after a misaligned pass, long enough to skip the rest of the
/// current frame and land in the interframe silence.
pub const MISALIGNMENT_BACKOFF_MS: u32 = 20;

/// Sleep after alignment so the decoder is armed just before the next frame.
pub const PRE_POSITION_MS: u32 = 110;

/// Busy-wait between the last bit cell and the standard flag sample.
pub const STANDARD_SETTLE_US: u32 = 280;

/// Upper bound on the interrupts-off spin spent waiting for one bit cell.
pub const BIT_CELL_TIMEOUT_US: u32 = 1_000;

/// Capacity of the text rendering of one reading, trailing newline included.
pub const MAX_TEXT_LEN: usize = 24;
