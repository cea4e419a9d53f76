//! Errors surfaced by the capture API.
//!
//! Misalignment is recovered inside the synchronizer and bit noise cannot be
//! detected at all (the frame carries no checksum), so neither has a type here.

/// The caliper did not complete a frame inside the power-off window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[error("caliper is not transmitting")]
pub struct PowerOff;

/// A capture was requested while another one is armed or decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[error("a capture is already in flight")]
pub struct CaptureInFlight;
