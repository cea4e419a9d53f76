//! # caliper-link
//!
//! A portable, no_std Rust driver for the two-wire clock/data output found on
//! cheap digital calipers, meant for boards that turn caliper readings into
//! text (for example a BLE keyboard that types the measurement).
//!
//! This driver reads the caliper's 24-bit serial frames using:
//! - `embedded-hal` traits for digital I/O and timing
//! - a timing-based synchronizer that finds the silent gap between frames
//! - interrupt-safe state shared with the clock ISR via `critical-section`
//! - `nb` non-blocking polling underneath a blocking read
//!
//! ## Crate features
//! | Feature       | Description |
//! |---------------|-------------|
//! | `std`         | Disables `#![no_std]` and adds [`timer::StdClock`] |
//! | `debug-pulse` | Pulses the optional debug line at sample points |
//! | `defmt-0-3`   | Uses `defmt` logging |
//! | `log`         | Uses `log` logging |
//!
//! ## Software Features
//!
//! - **Frame synchronization** without a start marker, with retry on misalignment
//! - **Power detection**: a caliper that stops transmitting is reported as off
//! - **Bit-exact decoding** of magnitude, sign and the mm/inch flag
//! - Text rendering into a fixed `heapless::String`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use caliper_link::capture::CaptureCoordinator;
//! use caliper_link::config::Calibration;
//! use caliper_link::line::{CaliperLines, NoDebugPin};
//! use caliper_link::session::Session;
//!
//! static CALIPER: Session = Session::new();
//!
//! let lines = CaliperLines::new(clock_pin, data_pin, None::<NoDebugPin>);
//! let mut caliper =
//!     CaptureCoordinator::new(&CALIPER, lines, timer, delay, clock_irq, Calibration::default());
//!
//! loop {
//!     if caliper.find_interframe_gap().is_ok() {
//!         let text = caliper.read_value().to_text();
//!         keyboard.type_str(&text);
//!     }
//! }
//! ```
//!
//! The clock-line interrupt handler only has to forward the edge:
//!
//! ```rust,ignore
//! #[interrupt]
//! fn GPIOTE() {
//!     let _ = CALIPER.on_clock_edge(&mut ClockIrq);
//! }
//! ```
//!
//! ## Integration Notes
//!
//! - Both caliper lines must be configured as pull-down inputs, so that an
//!   unpowered caliper reads as a low clock
//! - Decoding spins with interrupts disabled for up to one bit cell at a time
//! - All timing defaults come from [`config::Calibration`]
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub use critical_section;
pub use heapless;

#[macro_use]
mod fmt;

pub mod capture;
pub mod config;
pub mod consts;
pub mod decoder;
pub mod error;
pub mod line;
pub mod measurement;
pub mod session;
pub(crate) mod signal;
#[cfg(test)]
pub(crate) mod sim;
pub mod sync;
pub mod timer;
