//! Timekeeping for the synchronizer, the decoder and the coordinator.
//!
//! Two facilities are needed:
//! - a monotonic microsecond timestamp ([`Monotonic`]), polled from inside the
//!   busy-wait loops to evaluate [`Countdown`]s
//! - a delay provider ([`embedded_hal::delay::DelayNs`]) for both the short
//!   busy-waits (`delay_us`) and the long sleeps (`delay_ms`); on an RTOS the
//!   millisecond sleeps are expected to yield
//!
//! Timers are modelled as countdowns that are checked from the spin loops,
//! rather than as callbacks that flip shared flags. Every loop that can wait
//! on the caliper therefore terminates once its countdown has run out.
//!
//! With the `std` feature, [`StdClock`] provides both over `std::time`.

use crate::line::{Line, LineReader};

#[cfg(feature = "std")]
mod std_clock;
#[cfg_attr(feature = "std", allow(unused_imports))]
#[cfg(feature = "std")]
pub use std_clock::*;

/// 1,000 microseconds = 1 millisecond
pub const MICROSECONDS_PER_MILLISECOND: u64 = 1_000;

/// A free-running microsecond clock.
///
/// Implementations must never go backwards. Wrapping is not handled, so a
/// 64-bit counter (or a 32-bit counter extended in software) is expected.
///
/// The decoder reads the clock inside `critical_section::with`, so it must
/// stay correct with interrupts disabled for up to one bit-cell window. A
/// software extension that relies on an overflow interrupt has to detect a
/// pending overflow itself when read.
pub trait Monotonic {
    /// Microseconds since an arbitrary, fixed origin.
    fn now_us(&mut self) -> u64;
}

impl<T: Monotonic + ?Sized> Monotonic for &mut T {
    fn now_us(&mut self) -> u64 {
        (**self).now_us()
    }
}

/// A one-shot countdown started at a timestamp.
///
/// A countdown does nothing by itself; whoever is waiting polls
/// [`expired`](Countdown::expired) with the current time. Dropping it
/// cancels it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Countdown {
    started_at_us: u64,
    period_us: u64,
}

impl Countdown {
    /// Starts a countdown of `period_us` microseconds at `now_us`.
    pub const fn start(now_us: u64, period_us: u64) -> Self {
        Self {
            started_at_us: now_us,
            period_us,
        }
    }

    /// Starts a countdown of `period_ms` milliseconds at `now_us`.
    pub const fn start_ms(now_us: u64, period_ms: u32) -> Self {
        Self::start(now_us, period_ms as u64 * MICROSECONDS_PER_MILLISECOND)
    }

    /// Time elapsed since the countdown was started.
    pub fn elapsed_us(&self, now_us: u64) -> u64 {
        now_us.saturating_sub(self.started_at_us)
    }

    /// Whether the full period has elapsed at `now_us`.
    pub fn expired(&self, now_us: u64) -> bool {
        self.elapsed_us(now_us) >= self.period_us
    }
}

/// Spins while `line` reads `level`.
///
/// `check` is evaluated with the current time on every iteration and stops
/// the spin by returning `Some`. Returns `Ok(())` once the line has left
/// `level`, or the value produced by `check`.
pub(crate) fn spin_while<L, T, E, F>(
    lines: &mut L,
    line: Line,
    level: bool,
    timer: &mut T,
    mut check: F,
) -> Result<(), E>
where
    L: LineReader,
    T: Monotonic,
    F: FnMut(u64) -> Option<E>,
{
    while lines.read(line) == level {
        if let Some(stop) = check(timer.now_us()) {
            return Err(stop);
        }
    }
    Ok(())
}
