use core::cell::Cell;
use core::convert::Infallible;
use core::fmt;

use critical_section::Mutex;

/// Single-slot notification shared between interrupt and task context.
///
/// Releasing overwrites any value still in the slot; taking empties it.
pub(crate) struct Signal<T> {
    slot: Mutex<Cell<Option<T>>>,
}

impl<T> Signal<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slot: Mutex::new(Cell::new(None)),
        }
    }

    /// Puts `value` in the slot.
    pub(crate) fn release(&self, value: T) {
        critical_section::with(|cs| self.slot.borrow(cs).set(Some(value)));
    }

    /// Takes the value out of the slot, or `WouldBlock` if nothing was released.
    pub(crate) fn try_take(&self) -> nb::Result<T, Infallible> {
        critical_section::with(|cs| self.slot.borrow(cs).take()).ok_or(nb::Error::WouldBlock)
    }

    /// Drops whatever is in the slot.
    pub(crate) fn clear(&self) {
        critical_section::with(|cs| self.slot.borrow(cs).set(None));
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = critical_section::with(|cs| {
            let slot = self.slot.borrow(cs);
            let value = slot.take();
            let pending = value.is_some();
            slot.set(value);
            pending
        });
        f.debug_struct("Signal").field("pending", &pending).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_empties_the_slot() {
        let signal = Signal::new();
        assert_eq!(signal.try_take(), Err(nb::Error::WouldBlock));

        signal.release(7u8);
        assert_eq!(signal.try_take(), Ok(7));
        assert_eq!(signal.try_take(), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn test_release_overwrites_and_clear_drops() {
        let signal = Signal::new();
        signal.release(1u8);
        signal.release(2u8);
        assert_eq!(signal.try_take(), Ok(2));

        signal.release(3u8);
        signal.clear();
        assert_eq!(signal.try_take(), Err(nb::Error::WouldBlock));
    }
}
