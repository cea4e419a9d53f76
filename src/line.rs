//! Access to the caliper's clock and data lines.
//!
//! The caliper drives two lines: a clock and a data line carrying one bit per
//! clock cell. Both are wired as pull-down inputs, so an unpowered caliper
//! reads as a permanently low clock. An optional third line can be driven as
//! an output to mark sample points on a logic analyzer.
//!
//! Reads are instantaneous. There is no buffering and no debouncing; the
//! synchronizer and the decoder own all timing discipline.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

/// The lines the driver knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Line {
    /// Clock driven by the caliper. One low/high/low cycle per bit cell.
    Clock,
    /// Data driven by the caliper. Valid after each falling clock edge.
    Data,
    /// Optional diagnostic output for logic analyzer debugging.
    Debug,
}

/// Instantaneous line access used by the synchronizer and the decoder.
pub trait LineReader {
    /// Returns the current logic level of `line`.
    fn read(&mut self, line: Line) -> bool;

    /// Drives `line` to `level` if it is an output. Inputs ignore the write.
    fn write(&mut self, line: Line, level: bool);

    /// Emits a single high/low pulse on `line`.
    fn pulse(&mut self, line: Line) {
        self.write(line, true);
        self.write(line, false);
    }
}

impl<L: LineReader + ?Sized> LineReader for &mut L {
    fn read(&mut self, line: Line) -> bool {
        (**self).read(line)
    }

    fn write(&mut self, line: Line, level: bool) {
        (**self).write(line, level)
    }
}

/// Clock, data and optional diagnostic pins bundled behind [`LineReader`].
///
/// ## Type Parameters
///
/// - `CLK`: the clock input, configured as pull-down
/// - `DAT`: the data input, configured as pull-down
/// - `DBG`: the diagnostic output; use [`NoDebugPin`] when the board has none
///
/// ```rust,ignore
/// use caliper_link::line::{CaliperLines, NoDebugPin};
///
/// let lines = CaliperLines::new(clock_pin, data_pin, None::<NoDebugPin>);
/// ```
#[derive(Debug)]
pub struct CaliperLines<CLK, DAT, DBG>
where
    CLK: InputPin,
    DAT: InputPin,
    DBG: OutputPin,
{
    clock: CLK,
    data: DAT,
    debug: Option<DBG>,
}

impl<CLK, DAT, DBG> CaliperLines<CLK, DAT, DBG>
where
    CLK: InputPin,
    DAT: InputPin,
    DBG: OutputPin,
{
    /// Bundles the pins. The diagnostic line, if present, is driven low.
    pub fn new(clock: CLK, data: DAT, debug: Option<DBG>) -> Self {
        let mut debug = debug;
        if let Some(ref mut pin) = debug {
            let _ = pin.set_low();
        }
        Self { clock, data, debug }
    }

    /// Gives the pins back.
    pub fn release(self) -> (CLK, DAT, Option<DBG>) {
        (self.clock, self.data, self.debug)
    }
}

impl<CLK, DAT, DBG> LineReader for CaliperLines<CLK, DAT, DBG>
where
    CLK: InputPin,
    DAT: InputPin,
    DBG: OutputPin,
{
    fn read(&mut self, line: Line) -> bool {
        // A failed read is indistinguishable from the pull-down level.
        match line {
            Line::Clock => self.clock.is_high().unwrap_or(false),
            Line::Data => self.data.is_high().unwrap_or(false),
            Line::Debug => false,
        }
    }

    fn write(&mut self, line: Line, level: bool) {
        if line != Line::Debug {
            return;
        }
        if let Some(ref mut pin) = self.debug {
            if level {
                let _ = pin.set_high();
            } else {
                let _ = pin.set_low();
            }
        }
    }
}

/// Stand-in for boards without a diagnostic output line.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDebugPin;

impl ErrorType for NoDebugPin {
    type Error = Infallible;
}

impl OutputPin for NoDebugPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Control over the clock line's edge interrupt.
///
/// Captures are one-shot: the coordinator enables the falling-edge interrupt
/// once per reading and the interrupt handler disables it again on entry.
pub trait EdgeInterrupt {
    /// Enables the interrupt on the next high-to-low clock transition.
    fn enable_falling_edge(&mut self);

    /// Disables the clock-line interrupt.
    fn disable(&mut self);
}

impl<I: EdgeInterrupt + ?Sized> EdgeInterrupt for &mut I {
    fn enable_falling_edge(&mut self) {
        (**self).enable_falling_edge()
    }

    fn disable(&mut self) {
        (**self).disable()
    }
}
