//! Decoded caliper readings.
//!
//! A [`DecodedMeasurement`] is produced once per captured frame and handed to
//! the consumer as a plain value; nothing here caches previous readings.

use core::fmt;
use core::fmt::Write;

use heapless::String;

use crate::consts::MAX_TEXT_LEN;
use crate::decoder::RawFrame;

/// Measurement standard selected on the caliper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Standard {
    /// Magnitude is in hundredths of a millimeter.
    Millimeter,
    /// Magnitude is in thousandths of an inch.
    Inch,
}

impl Standard {
    /// Maps the post-frame flag sample: high is inch, low is millimeter.
    pub fn from_flag(level: bool) -> Self {
        if level { Self::Inch } else { Self::Millimeter }
    }

    /// Unit suffix used when rendering a reading.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Millimeter => "mm",
            Self::Inch => "inch",
        }
    }
}

/// One decoded, unit-scaled and signed reading.
///
/// `magnitude` is in hundredths of a millimeter for [`Standard::Millimeter`]
/// and in thousandths of an inch for [`Standard::Inch`].
///
/// ```rust
/// use caliper_link::measurement::{DecodedMeasurement, Standard};
///
/// let reading = DecodedMeasurement { magnitude: 1250, standard: Standard::Millimeter };
/// assert_eq!(reading.to_text().as_str(), "12.50 mm\n");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct DecodedMeasurement {
    /// Signed magnitude in the standard's display unit.
    pub magnitude: i16,
    /// Unit the magnitude is expressed in.
    pub standard: Standard,
}

impl DecodedMeasurement {
    /// Derives the reading from a captured frame and its standard flag.
    ///
    /// The raw count is twice the displayed resolution, and twice again in
    /// inch mode, so the 16-bit magnitude is halved once or twice before the
    /// sign bit is applied.
    pub fn from_frame(frame: &RawFrame, standard: Standard) -> Self {
        let mut raw = frame.magnitude() / 2;
        if standard == Standard::Inch {
            raw /= 2;
        }
        // Halving a u16 always fits in an i16.
        let magnitude = i16::try_from(raw).unwrap_or(i16::MAX);
        Self {
            magnitude: if frame.is_negative() {
                -magnitude
            } else {
                magnitude
            },
            standard,
        }
    }

    /// Renders the reading the way it is typed out, with a trailing newline.
    pub fn to_text(&self) -> String<MAX_TEXT_LEN> {
        let mut text = String::new();
        let _ = writeln!(text, "{}", self);
        text
    }
}

impl fmt::Display for DecodedMeasurement {
    /// Two decimals followed by the unit, e.g. `12.50 mm` or `-0.63 inch`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Inch readings carry one extra decimal, rounded half away from zero.
        let scale = match self.standard {
            Standard::Millimeter => 1,
            Standard::Inch => 10,
        };
        let raw = i32::from(self.magnitude);
        let hundredths = (raw.abs() + scale / 2) / scale;
        let sign = if raw < 0 && hundredths != 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:02} {}",
            sign,
            hundredths / 100,
            hundredths % 100,
            self.standard.suffix()
        )
    }
}
