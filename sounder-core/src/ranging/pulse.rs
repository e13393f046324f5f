//! Echo pulse evaluation
//!
//! The HC-SR04 encodes distance as the width of the echo pulse. Widths
//! outside the sensor's usable window are reported as invalid rather
//! than converted - a 50 us glitch is noise, not a 8 mm object.

/// Shortest echo pulse the sensor can produce for a real target (~3 mm)
pub const MIN_ECHO_US: u32 = 20;

/// Longest valid echo pulse (~6.5 m); anything longer means the echo
/// was lost and the sensor timed out on its own
pub const MAX_ECHO_US: u32 = 38_000;

/// Result of one pulse measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reading {
    /// Distance to the target in millimetres
    Valid(u32),
    /// Pulse width outside the sensor's valid window
    Invalid,
}

impl Reading {
    /// Distance in millimetres, if the measurement was valid
    pub fn distance_mm(&self) -> Option<u32> {
        match self {
            Reading::Valid(mm) => Some(*mm),
            Reading::Invalid => None,
        }
    }
}

/// Convert a pulse width to millimetres
///
/// Round trip at the speed of sound is 58 us per centimetre, so
/// `us / 58` is centimetres and `us * 10 / 58` is millimetres.
pub fn distance_mm(duration_us: u32) -> u32 {
    duration_us * 10 / 58
}

/// Validate a pulse width and convert it
pub fn evaluate(duration_us: u32) -> Reading {
    if (MIN_ECHO_US..=MAX_ECHO_US).contains(&duration_us) {
        Reading::Valid(distance_mm(duration_us))
    } else {
        Reading::Invalid
    }
}
