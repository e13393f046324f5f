//! Ranging state machine
//!
//! Gatekeeper for the trigger line. A trigger may only be emitted from
//! `Idle`, and never sooner than the sensor's mandated spacing after the
//! previous one - re-triggering while the transducer is still ringing
//! produces phantom echoes. The transition functions enforce both
//! preconditions; callers never mutate the state directly.

/// Minimum spacing between trigger pulses (sensor duty-cycle limit)
pub const MIN_TRIGGER_SPACING_US: u64 = 60_000;

/// Measurement cycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RangeState {
    /// Ready for a trigger
    Idle,
    /// Trigger emitted, waiting for the echo pulse to complete
    Measuring,
}

/// Why a trigger request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerRejected {
    /// A measurement is already in flight
    Measuring,
    /// Less than the minimum spacing since the previous trigger
    Throttled,
}

/// State and trigger bookkeeping for one sensor
///
/// Timestamps are monotonic microseconds supplied by the caller; the
/// machine never reads a clock, which keeps every transition testable.
#[derive(Debug, Clone)]
pub struct RangingMachine {
    state: RangeState,
    last_trigger_us: Option<u64>,
}

impl Default for RangingMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RangingMachine {
    pub const fn new() -> Self {
        Self {
            state: RangeState::Idle,
            last_trigger_us: None,
        }
    }

    pub fn state(&self) -> RangeState {
        self.state
    }

    /// Timestamp of the last accepted trigger, if any
    pub fn last_trigger_us(&self) -> Option<u64> {
        self.last_trigger_us
    }

    /// Arm a measurement: `Idle` -> `Measuring`
    ///
    /// Refused without side effects when a measurement is in flight or
    /// the spacing window has not elapsed - `last_trigger_us` is only
    /// updated on success.
    pub fn try_arm(&mut self, now_us: u64, min_spacing_us: u64) -> Result<(), TriggerRejected> {
        if self.state != RangeState::Idle {
            return Err(TriggerRejected::Measuring);
        }

        if let Some(last) = self.last_trigger_us {
            if now_us < last.saturating_add(min_spacing_us) {
                return Err(TriggerRejected::Throttled);
            }
        }

        self.state = RangeState::Measuring;
        self.last_trigger_us = Some(now_us);
        Ok(())
    }

    /// Complete the cycle: `Measuring` -> `Idle`
    ///
    /// Called from the echo edge handler once the falling edge has been
    /// timed. A stray falling edge while `Idle` is a no-op.
    pub fn complete(&mut self) {
        self.state = RangeState::Idle;
    }

    /// Force `Idle` ahead of a new request or after a timeout
    ///
    /// Keeps `last_trigger_us` - a reset must not bypass the spacing
    /// throttle.
    pub fn reset(&mut self) {
        self.state = RangeState::Idle;
    }
}
