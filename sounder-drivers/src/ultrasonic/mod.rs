//! HC-SR04 ultrasonic rangefinder driver
//!
//! The sensor answers a trigger pulse with a high pulse on the echo line
//! whose width encodes the round-trip time. Two execution contexts share
//! the device state:
//!
//! - the **edge context**: [`RangeSensor::run`] sits on the echo pin's
//!   edge interrupts, timestamps both edges and publishes the reading.
//!   It only ever takes the short blocking mutex and never sleeps.
//! - the **caller context**: the endpoint arms the state machine, emits
//!   the trigger pulse and then waits on the readiness signal - without
//!   holding any lock the edge context needs.
//!
//! The signal payload is the fully evaluated reading, so a woken waiter
//! always observes a consistent distance.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::signal::Signal;
use embassy_time::Instant;
use embedded_hal_async::digital::Wait;

use sounder_core::ranging::{pulse, RangeState, RangingMachine, Reading, TriggerRejected};

pub mod endpoint;

struct Shared {
    machine: RangingMachine,
    pulse_start: Option<Instant>,
    last_reading: Option<Reading>,
}

/// Shared sensor context
///
/// `const`-constructible so the firmware can keep it in a `static` and
/// hand references to both the edge task and the endpoint.
pub struct RangeSensor<M: RawMutex> {
    shared: BlockingMutex<M, RefCell<Shared>>,
    ready: Signal<M, Reading>,
}

impl<M: RawMutex> RangeSensor<M> {
    pub const fn new() -> Self {
        Self {
            shared: BlockingMutex::new(RefCell::new(Shared {
                machine: RangingMachine::new(),
                pulse_start: None,
                last_reading: None,
            })),
            ready: Signal::new(),
        }
    }

    /// Rising echo edge: the pulse has started
    pub fn on_rising(&self, at: Instant) {
        self.shared.lock(|s| s.borrow_mut().pulse_start = Some(at));
    }

    /// Falling echo edge: time the pulse and publish the reading
    ///
    /// Completes the measurement cycle and wakes the waiter. A falling
    /// edge with no recorded rise (noise, or a pulse that straddled a
    /// reset) is dropped.
    pub fn on_falling(&self, at: Instant) {
        let reading = self.shared.lock(|s| {
            let mut s = s.borrow_mut();
            let start = s.pulse_start.take()?;
            let width = at.checked_duration_since(start)?;

            let width_us = width.as_micros().min(u64::from(u32::MAX)) as u32;
            let reading = pulse::evaluate(width_us);

            s.machine.complete();
            s.last_reading = Some(reading);
            Some(reading)
        });

        if let Some(reading) = reading {
            // Signalled only after the distance is fully computed
            self.ready.signal(reading);
        }
    }

    /// Serve the echo pin's edge stream; the firmware runs this in its
    /// own task for the lifetime of the driver
    pub async fn run<P: Wait>(&self, mut echo: P) -> ! {
        loop {
            if echo.wait_for_rising_edge().await.is_err() {
                continue;
            }
            self.on_rising(Instant::now());

            if echo.wait_for_falling_edge().await.is_err() {
                continue;
            }
            self.on_falling(Instant::now());
        }
    }

    pub fn state(&self) -> RangeState {
        self.shared.lock(|s| s.borrow().machine.state())
    }

    /// Most recent completed reading, valid or not
    pub fn last_reading(&self) -> Option<Reading> {
        self.shared.lock(|s| s.borrow().last_reading)
    }

    /// Force the cycle back to idle and drop any stale readiness
    ///
    /// The trigger throttle survives a reset; only the state machine and
    /// the signal are cleared.
    pub(crate) fn reset(&self) {
        self.shared.lock(|s| s.borrow_mut().machine.reset());
        self.ready.reset();
    }

    pub(crate) fn try_arm(&self, now: Instant, min_spacing_us: u64) -> Result<(), TriggerRejected> {
        self.shared
            .lock(|s| s.borrow_mut().machine.try_arm(now.as_micros(), min_spacing_us))
    }
}

impl<M: RawMutex> Default for RangeSensor<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embassy_time::Duration;

    fn sensor() -> RangeSensor<NoopRawMutex> {
        RangeSensor::new()
    }

    fn at(us: u64) -> Instant {
        Instant::from_micros(us)
    }

    #[test]
    fn test_pulse_pair_produces_reading() {
        let s = sensor();
        s.try_arm(at(0), 0).unwrap();

        s.on_rising(at(1_000));
        assert_eq!(s.state(), RangeState::Measuring);

        s.on_falling(at(1_000) + Duration::from_micros(580));
        assert_eq!(s.state(), RangeState::Idle);
        assert_eq!(s.ready.try_take(), Some(Reading::Valid(100)));
        assert_eq!(s.last_reading(), Some(Reading::Valid(100)));
    }

    #[test]
    fn test_out_of_window_pulse_is_invalid() {
        let s = sensor();
        s.try_arm(at(0), 0).unwrap();

        s.on_rising(at(100));
        s.on_falling(at(100) + Duration::from_micros(10));

        assert_eq!(s.ready.try_take(), Some(Reading::Invalid));
        assert_eq!(s.last_reading(), Some(Reading::Invalid));
        assert_eq!(s.state(), RangeState::Idle);
    }

    #[test]
    fn test_falling_edge_without_rise_is_dropped() {
        let s = sensor();
        s.try_arm(at(0), 0).unwrap();

        s.on_falling(at(5_000));

        assert_eq!(s.ready.try_take(), None);
        // Cycle still in flight; only a timed pulse completes it
        assert_eq!(s.state(), RangeState::Measuring);
    }

    #[test]
    fn test_reset_clears_cycle_but_not_throttle() {
        let s = sensor();
        s.try_arm(at(0), 60_000).unwrap();
        s.on_rising(at(10));
        s.on_falling(at(10) + Duration::from_micros(580));

        s.reset();
        assert_eq!(s.ready.try_take(), None);
        assert_eq!(s.state(), RangeState::Idle);

        // Still throttled against the earlier trigger
        assert_eq!(s.try_arm(at(30_000), 60_000), Err(TriggerRejected::Throttled));
        assert_eq!(s.try_arm(at(60_000), 60_000), Ok(()));
    }
}
