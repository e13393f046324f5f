//! Blocking read surface for the rangefinder
//!
//! One measurement per read: arm, pulse the trigger line, then wait for
//! the edge context to publish the reading. The serialization lock only
//! covers arming and the trigger pulse - it is released before the wait,
//! so the edge context never contends with a sleeping caller.

use core::fmt::Write as _;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Duration, Instant};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use heapless::String;

use sounder_core::ranging::Reading;

use super::RangeSensor;

/// Trigger pulse hold; the sensor wants at least 10 us
const TRIGGER_PULSE_US: u32 = 15;

/// Endpoint configuration
#[derive(Debug, Clone, Copy)]
pub struct RangeConfig {
    /// How long a read waits for the echo. Far above the sensor's own
    /// 38 ms ceiling - this bounds a wholly lost echo, it is not tuned
    /// to the pulse width.
    pub timeout: Duration,
    /// Minimum spacing between trigger pulses (sensor duty-cycle limit)
    pub min_spacing: Duration,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            min_spacing: Duration::from_millis(60),
        }
    }
}

/// Rangefinder endpoint errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RangeError<E> {
    /// Measurement in flight or trigger spacing not yet elapsed; retry
    /// later, nothing was changed
    Busy,
    /// Echo never arrived; the cycle was reset so the next trigger only
    /// waits out the spacing
    Timeout,
    /// Caller was cancelled while waiting - distinct from [`Timeout`](Self::Timeout)
    /// so "no answer" and "gave up" stay distinguishable
    Interrupted,
    /// Caller buffer smaller than the formatted reading
    BufferTooSmall,
    /// Trigger line failure
    Trigger(E),
}

struct TriggerLine<P, D> {
    pin: P,
    delay: D,
}

/// The read endpoint over a [`RangeSensor`]
///
/// Owns the trigger line; the echo line lives with the edge task.
pub struct RangeEndpoint<'a, M: RawMutex, P, D> {
    sensor: &'a RangeSensor<M>,
    line: Mutex<M, TriggerLine<P, D>>,
    config: RangeConfig,
}

impl<'a, M, P, D> RangeEndpoint<'a, M, P, D>
where
    M: RawMutex,
    P: OutputPin,
    D: DelayNs,
{
    pub fn new(sensor: &'a RangeSensor<M>, pin: P, delay: D, config: RangeConfig) -> Self {
        Self {
            sensor,
            line: Mutex::new(TriggerLine { pin, delay }),
            config,
        }
    }

    /// One measurement, formatted as the record the caller reads:
    /// `"<mm>\n"` for a valid reading, `"ERROR\n"` for an out-of-window
    /// pulse. Returns the record length.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, RangeError<P::Error>> {
        let reading = self.measure(None).await?;
        format_record(reading, buf)
    }

    /// Like [`read`](Self::read), but a fired `cancel` signal aborts the
    /// wait with [`RangeError::Interrupted`]
    pub async fn read_with_cancel(
        &self,
        buf: &mut [u8],
        cancel: &Signal<M, ()>,
    ) -> Result<usize, RangeError<P::Error>> {
        let reading = self.measure(Some(cancel)).await?;
        format_record(reading, buf)
    }

    /// Trigger a measurement and wait for the reading
    pub async fn measure(
        &self,
        cancel: Option<&Signal<M, ()>>,
    ) -> Result<Reading, RangeError<P::Error>> {
        {
            let mut line = self.line.lock().await;

            // A cycle whose echo never came would otherwise stay wedged
            // in Measuring
            self.sensor.reset();
            self.sensor
                .try_arm(Instant::now(), self.config.min_spacing.as_micros())
                .map_err(|_| RangeError::Busy)?;

            line.pin.set_high().map_err(RangeError::Trigger)?;
            line.delay.delay_us(TRIGGER_PULSE_US).await;
            line.pin.set_low().map_err(RangeError::Trigger)?;
        }
        // Lock dropped: the edge context can now publish freely.

        let wait = async {
            match cancel {
                None => Ok(self.sensor.ready.wait().await),
                Some(cancel) => match select(self.sensor.ready.wait(), cancel.wait()).await {
                    Either::First(reading) => Ok(reading),
                    Either::Second(()) => Err(RangeError::Interrupted),
                },
            }
        };

        match with_timeout(self.config.timeout, wait).await {
            Ok(result) => result,
            Err(_) => {
                self.sensor.reset();
                Err(RangeError::Timeout)
            }
        }
    }
}

/// Format a reading into the caller's buffer; the buffer is checked
/// before anything is copied
fn format_record<E>(reading: Reading, buf: &mut [u8]) -> Result<usize, RangeError<E>> {
    let mut text: String<16> = String::new();
    match reading {
        Reading::Valid(mm) => {
            let _ = writeln!(text, "{}", mm);
        }
        Reading::Invalid => {
            let _ = text.push_str("ERROR\n");
        }
    }

    if buf.len() < text.len() {
        return Err(RangeError::BufferTooSmall);
    }
    buf[..text.len()].copy_from_slice(text.as_bytes());
    Ok(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockDelay, MockPin};
    use core::convert::Infallible;
    use embassy_futures::block_on;
    use embassy_futures::join::join;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embassy_time::Timer;
    use sounder_core::ranging::RangeState;

    type TestEndpoint<'a> = RangeEndpoint<'a, NoopRawMutex, MockPin, MockDelay>;

    fn config(timeout_ms: u64, spacing_ms: u64) -> RangeConfig {
        RangeConfig {
            timeout: Duration::from_millis(timeout_ms),
            min_spacing: Duration::from_millis(spacing_ms),
        }
    }

    fn endpoint(sensor: &RangeSensor<NoopRawMutex>, cfg: RangeConfig) -> TestEndpoint<'_> {
        RangeEndpoint::new(sensor, MockPin::new(), MockDelay::default(), cfg)
    }

    /// Fire a synthetic echo pulse of the given width shortly after the
    /// endpoint has triggered
    async fn echo_after(sensor: &RangeSensor<NoopRawMutex>, lead_ms: u64, width_us: u64) {
        Timer::after_millis(lead_ms).await;
        let rise = Instant::now();
        sensor.on_rising(rise);
        sensor.on_falling(rise + Duration::from_micros(width_us));
    }

    #[test]
    fn test_read_formats_distance() {
        let sensor = RangeSensor::new();
        let ep = endpoint(&sensor, config(200, 60));
        let mut buf = [0u8; 16];

        let (result, _) = block_on(join(ep.read(&mut buf), echo_after(&sensor, 5, 580)));

        let n = result.unwrap();
        assert_eq!(&buf[..n], b"100\n");
        assert_eq!(sensor.state(), RangeState::Idle);
    }

    #[test]
    fn test_read_reports_invalid_pulse() {
        let sensor = RangeSensor::new();
        let ep = endpoint(&sensor, config(200, 60));
        let mut buf = [0u8; 16];

        let (result, _) = block_on(join(ep.read(&mut buf), echo_after(&sensor, 5, 10)));

        let n = result.unwrap();
        assert_eq!(&buf[..n], b"ERROR\n");
    }

    #[test]
    fn test_timeout_leaves_device_usable() {
        let sensor = RangeSensor::new();
        let ep = endpoint(&sensor, config(50, 60));
        let mut buf = [0u8; 16];

        // No echo at all
        let result = block_on(ep.read(&mut buf));
        assert_eq!(result, Err(RangeError::Timeout));
        assert_eq!(sensor.state(), RangeState::Idle);

        // Once the spacing has elapsed the next measurement goes through
        let (result, _) = block_on(async {
            Timer::after_millis(70).await;
            join(ep.read(&mut buf), echo_after(&sensor, 5, 580)).await
        });
        let n = result.unwrap();
        assert_eq!(&buf[..n], b"100\n");
    }

    #[test]
    fn test_second_read_within_spacing_is_busy() {
        let sensor = RangeSensor::new();
        let ep = endpoint(&sensor, config(200, 60));
        let mut buf = [0u8; 16];

        let (result, _) = block_on(join(ep.read(&mut buf), echo_after(&sensor, 2, 580)));
        result.unwrap();

        // Well inside the 60 ms window
        let result = block_on(ep.read(&mut buf));
        assert_eq!(result, Err(RangeError::Busy));
    }

    #[test]
    fn test_cancel_is_distinct_from_timeout() {
        let sensor = RangeSensor::new();
        let ep = endpoint(&sensor, config(200, 60));
        let cancel: Signal<NoopRawMutex, ()> = Signal::new();
        let mut buf = [0u8; 16];

        let (result, _) = block_on(join(ep.read_with_cancel(&mut buf, &cancel), async {
            Timer::after_millis(5).await;
            cancel.signal(());
        }));

        assert_eq!(result, Err(RangeError::Interrupted));
    }

    #[test]
    fn test_buffer_too_small() {
        let sensor = RangeSensor::new();
        let ep = endpoint(&sensor, config(200, 60));
        let mut buf = [0u8; 3];

        let (result, _) = block_on(join(ep.read(&mut buf), echo_after(&sensor, 5, 580)));

        assert_eq!(result, Err(RangeError::BufferTooSmall));
        // Nothing was copied into the short buffer
        assert_eq!(buf, [0u8; 3]);
    }

    #[test]
    fn test_format_record() {
        let mut buf = [0u8; 16];

        let n = format_record::<Infallible>(Reading::Valid(6551), &mut buf).unwrap();
        assert_eq!(&buf[..n], b"6551\n");

        let n = format_record::<Infallible>(Reading::Invalid, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"ERROR\n");
    }
}
