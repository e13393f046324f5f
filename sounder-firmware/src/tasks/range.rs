//! Ranging tasks
//!
//! Two halves: [`echo_task`] is the edge-interrupt service for the echo
//! line, [`range_task`] paces measurements and publishes the readings.

use defmt::*;
use embassy_rp::gpio::{Input, Output};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Delay, Duration, Ticker};

use sounder_drivers::ultrasonic::endpoint::{RangeConfig, RangeEndpoint, RangeError};
use sounder_drivers::ultrasonic::RangeSensor;

use crate::channels::{RangeLine, RANGE_LINE};

/// Measurement cadence; comfortably above the sensor's 60 ms spacing
const MEASURE_INTERVAL_MS: u64 = 200;

/// Echo edge service - the interrupt half of the sensor driver
#[embassy_executor::task]
pub async fn echo_task(
    sensor: &'static RangeSensor<CriticalSectionRawMutex>,
    echo: Input<'static>,
) -> ! {
    info!("Echo task started");
    sensor.run(echo).await
}

/// Periodic measurement task
#[embassy_executor::task]
pub async fn range_task(
    sensor: &'static RangeSensor<CriticalSectionRawMutex>,
    trigger: Output<'static>,
) {
    info!("Range task started");

    let endpoint = RangeEndpoint::new(sensor, trigger, Delay, RangeConfig::default());
    let mut ticker = Ticker::every(Duration::from_millis(MEASURE_INTERVAL_MS));
    let mut buf = [0u8; 16];

    loop {
        ticker.next().await;

        let mut line = RangeLine::new();
        match endpoint.read(&mut buf).await {
            Ok(n) => {
                let text = core::str::from_utf8(&buf[..n]).unwrap_or("ERROR");
                let _ = line.push_str(text.trim_end());
            }
            Err(RangeError::Busy) => continue,
            Err(RangeError::Timeout) => {
                warn!("Echo timed out");
                let _ = line.push_str("----");
            }
            Err(_) => {
                warn!("Measurement failed");
                let _ = line.push_str("----");
            }
        }

        RANGE_LINE.signal(line);
    }
}
