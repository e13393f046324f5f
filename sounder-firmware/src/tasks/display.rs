//! Display task - renders range readings on the 16x2 panel

use core::fmt::Write as _;

use defmt::*;
use embassy_rp::i2c::{Async, I2c};
use embassy_rp::peripherals::I2C1;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Delay;

use sounder_core::display::COLS;
use sounder_drivers::lcd::endpoint::{LcdControl, LcdEndpoint};
use sounder_drivers::lcd::{Lcd1602, LcdConfig};

use crate::channels::RANGE_LINE;

#[embassy_executor::task]
pub async fn display_task(i2c: I2c<'static, I2C1, Async>) {
    info!("Display task started");

    let lcd = Lcd1602::new(i2c, Delay, LcdConfig::default());
    let endpoint: LcdEndpoint<CriticalSectionRawMutex, _, _> = LcdEndpoint::new(lcd);

    // Probe-style bring-up: an unreachable panel means no display at all
    if endpoint.init().await.is_err() {
        error!("LCD init failed, display disabled");
        return;
    }

    let _ = endpoint.write(b"\x0cRange (mm)").await;

    loop {
        let line = RANGE_LINE.wait().await;

        // Pad to a full row so a shorter reading overwrites the old one
        let mut padded: heapless::String<20> = heapless::String::new();
        let _ = write!(padded, "{:<width$}", line.as_str(), width = COLS as usize);

        let moved = endpoint
            .control(LcdControl::SetCursor { col: 0, row: 1 })
            .await;
        if moved.is_err() || endpoint.write(padded.as_bytes()).await.is_err() {
            warn!("LCD write failed");
        }
    }
}
