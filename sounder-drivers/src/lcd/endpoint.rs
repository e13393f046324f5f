//! Serialized caller surface for the LCD
//!
//! One async mutex guards the whole driver. Every write and control
//! request holds it for its entire protocol sequence: two interleaved
//! nibble streams would corrupt the controller's latch phase, so
//! operations are strictly sequential.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use super::{Lcd1602, LcdError};

/// Largest accepted write: the panel's 16x2 character capacity
pub const MAX_WRITE: usize = 32;

/// Control requests accepted by the endpoint
///
/// The wire form of these is a small fixed parameter block (a cursor
/// pair or an on/off flag); the enum is its typed equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LcdControl {
    /// Clear the panel and home the cursor
    Clear,
    /// Home the cursor without clearing
    Home,
    /// Move the cursor (0-based, range-checked)
    SetCursor { col: u8, row: u8 },
    /// Backlight flag; no bus traffic of its own
    Backlight(bool),
    /// Display on/off (contents retained)
    Display(bool),
}

/// The write/control endpoint over a [`Lcd1602`]
pub struct LcdEndpoint<M: RawMutex, I2C, D> {
    lcd: Mutex<M, Lcd1602<I2C, D>>,
}

impl<M, I2C, D> LcdEndpoint<M, I2C, D>
where
    M: RawMutex,
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(lcd: Lcd1602<I2C, D>) -> Self {
        Self {
            lcd: Mutex::new(lcd),
        }
    }

    /// Bring the panel up; a failure here means the endpoint should not
    /// be exposed at all
    pub async fn init(&self) -> Result<(), LcdError<I2C::Error>> {
        self.lcd.lock().await.init().await
    }

    /// Render a character stream, truncated to the panel capacity.
    /// Returns the number of input bytes processed.
    pub async fn write(&self, data: &[u8]) -> Result<usize, LcdError<I2C::Error>> {
        let data = &data[..data.len().min(MAX_WRITE)];
        let mut lcd = self.lcd.lock().await;
        lcd.render(data).await
    }

    /// Execute one control request
    pub async fn control(&self, req: LcdControl) -> Result<(), LcdError<I2C::Error>> {
        let mut lcd = self.lcd.lock().await;
        match req {
            LcdControl::Clear => lcd.clear().await,
            LcdControl::Home => lcd.home().await,
            LcdControl::SetCursor { col, row } => lcd.set_cursor(col, row).await,
            LcdControl::Backlight(on) => {
                lcd.set_backlight(on);
                Ok(())
            }
            LcdControl::Display(on) => lcd.set_display(on).await,
        }
    }

    /// Teardown: blank the panel so stale output does not linger
    pub async fn shutdown(&self) -> Result<(), LcdError<I2C::Error>> {
        self.lcd.lock().await.clear().await
    }
}
