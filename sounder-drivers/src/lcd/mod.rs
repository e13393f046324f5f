//! HD44780 16x2 LCD driver (4-bit mode via PCF8574 I2C expander)
//!
//! The expander maps one I2C byte onto the panel's control lines:
//! DB7..DB4 on the high nibble, backlight / enable / read-write /
//! register-select on the low nibble. Every byte therefore carries half
//! of a command or character plus the control state, and the controller
//! latches it on the falling edge of ENABLE.
//!
//! # Timing
//!
//! The controller is far slower than the bus. Each nibble is held for
//! the worst-case instruction time (50 us) after the enable strobe, and
//! clear/home need a 2 ms recovery on top. The delays are part of the
//! protocol; skipping one garbles the display rather than failing.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use sounder_core::display::CursorPos;

pub mod endpoint;

/// PCF8574 backpack address with all address pins open
pub const DEFAULT_ADDR: u8 = 0x27;

/// HD44780 instruction set
#[allow(dead_code)]
mod cmd {
    pub const CLEAR_DISPLAY: u8 = 0x01;
    pub const RETURN_HOME: u8 = 0x02;
    pub const ENTRY_MODE_SET: u8 = 0x04;
    pub const DISPLAY_CONTROL: u8 = 0x08;
    pub const CURSOR_SHIFT: u8 = 0x10;
    pub const FUNCTION_SET: u8 = 0x20;
    pub const SET_CGRAM_ADDR: u8 = 0x40;
    pub const SET_DDRAM_ADDR: u8 = 0x80;

    // ENTRY_MODE_SET bits
    pub const ENTRY_INCREMENT: u8 = 0x02;
    // DISPLAY_CONTROL bits
    pub const DISPLAY_ON: u8 = 0x04;
    pub const CURSOR_ON: u8 = 0x02;
    pub const BLINK_ON: u8 = 0x01;
    // FUNCTION_SET bits
    pub const FUNCTION_2LINE: u8 = 0x08;
}

/// PCF8574 pin assignment on the common LCD backpack
#[allow(dead_code)]
mod expander {
    pub const REGISTER_SELECT: u8 = 0x01;
    pub const READ_WRITE: u8 = 0x02;
    pub const ENABLE: u8 = 0x04;
    pub const BACKLIGHT: u8 = 0x08;
}

/// LCD driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LcdError<E> {
    /// A bus transaction did not complete. Fatal to the operation in
    /// progress: a half-sent nibble pair leaves the controller latch in
    /// an unknown phase, so nothing is retried.
    Bus(E),
    /// Cursor coordinates off the panel; rejected before any bus access
    OutOfRange,
}

/// Driver configuration
#[derive(Debug, Clone, Copy)]
pub struct LcdConfig {
    /// I2C address of the PCF8574 backpack
    pub address: u8,
}

impl Default for LcdConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDR,
        }
    }
}

/// HD44780 panel behind a PCF8574 expander
///
/// Owns the bus handle for the lifetime of the driver. The cursor field
/// mirrors the controller's auto-incrementing DDRAM address counter; it
/// is never read back from the hardware (see [`CursorPos`]).
pub struct Lcd1602<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    cursor: CursorPos,
    backlight: bool,
    display_on: bool,
    cursor_on: bool,
    blink_on: bool,
}

impl<I2C, D> Lcd1602<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    /// Create a driver; the panel is not touched until [`init`](Self::init)
    pub fn new(i2c: I2C, delay: D, config: LcdConfig) -> Self {
        Self {
            i2c,
            delay,
            address: config.address,
            cursor: CursorPos::origin(),
            backlight: true,
            display_on: false,
            cursor_on: false,
            blink_on: false,
        }
    }

    /// Power-on initialization
    ///
    /// The controller may wake in 8-bit mode or mid-way through a nibble
    /// pair, so the sequence starts with three 8-bit-mode function sets
    /// before dropping to 4-bit - this converges from any prior state.
    /// A failed step aborts and leaves the panel uninitialized.
    pub async fn init(&mut self) -> Result<(), LcdError<I2C::Error>> {
        self.delay.delay_ms(50).await;

        self.send_nibble(0x30, 0).await?;
        self.delay.delay_ms(5).await;
        self.send_nibble(0x30, 0).await?;
        self.delay.delay_us(150).await;
        self.send_nibble(0x30, 0).await?;
        self.delay.delay_us(150).await;

        // Switch to 4-bit mode
        self.send_nibble(0x20, 0).await?;

        // 4-bit, 2 lines, 5x8 font
        self.command(cmd::FUNCTION_SET | cmd::FUNCTION_2LINE).await?;

        self.display_on = true;
        self.cursor_on = false;
        self.blink_on = false;
        self.command(cmd::DISPLAY_CONTROL | self.display_bits()).await?;

        self.command(cmd::CLEAR_DISPLAY).await?;
        self.command(cmd::ENTRY_MODE_SET | cmd::ENTRY_INCREMENT).await?;

        self.cursor = CursorPos::origin();
        self.backlight = true;

        Ok(())
    }

    /// Current cursor model position
    pub fn cursor(&self) -> CursorPos {
        self.cursor
    }

    pub fn backlight(&self) -> bool {
        self.backlight
    }

    /// Set the backlight flag; takes effect on the next bus byte
    pub fn set_backlight(&mut self, on: bool) {
        self.backlight = on;
    }

    /// Clear the display; cursor returns to the origin
    pub async fn clear(&mut self) -> Result<(), LcdError<I2C::Error>> {
        self.command(cmd::CLEAR_DISPLAY).await
    }

    /// Return the cursor to the origin without clearing
    pub async fn home(&mut self) -> Result<(), LcdError<I2C::Error>> {
        self.command(cmd::RETURN_HOME).await
    }

    /// Switch the display on or off (contents are retained)
    pub async fn set_display(&mut self, on: bool) -> Result<(), LcdError<I2C::Error>> {
        self.display_on = on;
        self.command(cmd::DISPLAY_CONTROL | self.display_bits()).await
    }

    /// Move the cursor; out-of-panel coordinates are rejected before any
    /// bus traffic and leave the model untouched
    pub async fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), LcdError<I2C::Error>> {
        let pos = CursorPos::new(col, row).ok_or(LcdError::OutOfRange)?;
        self.command(cmd::SET_DDRAM_ADDR | pos.ddram_addr()).await?;
        self.cursor = pos;
        Ok(())
    }

    /// Write one character at the cursor and advance the model, mirroring
    /// the controller's own auto-increment
    pub async fn write_char(&mut self, ch: u8) -> Result<(), LcdError<I2C::Error>> {
        self.send_nibble(ch, expander::REGISTER_SELECT).await?;
        self.send_nibble(ch << 4, expander::REGISTER_SELECT).await?;
        self.cursor.advance();
        Ok(())
    }

    /// Render a character stream
    ///
    /// Control bytes steer the cursor: `\n` moves to column 0 of the
    /// other row, `\r` to column 0 of the current row, form feed clears,
    /// backspace erases in place. Printable ASCII is written, everything
    /// else is consumed silently. Returns the number of input bytes
    /// processed; a bus failure after some progress is reported as a
    /// short count, a failure on the very first byte as the error.
    pub async fn render(&mut self, data: &[u8]) -> Result<usize, LcdError<I2C::Error>> {
        let mut done = 0;

        for &byte in data {
            let step = match byte {
                b'\n' => {
                    let row = self.cursor.other_row();
                    self.set_cursor(0, row).await
                }
                b'\r' => {
                    let row = self.cursor.row();
                    self.set_cursor(0, row).await
                }
                0x0C => self.clear().await,
                0x08 => self.backspace().await,
                0x20..=0x7F => self.write_char(byte).await,
                _ => Ok(()),
            };

            match step {
                Ok(()) => done += 1,
                Err(e) if done == 0 => return Err(e),
                Err(_) => return Ok(done),
            }
        }

        Ok(done)
    }

    /// Erase the character left of the cursor; no-op at column 0
    async fn backspace(&mut self) -> Result<(), LcdError<I2C::Error>> {
        if self.cursor.col() == 0 {
            return Ok(());
        }

        let row = self.cursor.row();
        self.set_cursor(self.cursor.col() - 1, row).await?;
        self.write_char(b' ').await?;
        // write_char advanced back over the blank; step left again
        let row = self.cursor.row();
        self.set_cursor(self.cursor.col() - 1, row).await?;
        Ok(())
    }

    fn display_bits(&self) -> u8 {
        let mut bits = 0;
        if self.display_on {
            bits |= cmd::DISPLAY_ON;
        }
        if self.cursor_on {
            bits |= cmd::CURSOR_ON;
        }
        if self.blink_on {
            bits |= cmd::BLINK_ON;
        }
        bits
    }

    /// Send a full instruction as two nibbles; clear/home get their long
    /// recovery delay and reset the cursor model
    async fn command(&mut self, op: u8) -> Result<(), LcdError<I2C::Error>> {
        self.send_nibble(op, 0).await?;
        self.send_nibble(op << 4, 0).await?;

        if op == cmd::CLEAR_DISPLAY || op == cmd::RETURN_HOME {
            self.delay.delay_ms(2).await;
            self.cursor = CursorPos::origin();
        }

        Ok(())
    }

    /// Latch one nibble into the controller
    ///
    /// Three bus bytes: pins settle, ENABLE strobe (>=1 us), ENABLE
    /// released followed by the worst-case instruction time (>=50 us).
    /// The first failed write aborts - no partial retry.
    async fn send_nibble(&mut self, data: u8, control: u8) -> Result<(), LcdError<I2C::Error>> {
        let mut byte = (data & 0xF0) | control;
        if self.backlight {
            byte |= expander::BACKLIGHT;
        }

        self.i2c
            .write(self.address, &[byte])
            .await
            .map_err(LcdError::Bus)?;

        self.i2c
            .write(self.address, &[byte | expander::ENABLE])
            .await
            .map_err(LcdError::Bus)?;
        self.delay.delay_us(1).await;

        self.i2c
            .write(self.address, &[byte])
            .await
            .map_err(LcdError::Bus)?;
        self.delay.delay_us(50).await;

        Ok(())
    }
}
