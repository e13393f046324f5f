//! Character LCD addressing model
//!
//! The HD44780 controller auto-increments its DDRAM address after every
//! data write; the driver mirrors that locally instead of reading the
//! address counter back. [`CursorPos`] is that mirror.

mod cursor;

pub use cursor::{CursorPos, COLS, ROWS};
