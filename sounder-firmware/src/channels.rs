//! Inter-task communication channels
//!
//! Uses embassy-sync signals; a fresh reading simply replaces one the
//! display has not picked up yet.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use heapless::String;

/// Formatted reading for the display ("100", "ERROR", "----")
pub type RangeLine = String<16>;

/// Latest range reading (updated by the range task)
pub static RANGE_LINE: Signal<CriticalSectionRawMutex, RangeLine> = Signal::new();
