//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod display;
pub mod range;

pub use display::display_task;
pub use range::{echo_task, range_task};
