//! Hardware-free core logic for the Sounder range display
//!
//! This crate contains all driver logic that does not depend on a bus,
//! a pin, or a clock:
//!
//! - The 16x2 cursor/DDRAM addressing model for the character LCD
//! - Echo pulse-width validation and distance conversion
//! - The ranging state machine (trigger gating, re-trigger throttle)
//!
//! Everything here is deterministic; timestamps are plain microsecond
//! values supplied by the caller, never read from a clock.

#![no_std]
#![deny(unsafe_code)]

pub mod display;
pub mod ranging;
