//! Hardware drivers for the Sounder range display
//!
//! Two independent drivers, each split into a protocol half and a
//! synchronized endpoint, generic over `embedded-hal` traits so the
//! protocol logic is testable against mocks:
//!
//! - [`lcd`]: HD44780 16x2 character panel behind a PCF8574 I2C expander,
//!   driven in 4-bit mode with the controller's settle delays
//! - [`ultrasonic`]: HC-SR04 trigger/echo rangefinder whose echo pulse is
//!   timed off GPIO edges

#![no_std]
#![deny(unsafe_code)]

pub mod lcd;
pub mod ultrasonic;

#[cfg(test)]
mod testutil;
