//! Sounder - ultrasonic range display firmware
//!
//! RP2040 firmware wiring an HC-SR04 rangefinder to a PCF8574-backed
//! 16x2 LCD. The echo task times the sensor's pulse pair off GPIO edge
//! interrupts, the range task paces measurements, and the display task
//! renders the readings.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::i2c::{self, InterruptHandler as I2cInterruptHandler};
use embassy_rp::peripherals::I2C1;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use {defmt_rtt as _, panic_probe as _};

use sounder_drivers::ultrasonic::RangeSensor;

mod channels;
mod tasks;

bind_interrupts!(struct Irqs {
    I2C1_IRQ => I2cInterruptHandler<I2C1>;
});

/// Shared sensor context: the echo task writes it, the range task reads it
static SENSOR: RangeSensor<CriticalSectionRawMutex> = RangeSensor::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Sounder firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // HC-SR04: trigger out, echo in (sensor drives the line high)
    let trigger = Output::new(p.PIN_16, Level::Low);
    let echo = Input::new(p.PIN_17, Pull::Down);

    // LCD backpack on I2C1 (GPIO26 SDA / GPIO27 SCL)
    let i2c = i2c::I2c::new_async(p.I2C1, p.PIN_27, p.PIN_26, Irqs, i2c::Config::default());

    spawner.spawn(tasks::echo_task(&SENSOR, echo)).unwrap();
    spawner.spawn(tasks::range_task(&SENSOR, trigger)).unwrap();
    spawner.spawn(tasks::display_task(i2c)).unwrap();

    info!("All tasks spawned");
}
