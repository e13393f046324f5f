//! Mock hardware shared by the driver tests

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{Error, ErrorKind, ErrorType, I2c, Operation};
use heapless::Vec;

/// Error injected by [`MockBus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFault;

impl Error for BusFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Records every byte sent over the bus
///
/// With `fail_after` set, the first `n` writes succeed and every write
/// after them fails - enough to cut a multi-step protocol sequence at an
/// arbitrary point.
pub struct MockBus {
    pub bytes: Vec<u8, 1024>,
    pub writes: usize,
    pub fail_after: Option<usize>,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            writes: 0,
            fail_after: None,
        }
    }
}

impl ErrorType for MockBus {
    type Error = BusFault;
}

impl I2c for MockBus {
    async fn transaction(
        &mut self,
        _address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), BusFault> {
        for op in operations.iter_mut() {
            match op {
                Operation::Write(data) => {
                    if let Some(limit) = self.fail_after {
                        if self.writes >= limit {
                            return Err(BusFault);
                        }
                    }
                    self.writes += 1;
                    self.bytes.extend_from_slice(data).map_err(|_| BusFault)?;
                }
                Operation::Read(data) => data.fill(0),
            }
        }
        Ok(())
    }
}

/// Counts requested delay time instead of sleeping
#[derive(Default)]
pub struct MockDelay {
    pub total_us: u64,
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_us += u64::from(ns) / 1_000;
    }
}

/// Output pin that remembers its level and counts rising edges
pub struct MockPin {
    pub high: bool,
    pub pulses: usize,
}

impl MockPin {
    pub fn new() -> Self {
        Self {
            high: false,
            pulses: 0,
        }
    }
}

impl PinErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        if !self.high {
            self.pulses += 1;
        }
        self.high = true;
        Ok(())
    }
}
