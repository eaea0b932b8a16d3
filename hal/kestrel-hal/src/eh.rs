//! Adapters from `embedded-hal` 1.0 peripherals
//!
//! Chip HALs such as embassy-rp implement the `embedded-hal` traits; wrapping
//! their types here lets the drivers stay on the narrower Kestrel traits.

use core::convert::Infallible;

use embedded_hal::digital;
use embedded_hal::i2c;

use crate::{I2cBus, InputPin, OutputPin};

/// Blocking I2C wrapper
pub struct EhI2c<B>(pub B);

impl<B: i2c::I2c> I2cBus for EhI2c<B> {
    type Error = B::Error;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.0.write(address, data)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.0.read(address, buf)
    }

    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.0.write_read(address, write_data, read_buf)
    }
}

/// Output pin wrapper for infallible GPIO
pub struct EhOutput<P>(pub P);

impl<P: digital::OutputPin<Error = Infallible>> OutputPin for EhOutput<P> {
    fn set_high(&mut self) {
        match self.0.set_high() {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    fn set_low(&mut self) {
        match self.0.set_low() {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }
}

/// Input pin wrapper for infallible GPIO
pub struct EhInput<P>(pub P);

impl<P: digital::InputPin<Error = Infallible>> InputPin for EhInput<P> {
    fn is_high(&mut self) -> bool {
        match self.0.is_high() {
            Ok(level) => level,
            Err(never) => match never {},
        }
    }
}
