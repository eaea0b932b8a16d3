//! AS5600 12-bit magnetic rotary position sensor (I2C)
//!
//! Only the raw angle and magnet status registers are used. The sensor needs
//! external pull-ups on SDA/SCL and runs happily at 400 kHz.

use kestrel_hal::I2cBus;

/// 7-bit bus address
pub const ADDRESS: u8 = 0x36;

/// Register addresses
pub mod reg {
    /// Configuration (filters, hysteresis, power mode)
    pub const CONF: u8 = 0x07;
    /// Magnet status
    pub const STATUS: u8 = 0x0B;
    /// Unscaled, unfiltered angle
    pub const RAW_ANGLE: u8 = 0x0C;
}

/// Fast filter threshold written by [`As5600::setup`]
const FAST_FILTER_THRESHOLD: u8 = 0b001;

/// Slow filter setting written by [`As5600::setup`]
const SLOW_FILTER: u8 = 0b00;

/// One full turn in raw counts
pub const COUNTS_PER_TURN: u16 = 4096;

/// Magnet detection result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MagnetStatus {
    /// Detected and in range
    Ok,
    /// Not detected
    Missing,
    /// Too weak (AGC at maximum)
    Weak,
    /// Too strong (AGC at minimum)
    Strong,
}

impl MagnetStatus {
    /// Decode the STATUS register
    pub fn from_register(status: u8) -> Self {
        let detected = status & (1 << 5) != 0;
        let too_weak = status & (1 << 4) != 0;
        let too_strong = status & (1 << 3) != 0;

        if !detected {
            MagnetStatus::Missing
        } else if too_weak {
            MagnetStatus::Weak
        } else if too_strong {
            MagnetStatus::Strong
        } else {
            MagnetStatus::Ok
        }
    }

    /// Short label for reports
    pub fn label(&self) -> &'static str {
        match self {
            MagnetStatus::Ok => "Good",
            MagnetStatus::Missing => "Missing",
            MagnetStatus::Weak => "Weak",
            MagnetStatus::Strong => "Strong",
        }
    }
}

/// AS5600 on an I2C bus
pub struct As5600<I2C> {
    i2c: I2C,
}

impl<I2C: I2cBus> As5600<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Write the filter configuration
    pub fn setup(&mut self) -> Result<(), I2C::Error> {
        let conf = (FAST_FILTER_THRESHOLD << 2) | SLOW_FILTER;
        self.i2c.write(ADDRESS, &[reg::CONF, conf])
    }

    /// Raw angle, 0-4095
    pub fn angle(&mut self) -> Result<u16, I2C::Error> {
        let mut data = [0u8; 2];
        self.i2c.write_read(ADDRESS, &[reg::RAW_ANGLE], &mut data)?;
        Ok((((data[0] & 0x0F) as u16) << 8) | data[1] as u16)
    }

    /// Magnet detection state
    pub fn magnet_status(&mut self) -> Result<MagnetStatus, I2C::Error> {
        let mut data = [0u8; 1];
        self.i2c.write_read(ADDRESS, &[reg::STATUS], &mut data)?;
        Ok(MagnetStatus::from_register(data[0]))
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut I2C {
        &mut self.i2c
    }
}
