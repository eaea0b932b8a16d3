//! Board wiring
//!
//! The SPI and I2C lines are fixed by the RP2040 pin mux. Every other panel
//! line comes from `panel.toml` and is taken out of a [`PinPool`] at
//! start-up.

use embassy_rp::gpio::{AnyPin, Input, Level, Output, Pull};
use embassy_rp::peripherals::{SPI0, SPI1};
use embassy_rp::spi::{self, Blocking, Spi};
use embassy_rp::Peri;
use embedded_hal::spi::SpiBus as _;
use kestrel_core::config::PinConfig;
use kestrel_hal::eh::{EhInput, EhOutput};
use kestrel_hal::SpiBus;

/// Number of user GPIOs on the RP2040
pub const GPIO_COUNT: usize = 30;

/// GPIO lines not claimed by a fixed peripheral
pub struct PinPool {
    pins: [Option<Peri<'static, AnyPin>>; GPIO_COUNT],
}

impl PinPool {
    pub fn new(pins: [Option<Peri<'static, AnyPin>>; GPIO_COUNT]) -> Self {
        Self { pins }
    }

    /// Take a pin; `None` if it is reserved or already taken
    pub fn take(&mut self, pin: &PinConfig) -> Option<Peri<'static, AnyPin>> {
        self.pins.get_mut(pin.pin as usize)?.take()
    }

    /// Take a pin as a push-pull output, idle high
    pub fn output(&mut self, pin: Option<PinConfig>) -> Option<EhOutput<Output<'static>>> {
        let pin = self.take(&pin?)?;
        Some(EhOutput(Output::new(pin, Level::High)))
    }

    /// Take a pin as an input with the configured pull
    pub fn input(&mut self, pin: Option<PinConfig>) -> Option<EhInput<Input<'static>>> {
        let cfg = pin?;
        let pin = self.take(&cfg)?;
        let pull = if cfg.pull_up { Pull::Up } else { Pull::None };
        Some(EhInput(Input::new(pin, pull)))
    }
}

/// Fill a [`PinPool`] from the peripherals struct
///
/// `pin_pool!(p; 0 => PIN_0, 1 => PIN_1)`
#[macro_export]
macro_rules! pin_pool {
    ($p:expr; $($n:literal => $pin:ident),* $(,)?) => {{
        let mut pins: [Option<embassy_rp::Peri<'static, embassy_rp::gpio::AnyPin>>;
            $crate::board::GPIO_COUNT] = [const { None }; $crate::board::GPIO_COUNT];
        $( pins[$n] = Some($p.$pin.into()); )*
        $crate::board::PinPool::new(pins)
    }};
}

/// Display SPI on either peripheral
///
/// SPI0 uses SCK gpio18, MOSI gpio19, MISO gpio16; SPI1 uses SCK gpio10,
/// MOSI gpio11, MISO gpio12.
pub enum PanelSpi {
    Spi0(Spi<'static, SPI0, Blocking>),
    Spi1(Spi<'static, SPI1, Blocking>),
}

/// SPI settings for the display bus
pub fn spi_config(frequency: u32) -> spi::Config {
    let mut config = spi::Config::default();
    config.frequency = frequency;
    config
}

impl SpiBus for PanelSpi {
    type Error = spi::Error;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        match self {
            PanelSpi::Spi0(bus) => bus.write(data)?,
            PanelSpi::Spi1(bus) => bus.write(data)?,
        }
        self.flush()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        match self {
            PanelSpi::Spi0(bus) => bus.read(buf)?,
            PanelSpi::Spi1(bus) => bus.read(buf)?,
        }
        self.flush()
    }
}

impl PanelSpi {
    fn flush(&mut self) -> Result<(), spi::Error> {
        match self {
            PanelSpi::Spi0(bus) => bus.flush(),
            PanelSpi::Spi1(bus) => bus.flush(),
        }
    }
}
