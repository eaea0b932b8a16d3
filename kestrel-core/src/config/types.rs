//! Configuration type definitions
//!
//! Read once at start-up from the `panel.toml` embedded in the firmware
//! image; nothing here is re-read at runtime.

use heapless::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum label length
pub const MAX_LABEL_LEN: usize = 24;

/// GPIO pin configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinConfig {
    /// GPIO pin number (0-29 for RP2040)
    pub pin: u8,
    /// Pin is active-low (inverted)
    pub inverted: bool,
    /// Enable internal pull-up
    pub pull_up: bool,
}

impl PinConfig {
    /// Create a new pin config
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            inverted: false,
            pull_up: false,
        }
    }

    /// Create an inverted (active-low) pin with pull-up, as buttons are wired
    pub const fn button(pin: u8) -> Self {
        Self {
            pin,
            inverted: true,
            pull_up: true,
        }
    }
}

/// Display and input hardware
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PanelConfig {
    /// SPI peripheral (0 or 1)
    pub spi_channel: u8,
    /// SPI clock in Hz
    pub spi_frequency: u32,
    /// Chip select line
    pub cs_pin: Option<PinConfig>,
    /// Reset line (None = not connected)
    pub rst_pin: Option<PinConfig>,
    /// Data/command select line
    pub dc_pin: Option<PinConfig>,
    /// Orientation 0-3
    pub rotation: u8,
    /// Column offset of the visible area in controller RAM
    pub col_start: u16,
    /// Row offset of the visible area in controller RAM
    pub row_start: u16,
    /// Native (rotation 0) width in pixels
    pub width: u16,
    /// Native (rotation 0) height in pixels
    pub height: u16,
    /// Encoder phase A
    pub encoder_a_pin: Option<PinConfig>,
    /// Encoder phase B
    pub encoder_b_pin: Option<PinConfig>,
    /// Encoder push button (SELECT)
    pub click_pin: Option<PinConfig>,
    /// Back/pause button
    pub back_pin: Option<PinConfig>,
    /// Encoder steps per detent
    pub encoder_resolution: u8,
    /// Panel refresh rate
    pub refresh_hz: u8,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            spi_channel: 0,
            spi_frequency: 16_000_000,
            cs_pin: Some(PinConfig::new(17)),
            rst_pin: None,
            dc_pin: Some(PinConfig::new(20)),
            rotation: 3,
            col_start: 0,
            row_start: 0,
            width: 240,
            height: 320,
            encoder_a_pin: None,
            encoder_b_pin: None,
            click_pin: None,
            back_pin: None,
            encoder_resolution: 4,
            refresh_hz: 20,
        }
    }
}

/// Machine identity shown on the About screen
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AboutConfig {
    /// Machine name
    pub machine_name: String<MAX_LABEL_LEN>,
    /// Manufacturer
    pub make: String<MAX_LABEL_LEN>,
    /// Model
    pub model: String<MAX_LABEL_LEN>,
}

/// Filament flow sensor (AS5600 on a drive gear)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlowSensorConfig {
    /// Sensor fitted
    pub enable: bool,
    /// Gear diameter in mm
    pub gear_diameter_mm: f32,
    /// True counts forward rotation as positive distance
    pub direction: bool,
}

impl Default for FlowSensorConfig {
    fn default() -> Self {
        Self {
            enable: false,
            gear_diameter_mm: 10.699,
            direction: true,
        }
    }
}

/// Complete panel configuration
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HmiConfig {
    /// `[panel]`
    pub panel: PanelConfig,
    /// `[about]`
    pub about: AboutConfig,
    /// `[flow_sensor]`
    pub flow_sensor: FlowSensorConfig,
}
