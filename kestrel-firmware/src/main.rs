//! Kestrel - Front panel firmware
//!
//! Main firmware binary for RP2040-based panel boards: an ST7789 display,
//! a rotary encoder with push button, a back button, and an optional
//! filament flow sensor.
//!
//! Three tasks share the work:
//! - `poll_task` samples input at 1 kHz and ticks the flow sensor
//! - `panel_task` draws screens and turns clicks into commands
//! - `main_loop_task` hands queued commands to the interpreter

#![no_std]
#![no_main]

use core::cell::RefCell;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::i2c::{self, I2c};
use embassy_rp::spi::Spi;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Delay;
use kestrel_core::bridge::CommandBridge;
use kestrel_core::config::{parse_config, HmiConfig, PinConfig};
use kestrel_core::input::{ButtonLines, ButtonMask, QuadratureEncoder, SharedInput};
use kestrel_drivers::display::{St7789, St7789Config};
use kestrel_drivers::sensor::{As5600, FlowSensor};
use kestrel_hal::eh::EhI2c;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::board::{spi_config, PanelSpi, PinPool};
use crate::channels::{Bridge, Input, SharedFlow};

mod board;
mod channels;
mod tasks;

/// Embedded configuration (compiled into firmware)
/// Edit panel.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../panel.toml");

/// I2C clock for the flow sensor
const FLOW_I2C_FREQUENCY: u32 = 400_000;

static CONFIG: StaticCell<HmiConfig> = StaticCell::new();
static INPUT: StaticCell<Input> = StaticCell::new();
static BRIDGE: StaticCell<Bridge> = StaticCell::new();
static FLOW: StaticCell<SharedFlow> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Kestrel firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config: &'static HmiConfig = CONFIG.init(load_config());
    let panel = &config.panel;

    // Display bus: the pin mux fixes SCK/MOSI/MISO per peripheral
    let bus_config = spi_config(panel.spi_frequency);
    let spi = match panel.spi_channel {
        1 => PanelSpi::Spi1(Spi::new_blocking(p.SPI1, p.PIN_10, p.PIN_11, p.PIN_12, bus_config)),
        _ => PanelSpi::Spi0(Spi::new_blocking(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, bus_config)),
    };
    info!("SPI{} initialized at {} Hz", panel.spi_channel, panel.spi_frequency);

    // Flow sensor on I2C1 (SDA gpio26, SCL gpio27)
    let flow: Option<&'static SharedFlow> = if config.flow_sensor.enable {
        let mut i2c_config = i2c::Config::default();
        i2c_config.frequency = FLOW_I2C_FREQUENCY;
        let bus = I2c::new_blocking(p.I2C1, p.PIN_27, p.PIN_26, i2c_config);

        let mut sensor = FlowSensor::new(As5600::new(EhI2c(bus)), &config.flow_sensor);
        match sensor.start() {
            Ok(()) => info!("Flow sensor ready"),
            Err(e) => error!("ERROR: {}", defmt::Display2Format(&e)),
        }
        Some(&*FLOW.init(Mutex::new(RefCell::new(sensor))))
    } else {
        None
    };

    // Every remaining GPIO is available to the config
    let mut pins: PinPool = crate::pin_pool!(p;
        0 => PIN_0, 1 => PIN_1, 2 => PIN_2, 3 => PIN_3, 4 => PIN_4,
        5 => PIN_5, 6 => PIN_6, 7 => PIN_7, 8 => PIN_8, 9 => PIN_9,
        13 => PIN_13, 14 => PIN_14, 15 => PIN_15, 17 => PIN_17,
        20 => PIN_20, 21 => PIN_21, 22 => PIN_22, 23 => PIN_23,
        24 => PIN_24, 25 => PIN_25, 28 => PIN_28, 29 => PIN_29,
    );

    let cs = claim("cs_pin", panel.cs_pin, pins.output(panel.cs_pin));
    let rst = claim("rst_pin", panel.rst_pin, pins.output(panel.rst_pin));
    let Some(dc) = claim("dc_pin", panel.dc_pin, pins.output(panel.dc_pin)) else {
        error!("dc_pin must name a free GPIO, panel disabled");
        halt().await
    };

    let encoder = match (
        claim("encoder_a_pin", panel.encoder_a_pin, pins.input(panel.encoder_a_pin)),
        claim("encoder_b_pin", panel.encoder_b_pin, pins.input(panel.encoder_b_pin)),
    ) {
        (Some(a), Some(b)) => Some(QuadratureEncoder::new(a, b)),
        _ => None,
    };

    let mut buttons = ButtonLines::new();
    for (name, button, pin) in [
        ("click_pin", ButtonMask::SELECT, panel.click_pin),
        ("back_pin", ButtonMask::PAUSE, panel.back_pin),
    ] {
        let Some(line) = claim(name, pin, pins.input(pin)) else {
            continue;
        };
        let active_low = pin.is_some_and(|cfg| cfg.inverted);
        if let Err(e) = buttons.bind(button, line, active_low) {
            warn!("{}: {}", name, e);
        }
    }
    info!("Input lines configured");

    let input: &'static Input = INPUT.init(SharedInput::new());
    let bridge: &'static Bridge = BRIDGE.init(CommandBridge::new());

    let lcd = St7789::new(
        spi,
        cs,
        dc,
        rst,
        Delay,
        input,
        St7789Config {
            width: panel.width,
            height: panel.height,
            col_start: panel.col_start,
            row_start: panel.row_start,
            rotation: panel.rotation,
            encoder_resolution: panel.encoder_resolution,
        },
    );

    spawner.spawn(tasks::poll_task(encoder, buttons, input, flow)).unwrap();
    spawner
        .spawn(tasks::panel_task(lcd, bridge, &config.about, panel.refresh_hz))
        .unwrap();
    spawner.spawn(tasks::main_loop_task(bridge, flow)).unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Parse the embedded configuration, falling back to defaults
fn load_config() -> HmiConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration successfully");
            config
        }
        Err(e) => {
            // build.rs validates panel.toml, so this means the two disagree
            error!("Failed to parse embedded config: {}", e);
            error!("Using default configuration");
            HmiConfig::default()
        }
    }
}

/// Log a configured pin that could not be taken from the pool
fn claim<T>(name: &str, wanted: Option<PinConfig>, taken: Option<T>) -> Option<T> {
    if let (Some(cfg), None) = (wanted, &taken) {
        warn!("{=str}: gpio{} is reserved or already in use", name, cfg.pin);
    }
    taken
}

/// Park the main task forever
async fn halt() -> ! {
    loop {
        embassy_time::Timer::after_secs(60).await;
    }
}
