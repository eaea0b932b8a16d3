//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in kestrel-core for the parts found on a panel board:
//!
//! - Displays (ST7789 TFT over SPI)
//! - Sensors (AS5600 magnetic angle, filament flow sensor built on it)

#![no_std]
#![deny(unsafe_code)]

pub mod display;
pub mod sensor;
