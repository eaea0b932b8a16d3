//! Display controllers

pub mod st7789;

pub use st7789::{St7789, St7789Config, St7789Error};
