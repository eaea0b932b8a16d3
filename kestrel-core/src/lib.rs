//! Board-agnostic core of the front panel
//!
//! This crate contains everything the panel needs that does not depend on a
//! particular display controller or chip:
//!
//! - The display capability interface every panel driver implements
//! - Input decoding (button mask, quadrature encoder, cross-context accumulator)
//! - The command bridge between the panel and the machine's main loop
//! - Configuration type definitions and the `[panel]` config parser

#![no_std]
#![deny(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod input;
pub mod traits;
