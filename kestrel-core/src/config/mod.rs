//! Configuration types and parsing
//!
//! The firmware embeds `panel.toml` at build time and parses it once at
//! start-up with [`parse_config`].

pub mod parse;
pub mod types;

pub use parse::{parse_config, parse_optional_pin, ParseError};
pub use types::*;
