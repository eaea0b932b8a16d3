//! Hardware abstraction traits
//!
//! These traits define the interface between the panel logic and the
//! concrete display controllers.

pub mod display;

pub use display::{
    color_word, Capabilities, DisplayDriver, DisplayError, DisplayState, DrawMode,
};
