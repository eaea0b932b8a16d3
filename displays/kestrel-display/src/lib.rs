//! Menu rendering and screen navigation for the Kestrel front panel
//!
//! This crate provides:
//! - A 6x8 bitmap font for glyph blits
//! - `MenuWindow`, the scroll/highlight state of a list
//! - `MenuRenderer`, which repaints a list with the least bus traffic the
//!   change allows
//! - `Screen` and `Navigator` for stack-based page navigation
//! - Built-in `MenuScreen` and `AboutScreen`
//!
//! # Architecture
//!
//! Everything here is written against `kestrel_core::traits::DisplayDriver`,
//! so the same screens run on a full-graphics TFT or a character display.
//! Drivers advertise what they can do through `Capabilities`; the renderer
//! picks the framed, incrementally redrawn layout only when
//! `FULL_GRAPHICS` is set.

#![no_std]
#![deny(unsafe_code)]

pub mod font;
pub mod menu;
pub mod renderer;
pub mod screen;
pub mod screens;

// Re-export key types
pub use menu::MenuWindow;
pub use renderer::{Layout, MenuContent, MenuRenderer, Redraw};
pub use screen::{NavError, Navigator, PanelContext, PanelError, Screen, ScreenId, Transition};
