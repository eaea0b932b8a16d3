//! Built-in screens

pub mod about;
pub mod menu;

pub use about::AboutScreen;
pub use menu::{MenuAction, MenuItem, MenuScreen};
