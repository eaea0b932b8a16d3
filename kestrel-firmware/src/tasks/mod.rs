//! Embassy async tasks
//!
//! Each task runs independently and communicates through the structures in
//! `channels`.

pub mod main_loop;
pub mod panel;
pub mod poll;

pub use main_loop::main_loop_task;
pub use panel::{panel_task, PanelDisplay};
pub use poll::{poll_task, Encoder};
