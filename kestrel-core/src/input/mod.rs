//! Front panel input decoding
//!
//! - [`ButtonMask`] maps physical button lines to logical buttons
//! - [`QuadratureDecoder`] turns encoder phase samples into steps
//! - [`SharedInput`] carries samples from the poll context to the panel
//!   context
//! - [`PanelInput`] turns readings into detent steps and click edges

pub mod buttons;
pub mod panel;
pub mod quadrature;
pub mod shared;

pub use buttons::{ButtonError, ButtonLines, ButtonMask};
pub use panel::{PanelEvents, PanelInput};
pub use quadrature::{QuadratureDecoder, QuadratureEncoder};
pub use shared::{InputSample, InputSource, NoInput, SharedInput};
