//! Sensor drivers

pub mod as5600;
pub mod flow;

pub use as5600::{As5600, MagnetStatus};
pub use flow::{FlowError, FlowReport, FlowSensor, MeasuredExtrusion};
