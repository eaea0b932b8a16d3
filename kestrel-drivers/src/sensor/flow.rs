//! Filament flow sensor
//!
//! An AS5600 watches a magnet on the filament drive gear. Counting whole
//! turns plus the current angle gives the length of filament that actually
//! moved, which can be compared with the commanded extrusion.
//!
//! The sensor is ticked at 100 Hz. At 100 mm/s through a 10.7 mm gear that
//! is still more than four samples per turn, so no turn is skipped.
//!
//! # Error handling
//!
//! - A failed read during [`FlowSensor::update`] is skipped; the next tick
//!   tries again
//! - A missing magnet latches the sensor off until [`FlowSensor::reset`]
//! - Any failure during `reset` latches

use core::f32::consts::PI;
use core::fmt;

use kestrel_core::config::FlowSensorConfig;
use kestrel_hal::I2cBus;

use super::as5600::{As5600, MagnetStatus, COUNTS_PER_TURN};

/// Below this the angle is in the first quarter turn
const LOW_QUARTER: u16 = 1024;

/// Above this the angle is in the last quarter turn
const HIGH_QUARTER: u16 = 3072;

/// Latched flow sensor faults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlowError {
    /// I2C transfer failed
    Communication,
    /// No magnet in front of the sensor
    MagnetMissing,
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowError::Communication => f.write_str("Cannot communicate with flow sensor"),
            FlowError::MagnetMissing => f.write_str("Flow sensor magnet not detected"),
        }
    }
}

/// Live sensor state, as printed by the status command
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlowReport {
    /// Magnet state, `None` if the bus failed
    pub magnet: Option<MagnetStatus>,
    /// Raw angle, `None` if the bus failed
    pub angle: Option<u16>,
    /// Angle captured at the last reset
    pub origin: u16,
    /// Whole turns since the last reset
    pub rotations: i32,
    /// Angle relative to origin at the last update
    pub last_angle: u16,
}

impl fmt::Display for FlowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.magnet, self.angle) {
            (Some(magnet), Some(angle)) => writeln!(
                f,
                "Flow Sensor - Comm: Ok, Magnet: {}, Angle: {}",
                magnet.label(),
                angle
            )?,
            _ => writeln!(f, "Flow Sensor - Comm: Err")?,
        }
        write!(
            f,
            "Origin: {}, Rotations: {}, Last Angle: {}",
            self.origin, self.rotations, self.last_angle
        )
    }
}

/// Measured extrusion for the position report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasuredExtrusion(pub Option<f32>);

impl fmt::Display for MeasuredExtrusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(mm) => write!(f, "E_meas:{:.4}", mm),
            None => f.write_str("E_meas:Err"),
        }
    }
}

/// Turn counter over an AS5600
pub struct FlowSensor<I2C> {
    sensor: As5600<I2C>,
    circumference_mm: f32,
    direction: f32,
    origin: u16,
    rotations: i32,
    last_angle: u16,
    error: Option<FlowError>,
}

impl<I2C: I2cBus> FlowSensor<I2C> {
    /// Wrap a sensor; call [`start`](Self::start) before use
    pub fn new(sensor: As5600<I2C>, config: &FlowSensorConfig) -> Self {
        Self {
            sensor,
            circumference_mm: config.gear_diameter_mm * PI,
            direction: if config.direction { 1.0 } else { -1.0 },
            origin: 0,
            rotations: 0,
            last_angle: 0,
            error: None,
        }
    }

    /// Configure the sensor and take the current angle as zero
    pub fn start(&mut self) -> Result<(), FlowError> {
        if self.sensor.setup().is_err() {
            return Err(self.latch(FlowError::Communication));
        }
        self.reset()
    }

    /// Zero the distance at the current gear position
    ///
    /// Clears a latched error first; latches again if the sensor cannot be
    /// read or the magnet is missing.
    pub fn reset(&mut self) -> Result<(), FlowError> {
        self.rotations = 0;
        self.last_angle = 0;
        self.error = None;

        match self.sensor.magnet_status() {
            Err(_) => return Err(self.latch(FlowError::Communication)),
            Ok(MagnetStatus::Missing) => return Err(self.latch(FlowError::MagnetMissing)),
            Ok(_) => {}
        }
        match self.sensor.angle() {
            Ok(angle) => {
                self.origin = angle;
                Ok(())
            }
            Err(_) => Err(self.latch(FlowError::Communication)),
        }
    }

    /// Sample the sensor and count turns
    ///
    /// Returns an error only on the tick that latches.
    pub fn update(&mut self) -> Result<(), FlowError> {
        if self.error.is_some() {
            return Ok(());
        }
        match self.sensor.magnet_status() {
            Err(_) => return Ok(()),
            Ok(MagnetStatus::Missing) => return Err(self.latch(FlowError::MagnetMissing)),
            Ok(_) => {}
        }
        let Ok(raw) = self.sensor.angle() else {
            return Ok(());
        };

        let angle = (raw + COUNTS_PER_TURN - self.origin) % COUNTS_PER_TURN;
        if angle < LOW_QUARTER && self.last_angle > HIGH_QUARTER {
            self.rotations += 1;
        } else if angle > HIGH_QUARTER && self.last_angle < LOW_QUARTER {
            self.rotations -= 1;
        }
        self.last_angle = angle;
        Ok(())
    }

    /// Filament moved since the last reset, `None` while latched
    pub fn distance_mm(&self) -> Option<f32> {
        if self.error.is_some() {
            return None;
        }
        let turns = self.rotations as f32 + self.last_angle as f32 / COUNTS_PER_TURN as f32;
        Some(self.direction * turns * self.circumference_mm)
    }

    /// Distance formatted for the position report
    pub fn measured(&self) -> MeasuredExtrusion {
        MeasuredExtrusion(self.distance_mm())
    }

    /// Latched fault, if any
    pub fn error(&self) -> Option<FlowError> {
        self.error
    }

    /// Whole turns since reset
    pub fn rotations(&self) -> i32 {
        self.rotations
    }

    /// Read the sensor directly for a status report
    pub fn report(&mut self) -> FlowReport {
        let angle = self.sensor.angle().ok();
        let magnet = self.sensor.magnet_status().ok();
        FlowReport {
            magnet: angle.and(magnet),
            angle: magnet.and(angle),
            origin: self.origin,
            rotations: self.rotations,
            last_angle: self.last_angle,
        }
    }

    fn latch(&mut self, error: FlowError) -> FlowError {
        self.error = Some(error);
        error
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::sensor::as5600::reg;
    use crate::sensor::as5600::tests::FakeBus;
    use std::string::ToString;

    const MAGNET_OK: u8 = 0b10_0000;

    fn sensor(angle: u16) -> FlowSensor<FakeBus> {
        let mut bus = FakeBus::new();
        bus.regs[reg::STATUS as usize] = MAGNET_OK;
        bus.set_angle(angle);
        FlowSensor::new(As5600::new(bus), &FlowSensorConfig::default())
    }

    fn bus(flow: &mut FlowSensor<FakeBus>) -> &mut FakeBus {
        flow.sensor.bus_mut()
    }

    fn turn_to(flow: &mut FlowSensor<FakeBus>, angle: u16) {
        bus(flow).set_angle(angle);
        flow.update().unwrap();
    }

    #[test]
    fn test_reset_takes_origin() {
        let mut flow = sensor(1234);
        flow.start().unwrap();
        assert_eq!(flow.distance_mm(), Some(0.0));
        assert_eq!(flow.report().origin, 1234);
    }

    #[test]
    fn test_counts_forward_turns() {
        let mut flow = sensor(0);
        flow.start().unwrap();
        for angle in [1000, 2000, 3000, 4000, 100, 1500] {
            turn_to(&mut flow, angle);
        }
        assert_eq!(flow.rotations(), 1);

        let circumference = 10.699 * PI;
        let expected = (1.0 + 1500.0 / 4096.0) * circumference;
        let distance = flow.distance_mm().unwrap();
        assert!((distance - expected).abs() < 1e-3);
    }

    #[test]
    fn test_counts_backward_turns() {
        let mut flow = sensor(0);
        flow.start().unwrap();
        for angle in [4000, 3000, 2000] {
            turn_to(&mut flow, angle);
        }
        assert_eq!(flow.rotations(), -1);
        assert!(flow.distance_mm().unwrap() < 0.0);

        for angle in [1000, 100, 4000] {
            turn_to(&mut flow, angle);
        }
        assert_eq!(flow.rotations(), -2);
    }

    #[test]
    fn test_angle_relative_to_origin() {
        let mut flow = sensor(4000);
        flow.start().unwrap();
        // 4000 -> 50 is +146 counts, wrapping through zero
        turn_to(&mut flow, 50);
        assert_eq!(flow.rotations(), 0);
        assert_eq!(flow.report().last_angle, 146);
    }

    #[test]
    fn test_direction_flips_sign() {
        let mut bus = FakeBus::new();
        bus.regs[reg::STATUS as usize] = MAGNET_OK;
        let config = FlowSensorConfig {
            direction: false,
            ..FlowSensorConfig::default()
        };
        let mut flow = FlowSensor::new(As5600::new(bus), &config);
        flow.start().unwrap();
        turn_to(&mut flow, 2048);
        assert!(flow.distance_mm().unwrap() < 0.0);
    }

    #[test]
    fn test_missing_magnet_latches_once() {
        let mut flow = sensor(0);
        flow.start().unwrap();
        turn_to(&mut flow, 500);

        bus(&mut flow).regs[reg::STATUS as usize] = 0;
        assert_eq!(flow.update(), Err(FlowError::MagnetMissing));
        assert_eq!(flow.error(), Some(FlowError::MagnetMissing));
        assert_eq!(flow.distance_mm(), None);

        // latched: further ticks are silent and change nothing
        bus(&mut flow).regs[reg::STATUS as usize] = MAGNET_OK;
        bus(&mut flow).set_angle(3000);
        assert_eq!(flow.update(), Ok(()));
        assert_eq!(flow.distance_mm(), None);
        assert_eq!(flow.measured().to_string(), "E_meas:Err");

        // reset clears the latch
        flow.reset().unwrap();
        assert_eq!(flow.error(), None);
        assert_eq!(flow.distance_mm(), Some(0.0));
    }

    #[test]
    fn test_read_errors_are_skipped() {
        let mut flow = sensor(0);
        flow.start().unwrap();
        turn_to(&mut flow, 800);

        bus(&mut flow).fail = true;
        assert_eq!(flow.update(), Ok(()));
        assert_eq!(flow.error(), None);
        assert!(flow.distance_mm().is_some());
    }

    #[test]
    fn test_reset_failure_latches() {
        let mut flow = sensor(0);
        bus(&mut flow).fail = true;
        assert_eq!(flow.start(), Err(FlowError::Communication));
        assert_eq!(flow.error(), Some(FlowError::Communication));
        assert_eq!(
            FlowError::Communication.to_string(),
            "Cannot communicate with flow sensor"
        );
        assert_eq!(
            FlowError::MagnetMissing.to_string(),
            "Flow sensor magnet not detected"
        );
    }

    #[test]
    fn test_report_text() {
        let mut flow = sensor(0);
        flow.start().unwrap();
        turn_to(&mut flow, 700);
        assert_eq!(
            flow.report().to_string(),
            "Flow Sensor - Comm: Ok, Magnet: Good, Angle: 700\nOrigin: 0, Rotations: 0, Last Angle: 700"
        );

        bus(&mut flow).fail = true;
        assert!(flow.report().to_string().starts_with("Flow Sensor - Comm: Err\n"));
    }

    #[test]
    fn test_measured_format() {
        assert_eq!(MeasuredExtrusion(Some(12.5)).to_string(), "E_meas:12.5000");
    }
}
