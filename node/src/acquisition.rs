//! The sensor acquisition boundary.
//!
//! Physical sensor drivers (ADC protocols, one-wire polling, Modbus,
//! calibration math) live behind this trait. Which sensors exist is a
//! per-variant property resolved once at startup by the implementation;
//! the lifecycle code is variant-agnostic.

use fieldnode_common::reading::{Reading, SensorId, SensorKind};
use heapless::Vec;

/// Upper bound on sensors read in one cycle.
pub const MAX_READINGS: usize = 16;

/// One enabled sensor slot, as configured for this station.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRequest {
    pub sensor_id: SensorId,
    pub kind: SensorKind,
}

/// Produces the ordered list of readings for one cycle.
pub trait SensorAcquisition {
    /// The sensors enabled in this deployment, in reporting order.
    fn enabled_sensors(&mut self) -> Vec<SensorRequest, MAX_READINGS>;

    /// Read one sensor. Never fails: a broken or absent sensor yields a
    /// NaN reading (see [`Reading::failed`]), not an error.
    fn read(&mut self, request: &SensorRequest) -> Reading;

    /// Battery voltage in volts, for the frame header.
    fn battery_volts(&mut self) -> f32;
}
