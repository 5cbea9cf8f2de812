//! Per-quantity comparison tolerances and their conversion to meters.

use crate::constants::{Degree, METERS_PER_DEGREE, RADSEC, WGS84_MAJOR_AXIS};

/// Distance from the origin over which a scale error is evaluated, meters.
pub const SCALE_LEVER_M: f64 = 100_000.0;

/// Physical kind of a compared quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    /// Degrees.
    Angle,
    /// Meters.
    Linear,
    /// Arc-seconds.
    Rotation,
    /// Unitless factor (scale reduction, unit and map scale, affine coefficients).
    Scale,
    /// Parts per million.
    Ppm,
    /// Zone numbers and other codes, compared exactly.
    Code,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub angle: Degree,
    pub linear: f64,
    pub rotation: f64,
    pub scale: f64,
    pub ppm: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances {
            angle: 1.0e-7,
            linear: 2.0e-3,
            rotation: 1.0e-3,
            scale: 5.0e-6,
            ppm: 5.0e-3,
        }
    }
}

impl Tolerances {
    pub fn of(&self, quantity: Quantity) -> f64 {
        match quantity {
            Quantity::Angle => self.angle,
            Quantity::Linear => self.linear,
            Quantity::Rotation => self.rotation,
            Quantity::Scale => self.scale,
            Quantity::Ppm => self.ppm,
            Quantity::Code => 0.0,
        }
    }
}

/// Approximate positional effect, in meters, of a difference `delta`.
pub fn meters(quantity: Quantity, delta: f64) -> f64 {
    let delta = delta.abs();
    match quantity {
        Quantity::Angle => delta * METERS_PER_DEGREE,
        Quantity::Linear => delta,
        Quantity::Rotation => delta * RADSEC * WGS84_MAJOR_AXIS,
        Quantity::Scale => delta * SCALE_LEVER_M,
        Quantity::Ppm => delta * 1.0e-6 * WGS84_MAJOR_AXIS,
        Quantity::Code => f64::INFINITY,
    }
}
