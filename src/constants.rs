//! # Constants and type definitions for geoframe
//!
//! This module centralizes the **geodetic constants**, **conversion factors**, and
//! **common type aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Reference ellipsoid values (WGS84) used as the hub of every datum shift
//! - Unit conversions (degrees ↔ radians, arc-seconds ↔ radians)
//! - Fixed field widths of the binary dictionary records
//! - Coordinate type aliases used across the crate

// -------------------------------------------------------------------------------------------------
// Geodetic constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

/// WGS84 equatorial radius in meters
pub const WGS84_MAJOR_AXIS: f64 = 6_378_137.0;

/// WGS84 flattening
pub const WGS84_FLATTENING: f64 = 1.0 / 298.257_223_563;

/// WGS84 first eccentricity squared
pub const WGS84_ECC_SQUARED: f64 = WGS84_FLATTENING * (2.0 - WGS84_FLATTENING);

/// Mean length of one degree of latitude, in meters
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Numerical epsilon used for floating-point comparisons of definition values
pub const EPS: f64 = 1e-12;

/// Key name of the hub datum every `to84_via` definition converts to.
pub const WGS84_DATUM: &str = "WGS84";

/// Key name of the hub ellipsoid.
pub const WGS84_ELLIPSOID: &str = "WGS84";

// -------------------------------------------------------------------------------------------------
// Binary record field widths
// -------------------------------------------------------------------------------------------------

/// Width of a key name field in the coordinate system, datum and ellipsoid records.
pub const KEY_NAME_LEN: usize = 24;

/// Width of a key name field in the geodetic transformation records.
pub const GX_NAME_LEN: usize = 64;

/// Width of description / source fields.
pub const DESC_LEN: usize = 64;

/// Width of the country/state field.
pub const CNTRY_ST_LEN: usize = 48;

/// Width of a unit name field.
pub const UNIT_NAME_LEN: usize = 16;

/// Number of generic projection parameters carried by every coordinate system.
pub const PRJ_PARAM_COUNT: usize = 24;

/// Current on-disk format level written by this crate.
pub const CURRENT_LEVEL: u8 = 8;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in meters
pub type Meter = f64;
/// Scale in parts per million
pub type Ppm = f64;

/// Geographic coordinate triple `[longitude°, latitude°, height m]`.
pub type LlhPoint = [f64; 3];

/// Projected or geographic coordinate triple in the units of a coordinate system.
pub type XyzPoint = [f64; 3];
