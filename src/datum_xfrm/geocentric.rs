//! Null and Helmert family methods.
//!
//! Every geocentric method converts the source point to cartesian
//! coordinates on the source ellipsoid, applies
//!
//! ```text
//! X' = T + (1 + s·10⁻⁶) · R · X
//! ```
//!
//! and converts back on the target ellipsoid. `R` is the small angle
//! rotation matrix in the position vector convention; the seven parameter
//! method stores its rotations in the coordinate frame convention and is
//! negated on load. The reduced methods zero the terms they do not use.

use nalgebra::{Matrix3, Vector3};

use crate::{
    constants::{LlhPoint, RADSEC},
    dictionary::gx_def::{GeocentricParams, GxMethod},
    geodesy::Ellipsoid,
    geoframe_errors::GeoframeError,
};

use super::{DatumShift, Shift};

/// The identity: the two datums are the same for practical purposes.
#[derive(Debug, Clone, Copy)]
pub struct NullShift;

impl DatumShift for NullShift {
    fn method(&self) -> GxMethod {
        GxMethod::Null
    }

    fn forward(&self, ll: &LlhPoint) -> Result<Shift, GeoframeError> {
        Ok(Shift::Shifted(*ll))
    }

    fn has_inverse(&self) -> bool {
        true
    }

    fn inverse(&self, ll: &LlhPoint) -> Result<Shift, GeoframeError> {
        Ok(Shift::Shifted(*ll))
    }
}

/// Similarity transformation between geocentric frames.
#[derive(Debug, Clone)]
pub struct Helmert {
    method: GxMethod,
    translation: Vector3<f64>,
    /// `(1 + s) · R`
    matrix: Matrix3<f64>,
    inverse_matrix: Matrix3<f64>,
    src: Ellipsoid,
    trg: Ellipsoid,
}

/// Position vector rotation matrix for rotations in radians.
fn rotation_matrix(rx: f64, ry: f64, rz: f64) -> Matrix3<f64> {
    Matrix3::new(
        1.0, -rz, ry, //
        rz, 1.0, -rx, //
        -ry, rx, 1.0,
    )
}

impl Helmert {
    /// Build the method from its parameter block.
    ///
    /// Return
    /// ----------
    /// * [`GeoframeError::InvalidTransform`] if `method` is not geocentric
    ///   or the rotation matrix is singular.
    pub fn new(
        method: GxMethod,
        params: &GeocentricParams,
        src: Ellipsoid,
        trg: Ellipsoid,
    ) -> Result<Self, GeoframeError> {
        let [rx, ry, rz] = params.rotation.map(|r| r * RADSEC);
        let (use_rotation, use_scale, sign) = match method {
            GxMethod::GeocentricTranslation => (false, false, 1.0),
            GxMethod::FourParameter => (false, true, 1.0),
            GxMethod::SixParameter => (true, false, 1.0),
            GxMethod::BursaWolf => (true, true, 1.0),
            GxMethod::SevenParameter => (true, true, -1.0),
            other => {
                return Err(GeoframeError::invalid_transform(
                    other.name(),
                    "not a geocentric method",
                ))
            }
        };

        let rotation = if use_rotation {
            rotation_matrix(sign * rx, sign * ry, sign * rz)
        } else {
            Matrix3::identity()
        };
        let scale = if use_scale { 1.0 + params.scale * 1e-6 } else { 1.0 };
        let matrix = rotation * scale;
        let inverse_matrix = matrix.try_inverse().ok_or_else(|| {
            GeoframeError::invalid_transform(method.name(), "singular rotation matrix")
        })?;

        Ok(Helmert {
            method,
            translation: Vector3::from(params.delta),
            matrix,
            inverse_matrix,
            src,
            trg,
        })
    }

    /// Apply the similarity to a cartesian vector.
    pub fn apply(&self, xyz: &Vector3<f64>) -> Vector3<f64> {
        self.translation + self.matrix * xyz
    }

    pub fn apply_inverse(&self, xyz: &Vector3<f64>) -> Vector3<f64> {
        self.inverse_matrix * (xyz - self.translation)
    }
}

impl DatumShift for Helmert {
    fn method(&self) -> GxMethod {
        self.method
    }

    fn forward(&self, ll: &LlhPoint) -> Result<Shift, GeoframeError> {
        let xyz = self.apply(&self.src.to_geocentric(*ll));
        Ok(Shift::Shifted(self.trg.to_geodetic(&xyz)))
    }

    fn has_inverse(&self) -> bool {
        true
    }

    fn inverse(&self, ll: &LlhPoint) -> Result<Shift, GeoframeError> {
        let xyz = self.apply_inverse(&self.trg.to_geocentric(*ll));
        Ok(Shift::Shifted(self.src.to_geodetic(&xyz)))
    }
}
