//! Forward and inverse projection formulas.
//!
//! Only a subset of the projection table has formulas: geographic systems,
//! the Transverse Mercator family, Mercator variants A and B and Lambert
//! conformal conic with one or two standard parallels. Every other
//! projection resolves fine but [`Projector::new`] reports
//! [`GeoframeError::ProjectionNotSupported`].
//!
//! A [`ProjectionMath`] works in natural units (meters east/north of the
//! natural origin, or degrees for geographic systems). [`Projector`] adds the
//! unit and map scale, the false origin and the quadrant.

pub mod lambert;
pub mod mercator;
pub mod transverse_mercator;

use std::{f64::consts::FRAC_PI_2, fmt};

use crate::{
    constants::{Degree, RADEG},
    dictionary::coordsys_def::CoordSysDef,
    geodesy::{normalize_longitude, Ellipsoid},
    geoframe_errors::GeoframeError,
};

use super::{projection_by_key, quadrant::Quadrant, ProjectionInfo};

pub use lambert::LambertConformalConic;
pub use mercator::Mercator;
pub use transverse_mercator::TransverseMercator;

/// Formula pair of one projection.
pub trait ProjectionMath: Send + Sync + fmt::Debug {
    /// Geographic degrees to natural `[east, north]`.
    fn forward(&self, lng: Degree, lat: Degree) -> Result<[f64; 2], GeoframeError>;

    /// Natural `[east, north]` back to geographic `[lng, lat]` degrees.
    fn inverse(&self, east: f64, north: f64) -> Result<[Degree; 2], GeoframeError>;
}

/// Identity with an optional prime meridian offset.
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    pub org_lng: Degree,
}

impl ProjectionMath for Geographic {
    fn forward(&self, lng: Degree, lat: Degree) -> Result<[f64; 2], GeoframeError> {
        Ok([lng - self.org_lng, lat])
    }

    fn inverse(&self, east: f64, north: f64) -> Result<[Degree; 2], GeoframeError> {
        Ok([east + self.org_lng, north])
    }
}

/// Isometric latitude helper `t(φ)` of Snyder (15-9).
pub(crate) fn tsfn(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (std::f64::consts::FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

/// Latitude from `t`, by fixed-point iteration of Snyder (7-9).
pub(crate) fn phi_from_ts(ts: f64, e: f64) -> Result<f64, GeoframeError> {
    let mut phi = FRAC_PI_2 - 2.0 * ts.atan();
    for _ in 0..15 {
        let es = e * phi.sin();
        let next = FRAC_PI_2 - 2.0 * (ts * ((1.0 - es) / (1.0 + es)).powf(e / 2.0)).atan();
        if (next - phi).abs() < 1e-12 {
            return Ok(next);
        }
        phi = next;
    }
    Err(GeoframeError::format(format!(
        "latitude iteration did not converge for t = {ts}"
    )))
}

/// `m(φ)` of Snyder (14-15).
pub(crate) fn msfn(phi: f64, e_sq: f64) -> f64 {
    phi.cos() / (1.0 - e_sq * phi.sin().powi(2)).sqrt()
}

pub(crate) fn out_of_domain(projection: &str, lng: Degree, lat: Degree) -> GeoframeError {
    GeoframeError::OutOfDomain {
        projection: projection.to_string(),
        lng,
        lat,
    }
}

pub(crate) fn check_latitude(projection: &str, lng: Degree, lat: Degree) -> Result<f64, GeoframeError> {
    if !lat.is_finite() || lat.abs() > 90.0 {
        return Err(out_of_domain(projection, lng, lat));
    }
    Ok(lat * RADEG)
}

/// Select the formulas for a filled coordinate system.
pub fn build_math(
    proj: &ProjectionInfo,
    def: &CoordSysDef,
    ellipsoid: Ellipsoid,
) -> Result<Box<dyn ProjectionMath>, GeoframeError> {
    let math: Box<dyn ProjectionMath> = match proj.key {
        "LL" => Box::new(Geographic {
            org_lng: def.org_lng,
        }),
        "TM" | "UTM" | "GAUSSK" | "TRMRKRG" | "SOTRM" => Box::new(TransverseMercator::new(
            ellipsoid,
            def.org_lng,
            def.org_lat,
            def.scl_red,
            proj.key == "SOTRM",
        )),
        "MRCATK" => Box::new(Mercator::new(ellipsoid, def.org_lng, def.scl_red)),
        "MRCAT" => Box::new(Mercator::from_standard_parallel(ellipsoid, def.org_lng, def.prm[1])),
        "LM1SP" => Box::new(LambertConformalConic::one_parallel(
            ellipsoid,
            def.org_lng,
            def.org_lat,
            def.scl_red,
        )?),
        "LM2SP" => Box::new(LambertConformalConic::two_parallels(
            ellipsoid,
            def.org_lng,
            def.org_lat,
            def.prm[0],
            def.prm[1],
        )?),
        other => return Err(GeoframeError::ProjectionNotSupported(other.to_string())),
    };
    Ok(math)
}

/// Complete conversion between geographic coordinates and the stored
/// coordinates of one coordinate system.
#[derive(Debug)]
pub struct Projector {
    pub info: &'static ProjectionInfo,
    math: Box<dyn ProjectionMath>,
    quadrant: Quadrant,
    x_off: f64,
    y_off: f64,
    /// Natural units per stored unit.
    unit_per_natural: f64,
}

impl Projector {
    /// Arguments
    /// -----------------
    /// * `def`: a coordinate system already passed through [`fill_in`](super::fill_in::fill_in)
    /// * `ellipsoid`: the shape the system is referenced to
    pub fn new(def: &CoordSysDef, ellipsoid: Ellipsoid) -> Result<Self, GeoframeError> {
        let info = projection_by_key(&def.prj_knm)?;
        let math = build_math(info, def, ellipsoid)?;
        Ok(Projector {
            info,
            math,
            quadrant: Quadrant::from_code(def.quad)?,
            x_off: def.x_off,
            y_off: def.y_off,
            unit_per_natural: def.scale,
        })
    }

    /// Geographic `[lng, lat]` to stored `[x, y]`.
    pub fn project(&self, lng: Degree, lat: Degree) -> Result<[f64; 2], GeoframeError> {
        let [east, north] = self.math.forward(lng, lat)?;
        let [x, y] = self
            .quadrant
            .apply(east * self.unit_per_natural, north * self.unit_per_natural);
        Ok([x + self.x_off, y + self.y_off])
    }

    /// Stored `[x, y]` to geographic `[lng, lat]`.
    pub fn unproject(&self, x: f64, y: f64) -> Result<[Degree; 2], GeoframeError> {
        let [east, north] = self.quadrant.invert(x - self.x_off, y - self.y_off);
        let [lng, lat] = self
            .math
            .inverse(east / self.unit_per_natural, north / self.unit_per_natural)?;
        Ok([normalize_longitude(lng), lat])
    }
}
