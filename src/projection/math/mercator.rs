//! Normal aspect ellipsoidal Mercator (Snyder 7-6 to 7-9).
//!
//! Variant A carries the scale at the equator directly, variant B derives it
//! from the standard parallel; both end up with the same formulas.

use std::f64::consts::FRAC_PI_2;

use crate::{
    constants::{Degree, RADEG},
    geodesy::{normalize_longitude, Ellipsoid},
    geoframe_errors::GeoframeError,
};

use super::{check_latitude, msfn, out_of_domain, phi_from_ts, tsfn, ProjectionMath};

/// Latitudes closer than this to a pole project to infinity.
const POLE_MARGIN: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct Mercator {
    a: f64,
    e: f64,
    lng0: Degree,
    k0: f64,
}

impl Mercator {
    pub fn new(ellipsoid: Ellipsoid, lng0: Degree, k0: f64) -> Self {
        Mercator {
            a: ellipsoid.a,
            e: ellipsoid.e_sq.sqrt(),
            lng0,
            k0,
        }
    }

    pub fn from_standard_parallel(ellipsoid: Ellipsoid, lng0: Degree, lat_ts: Degree) -> Self {
        let k0 = msfn(lat_ts * RADEG, ellipsoid.e_sq);
        Mercator::new(ellipsoid, lng0, k0)
    }

    pub fn scale_at_equator(&self) -> f64 {
        self.k0
    }
}

impl ProjectionMath for Mercator {
    fn forward(&self, lng: Degree, lat: Degree) -> Result<[f64; 2], GeoframeError> {
        let phi = check_latitude("MRCAT", lng, lat)?;
        if FRAC_PI_2 - phi.abs() < POLE_MARGIN {
            return Err(out_of_domain("MRCAT", lng, lat));
        }
        let ak = self.a * self.k0;
        let east = ak * normalize_longitude(lng - self.lng0) * RADEG;
        let north = -ak * tsfn(phi, self.e).ln();
        Ok([east, north])
    }

    fn inverse(&self, east: f64, north: f64) -> Result<[Degree; 2], GeoframeError> {
        let ak = self.a * self.k0;
        let phi = phi_from_ts((-north / ak).exp(), self.e)?;
        Ok([self.lng0 + east / ak / RADEG, phi / RADEG])
    }
}
