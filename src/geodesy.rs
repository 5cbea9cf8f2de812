//! Ellipsoid and sphere helpers shared by the projection model and the
//! datum transformation methods.

use nalgebra::Vector3;

use crate::constants::{Degree, LlhPoint, Meter, RADEG};

/// Shape of an ellipsoid as consumed by the math routines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Equatorial radius (m).
    pub a: Meter,
    /// First eccentricity squared.
    pub e_sq: f64,
}

impl Ellipsoid {
    pub fn new(a: Meter, e_sq: f64) -> Self {
        Ellipsoid { a, e_sq }
    }

    pub fn wgs84() -> Self {
        Ellipsoid::new(crate::constants::WGS84_MAJOR_AXIS, crate::constants::WGS84_ECC_SQUARED)
    }

    pub fn flattening(&self) -> f64 {
        1.0 - (1.0 - self.e_sq).sqrt()
    }

    /// Polar radius (m).
    pub fn b(&self) -> Meter {
        self.a * (1.0 - self.e_sq).sqrt()
    }

    /// Radius of curvature in the prime vertical.
    pub fn prime_vertical(&self, lat_rad: f64) -> Meter {
        let s = lat_rad.sin();
        self.a / (1.0 - self.e_sq * s * s).sqrt()
    }

    /// Radius of curvature in the meridian.
    pub fn meridian_radius(&self, lat_rad: f64) -> Meter {
        let s = lat_rad.sin();
        self.a * (1.0 - self.e_sq) / (1.0 - self.e_sq * s * s).powf(1.5)
    }

    /// Geodetic `[lng°, lat°, h]` to geocentric cartesian (m).
    pub fn to_geocentric(&self, llh: LlhPoint) -> Vector3<f64> {
        let lng = llh[0] * RADEG;
        let lat = llh[1] * RADEG;
        let n = self.prime_vertical(lat);
        let (sin_lat, cos_lat) = lat.sin_cos();
        Vector3::new(
            (n + llh[2]) * cos_lat * lng.cos(),
            (n + llh[2]) * cos_lat * lng.sin(),
            (n * (1.0 - self.e_sq) + llh[2]) * sin_lat,
        )
    }

    /// Geocentric cartesian (m) back to geodetic `[lng°, lat°, h]`.
    ///
    /// Fixed-point iteration on latitude; converges to well below a
    /// micrometer in a handful of steps for terrestrial heights.
    pub fn to_geodetic(&self, xyz: &Vector3<f64>) -> LlhPoint {
        let p = xyz.x.hypot(xyz.y);
        let lng = xyz.y.atan2(xyz.x);
        if p < 1e-9 {
            let lat = if xyz.z >= 0.0 { 90.0 } else { -90.0 };
            return [lng / RADEG, lat, xyz.z.abs() - self.b()];
        }
        let mut lat = (xyz.z / (p * (1.0 - self.e_sq))).atan();
        let mut h = 0.0;
        for _ in 0..10 {
            let n = self.prime_vertical(lat);
            h = p / lat.cos() - n;
            let next = (xyz.z / (p * (1.0 - self.e_sq * n / (n + h)))).atan();
            let done = (next - lat).abs() < 1e-14;
            lat = next;
            if done {
                break;
            }
        }
        [lng / RADEG, lat / RADEG, h]
    }
}

/// Normalize a longitude into `(-180, 180]`.
pub fn normalize_longitude(lng: Degree) -> Degree {
    let mut l = lng % 360.0;
    if l <= -180.0 {
        l += 360.0;
    } else if l > 180.0 {
        l -= 360.0;
    }
    l
}

/// Initial great-circle azimuth (degrees east of north) from point 1 to point 2 on the sphere.
pub fn spherical_azimuth(lng1: Degree, lat1: Degree, lng2: Degree, lat2: Degree) -> Degree {
    let (phi1, phi2) = (lat1 * RADEG, lat2 * RADEG);
    let dl = (lng2 - lng1) * RADEG;
    let y = dl.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dl.cos();
    y.atan2(x) / RADEG
}

/// Great-circle angular distance (degrees) between two points on the sphere.
pub fn spherical_distance(lng1: Degree, lat1: Degree, lng2: Degree, lat2: Degree) -> Degree {
    let (phi1, phi2) = (lat1 * RADEG, lat2 * RADEG);
    let dphi = phi2 - phi1;
    let dl = (lng2 - lng1) * RADEG;
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dl / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin() / RADEG
}

/// Midpoint of the great-circle arc between two points, as `(lng°, lat°)`.
pub fn spherical_midpoint(lng1: Degree, lat1: Degree, lng2: Degree, lat2: Degree) -> (Degree, Degree) {
    let (phi1, phi2) = (lat1 * RADEG, lat2 * RADEG);
    let (l1, l2) = (lng1 * RADEG, lng2 * RADEG);
    let a = Vector3::new(phi1.cos() * l1.cos(), phi1.cos() * l1.sin(), phi1.sin());
    let b = Vector3::new(phi2.cos() * l2.cos(), phi2.cos() * l2.sin(), phi2.sin());
    let m = a + b;
    let lat = m.z.atan2(m.x.hypot(m.y));
    let lng = m.y.atan2(m.x);
    (lng / RADEG, lat / RADEG)
}
