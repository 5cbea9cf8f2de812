//! Transverse Mercator, series expansion (Snyder, Map Projections - A Working
//! Manual, 8-9 to 8-25). Accurate to the millimetre within a few degrees of
//! the central meridian, which covers TM, UTM and Gauss-Kruger zones.

use crate::{
    constants::{Degree, RADEG},
    geodesy::{normalize_longitude, Ellipsoid},
    geoframe_errors::GeoframeError,
};

use super::{check_latitude, ProjectionMath};

#[derive(Debug, Clone)]
pub struct TransverseMercator {
    a: f64,
    e_sq: f64,
    ep_sq: f64,
    lng0: Degree,
    k0: f64,
    /// Meridian distance of the origin latitude.
    m0: f64,
    south_oriented: bool,
}

impl TransverseMercator {
    pub fn new(ellipsoid: Ellipsoid, lng0: Degree, lat0: Degree, k0: f64, south_oriented: bool) -> Self {
        let e_sq = ellipsoid.e_sq;
        let mut tm = TransverseMercator {
            a: ellipsoid.a,
            e_sq,
            ep_sq: e_sq / (1.0 - e_sq),
            lng0,
            k0,
            m0: 0.0,
            south_oriented,
        };
        tm.m0 = tm.meridian_distance(lat0 * RADEG);
        tm
    }

    fn meridian_distance(&self, phi: f64) -> f64 {
        let e2 = self.e_sq;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        self.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }

    fn orient(&self, east: f64, north: f64) -> [f64; 2] {
        if self.south_oriented {
            [-east, -north]
        } else {
            [east, north]
        }
    }
}

impl ProjectionMath for TransverseMercator {
    fn forward(&self, lng: Degree, lat: Degree) -> Result<[f64; 2], GeoframeError> {
        let phi = check_latitude("TM", lng, lat)?;
        let ep2 = self.ep_sq;
        let (sin_phi, cos_phi) = phi.sin_cos();
        let n = self.a / (1.0 - self.e_sq * sin_phi * sin_phi).sqrt();
        let t = phi.tan().powi(2);
        let c = ep2 * cos_phi * cos_phi;
        let a = normalize_longitude(lng - self.lng0) * RADEG * cos_phi;
        let m = self.meridian_distance(phi);

        let east = self.k0
            * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0);
        let north = self.k0
            * (m - self.m0
                + n * phi.tan()
                    * (a * a / 2.0
                        + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                        + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));
        Ok(self.orient(east, north))
    }

    fn inverse(&self, east: f64, north: f64) -> Result<[Degree; 2], GeoframeError> {
        let [x, y] = self.orient(east, north);
        let e2 = self.e_sq;
        let ep2 = self.ep_sq;
        let m = self.m0 + y / self.k0;
        let mu = m / (self.a * (1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2.powi(3) / 256.0));
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin1, cos1) = phi1.sin_cos();
        let c1 = ep2 * cos1 * cos1;
        let t1 = phi1.tan().powi(2);
        let w = 1.0 - e2 * sin1 * sin1;
        let n1 = self.a / w.sqrt();
        let r1 = self.a * (1.0 - e2) / w.powf(1.5);
        let d = x / (n1 * self.k0);

        let phi = phi1
            - (n1 * phi1.tan() / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);
        let lambda = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d.powi(5)
                / 120.0)
            / cos1;
        Ok([self.lng0 + lambda / RADEG, phi / RADEG])
    }
}
