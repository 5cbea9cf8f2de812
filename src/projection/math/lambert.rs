//! Lambert conformal conic, ellipsoidal (Snyder 15-1 to 15-11).

use crate::{
    constants::{Degree, RADEG},
    geodesy::{normalize_longitude, Ellipsoid},
    geoframe_errors::{GeoframeError, ValidationErrors},
};

use super::{check_latitude, msfn, out_of_domain, phi_from_ts, tsfn, ProjectionMath};

#[derive(Debug, Clone)]
pub struct LambertConformalConic {
    e: f64,
    lng0: Degree,
    /// Cone constant.
    n: f64,
    /// `a F k0`.
    af: f64,
    rho0: f64,
}

fn invalid(message: String) -> GeoframeError {
    GeoframeError::Validation(ValidationErrors::single("", message))
}

impl LambertConformalConic {
    /// Two standard parallels; equal parallels degenerate to the tangent cone.
    pub fn two_parallels(
        ellipsoid: Ellipsoid,
        lng0: Degree,
        lat0: Degree,
        sp1: Degree,
        sp2: Degree,
    ) -> Result<Self, GeoframeError> {
        let e = ellipsoid.e_sq.sqrt();
        let (phi1, phi2) = (sp1 * RADEG, sp2 * RADEG);
        if sp1.abs() >= 90.0 || sp2.abs() >= 90.0 || (sp1 + sp2).abs() < 1e-10 {
            return Err(invalid(format!(
                "standard parallels {sp1} and {sp2} do not define a cone"
            )));
        }
        let (m1, m2) = (msfn(phi1, ellipsoid.e_sq), msfn(phi2, ellipsoid.e_sq));
        let (t1, t2) = (tsfn(phi1, e), tsfn(phi2, e));
        let n = if (sp1 - sp2).abs() < 1e-10 {
            phi1.sin()
        } else {
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };
        Ok(Self::finish(ellipsoid, lng0, lat0, n, m1 / (n * t1.powf(n))))
    }

    /// One standard parallel at the origin latitude with a scale reduction.
    pub fn one_parallel(ellipsoid: Ellipsoid, lng0: Degree, lat0: Degree, k0: f64) -> Result<Self, GeoframeError> {
        if lat0.abs() < 1e-10 || lat0.abs() >= 90.0 {
            return Err(invalid(format!("origin latitude {lat0} does not define a cone")));
        }
        let e = ellipsoid.e_sq.sqrt();
        let phi0 = lat0 * RADEG;
        let n = phi0.sin();
        let f = msfn(phi0, ellipsoid.e_sq) / (n * tsfn(phi0, e).powf(n));
        Ok(Self::finish(ellipsoid, lng0, lat0, n, f * k0))
    }

    fn finish(ellipsoid: Ellipsoid, lng0: Degree, lat0: Degree, n: f64, f: f64) -> Self {
        let e = ellipsoid.e_sq.sqrt();
        let af = ellipsoid.a * f;
        LambertConformalConic {
            e,
            lng0,
            n,
            af,
            rho0: af * tsfn(lat0 * RADEG, e).powf(n),
        }
    }

    pub fn cone_constant(&self) -> f64 {
        self.n
    }
}

impl ProjectionMath for LambertConformalConic {
    fn forward(&self, lng: Degree, lat: Degree) -> Result<[f64; 2], GeoframeError> {
        let phi = check_latitude("LM2SP", lng, lat)?;
        // the opposite pole maps to infinity
        if (lat + 90.0 * self.n.signum()).abs() < 1e-10 {
            return Err(out_of_domain("LM2SP", lng, lat));
        }
        let rho = self.af * tsfn(phi, self.e).powf(self.n);
        let theta = self.n * normalize_longitude(lng - self.lng0) * RADEG;
        Ok([rho * theta.sin(), self.rho0 - rho * theta.cos()])
    }

    fn inverse(&self, east: f64, north: f64) -> Result<[Degree; 2], GeoframeError> {
        let sign = self.n.signum();
        let dy = self.rho0 - north;
        let rho = sign * east.hypot(dy);
        let theta = (sign * east).atan2(sign * dy);
        let lat = if rho == 0.0 {
            90.0 * sign
        } else {
            phi_from_ts((rho / self.af).powf(1.0 / self.n), self.e)? / RADEG
        };
        Ok([self.lng0 + theta / self.n / RADEG, lat])
    }
}

#[cfg(test)]
mod test_lambert {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn clarke1866() -> Ellipsoid {
        Ellipsoid::new(6_378_206.4, 0.006_768_66)
    }

    #[test]
    fn test_snyder_worked_example() {
        let lcc = LambertConformalConic::two_parallels(clarke1866(), -96.0, 23.0, 33.0, 45.0).unwrap();
        assert_abs_diff_eq!(lcc.cone_constant(), 0.630_496_5, epsilon = 1e-7);
        let [x, y] = lcc.forward(-75.0, 35.0).unwrap();
        assert_abs_diff_eq!(x, 1_894_410.9, epsilon = 0.5);
        assert_abs_diff_eq!(y, 1_564_649.5, epsilon = 0.5);
        let [lng, lat] = lcc.inverse(x, y).unwrap();
        assert_abs_diff_eq!(lng, -75.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lat, 35.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reversed_parallels_are_the_same_cone() {
        let a = LambertConformalConic::two_parallels(Ellipsoid::wgs84(), 4.0, 46.5, 44.0, 49.0).unwrap();
        let b = LambertConformalConic::two_parallels(Ellipsoid::wgs84(), 4.0, 46.5, 49.0, 44.0).unwrap();
        let pa = a.forward(2.35, 48.85).unwrap();
        let pb = b.forward(2.35, 48.85).unwrap();
        assert_abs_diff_eq!(pa[0], pb[0], epsilon = 1e-6);
        assert_abs_diff_eq!(pa[1], pb[1], epsilon = 1e-6);
    }

    #[test]
    fn test_one_parallel_southern_hemisphere() {
        let lcc = LambertConformalConic::one_parallel(Ellipsoid::wgs84(), 145.0, -37.0, 0.9999).unwrap();
        assert!(lcc.cone_constant() < 0.0);
        let [x, y] = lcc.forward(146.0, -38.0).unwrap();
        let [lng, lat] = lcc.inverse(x, y).unwrap();
        assert_abs_diff_eq!(lng, 146.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lat, -38.0, epsilon = 1e-9);
        assert!(LambertConformalConic::one_parallel(Ellipsoid::wgs84(), 0.0, 0.0, 1.0).is_err());
    }
}
