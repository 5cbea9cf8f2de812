//! Standard Molodensky shift.
//!
//! Works directly on geodetic coordinates from the three geocentric
//! translations and the difference between the two ellipsoids. The inverse
//! is the same formula with negated translations and swapped ellipsoids.

use crate::{
    constants::{LlhPoint, Meter, RADEG},
    dictionary::gx_def::GxMethod,
    geodesy::Ellipsoid,
    geoframe_errors::GeoframeError,
};

use super::{DatumShift, Shift};

#[derive(Debug, Clone)]
pub struct Molodensky {
    delta: [Meter; 3],
    src: Ellipsoid,
    trg: Ellipsoid,
}

impl Molodensky {
    pub fn new(delta: [Meter; 3], src: Ellipsoid, trg: Ellipsoid) -> Self {
        Molodensky { delta, src, trg }
    }

    fn shift(delta: [Meter; 3], src: &Ellipsoid, trg: &Ellipsoid, ll: &LlhPoint) -> LlhPoint {
        let [dx, dy, dz] = delta;
        let lng = ll[0] * RADEG;
        let lat = ll[1] * RADEG;
        let h = ll[2];

        let a = src.a;
        let f = src.flattening();
        let e_sq = src.e_sq;
        let da = trg.a - src.a;
        let df = trg.flattening() - f;

        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lng, cos_lng) = lng.sin_cos();
        let rn = src.prime_vertical(lat);
        let rm = src.meridian_radius(lat);
        let b_over_a = 1.0 - f;

        let d_lat = (-dx * sin_lat * cos_lng - dy * sin_lat * sin_lng
            + dz * cos_lat
            + da * (rn * e_sq * sin_lat * cos_lat) / a
            + df * (rm / b_over_a + rn * b_over_a) * sin_lat * cos_lat)
            / (rm + h);
        let d_lng = (-dx * sin_lng + dy * cos_lng) / ((rn + h) * cos_lat);
        let d_h = dx * cos_lat * cos_lng + dy * cos_lat * sin_lng + dz * sin_lat
            - da * a / rn
            + df * b_over_a * rn * sin_lat * sin_lat;

        [ll[0] + d_lng / RADEG, ll[1] + d_lat / RADEG, h + d_h]
    }
}

impl DatumShift for Molodensky {
    fn method(&self) -> GxMethod {
        GxMethod::Molodensky
    }

    fn forward(&self, ll: &LlhPoint) -> Result<Shift, GeoframeError> {
        Ok(Shift::Shifted(Molodensky::shift(self.delta, &self.src, &self.trg, ll)))
    }

    fn has_inverse(&self) -> bool {
        true
    }

    fn inverse(&self, ll: &LlhPoint) -> Result<Shift, GeoframeError> {
        let neg = [-self.delta[0], -self.delta[1], -self.delta[2]];
        Ok(Shift::Shifted(Molodensky::shift(neg, &self.trg, &self.src, ll)))
    }
}

#[cfg(test)]
mod test_molodensky {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn clarke_1866() -> Ellipsoid {
        let a = 6_378_206.4;
        let b: f64 = 6_356_583.8;
        Ellipsoid::new(a, 1.0 - (b * b) / (a * a))
    }

    #[test]
    fn test_matches_geocentric_translation() {
        let delta = [-8.0, 160.0, 176.0];
        let src = clarke_1866();
        let trg = Ellipsoid::wgs84();
        let molo = Molodensky::new(delta, src, trg);
        let p = [-100.0, 40.0, 0.0];
        let Shift::Shifted(out) = molo.forward(&p).unwrap() else {
            panic!("no range on molodensky")
        };

        let xyz = src.to_geocentric(p) + nalgebra::Vector3::from(delta);
        let exact = trg.to_geodetic(&xyz);
        // First order formula: within a meter of the exact shift.
        assert_abs_diff_eq!(out[0], exact[0], epsilon = 1e-5);
        assert_abs_diff_eq!(out[1], exact[1], epsilon = 1e-5);
        assert_abs_diff_eq!(out[2], exact[2], epsilon = 2.0);
    }

    #[test]
    fn test_inverse_round_trip() {
        let molo = Molodensky::new([-87.0, -98.0, -121.0], Ellipsoid::new(6_378_388.0, 0.006_722_67), Ellipsoid::wgs84());
        let p = [2.35, 48.85, 35.0];
        let Shift::Shifted(fwd) = molo.forward(&p).unwrap() else { panic!() };
        let Shift::Shifted(back) = molo.inverse(&fwd).unwrap() else { panic!() };
        assert_abs_diff_eq!(back[0], p[0], epsilon = 1e-6);
        assert_abs_diff_eq!(back[1], p[1], epsilon = 1e-6);
        assert_abs_diff_eq!(back[2], p[2], epsilon = 0.5);
    }
}
