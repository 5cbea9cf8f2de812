//! Multiple regression polynomial shifts.
//!
//! The polynomials are evaluated on normalized coordinates
//! `U = kk·(lat - lat_off)`, `V = kk·(lng - lng_off)`. They have no closed
//! form inverse; [`GxTransform`](super::GxTransform) inverts them
//! iteratively. The same evaluator serves the `.mrt` grid file format.

use crate::{
    constants::LlhPoint,
    dictionary::gx_def::{GxMethod, MulRegParams, MulRegTerm},
    geoframe_errors::GeoframeError,
};

use super::{DatumShift, Shift};

fn evaluate(terms: &[MulRegTerm], u: f64, v: f64) -> f64 {
    terms
        .iter()
        .map(|t| t.coef * u.powi(t.u_pow as i32) * v.powi(t.v_pow as i32))
        .sum()
}

/// Shift of one point: `(dlng″, dlat″, dh m)`.
pub fn mulreg_shift(params: &MulRegParams, lng: f64, lat: f64) -> (f64, f64, f64) {
    let u = params.kk * (lat - params.lat_off);
    let v = params.kk * (lng - params.lng_off);
    (
        evaluate(&params.lng_terms, u, v),
        evaluate(&params.lat_terms, u, v),
        evaluate(&params.hgt_terms, u, v),
    )
}

/// Apply `params` to a point.
pub fn apply_mulreg(params: &MulRegParams, ll: &LlhPoint) -> LlhPoint {
    let (d_lng, d_lat, d_h) = mulreg_shift(params, ll[0], ll[1]);
    [ll[0] + d_lng / 3600.0, ll[1] + d_lat / 3600.0, ll[2] + d_h]
}

#[derive(Debug, Clone)]
pub struct MultipleRegression {
    params: MulRegParams,
}

impl MultipleRegression {
    pub fn new(params: MulRegParams) -> Self {
        MultipleRegression { params }
    }
}

impl DatumShift for MultipleRegression {
    fn method(&self) -> GxMethod {
        GxMethod::MultipleRegression
    }

    fn forward(&self, ll: &LlhPoint) -> Result<Shift, GeoframeError> {
        Ok(Shift::Shifted(apply_mulreg(&self.params, ll)))
    }
}

#[cfg(test)]
mod test_mulreg {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_polynomial_evaluation() {
        let params = MulRegParams {
            lat_off: 40.0,
            lng_off: -100.0,
            kk: 0.05,
            lat_terms: vec![
                MulRegTerm { u_pow: 0, v_pow: 0, coef: 0.5 },
                MulRegTerm { u_pow: 1, v_pow: 0, coef: 2.0 },
            ],
            lng_terms: vec![MulRegTerm { u_pow: 1, v_pow: 1, coef: -4.0 }],
            hgt_terms: vec![MulRegTerm { u_pow: 0, v_pow: 2, coef: 10.0 }],
        };
        // U = 0.05 * 2 = 0.1, V = 0.05 * 4 = 0.2
        let (d_lng, d_lat, d_h) = mulreg_shift(&params, -96.0, 42.0);
        assert_abs_diff_eq!(d_lat, 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(d_lng, -0.08, epsilon = 1e-12);
        assert_abs_diff_eq!(d_h, 0.4, epsilon = 1e-12);

        let method = MultipleRegression::new(params);
        assert!(!method.has_inverse());
        let Shift::Shifted(p) = method.forward(&[-96.0, 42.0, 0.0]).unwrap() else { panic!() };
        assert_abs_diff_eq!(p[1], 42.0 + 0.7 / 3600.0, epsilon = 1e-12);
    }
}
