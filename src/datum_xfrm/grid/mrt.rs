//! Multiple regression coefficient files (`.mrt`).
//!
//! ```text
//! total i32 | lat_count i32 | lng_count i32 | hgt_count i32
//! lat_off lng_off kk min_lng min_lat max_lng max_lat   (f64)
//! total x (u_pow i32, v_pow i32, coef f64)             latitude, longitude, height terms
//! ```
//!
//! The term total doubles as the byte order probe: a little-endian read
//! within `0..=4096` selects little-endian.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use nom::IResult;

use crate::{
    codec::ByteOrder,
    constants::Degree,
    datum_xfrm::mulreg::mulreg_shift,
    dictionary::gx_def::{GxRange, MulRegParams, MulRegTerm},
    geoframe_errors::GeoframeError,
};

use super::{detect_order, parse_f64, parse_i32, truncated, GridValue, ShiftGrid};

pub const MRT_MAX_TERMS: i32 = 4096;

fn term(order: ByteOrder, input: &[u8]) -> IResult<&[u8], MulRegTerm> {
    let (input, u_pow) = parse_i32(order, input)?;
    let (input, v_pow) = parse_i32(order, input)?;
    let (input, coef) = parse_f64(order, input)?;
    Ok((
        input,
        MulRegTerm {
            u_pow: u_pow as i16,
            v_pow: v_pow as i16,
            coef,
        },
    ))
}

fn terms(order: ByteOrder, mut input: &[u8], n: usize) -> IResult<&[u8], Vec<MulRegTerm>> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let (rest, t) = term(order, input)?;
        out.push(t);
        input = rest;
    }
    Ok((input, out))
}

#[derive(Debug)]
pub struct MrtGrid {
    path: Utf8PathBuf,
    pub params: MulRegParams,
    pub range: GxRange,
}

impl MrtGrid {
    pub fn open(path: &Utf8Path) -> Result<Self, GeoframeError> {
        let bytes = fs::read(path)?;
        MrtGrid::from_bytes(path, &bytes)
    }

    pub fn from_bytes(path: &Utf8Path, bytes: &[u8]) -> Result<Self, GeoframeError> {
        let order = detect_order(path, bytes, |n| (0..=MRT_MAX_TERMS).contains(&n))?;
        let fail = |_| truncated(path);

        let (input, total) = parse_i32(order, bytes).map_err(fail)?;
        let (input, lat_n) = parse_i32(order, input).map_err(fail)?;
        let (input, lng_n) = parse_i32(order, input).map_err(fail)?;
        let (mut input, hgt_n) = parse_i32(order, input).map_err(fail)?;
        let declared = [lat_n, lng_n, hgt_n].map(i64::from);
        if declared.iter().any(|&n| n < 0) || declared.iter().sum::<i64>() != i64::from(total) {
            return Err(GeoframeError::format(format!(
                "{path}: term counts {lat_n}+{lng_n}+{hgt_n} do not add up to {total}"
            )));
        }

        let mut header = [0.0; 7];
        for value in header.iter_mut() {
            let (rest, v) = parse_f64(order, input).map_err(fail)?;
            *value = v;
            input = rest;
        }
        let [lat_off, lng_off, kk, min_lng, min_lat, max_lng, max_lat] = header;

        let (input, lat_terms) = terms(order, input, lat_n as usize).map_err(fail)?;
        let (input, lng_terms) = terms(order, input, lng_n as usize).map_err(fail)?;
        let (_, hgt_terms) = terms(order, input, hgt_n as usize).map_err(fail)?;

        if kk <= 0.0 {
            return Err(GeoframeError::format(format!("{path}: normalizing scale must be positive")));
        }
        Ok(MrtGrid {
            path: path.to_path_buf(),
            params: MulRegParams {
                lat_off,
                lng_off,
                kk,
                lat_terms,
                lng_terms,
                hgt_terms,
            },
            range: GxRange {
                min_lng,
                min_lat,
                max_lng,
                max_lat,
            },
        })
    }
}

impl ShiftGrid for MrtGrid {
    fn name(&self) -> &str {
        self.path.as_str()
    }

    fn covers(&self, lng: Degree, lat: Degree) -> bool {
        self.range.contains(lng, lat)
    }

    fn shift(&self, lng: Degree, lat: Degree) -> Result<Option<GridValue>, GeoframeError> {
        if !self.covers(lng, lat) {
            return Ok(None);
        }
        let (d_lng, d_lat, d_h) = mulreg_shift(&self.params, lng, lat);
        Ok(Some([d_lng / 3600.0, d_lat / 3600.0, d_h]))
    }
}

#[cfg(test)]
mod test_mrt {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample(order: ByteOrder) -> Vec<u8> {
        let mut buf = Vec::new();
        let int = |buf: &mut Vec<u8>, v: i32| match order {
            ByteOrder::Little => buf.extend_from_slice(&v.to_le_bytes()),
            ByteOrder::Big => buf.extend_from_slice(&v.to_be_bytes()),
        };
        for v in [3, 1, 1, 1] {
            int(&mut buf, v);
        }
        let real = |buf: &mut Vec<u8>, v: f64| match order {
            ByteOrder::Little => buf.extend_from_slice(&v.to_le_bytes()),
            ByteOrder::Big => buf.extend_from_slice(&v.to_be_bytes()),
        };
        for v in [40.0, 10.0, 0.5, 5.0, 35.0, 15.0, 45.0] {
            real(&mut buf, v);
        }
        // lat: 0.3 U, lng: -1.2, hgt: 2 V^2
        for (u, v, c) in [(1, 0, 0.3), (0, 0, -1.2), (0, 2, 2.0)] {
            int(&mut buf, u);
            int(&mut buf, v);
            real(&mut buf, c);
        }
        buf
    }

    #[test]
    fn test_both_orders_evaluate_alike() {
        for order in [ByteOrder::Little, ByteOrder::Big] {
            let grid = MrtGrid::from_bytes(Utf8Path::new("t.mrt"), &sample(order)).unwrap();
            assert_eq!(grid.params.term_count(), 3);
            // U = 0.5 * 2 = 1, V = 0.5 * 2 = 1
            let [d_lng, d_lat, d_h] = grid.shift(12.0, 42.0).unwrap().unwrap();
            assert_abs_diff_eq!(d_lat, 0.3 / 3600.0, epsilon = 1e-15);
            assert_abs_diff_eq!(d_lng, -1.2 / 3600.0, epsilon = 1e-15);
            assert_abs_diff_eq!(d_h, 2.0, epsilon = 1e-12);
            assert!(grid.shift(0.0, 42.0).unwrap().is_none());
        }
    }

    #[test]
    fn test_inconsistent_counts() {
        let mut bytes = sample(ByteOrder::Little);
        bytes[0] = 4;
        assert!(matches!(
            MrtGrid::from_bytes(Utf8Path::new("t.mrt"), &bytes),
            Err(GeoframeError::Format(_))
        ));
    }
}
