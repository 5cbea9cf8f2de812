//! Canadian NTv1 (`.dac`) grid shift files.
//!
//! Single grid, same 16 byte header records as NTv2 but twelve of them:
//! `NUM_OREC`, `TYPE`, `VERSION`, `DATUM_F`, `DATUM_T`, `S_LAT`, `N_LAT`,
//! `E_LONG`, `W_LONG`, `LAT_INC`, `LONG_INC`, `GS_COUNT`. Bounds are in
//! arc-seconds, longitudes positive west. Nodes are `f64` pairs (latitude
//! shift, longitude shift) in NTv2 node order.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use nom::IResult;

use crate::{codec::ByteOrder, constants::Degree, geoframe_errors::GeoframeError};

use super::{
    check_node_bytes, detect_order,
    ntv2::{int_record, real_record, text_record},
    parse_f64, truncated, GridValue, RegularGrid, ShiftGrid,
};

pub const NTV1_NUM_OREC: i32 = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct Ntv1Header {
    pub gs_type: String,
    pub version: String,
    pub datum_f: String,
    pub datum_t: String,
    /// `[S_LAT, N_LAT, E_LONG, W_LONG, LAT_INC, LONG_INC]`, arc-seconds.
    pub extent: [f64; 6],
    pub gs_count: i32,
}

impl Ntv1Header {
    fn parse(order: ByteOrder, input: &[u8]) -> IResult<&[u8], Self> {
        let (input, _num_orec) = int_record(order, input)?;
        let (input, gs_type) = text_record(input)?;
        let (input, version) = text_record(input)?;
        let (input, datum_f) = text_record(input)?;
        let (input, datum_t) = text_record(input)?;
        let mut extent = [0.0; 6];
        let mut input = input;
        for value in extent.iter_mut() {
            let (rest, v) = real_record(order, input)?;
            *value = v;
            input = rest;
        }
        let (input, gs_count) = int_record(order, input)?;
        Ok((
            input,
            Ntv1Header {
                gs_type,
                version,
                datum_f,
                datum_t,
                extent,
                gs_count,
            },
        ))
    }
}

#[derive(Debug)]
pub struct Ntv1Grid {
    path: Utf8PathBuf,
    pub header: Ntv1Header,
    pub grid: RegularGrid,
}

impl Ntv1Grid {
    pub fn open(path: &Utf8Path) -> Result<Self, GeoframeError> {
        let bytes = fs::read(path)?;
        Ntv1Grid::from_bytes(path, &bytes)
    }

    pub fn from_bytes(path: &Utf8Path, bytes: &[u8]) -> Result<Self, GeoframeError> {
        let probe = bytes.get(8..).ok_or_else(|| truncated(path))?;
        let order = detect_order(path, probe, |v| v == NTV1_NUM_OREC)?;
        let (mut input, header) = Ntv1Header::parse(order, bytes).map_err(|_| truncated(path))?;

        let [s_lat, n_lat, e_long, w_long, lat_inc, long_inc] = header.extent;
        if !(lat_inc > 0.0 && long_inc > 0.0) || w_long <= e_long || n_lat <= s_lat {
            return Err(GeoframeError::format(format!("{path}: empty NTv1 extent")));
        }
        let cols = (((w_long - e_long) / long_inc).round() as usize).saturating_add(1);
        let rows = (((n_lat - s_lat) / lat_inc).round() as usize).saturating_add(1);
        if header.gs_count < 0 || Some(header.gs_count as usize) != cols.checked_mul(rows) {
            return Err(GeoframeError::format(format!(
                "{path}: {} nodes declared for a {cols}x{rows} grid",
                header.gs_count
            )));
        }

        check_node_bytes(path, input, cols * rows, 16)?;
        let mut nodes = vec![[0.0; 2]; cols * rows];
        for k in 0..cols * rows {
            let (rest, lat_shift) = parse_f64(order, input).map_err(|_| truncated(path))?;
            let (rest, lng_shift) = parse_f64(order, rest).map_err(|_| truncated(path))?;
            input = rest;
            let row = k / cols;
            let col = cols - 1 - k % cols;
            nodes[row * cols + col] = [-lng_shift / 3600.0, lat_shift / 3600.0];
        }

        let grid = RegularGrid::new(
            -w_long / 3600.0,
            s_lat / 3600.0,
            long_inc / 3600.0,
            lat_inc / 3600.0,
            cols,
            rows,
            nodes,
        )?;
        Ok(Ntv1Grid {
            path: path.to_path_buf(),
            header,
            grid,
        })
    }
}

impl ShiftGrid for Ntv1Grid {
    fn name(&self) -> &str {
        self.path.as_str()
    }

    fn covers(&self, lng: Degree, lat: Degree) -> bool {
        self.grid.covers(lng, lat)
    }

    fn shift(&self, lng: Degree, lat: Degree) -> Result<Option<GridValue>, GeoframeError> {
        Ok(self
            .grid
            .interpolate(lng, lat)
            .map(|[d_lng, d_lat]| [d_lng, d_lat, 0.0]))
    }
}
