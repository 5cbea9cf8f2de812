//! Canadian NTv2 (`.gsb`) grid shift files.
//!
//! The file is a sequence of 16 byte records, an 8 character key followed
//! by an 8 byte value:
//!
//! * 11 overview records (`NUM_OREC`, `NUM_SREC`, `NUM_FILE`, `GS_TYPE`, ...),
//! * per sub-grid, 11 header records (`SUB_NAME`, `PARENT`, ..., `S_LAT`,
//!   `N_LAT`, `E_LONG`, `W_LONG`, `LAT_INC`, `LONG_INC`, `GS_COUNT`) followed
//!   by `GS_COUNT` nodes of four `f32`: latitude shift, longitude shift,
//!   and their accuracies,
//! * an `END` record.
//!
//! Longitudes are positive west. Nodes run from the south east corner
//! westward along each row, rows northward. The whole file is loaded.
//! Where sub-grids nest, the densest one covering the point is used.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use nom::{bytes::complete::take, IResult};
use tracing::debug;

use crate::{codec::chars_to_string, codec::ByteOrder, constants::Degree, geoframe_errors::GeoframeError};

use super::{check_node_bytes, detect_order, parse_f32, parse_f64, parse_i32, truncated, GridValue, RegularGrid, ShiftGrid};

/// Overview record count, doubling as the byte order probe.
pub const NTV2_NUM_OREC: i32 = 11;
/// Sub-grid header record count.
pub const NTV2_NUM_SREC: i32 = 11;

fn record(input: &[u8]) -> IResult<&[u8], (String, &[u8])> {
    let (input, key) = take(8usize)(input)?;
    let (input, value) = take(8usize)(input)?;
    Ok((input, (chars_to_string(key), value)))
}

pub(super) fn int_record(order: ByteOrder, input: &[u8]) -> IResult<&[u8], i32> {
    let (input, (_, value)) = record(input)?;
    let (_, v) = parse_i32(order, value)?;
    Ok((input, v))
}

pub(super) fn real_record(order: ByteOrder, input: &[u8]) -> IResult<&[u8], f64> {
    let (input, (_, value)) = record(input)?;
    let (_, v) = parse_f64(order, value)?;
    Ok((input, v))
}

pub(super) fn text_record(input: &[u8]) -> IResult<&[u8], String> {
    let (input, (_, value)) = record(input)?;
    Ok((input, chars_to_string(value)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ntv2Overview {
    pub num_file: i32,
    pub gs_type: String,
    pub version: String,
    pub system_f: String,
    pub system_t: String,
}

impl Ntv2Overview {
    fn parse(order: ByteOrder, input: &[u8]) -> IResult<&[u8], Self> {
        let (input, _num_orec) = int_record(order, input)?;
        let (input, _num_srec) = int_record(order, input)?;
        let (input, num_file) = int_record(order, input)?;
        let (input, gs_type) = text_record(input)?;
        let (input, version) = text_record(input)?;
        let (input, system_f) = text_record(input)?;
        let (input, system_t) = text_record(input)?;
        // MAJOR_F, MINOR_F, MAJOR_T, MINOR_T
        let (input, _) = take(64usize)(input)?;
        Ok((
            input,
            Ntv2Overview {
                num_file,
                gs_type,
                version,
                system_f,
                system_t,
            },
        ))
    }

    /// Degrees per unit of the header and shift values.
    fn unit_factor(&self) -> Result<f64, GeoframeError> {
        match self.gs_type.to_ascii_uppercase().as_str() {
            "SECONDS" => Ok(1.0 / 3600.0),
            "MINUTES" => Ok(1.0 / 60.0),
            "DEGREES" => Ok(1.0),
            other => Err(GeoframeError::format(format!("unsupported NTv2 GS_TYPE '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct SubGridHeader {
    name: String,
    parent: String,
    s_lat: f64,
    n_lat: f64,
    e_long: f64,
    w_long: f64,
    lat_inc: f64,
    long_inc: f64,
    gs_count: i32,
}

impl SubGridHeader {
    fn parse(order: ByteOrder, input: &[u8]) -> IResult<&[u8], Self> {
        let (input, name) = text_record(input)?;
        let (input, parent) = text_record(input)?;
        // CREATED, UPDATED
        let (input, _) = take(32usize)(input)?;
        let (input, s_lat) = real_record(order, input)?;
        let (input, n_lat) = real_record(order, input)?;
        let (input, e_long) = real_record(order, input)?;
        let (input, w_long) = real_record(order, input)?;
        let (input, lat_inc) = real_record(order, input)?;
        let (input, long_inc) = real_record(order, input)?;
        let (input, gs_count) = int_record(order, input)?;
        Ok((
            input,
            SubGridHeader {
                name,
                parent,
                s_lat,
                n_lat,
                e_long,
                w_long,
                lat_inc,
                long_inc,
                gs_count,
            },
        ))
    }
}

fn node(order: ByteOrder, input: &[u8]) -> IResult<&[u8], (f32, f32)> {
    let (input, lat_shift) = parse_f32(order, input)?;
    let (input, lng_shift) = parse_f32(order, input)?;
    let (input, _) = take(8usize)(input)?;
    Ok((input, (lat_shift, lng_shift)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ntv2SubGrid {
    pub name: String,
    pub parent: String,
    pub grid: RegularGrid,
}

#[derive(Debug)]
pub struct Ntv2Grid {
    path: Utf8PathBuf,
    pub overview: Ntv2Overview,
    pub byte_order: ByteOrder,
    pub subgrids: Vec<Ntv2SubGrid>,
}

impl Ntv2Grid {
    pub fn open(path: &Utf8Path) -> Result<Self, GeoframeError> {
        let bytes = fs::read(path)?;
        Ntv2Grid::from_bytes(path, &bytes)
    }

    pub fn from_bytes(path: &Utf8Path, bytes: &[u8]) -> Result<Self, GeoframeError> {
        let probe = bytes.get(8..).ok_or_else(|| truncated(path))?;
        let order = detect_order(path, probe, |v| v == NTV2_NUM_OREC)?;

        let (mut input, overview) = Ntv2Overview::parse(order, bytes).map_err(|_| truncated(path))?;
        let factor = overview.unit_factor()?;

        let mut subgrids = Vec::new();
        for _ in 0..overview.num_file {
            let (rest, header) = SubGridHeader::parse(order, input).map_err(|_| truncated(path))?;
            input = rest;

            if !(header.long_inc > 0.0 && header.lat_inc > 0.0)
                || header.w_long <= header.e_long
                || header.n_lat <= header.s_lat
            {
                return Err(GeoframeError::format(format!(
                    "{path}: sub-grid {} has an empty extent",
                    header.name
                )));
            }
            let cols = (((header.w_long - header.e_long) / header.long_inc).round() as usize).saturating_add(1);
            let rows = (((header.n_lat - header.s_lat) / header.lat_inc).round() as usize).saturating_add(1);
            if header.gs_count < 0 || Some(header.gs_count as usize) != cols.checked_mul(rows) {
                return Err(GeoframeError::format(format!(
                    "{path}: sub-grid {} declares {} nodes for a {cols}x{rows} grid",
                    header.name, header.gs_count
                )));
            }

            check_node_bytes(path, input, cols * rows, 16)?;
            let mut nodes = vec![[0.0; 2]; cols * rows];
            for k in 0..cols * rows {
                let (rest, (lat_shift, lng_shift)) = node(order, input).map_err(|_| truncated(path))?;
                input = rest;
                let row = k / cols;
                let col = cols - 1 - k % cols;
                nodes[row * cols + col] = [-(lng_shift as f64) * factor, lat_shift as f64 * factor];
            }

            let grid = RegularGrid::new(
                -header.w_long * factor,
                header.s_lat * factor,
                header.long_inc * factor,
                header.lat_inc * factor,
                cols,
                rows,
                nodes,
            )?;
            debug!(grid = %path, subgrid = %header.name, cols, rows, "NTv2 sub-grid read");
            subgrids.push(Ntv2SubGrid {
                name: header.name,
                parent: header.parent,
                grid,
            });
        }

        Ok(Ntv2Grid {
            path: path.to_path_buf(),
            overview,
            byte_order: order,
            subgrids,
        })
    }

    fn densest(&self, lng: Degree, lat: Degree) -> Option<&Ntv2SubGrid> {
        self.subgrids
            .iter()
            .filter(|s| s.grid.covers(lng, lat))
            .min_by(|a, b| a.grid.cell_area().total_cmp(&b.grid.cell_area()))
    }
}

impl ShiftGrid for Ntv2Grid {
    fn name(&self) -> &str {
        self.path.as_str()
    }

    fn covers(&self, lng: Degree, lat: Degree) -> bool {
        self.subgrids.iter().any(|s| s.grid.covers(lng, lat))
    }

    fn shift(&self, lng: Degree, lat: Degree) -> Result<Option<GridValue>, GeoframeError> {
        Ok(self
            .densest(lng, lat)
            .and_then(|s| s.grid.interpolate(lng, lat))
            .map(|[d_lng, d_lat]| [d_lng, d_lat, 0.0]))
    }
}
