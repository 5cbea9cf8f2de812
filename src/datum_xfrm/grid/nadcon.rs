//! US NADCON `.las`/`.los` grid pairs.
//!
//! Both files share one layout. Every record is `(ncol + 1) * 4` bytes long;
//! record 0 is the header
//!
//! ```text
//! ident c56 | pgm c8 | ncol i32 | nrow i32 | nz i32 | xmin dx ymin dy angle f32
//! ```
//!
//! and record `r` (1-based, south to north) holds the row index followed by
//! `ncol` `f32` values west to east. Latitude shifts (`.las`) are in
//! arc-seconds, longitude shifts (`.los`) in arc-seconds positive west.
//! `nz` is always 1 and serves as the byte order probe.
//!
//! The files are not loaded: each lookup reads the four surrounding nodes
//! from both files under a lock, so the grid is not reentrant.

use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
};

use camino::{Utf8Path, Utf8PathBuf};
use nom::{bytes::complete::take, IResult};
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    codec::{chars_to_string, ByteOrder},
    constants::Degree,
    geoframe_errors::GeoframeError,
};

use super::{detect_order, parse_f32, parse_i32, truncated, GridValue, ShiftGrid};

pub const NADCON_HEADER_LEN: usize = 96;
const NZ_OFFSET: usize = 72;

#[derive(Debug, Clone, PartialEq)]
pub struct NadconHeader {
    pub ident: String,
    pub pgm: String,
    pub ncol: i32,
    pub nrow: i32,
    pub nz: i32,
    pub xmin: f32,
    pub dx: f32,
    pub ymin: f32,
    pub dy: f32,
    pub angle: f32,
}

impl NadconHeader {
    fn parse(order: ByteOrder, input: &[u8]) -> IResult<&[u8], Self> {
        let (input, ident) = take(56usize)(input)?;
        let (input, pgm) = take(8usize)(input)?;
        let (input, ncol) = parse_i32(order, input)?;
        let (input, nrow) = parse_i32(order, input)?;
        let (input, nz) = parse_i32(order, input)?;
        let (input, xmin) = parse_f32(order, input)?;
        let (input, dx) = parse_f32(order, input)?;
        let (input, ymin) = parse_f32(order, input)?;
        let (input, dy) = parse_f32(order, input)?;
        let (input, angle) = parse_f32(order, input)?;
        Ok((
            input,
            NadconHeader {
                ident: chars_to_string(ident),
                pgm: chars_to_string(pgm),
                ncol,
                nrow,
                nz,
                xmin,
                dx,
                ymin,
                dy,
                angle,
            },
        ))
    }

    fn record_len(&self) -> u64 {
        (self.ncol as u64 + 1) * 4
    }

    fn max_lng(&self) -> f64 {
        self.xmin as f64 + self.dx as f64 * (self.ncol - 1) as f64
    }

    fn max_lat(&self) -> f64 {
        self.ymin as f64 + self.dy as f64 * (self.nrow - 1) as f64
    }

    fn same_grid(&self, other: &NadconHeader) -> bool {
        self.ncol == other.ncol
            && self.nrow == other.nrow
            && self.xmin == other.xmin
            && self.dx == other.dx
            && self.ymin == other.ymin
            && self.dy == other.dy
    }
}

/// `.las` and `.los` paths from either one, keeping the extension case.
pub fn companion_paths(path: &Utf8Path) -> Result<(Utf8PathBuf, Utf8PathBuf), GeoframeError> {
    let ext = path
        .extension()
        .ok_or_else(|| GeoframeError::format(format!("{path}: NADCON file without extension")))?;
    let upper = ext.chars().all(|c| c.is_ascii_uppercase());
    let (las, los) = if upper { ("LAS", "LOS") } else { ("las", "los") };
    Ok((path.with_extension(las), path.with_extension(los)))
}

fn read_header(path: &Utf8Path, file: &mut BufReader<File>) -> Result<(ByteOrder, NadconHeader), GeoframeError> {
    let mut raw = [0u8; NADCON_HEADER_LEN];
    file.read_exact(&mut raw)?;
    let order = detect_order(path, &raw[NZ_OFFSET..], |nz| nz == 1)?;
    let (_, header) = NadconHeader::parse(order, &raw).map_err(|_| truncated(path))?;
    if header.ncol < 2
        || header.nrow < 2
        || header.dx <= 0.0
        || header.dy <= 0.0
        || header.record_len() < NADCON_HEADER_LEN as u64
    {
        return Err(GeoframeError::format(format!(
            "{path}: degenerate NADCON grid {}x{}",
            header.ncol, header.nrow
        )));
    }
    Ok((order, header))
}

#[derive(Debug)]
pub struct NadconGrid {
    name: String,
    pub header: NadconHeader,
    order: ByteOrder,
    las: Mutex<BufReader<File>>,
    los: Mutex<BufReader<File>>,
}

impl NadconGrid {
    /// Open the pair given the path of either file.
    pub fn open(path: &Utf8Path) -> Result<Self, GeoframeError> {
        let (las_path, los_path) = companion_paths(path)?;
        let mut las = BufReader::new(File::open(&las_path)?);
        let mut los = BufReader::new(File::open(&los_path)?);
        let (order, header) = read_header(&las_path, &mut las)?;
        let (los_order, los_header) = read_header(&los_path, &mut los)?;
        if los_order != order || !header.same_grid(&los_header) {
            return Err(GeoframeError::format(format!(
                "{las_path} and {los_path} describe different grids"
            )));
        }
        debug!(grid = %las_path, ncol = header.ncol, nrow = header.nrow, %order, "NADCON pair opened");
        Ok(NadconGrid {
            name: las_path.with_extension("").to_string(),
            header,
            order,
            las: Mutex::new(las),
            los: Mutex::new(los),
        })
    }

    /// Two adjacent values of one row: `(col, row)` and `(col + 1, row)`, 0-based.
    fn read_pair(&self, file: &Mutex<BufReader<File>>, col: usize, row: usize) -> Result<[f32; 2], GeoframeError> {
        let offset = (row as u64 + 1) * self.header.record_len() + 4 + col as u64 * 4;
        let mut raw = [0u8; 8];
        {
            let mut file = file.lock();
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut raw)?;
        }
        let name = Utf8Path::new(&self.name);
        let (rest, a) = parse_f32(self.order, &raw).map_err(|_| truncated(name))?;
        let (_, b) = parse_f32(self.order, rest).map_err(|_| truncated(name))?;
        Ok([a, b])
    }

    /// Bilinear value of one file at fractional cell position.
    fn interpolate(&self, file: &Mutex<BufReader<File>>, col: usize, row: usize, fx: f64, fy: f64) -> Result<f64, GeoframeError> {
        let [sw, se] = self.read_pair(file, col, row)?;
        let [nw, ne] = self.read_pair(file, col, row + 1)?;
        let south = sw as f64 + (se as f64 - sw as f64) * fx;
        let north = nw as f64 + (ne as f64 - nw as f64) * fx;
        Ok(south + (north - south) * fy)
    }
}

impl ShiftGrid for NadconGrid {
    fn name(&self) -> &str {
        &self.name
    }

    fn covers(&self, lng: Degree, lat: Degree) -> bool {
        lng >= self.header.xmin as f64
            && lng <= self.header.max_lng()
            && lat >= self.header.ymin as f64
            && lat <= self.header.max_lat()
    }

    fn shift(&self, lng: Degree, lat: Degree) -> Result<Option<GridValue>, GeoframeError> {
        if !self.covers(lng, lat) {
            return Ok(None);
        }
        let x = (lng - self.header.xmin as f64) / self.header.dx as f64;
        let y = (lat - self.header.ymin as f64) / self.header.dy as f64;
        let col = (x.floor() as usize).min(self.header.ncol as usize - 2);
        let row = (y.floor() as usize).min(self.header.nrow as usize - 2);
        let (fx, fy) = (x - col as f64, y - row as f64);

        let d_lat = self.interpolate(&self.las, col, row, fx, fy)?;
        let d_lng = self.interpolate(&self.los, col, row, fx, fy)?;
        Ok(Some([-d_lng / 3600.0, d_lat / 3600.0, 0.0]))
    }

    fn is_reentrant(&self) -> bool {
        false
    }
}

#[cfg(test)]
pub(crate) mod test_nadcon {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::fs;

    /// Write a 25x2 pair over 100°W..76°W, 40°N..41°N. The latitude shift
    /// equals the column number, the longitude shift is 2" west.
    pub(crate) fn write_pair(dir: &Utf8Path, stem: &str) -> Utf8PathBuf {
        let (ncol, nrow) = (25i32, 2i32);
        for (ext, value) in [("las", None), ("los", Some(2.0f32))] {
            let mut buf = Vec::new();
            let mut ident = [b' '; 56];
            ident[..6].copy_from_slice(b"NADCON");
            buf.extend_from_slice(&ident);
            buf.extend_from_slice(b"NADGRD  ");
            for v in [ncol, nrow, 1] {
                buf.extend_from_slice(&v.to_le_bytes());
            }
            for v in [-100.0f32, 1.0, 40.0, 1.0, 0.0] {
                buf.extend_from_slice(&v.to_le_bytes());
            }
            buf.resize(((ncol + 1) * 4) as usize, 0);
            for row in 1..=nrow {
                buf.extend_from_slice(&row.to_le_bytes());
                for col in 0..ncol {
                    let v = value.unwrap_or(col as f32);
                    buf.extend_from_slice(&v.to_le_bytes());
                }
            }
            fs::write(dir.join(format!("{stem}.{ext}")), buf).unwrap();
        }
        dir.join(format!("{stem}.las"))
    }

    #[test]
    fn test_lookup_from_either_file() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();
        let las = write_pair(dir, "conus");
        let grid = NadconGrid::open(&las.with_extension("los")).unwrap();
        assert!(!grid.is_reentrant());
        assert_eq!(grid.header.pgm, "NADGRD");

        let [d_lng, d_lat, _] = grid.shift(-98.5, 40.5).unwrap().unwrap();
        assert_abs_diff_eq!(d_lat, 1.5 / 3600.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d_lng, -2.0 / 3600.0, epsilon = 1e-12);
        assert!(grid.shift(-75.0, 40.5).unwrap().is_none());
    }

    #[test]
    fn test_missing_companion_is_system_error() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();
        let las = write_pair(dir, "alone");
        fs::remove_file(las.with_extension("los")).unwrap();
        let err = NadconGrid::open(&las).unwrap_err();
        assert!(err.is_system_error());
    }

    #[test]
    fn test_companion_paths_keep_case() {
        let (las, los) = companion_paths(Utf8Path::new("/g/CONUS.LOS")).unwrap();
        assert_eq!(las, "/g/CONUS.LAS");
        assert_eq!(los, "/g/CONUS.LOS");
    }
}
