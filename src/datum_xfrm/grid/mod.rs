//! # Grid file interpolation
//!
//! A grid file transformation references up to six files, searched in
//! order: the first file covering the point supplies the shift. A file
//! flagged `Inverse` is applied backwards, by iterating its forward shift.
//!
//! | format | extension     | storage                        | loading         |
//! |--------|---------------|--------------------------------|-----------------|
//! | NTv2   | `.gsb`        | sub-grids of `f32` nodes       | whole file      |
//! | NTv1   | `.dac`        | one grid of `f64` node pairs   | whole file      |
//! | NADCON | `.las`/`.los` | one row per record, `f32`      | two rows a time |
//! | MREG   | `.mrt`        | regression polynomial          | whole file      |
//!
//! Byte order is detected per file from a header value with a known
//! expected range, so files produced on either architecture load.

pub mod mrt;
pub mod nadcon;
pub mod ntv1;
pub mod ntv2;

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use nom::{
    number::complete::{be_f32, be_f64, be_i32, le_f32, le_f64, le_i32},
    IResult,
};
use tracing::info;

use crate::{
    codec::ByteOrder,
    constants::{Degree, LlhPoint},
    dictionary::gx_def::{GridDirection, GridFileRef, GridFormat, GxMethod},
    geoframe_errors::GeoframeError,
};

use super::{iterative_inverse, DatumShift, IterationControls, IterationOutcome, MethodEnv, Shift};

/// `(dlng°, dlat°, dh m)` at one point.
pub type GridValue = [f64; 3];

/// One loaded grid file.
pub trait ShiftGrid: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn covers(&self, lng: Degree, lat: Degree) -> bool;

    /// Interpolated shift, `None` outside the coverage.
    fn shift(&self, lng: Degree, lat: Degree) -> Result<Option<GridValue>, GeoframeError>;

    fn is_reentrant(&self) -> bool {
        true
    }
}

// -------------------------------------------------------------------------------------------------
// Byte order aware number parsers
// -------------------------------------------------------------------------------------------------

pub(crate) fn parse_i32(order: ByteOrder, input: &[u8]) -> IResult<&[u8], i32> {
    match order {
        ByteOrder::Little => le_i32(input),
        ByteOrder::Big => be_i32(input),
    }
}

pub(crate) fn parse_f32(order: ByteOrder, input: &[u8]) -> IResult<&[u8], f32> {
    match order {
        ByteOrder::Little => le_f32(input),
        ByteOrder::Big => be_f32(input),
    }
}

pub(crate) fn parse_f64(order: ByteOrder, input: &[u8]) -> IResult<&[u8], f64> {
    match order {
        ByteOrder::Little => le_f64(input),
        ByteOrder::Big => be_f64(input),
    }
}

/// Pick the byte order under which the leading `i32` of `input` is accepted.
pub(crate) fn detect_order<F>(path: &Utf8Path, input: &[u8], accept: F) -> Result<ByteOrder, GeoframeError>
where
    F: Fn(i32) -> bool,
{
    for order in [ByteOrder::Little, ByteOrder::Big] {
        if let Ok((_, value)) = parse_i32(order, input) {
            if accept(value) {
                return Ok(order);
            }
        }
    }
    Err(GeoframeError::format(format!(
        "{path}: header matches neither byte order"
    )))
}

pub(crate) fn truncated(path: &Utf8Path) -> GeoframeError {
    GeoframeError::NomParsingError(format!("{path}: truncated grid file"))
}

/// Fails unless `input` holds `count` nodes of `node_size` bytes, so a
/// corrupt header count never drives an allocation.
pub(crate) fn check_node_bytes(
    path: &Utf8Path,
    input: &[u8],
    count: usize,
    node_size: usize,
) -> Result<(), GeoframeError> {
    match count.checked_mul(node_size) {
        Some(needed) if needed <= input.len() => Ok(()),
        _ => Err(GeoframeError::format(format!(
            "{path}: {count} nodes declared but only {} bytes remain",
            input.len()
        ))),
    }
}

// -------------------------------------------------------------------------------------------------
// Regular grid
// -------------------------------------------------------------------------------------------------

/// Regular lat/long grid of two-component shifts, bilinear interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularGrid {
    pub min_lng: Degree,
    pub min_lat: Degree,
    pub d_lng: Degree,
    pub d_lat: Degree,
    pub cols: usize,
    pub rows: usize,
    /// `(dlng°, dlat°)` per node, rows south to north, columns west to east.
    pub nodes: Vec<[f64; 2]>,
}

impl RegularGrid {
    pub fn new(
        min_lng: Degree,
        min_lat: Degree,
        d_lng: Degree,
        d_lat: Degree,
        cols: usize,
        rows: usize,
        nodes: Vec<[f64; 2]>,
    ) -> Result<Self, GeoframeError> {
        if cols < 2 || rows < 2 || d_lng <= 0.0 || d_lat <= 0.0 {
            return Err(GeoframeError::format(format!(
                "degenerate grid {cols}x{rows}, cell {d_lng}x{d_lat}"
            )));
        }
        if nodes.len() != cols * rows {
            return Err(GeoframeError::format(format!(
                "grid of {cols}x{rows} nodes holds {} values",
                nodes.len()
            )));
        }
        Ok(RegularGrid {
            min_lng,
            min_lat,
            d_lng,
            d_lat,
            cols,
            rows,
            nodes,
        })
    }

    pub fn max_lng(&self) -> Degree {
        self.min_lng + self.d_lng * (self.cols - 1) as f64
    }

    pub fn max_lat(&self) -> Degree {
        self.min_lat + self.d_lat * (self.rows - 1) as f64
    }

    pub fn cell_area(&self) -> f64 {
        self.d_lng * self.d_lat
    }

    pub fn covers(&self, lng: Degree, lat: Degree) -> bool {
        lng >= self.min_lng && lng <= self.max_lng() && lat >= self.min_lat && lat <= self.max_lat()
    }

    fn node(&self, col: usize, row: usize) -> [f64; 2] {
        self.nodes[row * self.cols + col]
    }

    /// Cell index and fraction along one axis.
    fn locate(value: f64, min: f64, step: f64, count: usize) -> (usize, f64) {
        let x = (value - min) / step;
        let cell = (x.floor().max(0.0) as usize).min(count - 2);
        (cell, x - cell as f64)
    }

    pub fn interpolate(&self, lng: Degree, lat: Degree) -> Option<[f64; 2]> {
        if !self.covers(lng, lat) {
            return None;
        }
        let (col, fx) = RegularGrid::locate(lng, self.min_lng, self.d_lng, self.cols);
        let (row, fy) = RegularGrid::locate(lat, self.min_lat, self.d_lat, self.rows);
        let sw = self.node(col, row);
        let se = self.node(col + 1, row);
        let nw = self.node(col, row + 1);
        let ne = self.node(col + 1, row + 1);
        let mut out = [0.0; 2];
        for (k, v) in out.iter_mut().enumerate() {
            let south = sw[k] + (se[k] - sw[k]) * fx;
            let north = nw[k] + (ne[k] - nw[k]) * fx;
            *v = south + (north - south) * fy;
        }
        Some(out)
    }
}

// -------------------------------------------------------------------------------------------------
// Loading and the grid file method
// -------------------------------------------------------------------------------------------------

/// Resolve a grid file reference against the grid directory.
pub fn resolve_grid_path(path: &str, grid_dir: &Utf8Path) -> Utf8PathBuf {
    let path = Utf8Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        grid_dir.join(path)
    }
}

/// Open one grid file with the reader of its format.
pub fn load_grid(file: &GridFileRef, grid_dir: &Utf8Path) -> Result<Box<dyn ShiftGrid>, GeoframeError> {
    let path = resolve_grid_path(&file.path, grid_dir);
    if let Some(by_extension) = GridFormat::from_extension(path.as_str()) {
        if by_extension != file.format {
            return Err(GeoframeError::format(format!(
                "{path}: extension names a {by_extension:?} file, the transformation declares {:?}",
                file.format
            )));
        }
    }
    let grid: Box<dyn ShiftGrid> = match file.format {
        GridFormat::Ntv2 => Box::new(ntv2::Ntv2Grid::open(&path)?),
        GridFormat::Ntv1 => Box::new(ntv1::Ntv1Grid::open(&path)?),
        GridFormat::Nadcon => Box::new(nadcon::NadconGrid::open(&path)?),
        GridFormat::MulRegFile => Box::new(mrt::MrtGrid::open(&path)?),
    };
    info!(grid = %path, format = ?file.format, "grid file loaded");
    Ok(grid)
}

fn apply(ll: &LlhPoint, value: GridValue) -> LlhPoint {
    [ll[0] + value[0], ll[1] + value[1], ll[2] + value[2]]
}

fn grid_forward(grid: &dyn ShiftGrid, ll: &LlhPoint) -> Result<Shift, GeoframeError> {
    Ok(match grid.shift(ll[0], ll[1])? {
        Some(value) => Shift::Shifted(apply(ll, value)),
        None => Shift::OutOfRange,
    })
}

/// The grid file transformation method.
#[derive(Debug)]
pub struct GridShift {
    grids: Vec<(GridDirection, Box<dyn ShiftGrid>)>,
    controls: IterationControls,
}

impl GridShift {
    pub fn open(files: &[GridFileRef], env: &MethodEnv) -> Result<Self, GeoframeError> {
        let grids = files
            .iter()
            .map(|file| Ok((file.direction, load_grid(file, &env.grid_dir)?)))
            .collect::<Result<Vec<_>, GeoframeError>>()?;
        Ok(GridShift::from_grids(grids, env.defaults))
    }

    pub fn from_grids(grids: Vec<(GridDirection, Box<dyn ShiftGrid>)>, controls: IterationControls) -> Self {
        GridShift { grids, controls }
    }
}

impl DatumShift for GridShift {
    fn method(&self) -> GxMethod {
        GxMethod::GridFiles
    }

    fn forward(&self, ll: &LlhPoint) -> Result<Shift, GeoframeError> {
        for (direction, grid) in &self.grids {
            if !grid.covers(ll[0], ll[1]) {
                continue;
            }
            match direction {
                GridDirection::Forward => {
                    if let Shift::Shifted(p) = grid_forward(grid.as_ref(), ll)? {
                        return Ok(Shift::Shifted(p));
                    }
                }
                GridDirection::Inverse => {
                    match iterative_inverse(|p| grid_forward(grid.as_ref(), p), ll, &self.controls)? {
                        IterationOutcome::Converged(p) | IterationOutcome::Loose(p) => {
                            return Ok(Shift::Shifted(p))
                        }
                        IterationOutcome::Diverged(_) | IterationOutcome::OutOfRange => {}
                    }
                }
            }
        }
        Ok(Shift::OutOfRange)
    }

    fn is_reentrant(&self) -> bool {
        self.grids.iter().all(|(_, g)| g.is_reentrant())
    }

    fn release(&mut self) {
        self.grids.clear();
    }
}

#[cfg(test)]
pub(crate) mod test_grid {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_load_grid_checks_the_extension() {
        let dir = tempfile::tempdir().unwrap();
        let grid_dir = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(grid_dir.join("sample.gsb"), ntv2::test_ntv2::sample_gsb(ByteOrder::Little)).unwrap();

        let mut file = GridFileRef {
            format: GridFormat::Ntv2,
            direction: GridDirection::Forward,
            path: "sample.gsb".into(),
        };
        assert!(load_grid(&file, grid_dir).unwrap().covers(-73.0, 44.5));

        file.format = GridFormat::Ntv1;
        assert!(matches!(load_grid(&file, grid_dir), Err(GeoframeError::Format(_))));
    }

    /// 3x3 grid over [0, 2]x[0, 2] whose shift is `(0.001·lng, 0.002·lat)`.
    pub(crate) fn linear_grid() -> RegularGrid {
        let mut nodes = Vec::new();
        for row in 0..3 {
            for col in 0..3 {
                nodes.push([0.001 * col as f64, 0.002 * row as f64]);
            }
        }
        RegularGrid::new(0.0, 0.0, 1.0, 1.0, 3, 3, nodes).unwrap()
    }

    #[derive(Debug)]
    struct Fixed(RegularGrid);

    impl ShiftGrid for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        fn covers(&self, lng: Degree, lat: Degree) -> bool {
            self.0.covers(lng, lat)
        }
        fn shift(&self, lng: Degree, lat: Degree) -> Result<Option<GridValue>, GeoframeError> {
            Ok(self.0.interpolate(lng, lat).map(|[a, b]| [a, b, 0.0]))
        }
    }

    #[test]
    fn test_bilinear_is_exact_on_linear_field() {
        let grid = linear_grid();
        let [dl, dp] = grid.interpolate(1.25, 0.5).unwrap();
        assert_abs_diff_eq!(dl, 0.00125, epsilon = 1e-15);
        assert_abs_diff_eq!(dp, 0.001, epsilon = 1e-15);
        // upper edge belongs to the last cell
        assert!(grid.interpolate(2.0, 2.0).is_some());
        assert!(grid.interpolate(2.0001, 1.0).is_none());
    }

    #[test]
    fn test_inverse_direction_iterates() {
        let forward = GridShift::from_grids(
            vec![(GridDirection::Forward, Box::new(Fixed(linear_grid())) as Box<dyn ShiftGrid>)],
            IterationControls::default(),
        );
        let inverse = GridShift::from_grids(
            vec![(GridDirection::Inverse, Box::new(Fixed(linear_grid())) as Box<dyn ShiftGrid>)],
            IterationControls::default(),
        );
        let p = [1.0, 1.0, 0.0];
        let Shift::Shifted(q) = forward.forward(&p).unwrap() else { panic!() };
        let Shift::Shifted(back) = inverse.forward(&q).unwrap() else { panic!() };
        assert_abs_diff_eq!(back[0], p[0], epsilon = 1e-9);
        assert_abs_diff_eq!(back[1], p[1], epsilon = 1e-9);
        assert_eq!(forward.forward(&[5.0, 5.0, 0.0]).unwrap(), Shift::OutOfRange);
    }

    #[test]
    fn test_degenerate_grid_rejected() {
        assert!(RegularGrid::new(0.0, 0.0, 1.0, 1.0, 1, 3, vec![[0.0; 2]; 3]).is_err());
        assert!(RegularGrid::new(0.0, 0.0, 1.0, 1.0, 2, 2, vec![[0.0; 2]; 3]).is_err());
    }
}
