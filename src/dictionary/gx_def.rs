//! Geodetic transformation definitions (`GeodeticTransform.CSD`).
//!
//! A record links a source and a target datum through one method. The
//! method-specific parameters share a fixed 1472-byte union whose layout is
//! selected by the method code, so the byte-order descriptor of a record
//! depends on its own content (see [`DictRecord::refine_layout`]).

use std::{borrow::Cow, fmt, str::FromStr};

use crate::{
    codec::{ByteOrder, FieldKind, RecordReader, RecordWriter},
    constants::{ArcSec, Degree, Meter, Ppm, DESC_LEN, GX_NAME_LEN, KEY_NAME_LEN},
    dictionary::{unsupported_level, DictKind, DictRecord},
    geoframe_errors::GeoframeError,
    migration::validate_migrated_name,
};

/// Size of the method parameter union.
pub const GX_UNION_LEN: usize = 1472;
/// Maximum number of polynomial terms of a multiple regression block.
pub const MULREG_MAX_TERMS: usize = 120;
/// Maximum number of grid files referenced by one transformation.
pub const GRID_MAX_FILES: usize = 6;
/// Width of a grid file path.
pub const GRID_PATH_LEN: usize = 240;

const GX_HEADER: &[FieldKind] = &[
    FieldKind::Chars(GX_NAME_LEN),  // key_nm
    FieldKind::Chars(KEY_NAME_LEN), // src_dt_knm
    FieldKind::Chars(KEY_NAME_LEN), // trg_dt_knm
    FieldKind::Chars(KEY_NAME_LEN), // group
    FieldKind::Chars(DESC_LEN),     // desc_nm
    FieldKind::Chars(DESC_LEN),     // source
    FieldKind::I32,                 // epsg
    FieldKind::I16,                 // method
    FieldKind::I16,                 // reversible
    FieldKind::I16,                 // max_itr
    FieldKind::I16,                 // protect
    FieldKind::I16,                 // fallback method
    FieldKind::F64,                 // accuracy
    FieldKind::F64,                 // cnvrg_val
    FieldKind::F64,                 // error_val
    FieldKind::Doubles(4),          // validity range
    FieldKind::Doubles(7),          // fallback parameters
];

/// Byte offset of the method code in a record.
const METHOD_OFFSET: usize = GX_NAME_LEN + 3 * KEY_NAME_LEN + 2 * DESC_LEN + 4;

const FILL_LEN: usize = 8;

/// Transformation method code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GxMethod {
    Null,
    Molodensky,
    GeocentricTranslation,
    FourParameter,
    SixParameter,
    /// Seven parameters, position vector rotation convention.
    BursaWolf,
    /// Seven parameters, coordinate frame rotation convention.
    SevenParameter,
    MultipleRegression,
    GridFiles,
}

impl GxMethod {
    pub fn code(self) -> i16 {
        match self {
            GxMethod::Null => 1,
            GxMethod::Molodensky => 2,
            GxMethod::GeocentricTranslation => 3,
            GxMethod::FourParameter => 4,
            GxMethod::SixParameter => 5,
            GxMethod::BursaWolf => 6,
            GxMethod::SevenParameter => 7,
            GxMethod::MultipleRegression => 8,
            GxMethod::GridFiles => 9,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        Some(match code {
            1 => GxMethod::Null,
            2 => GxMethod::Molodensky,
            3 => GxMethod::GeocentricTranslation,
            4 => GxMethod::FourParameter,
            5 => GxMethod::SixParameter,
            6 => GxMethod::BursaWolf,
            7 => GxMethod::SevenParameter,
            8 => GxMethod::MultipleRegression,
            9 => GxMethod::GridFiles,
            _ => return None,
        })
    }

    /// Methods whose parameters are a geocentric block.
    pub fn is_geocentric(self) -> bool {
        !matches!(self, GxMethod::MultipleRegression | GxMethod::GridFiles)
    }

    /// Methods usable as a fallback.
    pub fn can_be_fallback(self) -> bool {
        self.is_geocentric() && self != GxMethod::Null
    }

    pub fn name(self) -> &'static str {
        match self {
            GxMethod::Null => "NULL",
            GxMethod::Molodensky => "MOLODENSKY",
            GxMethod::GeocentricTranslation => "GEOCENTRIC",
            GxMethod::FourParameter => "4PARAMETER",
            GxMethod::SixParameter => "6PARAMETER",
            GxMethod::BursaWolf => "BURSAWOLF",
            GxMethod::SevenParameter => "7PARAMETER",
            GxMethod::MultipleRegression => "MULREG",
            GxMethod::GridFiles => "GRID_FILE",
        }
    }
}

impl fmt::Display for GxMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GxMethod {
    type Err = GeoframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let up = s.trim().to_ascii_uppercase();
        Ok(match up.as_str() {
            "NULL" => GxMethod::Null,
            "MOLODENSKY" => GxMethod::Molodensky,
            "GEOCENTRIC" | "3PARAMETER" => GxMethod::GeocentricTranslation,
            "4PARAMETER" => GxMethod::FourParameter,
            "6PARAMETER" => GxMethod::SixParameter,
            "BURSAWOLF" => GxMethod::BursaWolf,
            "7PARAMETER" => GxMethod::SevenParameter,
            "MULREG" | "MREG" => GxMethod::MultipleRegression,
            "GRID_FILE" | "GRID" => GxMethod::GridFiles,
            _ => return Err(GeoframeError::UnknownMethod(s.trim().to_string())),
        })
    }
}

/// Geocentric (Helmert family) parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeocentricParams {
    pub delta: [Meter; 3],
    pub rotation: [ArcSec; 3],
    pub scale: Ppm,
}

impl GeocentricParams {
    pub fn translation(dx: Meter, dy: Meter, dz: Meter) -> Self {
        GeocentricParams {
            delta: [dx, dy, dz],
            ..Default::default()
        }
    }

    fn to_array(self) -> [f64; 7] {
        let [dx, dy, dz] = self.delta;
        let [rx, ry, rz] = self.rotation;
        [dx, dy, dz, rx, ry, rz, self.scale]
    }

    fn from_array(p: [f64; 7]) -> Self {
        GeocentricParams {
            delta: [p[0], p[1], p[2]],
            rotation: [p[3], p[4], p[5]],
            scale: p[6],
        }
    }

    pub fn is_zero(&self) -> bool {
        self.to_array().iter().all(|&v| v == 0.0)
    }
}

/// One polynomial term `coef * U^u_pow * V^v_pow`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MulRegTerm {
    pub u_pow: i16,
    pub v_pow: i16,
    pub coef: f64,
}

/// Multiple regression polynomial block.
///
/// `U = kk * (lat - lat_off)` and `V = kk * (lng - lng_off)`; the latitude and
/// longitude polynomials yield shifts in arc-seconds, the height polynomial
/// in meters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MulRegParams {
    pub lat_off: Degree,
    pub lng_off: Degree,
    pub kk: f64,
    pub lat_terms: Vec<MulRegTerm>,
    pub lng_terms: Vec<MulRegTerm>,
    pub hgt_terms: Vec<MulRegTerm>,
}

impl MulRegParams {
    pub fn term_count(&self) -> usize {
        self.lat_terms.len() + self.lng_terms.len() + self.hgt_terms.len()
    }
}

/// Grid file format. A known file extension must agree with it when the
/// grid is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridFormat {
    /// Canadian NTv2 `.gsb`.
    Ntv2,
    /// Canadian NTv1 `.dac`.
    Ntv1,
    /// US NADCON `.las`/`.los` pair.
    Nadcon,
    /// Multiple regression coefficients `.mrt`.
    MulRegFile,
}

impl GridFormat {
    pub fn code(self) -> i16 {
        match self {
            GridFormat::Ntv2 => 1,
            GridFormat::Ntv1 => 2,
            GridFormat::Nadcon => 3,
            GridFormat::MulRegFile => 4,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        Some(match code {
            1 => GridFormat::Ntv2,
            2 => GridFormat::Ntv1,
            3 => GridFormat::Nadcon,
            4 => GridFormat::MulRegFile,
            _ => return None,
        })
    }

    pub fn from_extension(path: &str) -> Option<Self> {
        let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
        Some(match ext.as_str() {
            "gsb" => GridFormat::Ntv2,
            "dac" => GridFormat::Ntv1,
            "las" | "los" => GridFormat::Nadcon,
            "mrt" => GridFormat::MulRegFile,
            _ => return None,
        })
    }
}

/// Direction a grid file is applied in, relative to the transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridDirection {
    #[default]
    Forward,
    Inverse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridFileRef {
    pub format: GridFormat,
    pub direction: GridDirection,
    pub path: String,
}

/// Method-specific parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum GxParameters {
    Geocentric(GeocentricParams),
    MultipleRegression(MulRegParams),
    GridFiles(Vec<GridFileRef>),
}

impl Default for GxParameters {
    fn default() -> Self {
        GxParameters::Geocentric(GeocentricParams::default())
    }
}

/// Longitude/latitude validity window of a transformation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GxRange {
    pub min_lng: Degree,
    pub min_lat: Degree,
    pub max_lng: Degree,
    pub max_lat: Degree,
}

impl GxRange {
    /// An all-zero range means "unrestricted".
    pub fn is_unrestricted(&self) -> bool {
        self.min_lng == 0.0 && self.min_lat == 0.0 && self.max_lng == 0.0 && self.max_lat == 0.0
    }

    pub fn contains(&self, lng: Degree, lat: Degree) -> bool {
        self.is_unrestricted()
            || (lng >= self.min_lng
                && lng <= self.max_lng
                && lat >= self.min_lat
                && lat <= self.max_lat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GxFallback {
    pub method: GxMethod,
    pub params: GeocentricParams,
}

/// Geodetic transformation definition.
#[derive(Debug, Clone, PartialEq)]
pub struct GxTransformDef {
    pub key_nm: String,
    pub src_dt_knm: String,
    pub trg_dt_knm: String,
    pub group: String,
    pub desc_nm: String,
    pub source: String,
    pub epsg: i32,
    pub method: GxMethod,
    pub reversible: bool,
    pub max_itr: i16,
    pub protect: i16,
    /// Expected accuracy in meters.
    pub accuracy: Meter,
    /// Convergence threshold of the iterative inverse, degrees.
    pub cnvrg_val: Degree,
    /// Residual above which an iterative inverse is reported out of coverage, degrees.
    pub error_val: Degree,
    pub range: GxRange,
    pub fallback: Option<GxFallback>,
    pub params: GxParameters,
}

impl GxTransformDef {
    pub fn new(key_nm: &str, src: &str, trg: &str, method: GxMethod, params: GxParameters) -> Self {
        GxTransformDef {
            key_nm: key_nm.to_string(),
            src_dt_knm: src.to_string(),
            trg_dt_knm: trg.to_string(),
            group: String::new(),
            desc_nm: String::new(),
            source: String::new(),
            epsg: 0,
            method,
            reversible: true,
            max_itr: 0,
            protect: 0,
            accuracy: 0.0,
            cnvrg_val: 0.0,
            error_val: 0.0,
            range: GxRange::default(),
            fallback: None,
            params,
        }
    }

    /// Method-specific invariants checked before a transformation is
    /// initialized and by the compiler.
    ///
    /// Return
    /// ----------
    /// * `Err(reason)` naming the first violated invariant.
    pub fn check_invariants(&self) -> Result<(), String> {
        match (&self.params, self.method) {
            (GxParameters::Geocentric(_), m) if m.is_geocentric() => {}
            (GxParameters::MultipleRegression(mr), GxMethod::MultipleRegression) => {
                if mr.kk <= 0.0 {
                    return Err("normalizing scale must be positive".into());
                }
                if mr.lat_terms.is_empty() || mr.lng_terms.is_empty() {
                    return Err("latitude and longitude polynomials are required".into());
                }
                if mr.term_count() > MULREG_MAX_TERMS {
                    return Err(format!("more than {MULREG_MAX_TERMS} polynomial terms"));
                }
                if mr
                    .lat_terms
                    .iter()
                    .chain(&mr.lng_terms)
                    .chain(&mr.hgt_terms)
                    .any(|t| t.u_pow < 0 || t.v_pow < 0 || t.u_pow > 9 || t.v_pow > 9)
                {
                    return Err("polynomial powers must be within 0..=9".into());
                }
                if self.range.is_unrestricted() {
                    return Err("a multiple regression needs a validity range".into());
                }
            }
            (GxParameters::GridFiles(files), GxMethod::GridFiles) => {
                if files.is_empty() {
                    return Err("no grid file referenced".into());
                }
                if files.len() > GRID_MAX_FILES {
                    return Err(format!("more than {GRID_MAX_FILES} grid files"));
                }
            }
            (_, method) => {
                return Err(format!("parameter block does not match method {method}"));
            }
        }
        if self.range.min_lng > self.range.max_lng || self.range.min_lat > self.range.max_lat {
            return Err("validity range is inverted".into());
        }
        if let Some(fb) = &self.fallback {
            if !fb.method.can_be_fallback() {
                return Err(format!("{} cannot be used as a fallback", fb.method));
            }
        }
        Ok(())
    }

    fn union_layout(method: GxMethod) -> Vec<FieldKind> {
        match method {
            GxMethod::MultipleRegression => {
                let mut layout = vec![
                    FieldKind::F64,
                    FieldKind::F64,
                    FieldKind::F64,
                    FieldKind::I16,
                    FieldKind::I16,
                    FieldKind::I16,
                    FieldKind::I16,
                ];
                for _ in 0..MULREG_MAX_TERMS {
                    layout.extend([FieldKind::I16, FieldKind::I16, FieldKind::F64]);
                }
                layout
            }
            GxMethod::GridFiles => {
                let mut layout = vec![FieldKind::I16, FieldKind::Chars(6)];
                for _ in 0..GRID_MAX_FILES {
                    layout.extend([
                        FieldKind::I16,
                        FieldKind::I16,
                        FieldKind::Chars(GRID_PATH_LEN),
                    ]);
                }
                layout
            }
            _ => vec![FieldKind::Doubles(7), FieldKind::Chars(GX_UNION_LEN - 56)],
        }
    }

    fn full_layout(method: GxMethod) -> Vec<FieldKind> {
        let mut layout = GX_HEADER.to_vec();
        layout.extend(Self::union_layout(method));
        layout.push(FieldKind::Chars(FILL_LEN));
        layout
    }

    fn method_from_raw(bytes: &[u8], order: ByteOrder) -> Result<GxMethod, GeoframeError> {
        let raw: [u8; 2] = bytes
            .get(METHOD_OFFSET..METHOD_OFFSET + 2)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| GeoframeError::format("truncated geodetic transformation record"))?;
        let code = match order {
            ByteOrder::Little => i16::from_le_bytes(raw),
            ByteOrder::Big => i16::from_be_bytes(raw),
        };
        GxMethod::from_code(code)
            .ok_or_else(|| GeoframeError::format(format!("unknown transformation method code {code}")))
    }

    fn decode_current(bytes: &[u8]) -> Result<Self, GeoframeError> {
        let mut r = RecordReader::new(bytes, "geodetic transformation");
        let key_nm = r.chars(GX_NAME_LEN)?;
        let src_dt_knm = r.chars(KEY_NAME_LEN)?;
        let trg_dt_knm = r.chars(KEY_NAME_LEN)?;
        let group = r.chars(KEY_NAME_LEN)?;
        let desc_nm = r.chars(DESC_LEN)?;
        let source = r.chars(DESC_LEN)?;
        let epsg = r.i32()?;
        let method_code = r.i16()?;
        let reversible = r.i16()? != 0;
        let max_itr = r.i16()?;
        let protect = r.i16()?;
        let fallback_code = r.i16()?;
        let accuracy = r.f64()?;
        let cnvrg_val = r.f64()?;
        let error_val = r.f64()?;
        let [min_lng, min_lat, max_lng, max_lat] = r.doubles::<4>()?;
        let fallback_params = r.doubles::<7>()?;

        let method = GxMethod::from_code(method_code).ok_or_else(|| {
            GeoframeError::format(format!("unknown transformation method code {method_code}"))
        })?;
        let fallback = match fallback_code {
            0 => None,
            code => Some(GxFallback {
                method: GxMethod::from_code(code).ok_or_else(|| {
                    GeoframeError::format(format!("unknown fallback method code {code}"))
                })?,
                params: GeocentricParams::from_array(fallback_params),
            }),
        };

        let params = match method {
            GxMethod::MultipleRegression => {
                let lat_off = r.f64()?;
                let lng_off = r.f64()?;
                let kk = r.f64()?;
                let counts = [r.i16()?, r.i16()?, r.i16()?];
                r.i16()?;
                let mut terms = Vec::with_capacity(MULREG_MAX_TERMS);
                for _ in 0..MULREG_MAX_TERMS {
                    terms.push(MulRegTerm {
                        u_pow: r.i16()?,
                        v_pow: r.i16()?,
                        coef: r.f64()?,
                    });
                }
                let [n_lat, n_lng, n_hgt] = counts.map(|c| c.max(0) as usize);
                if n_lat + n_lng + n_hgt > MULREG_MAX_TERMS {
                    return Err(GeoframeError::format(format!(
                        "'{key_nm}' declares more than {MULREG_MAX_TERMS} regression terms"
                    )));
                }
                let mut it = terms.into_iter();
                GxParameters::MultipleRegression(MulRegParams {
                    lat_off,
                    lng_off,
                    kk,
                    lat_terms: it.by_ref().take(n_lat).collect(),
                    lng_terms: it.by_ref().take(n_lng).collect(),
                    hgt_terms: it.by_ref().take(n_hgt).collect(),
                })
            }
            GxMethod::GridFiles => {
                let count = r.i16()?.max(0) as usize;
                r.bytes(6)?;
                let mut files = Vec::new();
                for idx in 0..GRID_MAX_FILES {
                    let format = r.i16()?;
                    let direction = r.i16()?;
                    let path = r.chars(GRID_PATH_LEN)?;
                    if idx < count {
                        files.push(GridFileRef {
                            format: GridFormat::from_code(format).ok_or_else(|| {
                                GeoframeError::format(format!("unknown grid format code {format}"))
                            })?,
                            direction: if direction != 0 {
                                GridDirection::Inverse
                            } else {
                                GridDirection::Forward
                            },
                            path,
                        });
                    }
                }
                GxParameters::GridFiles(files)
            }
            _ => {
                let block = r.doubles::<7>()?;
                r.bytes(GX_UNION_LEN - 56)?;
                GxParameters::Geocentric(GeocentricParams::from_array(block))
            }
        };
        r.bytes(FILL_LEN)?;
        r.finish()?;

        Ok(GxTransformDef {
            key_nm,
            src_dt_knm,
            trg_dt_knm,
            group,
            desc_nm,
            source,
            epsg,
            method,
            reversible,
            max_itr,
            protect,
            accuracy,
            cnvrg_val,
            error_val,
            range: GxRange {
                min_lng,
                min_lat,
                max_lng,
                max_lat,
            },
            fallback,
            params,
        })
    }
}

impl DictRecord for GxTransformDef {
    const KIND: DictKind = DictKind::GeodeticTransform;

    fn key_name(&self) -> &str {
        &self.key_nm
    }

    fn group(&self) -> &str {
        &self.group
    }

    fn protect(&self) -> i16 {
        self.protect
    }

    /// Base layout: the union is seen as an opaque block.
    fn layout(level: u8) -> Result<Cow<'static, [FieldKind]>, GeoframeError> {
        if level != 8 {
            return Err(unsupported_level(DictKind::GeodeticTransform, level));
        }
        let mut layout = GX_HEADER.to_vec();
        layout.push(FieldKind::Chars(GX_UNION_LEN));
        layout.push(FieldKind::Chars(FILL_LEN));
        Ok(Cow::Owned(layout))
    }

    fn refine_layout(
        level: u8,
        bytes: &[u8],
        order: ByteOrder,
    ) -> Result<Cow<'static, [FieldKind]>, GeoframeError> {
        if level != 8 {
            return Err(unsupported_level(DictKind::GeodeticTransform, level));
        }
        Ok(Cow::Owned(Self::full_layout(Self::method_from_raw(bytes, order)?)))
    }

    fn encode(&self) -> Vec<u8> {
        let mut w = RecordWriter::with_capacity(1920);
        let (fallback_code, fallback_params) = match &self.fallback {
            Some(fb) => (fb.method.code(), fb.params.to_array()),
            None => (0, [0.0; 7]),
        };
        w.chars(&self.key_nm, GX_NAME_LEN)
            .chars(&self.src_dt_knm, KEY_NAME_LEN)
            .chars(&self.trg_dt_knm, KEY_NAME_LEN)
            .chars(&self.group, KEY_NAME_LEN)
            .chars(&self.desc_nm, DESC_LEN)
            .chars(&self.source, DESC_LEN)
            .i32(self.epsg)
            .i16(self.method.code())
            .i16(self.reversible as i16)
            .i16(self.max_itr)
            .i16(self.protect)
            .i16(fallback_code)
            .f64(self.accuracy)
            .f64(self.cnvrg_val)
            .f64(self.error_val)
            .doubles(&[
                self.range.min_lng,
                self.range.min_lat,
                self.range.max_lng,
                self.range.max_lat,
            ])
            .doubles(&fallback_params);

        let union_start = w.len();
        match &self.params {
            GxParameters::MultipleRegression(mr) => {
                w.f64(mr.lat_off)
                    .f64(mr.lng_off)
                    .f64(mr.kk)
                    .i16(mr.lat_terms.len() as i16)
                    .i16(mr.lng_terms.len() as i16)
                    .i16(mr.hgt_terms.len() as i16)
                    .i16(0);
                let terms = mr.lat_terms.iter().chain(&mr.lng_terms).chain(&mr.hgt_terms);
                for term in terms.take(MULREG_MAX_TERMS) {
                    w.i16(term.u_pow).i16(term.v_pow).f64(term.coef);
                }
            }
            GxParameters::GridFiles(files) => {
                w.i16(files.len().min(GRID_MAX_FILES) as i16).zeros(6);
                for file in files.iter().take(GRID_MAX_FILES) {
                    let direction = match file.direction {
                        GridDirection::Forward => 0,
                        GridDirection::Inverse => 1,
                    };
                    w.i16(file.format.code())
                        .i16(direction)
                        .chars(&file.path, GRID_PATH_LEN);
                }
            }
            GxParameters::Geocentric(block) => {
                w.doubles(&block.to_array());
            }
        }
        let used = w.len() - union_start;
        w.zeros(GX_UNION_LEN.saturating_sub(used)).zeros(FILL_LEN);
        w.into_bytes()
    }

    fn decode_level(level: u8, bytes: &[u8]) -> Result<Self, GeoframeError> {
        if level != 8 {
            return Err(unsupported_level(DictKind::GeodeticTransform, level));
        }
        let def = Self::decode_current(bytes)?;
        validate_migrated_name(DictKind::GeodeticTransform, &def.key_nm)?;
        Ok(def)
    }
}

#[cfg(test)]
pub(crate) mod test_gx_def {
    use super::*;
    use crate::codec::{decode_record, encode_record, layout_size, ByteOrder, Obfuscation};

    pub(crate) fn mulreg_def() -> GxTransformDef {
        let params = MulRegParams {
            lat_off: 45.0,
            lng_off: -75.0,
            kk: 0.05,
            lat_terms: vec![
                MulRegTerm { u_pow: 0, v_pow: 0, coef: 0.25 },
                MulRegTerm { u_pow: 1, v_pow: 0, coef: 0.01 },
            ],
            lng_terms: vec![MulRegTerm { u_pow: 0, v_pow: 0, coef: -0.4 }],
            hgt_terms: vec![],
        };
        let mut def = GxTransformDef::new(
            "TEST_MREG",
            "TESTDATUM",
            "WGS84",
            GxMethod::MultipleRegression,
            GxParameters::MultipleRegression(params),
        );
        def.range = GxRange {
            min_lng: -80.0,
            min_lat: 40.0,
            max_lng: -70.0,
            max_lat: 50.0,
        };
        def.max_itr = 10;
        def.cnvrg_val = 1e-9;
        def.error_val = 5e-7;
        def.fallback = Some(GxFallback {
            method: GxMethod::Molodensky,
            params: GeocentricParams::translation(-8.0, 160.0, 176.0),
        });
        def
    }

    fn grid_def() -> GxTransformDef {
        GxTransformDef::new(
            "NAD27_to_NAD83",
            "NAD27",
            "NAD83",
            GxMethod::GridFiles,
            GxParameters::GridFiles(vec![GridFileRef {
                format: GridFormat::Ntv2,
                direction: GridDirection::Forward,
                path: "./Canada/Ntv2_0.gsb".into(),
            }]),
        )
    }

    #[test]
    fn test_union_layouts_have_fixed_size() {
        for method in [
            GxMethod::Null,
            GxMethod::BursaWolf,
            GxMethod::MultipleRegression,
            GxMethod::GridFiles,
        ] {
            assert_eq!(
                layout_size(&GxTransformDef::union_layout(method)),
                GX_UNION_LEN,
                "{method}"
            );
        }
        let base = GxTransformDef::layout(8).unwrap();
        assert_eq!(mulreg_def().encode().len(), layout_size(&base));
        assert_eq!(grid_def().encode().len(), layout_size(&base));
    }

    #[test]
    fn test_round_trip_every_union() {
        let mut seven = GxTransformDef::new(
            "ED50_to_WGS84",
            "ED50",
            "WGS84",
            GxMethod::SevenParameter,
            GxParameters::Geocentric(GeocentricParams {
                delta: [-89.5, -93.8, -123.1],
                rotation: [0.0, 0.0, 0.156],
                scale: 1.2,
            }),
        );
        seven.epsg = 1133;
        for def in [mulreg_def(), grid_def(), seven] {
            for order in [ByteOrder::Little, ByteOrder::Big] {
                for obf in [Obfuscation::Plain, Obfuscation::Key(0x5A)] {
                    let bytes = encode_record(&def, order, obf).unwrap();
                    let back: GxTransformDef = decode_record(&bytes, 8, order).unwrap();
                    assert_eq!(back, def, "{} {order:?} {obf:?}", def.key_nm);
                }
            }
        }
    }

    #[test]
    fn test_invariants() {
        assert!(mulreg_def().check_invariants().is_ok());
        let mut empty = grid_def();
        empty.params = GxParameters::GridFiles(vec![]);
        assert!(empty.check_invariants().is_err());
        let mut unbounded = mulreg_def();
        unbounded.range = GxRange::default();
        assert!(unbounded.check_invariants().is_err());
        let mut mismatch = grid_def();
        mismatch.method = GxMethod::MultipleRegression;
        assert!(mismatch.check_invariants().is_err());
    }

    #[test]
    fn test_extension_detection() {
        assert_eq!(GridFormat::from_extension("a/b/NTV2_0.GSB"), Some(GridFormat::Ntv2));
        assert_eq!(GridFormat::from_extension("conus.las"), Some(GridFormat::Nadcon));
        assert_eq!(GridFormat::from_extension("x.txt"), None);
    }
}
