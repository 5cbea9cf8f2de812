//! Datum definitions (`Datums.CSD`).

use std::{borrow::Cow, fmt, str::FromStr};

use crate::{
    codec::{FieldKind, RecordReader, RecordWriter},
    constants::{ArcSec, Meter, Ppm, CNTRY_ST_LEN, DESC_LEN, KEY_NAME_LEN},
    dictionary::{DictKind, DictRecord},
    geoframe_errors::GeoframeError,
    migration,
};

/// Current (level 8) datum record layout.
pub const DATUM_LAYOUT_08: &[FieldKind] = &[
    FieldKind::Chars(KEY_NAME_LEN), // key_nm
    FieldKind::Chars(KEY_NAME_LEN), // ell_knm
    FieldKind::Chars(KEY_NAME_LEN), // group
    FieldKind::Chars(KEY_NAME_LEN), // locatn
    FieldKind::Chars(CNTRY_ST_LEN), // cntry_st
    FieldKind::Doubles(3),          // delta_x/y/z
    FieldKind::Doubles(3),          // rot_x/y/z
    FieldKind::F64,                 // bwscale
    FieldKind::Chars(DESC_LEN),     // desc_nm
    FieldKind::Chars(DESC_LEN),     // source
    FieldKind::I16,                 // protect
    FieldKind::I16,                 // to84_via
    FieldKind::I32,                 // epsg
    FieldKind::I16,                 // wkt_flvr
    FieldKind::Chars(6),            // fill
];

/// How a datum converts to WGS84.
///
/// The numeric codes are the on-disk values of the `to84_via` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum To84Via {
    #[default]
    None,
    Molodensky,
    MultipleRegression,
    BursaWolf,
    GridFiles,
    /// The datum is WGS84 for all practical purposes (NAD83, GDA94, ETRF89…).
    Wgs84Equivalent,
    SevenParameter,
    SixParameter,
    FourParameter,
    ThreeParameter,
}

impl To84Via {
    pub fn code(self) -> i16 {
        match self {
            To84Via::None => 0,
            To84Via::Molodensky => 1,
            To84Via::MultipleRegression => 2,
            To84Via::BursaWolf => 3,
            To84Via::GridFiles => 4,
            To84Via::Wgs84Equivalent => 5,
            To84Via::SevenParameter => 6,
            To84Via::SixParameter => 7,
            To84Via::FourParameter => 8,
            To84Via::ThreeParameter => 9,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        Some(match code {
            0 => To84Via::None,
            1 => To84Via::Molodensky,
            2 => To84Via::MultipleRegression,
            3 => To84Via::BursaWolf,
            4 => To84Via::GridFiles,
            5 => To84Via::Wgs84Equivalent,
            6 => To84Via::SevenParameter,
            7 => To84Via::SixParameter,
            8 => To84Via::FourParameter,
            9 => To84Via::ThreeParameter,
            _ => return None,
        })
    }

    /// Which parameter groups the method consumes: `(translation, rotation, scale)`.
    pub fn parameter_usage(self) -> (bool, bool, bool) {
        match self {
            To84Via::Molodensky | To84Via::ThreeParameter => (true, false, false),
            To84Via::FourParameter => (true, false, true),
            To84Via::SixParameter => (true, true, false),
            To84Via::BursaWolf | To84Via::SevenParameter => (true, true, true),
            To84Via::None
            | To84Via::MultipleRegression
            | To84Via::GridFiles
            | To84Via::Wgs84Equivalent => (false, false, false),
        }
    }

    /// Methods whose parameters live in a geodetic transformation record.
    pub fn needs_transform_record(self) -> bool {
        matches!(self, To84Via::MultipleRegression | To84Via::GridFiles)
    }

    pub fn name(self) -> &'static str {
        match self {
            To84Via::None => "NONE",
            To84Via::Molodensky => "MOLODENSKY",
            To84Via::MultipleRegression => "MREG",
            To84Via::BursaWolf => "BURSAWOLF",
            To84Via::GridFiles => "GRID",
            To84Via::Wgs84Equivalent => "WGS84",
            To84Via::SevenParameter => "7PARAMETER",
            To84Via::SixParameter => "6PARAMETER",
            To84Via::FourParameter => "4PARAMETER",
            To84Via::ThreeParameter => "3PARAMETER",
        }
    }
}

impl fmt::Display for To84Via {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for To84Via {
    type Err = GeoframeError;

    /// Parse the `USE:` keyword value of the datum compiler. Historical
    /// method names are accepted as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let up = s.trim().to_ascii_uppercase();
        Ok(match up.as_str() {
            "MOLODENSKY" => To84Via::Molodensky,
            "MREG" | "MULREG" => To84Via::MultipleRegression,
            "BURSAWOLF" | "BURSA" => To84Via::BursaWolf,
            "GRID" | "GRID_FILE" | "NAD27" | "HPGN" | "AGD66" | "AGD84" | "NZGD4K" | "ATS77"
            | "TOKYO" | "RGF93" | "ED50" | "DHDN" => To84Via::GridFiles,
            "WGS84" | "NAD83" | "GDA94" | "NZGD2K" | "ETRF89" | "CSRS" | "NULL" => {
                To84Via::Wgs84Equivalent
            }
            "7PARAMETER" | "7PARM" => To84Via::SevenParameter,
            "6PARAMETER" | "6PARM" => To84Via::SixParameter,
            "4PARAMETER" | "4PARM" => To84Via::FourParameter,
            "3PARAMETER" | "3PARM" | "GEOCENTRIC" => To84Via::ThreeParameter,
            _ => return Err(GeoframeError::UnknownMethod(s.trim().to_string())),
        })
    }
}

/// Geodetic datum definition.
///
/// Translations are in meters, rotations in arc-seconds, `bwscale` in parts
/// per million. Rotations follow the position-vector convention except for
/// [`To84Via::SevenParameter`], which uses the coordinate-frame convention.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatumDef {
    pub key_nm: String,
    pub ell_knm: String,
    pub group: String,
    pub locatn: String,
    pub cntry_st: String,
    pub delta: [Meter; 3],
    pub rotation: [ArcSec; 3],
    pub bwscale: Ppm,
    pub desc_nm: String,
    pub source: String,
    pub protect: i16,
    pub to84_via: To84Via,
    pub epsg: i32,
    pub wkt_flvr: i16,
}

impl DatumDef {
    pub fn new(key_nm: &str, ell_knm: &str, to84_via: To84Via) -> Self {
        DatumDef {
            key_nm: key_nm.to_string(),
            ell_knm: ell_knm.to_string(),
            to84_via,
            ..Default::default()
        }
    }

    /// Zero the parameters the `to84_via` method does not consume.
    pub fn clear_unused_parameters(&mut self) {
        let (translation, rotation, scale) = self.to84_via.parameter_usage();
        if !translation {
            self.delta = [0.0; 3];
        }
        if !rotation {
            self.rotation = [0.0; 3];
        }
        if !scale {
            self.bwscale = 0.0;
        }
    }

    pub(crate) fn decode_current(bytes: &[u8]) -> Result<Self, GeoframeError> {
        let mut r = RecordReader::new(bytes, "datum");
        let key_nm = r.chars(KEY_NAME_LEN)?;
        let ell_knm = r.chars(KEY_NAME_LEN)?;
        let group = r.chars(KEY_NAME_LEN)?;
        let locatn = r.chars(KEY_NAME_LEN)?;
        let cntry_st = r.chars(CNTRY_ST_LEN)?;
        let delta = r.doubles::<3>()?;
        let rotation = r.doubles::<3>()?;
        let bwscale = r.f64()?;
        let desc_nm = r.chars(DESC_LEN)?;
        let source = r.chars(DESC_LEN)?;
        let protect = r.i16()?;
        let via_code = r.i16()?;
        let epsg = r.i32()?;
        let wkt_flvr = r.i16()?;
        r.bytes(6)?;
        r.finish()?;
        let to84_via = To84Via::from_code(via_code).ok_or_else(|| {
            GeoframeError::format(format!("datum '{key_nm}' has unknown to84_via code {via_code}"))
        })?;
        Ok(DatumDef {
            key_nm,
            ell_knm,
            group,
            locatn,
            cntry_st,
            delta,
            rotation,
            bwscale,
            desc_nm,
            source,
            protect,
            to84_via,
            epsg,
            wkt_flvr,
        })
    }
}

impl DictRecord for DatumDef {
    const KIND: DictKind = DictKind::Datum;

    fn key_name(&self) -> &str {
        &self.key_nm
    }

    fn group(&self) -> &str {
        &self.group
    }

    fn protect(&self) -> i16 {
        self.protect
    }

    fn layout(level: u8) -> Result<Cow<'static, [FieldKind]>, GeoframeError> {
        migration::datum::layout(level).map(Cow::Borrowed)
    }

    fn encode(&self) -> Vec<u8> {
        let mut w = RecordWriter::with_capacity(344);
        w.chars(&self.key_nm, KEY_NAME_LEN)
            .chars(&self.ell_knm, KEY_NAME_LEN)
            .chars(&self.group, KEY_NAME_LEN)
            .chars(&self.locatn, KEY_NAME_LEN)
            .chars(&self.cntry_st, CNTRY_ST_LEN)
            .doubles(&self.delta)
            .doubles(&self.rotation)
            .f64(self.bwscale)
            .chars(&self.desc_nm, DESC_LEN)
            .chars(&self.source, DESC_LEN)
            .i16(self.protect)
            .i16(self.to84_via.code())
            .i32(self.epsg)
            .i16(self.wkt_flvr)
            .zeros(6);
        w.into_bytes()
    }

    fn decode_level(level: u8, bytes: &[u8]) -> Result<Self, GeoframeError> {
        migration::datum::decode_and_migrate(level, bytes)
    }
}

#[cfg(test)]
mod test_datum_def {
    use super::*;
    use crate::codec::{decode_record, encode_record, layout_size, ByteOrder, Obfuscation};

    pub(crate) fn sample_datum() -> DatumDef {
        let mut def = DatumDef::new("DHDN", "BESSEL", To84Via::SevenParameter);
        def.group = "EUROPE".into();
        def.locatn = "Germany".into();
        def.delta = [582.0, 105.0, 414.0];
        def.rotation = [1.04, 0.35, -3.08];
        def.bwscale = 8.3;
        def.desc_nm = "Deutsches Hauptdreiecksnetz".into();
        def.epsg = 6314;
        def.protect = 1;
        def
    }

    #[test]
    fn test_encode_matches_layout() {
        assert_eq!(sample_datum().encode().len(), layout_size(DATUM_LAYOUT_08));
    }

    #[test]
    fn test_codec_round_trip() {
        let def = sample_datum();
        for order in [ByteOrder::Little, ByteOrder::Big] {
            for obf in [Obfuscation::Plain, Obfuscation::Key(0x3C)] {
                let bytes = encode_record(&def, order, obf).unwrap();
                let back: DatumDef = decode_record(&bytes, 8, order).unwrap();
                assert_eq!(back, def);
            }
        }
    }

    #[test]
    fn test_method_names() {
        assert_eq!("molodensky".parse::<To84Via>().unwrap(), To84Via::Molodensky);
        assert_eq!("NAD83".parse::<To84Via>().unwrap(), To84Via::Wgs84Equivalent);
        assert_eq!("7PARM".parse::<To84Via>().unwrap(), To84Via::SevenParameter);
        assert!("TELEPORT".parse::<To84Via>().is_err());
        for code in 0..10 {
            assert_eq!(To84Via::from_code(code).unwrap().code(), code);
        }
    }

    #[test]
    fn test_clear_unused() {
        let mut def = sample_datum();
        def.to84_via = To84Via::Molodensky;
        def.clear_unused_parameters();
        assert_eq!(def.delta, [582.0, 105.0, 414.0]);
        assert_eq!(def.rotation, [0.0; 3]);
        assert_eq!(def.bwscale, 0.0);
    }
}
