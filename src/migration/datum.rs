//! Datum record levels 5 to 8.
//!
//! * 5 → 6: group, location and country/state fields appear (zero-filled).
//! * 6 → 7: EPSG code appears; seven-parameter rotations were stored with the
//!   opposite sign convention before this release and are negated.
//! * 7 → 8: WKT flavour appears; parameters the method does not use are zeroed.

use crate::{
    codec::{FieldKind, RecordReader},
    constants::{CNTRY_ST_LEN, DESC_LEN, KEY_NAME_LEN},
    dictionary::{
        datum_def::{DatumDef, To84Via, DATUM_LAYOUT_08},
        unsupported_level, DictKind,
    },
    geoframe_errors::GeoframeError,
};

use super::validate_migrated_name;

const DATUM_LAYOUT_05: &[FieldKind] = &[
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Doubles(7),
    FieldKind::Chars(DESC_LEN),
    FieldKind::Chars(DESC_LEN),
    FieldKind::I16,
    FieldKind::I16,
    FieldKind::Chars(4),
];

const DATUM_LAYOUT_06: &[FieldKind] = &[
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(CNTRY_ST_LEN),
    FieldKind::Doubles(7),
    FieldKind::Chars(DESC_LEN),
    FieldKind::Chars(DESC_LEN),
    FieldKind::I16,
    FieldKind::I16,
    FieldKind::Chars(4),
];

const DATUM_LAYOUT_07: &[FieldKind] = &[
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(CNTRY_ST_LEN),
    FieldKind::Doubles(7),
    FieldKind::Chars(DESC_LEN),
    FieldKind::Chars(DESC_LEN),
    FieldKind::I16,
    FieldKind::I16,
    FieldKind::I32,
    FieldKind::Chars(8),
];

pub fn layout(level: u8) -> Result<&'static [FieldKind], GeoframeError> {
    match level {
        5 => Ok(DATUM_LAYOUT_05),
        6 => Ok(DATUM_LAYOUT_06),
        7 => Ok(DATUM_LAYOUT_07),
        8 => Ok(DATUM_LAYOUT_08),
        _ => Err(unsupported_level(DictKind::Datum, level)),
    }
}

/// Fields shared by every level.
#[derive(Debug, Clone, PartialEq)]
pub struct DatumCore {
    pub key_nm: String,
    pub ell_knm: String,
    pub params: [f64; 7],
    pub desc_nm: String,
    pub source: String,
    pub protect: i16,
    pub to84_via: i16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatumL5 {
    pub core: DatumCore,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatumL6 {
    pub core: DatumCore,
    pub group: String,
    pub locatn: String,
    pub cntry_st: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatumL7 {
    pub l6: DatumL6,
    pub epsg: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DatumRecord {
    L5(DatumL5),
    L6(DatumL6),
    L7(DatumL7),
    L8(DatumDef),
}

fn read_tail(r: &mut RecordReader) -> Result<(String, String, i16, i16), GeoframeError> {
    Ok((r.chars(DESC_LEN)?, r.chars(DESC_LEN)?, r.i16()?, r.i16()?))
}

fn read_l6(r: &mut RecordReader) -> Result<DatumL6, GeoframeError> {
    let key_nm = r.chars(KEY_NAME_LEN)?;
    let ell_knm = r.chars(KEY_NAME_LEN)?;
    let group = r.chars(KEY_NAME_LEN)?;
    let locatn = r.chars(KEY_NAME_LEN)?;
    let cntry_st = r.chars(CNTRY_ST_LEN)?;
    let params = r.doubles::<7>()?;
    let (desc_nm, source, protect, to84_via) = read_tail(r)?;
    Ok(DatumL6 {
        core: DatumCore {
            key_nm,
            ell_knm,
            params,
            desc_nm,
            source,
            protect,
            to84_via,
        },
        group,
        locatn,
        cntry_st,
    })
}

impl DatumRecord {
    pub fn decode(level: u8, bytes: &[u8]) -> Result<Self, GeoframeError> {
        match level {
            5 => {
                let mut r = RecordReader::new(bytes, "level 5 datum");
                let key_nm = r.chars(KEY_NAME_LEN)?;
                let ell_knm = r.chars(KEY_NAME_LEN)?;
                let params = r.doubles::<7>()?;
                let (desc_nm, source, protect, to84_via) = read_tail(&mut r)?;
                r.bytes(4)?;
                r.finish()?;
                Ok(DatumRecord::L5(DatumL5 {
                    core: DatumCore {
                        key_nm,
                        ell_knm,
                        params,
                        desc_nm,
                        source,
                        protect,
                        to84_via,
                    },
                }))
            }
            6 => {
                let mut r = RecordReader::new(bytes, "level 6 datum");
                let rec = read_l6(&mut r)?;
                r.bytes(4)?;
                r.finish()?;
                Ok(DatumRecord::L6(rec))
            }
            7 => {
                let mut r = RecordReader::new(bytes, "level 7 datum");
                let l6 = read_l6(&mut r)?;
                let epsg = r.i32()?;
                r.bytes(8)?;
                r.finish()?;
                Ok(DatumRecord::L7(DatumL7 { l6, epsg }))
            }
            8 => Ok(DatumRecord::L8(DatumDef::decode_current(bytes)?)),
            _ => Err(unsupported_level(DictKind::Datum, level)),
        }
    }

    pub fn key_name(&self) -> &str {
        match self {
            DatumRecord::L5(r) => &r.core.key_nm,
            DatumRecord::L6(r) => &r.core.key_nm,
            DatumRecord::L7(r) => &r.l6.core.key_nm,
            DatumRecord::L8(r) => &r.key_nm,
        }
    }

    pub fn upgrade(self) -> Result<Self, GeoframeError> {
        Ok(match self {
            DatumRecord::L5(rec) => DatumRecord::L6(upgrade_5_to_6(rec)),
            DatumRecord::L6(rec) => DatumRecord::L7(upgrade_6_to_7(rec)),
            DatumRecord::L7(rec) => DatumRecord::L8(upgrade_7_to_8(rec)?),
            current @ DatumRecord::L8(_) => current,
        })
    }
}

fn upgrade_5_to_6(rec: DatumL5) -> DatumL6 {
    DatumL6 {
        core: rec.core,
        group: String::new(),
        locatn: String::new(),
        cntry_st: String::new(),
    }
}

fn upgrade_6_to_7(mut rec: DatumL6) -> DatumL7 {
    if rec.core.to84_via == To84Via::SevenParameter.code() {
        for rot in &mut rec.core.params[3..6] {
            *rot = -*rot;
        }
    }
    DatumL7 { l6: rec, epsg: 0 }
}

fn upgrade_7_to_8(rec: DatumL7) -> Result<DatumDef, GeoframeError> {
    let DatumL7 { l6, epsg } = rec;
    let core = l6.core;
    let to84_via = To84Via::from_code(core.to84_via).ok_or_else(|| {
        GeoframeError::format(format!(
            "datum '{}' has unknown to84_via code {}",
            core.key_nm, core.to84_via
        ))
    })?;
    let p = core.params;
    let mut def = DatumDef {
        key_nm: core.key_nm,
        ell_knm: core.ell_knm,
        group: l6.group,
        locatn: l6.locatn,
        cntry_st: l6.cntry_st,
        delta: [p[0], p[1], p[2]],
        rotation: [p[3], p[4], p[5]],
        bwscale: p[6],
        desc_nm: core.desc_nm,
        source: core.source,
        protect: core.protect,
        to84_via,
        epsg,
        wkt_flvr: 0,
    };
    def.clear_unused_parameters();
    Ok(def)
}

pub fn decode_and_migrate(level: u8, bytes: &[u8]) -> Result<DatumDef, GeoframeError> {
    let mut rec = DatumRecord::decode(level, bytes)?;
    loop {
        match rec {
            DatumRecord::L8(def) => return Ok(def),
            older => {
                rec = older.upgrade()?;
                validate_migrated_name(DictKind::Datum, rec.key_name())?;
            }
        }
    }
}
