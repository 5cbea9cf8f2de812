//! Ellipsoid record levels 5, 7 and 8. Level-6 files reuse the level-5 shape.

use crate::{
    codec::{FieldKind, RecordReader},
    constants::{DESC_LEN, KEY_NAME_LEN},
    dictionary::{ellipsoid_def::{EllipsoidDef, ELLIPSOID_LAYOUT_08}, unsupported_level, DictKind},
    geoframe_errors::GeoframeError,
};

use super::validate_migrated_name;

const ELLIPSOID_LAYOUT_05: &[FieldKind] = &[
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Doubles(4),
    FieldKind::Chars(DESC_LEN),
    FieldKind::Chars(DESC_LEN),
    FieldKind::I16,
    FieldKind::Chars(6),
];

const ELLIPSOID_LAYOUT_07: &[FieldKind] = &[
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Doubles(4),
    FieldKind::Chars(DESC_LEN),
    FieldKind::Chars(DESC_LEN),
    FieldKind::I16, // protect
    FieldKind::I16, // epsg
    FieldKind::I16, // wkt_flvr
    FieldKind::Chars(6),
];

pub fn layout(level: u8) -> Result<&'static [FieldKind], GeoframeError> {
    match level {
        5 | 6 => Ok(ELLIPSOID_LAYOUT_05),
        7 => Ok(ELLIPSOID_LAYOUT_07),
        8 => Ok(ELLIPSOID_LAYOUT_08),
        _ => Err(unsupported_level(DictKind::Ellipsoid, level)),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EllipsoidL5 {
    pub key_nm: String,
    pub group: String,
    pub e_rad: f64,
    pub p_rad: f64,
    pub flat: f64,
    pub ecent: f64,
    pub desc_nm: String,
    pub source: String,
    pub protect: i16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EllipsoidL7 {
    pub base: EllipsoidL5,
    pub epsg: i16,
    pub wkt_flvr: i16,
}

/// An ellipsoid record as it was read, tagged with its level.
#[derive(Debug, Clone, PartialEq)]
pub enum EllipsoidRecord {
    L5(EllipsoidL5),
    L7(EllipsoidL7),
    L8(EllipsoidDef),
}

fn read_l5_prefix(r: &mut RecordReader) -> Result<EllipsoidL5, GeoframeError> {
    let key_nm = r.chars(KEY_NAME_LEN)?;
    let group = r.chars(KEY_NAME_LEN)?;
    let [e_rad, p_rad, flat, ecent] = r.doubles::<4>()?;
    Ok(EllipsoidL5 {
        key_nm,
        group,
        e_rad,
        p_rad,
        flat,
        ecent,
        desc_nm: r.chars(DESC_LEN)?,
        source: r.chars(DESC_LEN)?,
        protect: r.i16()?,
    })
}

impl EllipsoidRecord {
    pub fn decode(level: u8, bytes: &[u8]) -> Result<Self, GeoframeError> {
        match level {
            5 | 6 => {
                let mut r = RecordReader::new(bytes, "level 5 ellipsoid");
                let rec = read_l5_prefix(&mut r)?;
                r.bytes(6)?;
                r.finish()?;
                Ok(EllipsoidRecord::L5(rec))
            }
            7 => {
                let mut r = RecordReader::new(bytes, "level 7 ellipsoid");
                let base = read_l5_prefix(&mut r)?;
                let epsg = r.i16()?;
                let wkt_flvr = r.i16()?;
                r.bytes(6)?;
                r.finish()?;
                Ok(EllipsoidRecord::L7(EllipsoidL7 {
                    base,
                    epsg,
                    wkt_flvr,
                }))
            }
            8 => Ok(EllipsoidRecord::L8(EllipsoidDef::decode_current(bytes)?)),
            _ => Err(unsupported_level(DictKind::Ellipsoid, level)),
        }
    }

    pub fn key_name(&self) -> &str {
        match self {
            EllipsoidRecord::L5(r) => &r.key_nm,
            EllipsoidRecord::L7(r) => &r.base.key_nm,
            EllipsoidRecord::L8(r) => &r.key_nm,
        }
    }

    /// Advance the record by one level.
    pub fn upgrade(self) -> Self {
        match self {
            EllipsoidRecord::L5(rec) => EllipsoidRecord::L7(upgrade_5_to_7(rec)),
            EllipsoidRecord::L7(rec) => EllipsoidRecord::L8(upgrade_7_to_8(rec)),
            current @ EllipsoidRecord::L8(_) => current,
        }
    }
}

/// Level-5 dictionaries did not always carry a consistent flattening and
/// eccentricity; both are re-derived from the radii.
fn upgrade_5_to_7(mut rec: EllipsoidL5) -> EllipsoidL7 {
    if rec.e_rad > 0.0 && rec.p_rad > 0.0 {
        rec.flat = 1.0 - rec.p_rad / rec.e_rad;
        rec.ecent = (rec.flat * (2.0 - rec.flat)).max(0.0).sqrt();
    }
    EllipsoidL7 {
        base: rec,
        epsg: 0,
        wkt_flvr: 0,
    }
}

fn upgrade_7_to_8(rec: EllipsoidL7) -> EllipsoidDef {
    let b = rec.base;
    EllipsoidDef {
        key_nm: b.key_nm,
        group: b.group,
        e_rad: b.e_rad,
        p_rad: b.p_rad,
        flat: b.flat,
        ecent: b.ecent,
        desc_nm: b.desc_nm,
        source: b.source,
        protect: b.protect,
        wkt_flvr: rec.wkt_flvr,
        epsg: rec.epsg as i32,
        created: 0,
    }
}

pub fn decode_and_migrate(level: u8, bytes: &[u8]) -> Result<EllipsoidDef, GeoframeError> {
    let mut rec = EllipsoidRecord::decode(level, bytes)?;
    loop {
        match rec {
            EllipsoidRecord::L8(def) => return Ok(def),
            older => {
                rec = older.upgrade();
                validate_migrated_name(DictKind::Ellipsoid, rec.key_name())?;
            }
        }
    }
}
