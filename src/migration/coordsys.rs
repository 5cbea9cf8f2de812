//! Coordinate system record levels 5 to 8.
//!
//! * 5 → 6: group field appears. The azimuth (`-AZ`) and point (`-PT`)
//!   variants of `AZMEA`, `AZMED` and `OSTRO` are merged into the base
//!   projection; a point variant has its y-axis azimuth re-derived from the
//!   origin and the point. A zero quadrant becomes 1.
//! * 6 → 7: location, country/state, EPSG and SRID fields appear; legacy
//!   unit names are renamed.
//! * 7 → 8: EPSG quadrant and WKT flavour appear; parameter slots the
//!   projection does not use are zeroed.

use tracing::{debug, warn};

use crate::{
    codec::{FieldKind, RecordReader},
    constants::{CNTRY_ST_LEN, DESC_LEN, KEY_NAME_LEN, PRJ_PARAM_COUNT, UNIT_NAME_LEN},
    dictionary::{
        coordsys_def::{CoordSysBody, CoordSysDef, COORDSYS_LAYOUT_08},
        unsupported_level, DictKind,
    },
    geodesy::spherical_azimuth,
    geoframe_errors::GeoframeError,
    key_name::eq_key,
    projection::projection_by_key,
    units::legacy_unit_rename,
};

use super::validate_migrated_name;

const COORDSYS_BODY: [FieldKind; 9] = [
    FieldKind::Doubles(PRJ_PARAM_COUNT),
    FieldKind::Doubles(8),
    FieldKind::Doubles(2),
    FieldKind::Doubles(2),
    FieldKind::Doubles(2),
    FieldKind::Doubles(2),
    FieldKind::Doubles(2),
    FieldKind::Chars(DESC_LEN),
    FieldKind::Chars(DESC_LEN),
];

const COORDSYS_LAYOUT_05: &[FieldKind] = &[
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(UNIT_NAME_LEN),
    COORDSYS_BODY[0],
    COORDSYS_BODY[1],
    COORDSYS_BODY[2],
    COORDSYS_BODY[3],
    COORDSYS_BODY[4],
    COORDSYS_BODY[5],
    COORDSYS_BODY[6],
    COORDSYS_BODY[7],
    COORDSYS_BODY[8],
    FieldKind::I16,
    FieldKind::I16,
    FieldKind::Chars(8),
];

const COORDSYS_LAYOUT_06: &[FieldKind] = &[
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(UNIT_NAME_LEN),
    COORDSYS_BODY[0],
    COORDSYS_BODY[1],
    COORDSYS_BODY[2],
    COORDSYS_BODY[3],
    COORDSYS_BODY[4],
    COORDSYS_BODY[5],
    COORDSYS_BODY[6],
    COORDSYS_BODY[7],
    COORDSYS_BODY[8],
    FieldKind::I16,
    FieldKind::I16,
    FieldKind::Chars(8),
];

const COORDSYS_LAYOUT_07: &[FieldKind] = &[
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(KEY_NAME_LEN),
    FieldKind::Chars(CNTRY_ST_LEN),
    FieldKind::Chars(UNIT_NAME_LEN),
    COORDSYS_BODY[0],
    COORDSYS_BODY[1],
    COORDSYS_BODY[2],
    COORDSYS_BODY[3],
    COORDSYS_BODY[4],
    COORDSYS_BODY[5],
    COORDSYS_BODY[6],
    COORDSYS_BODY[7],
    COORDSYS_BODY[8],
    FieldKind::I16,
    FieldKind::I16,
    FieldKind::I32,
    FieldKind::I32,
    FieldKind::Chars(8),
];

pub fn layout(level: u8) -> Result<&'static [FieldKind], GeoframeError> {
    match level {
        5 => Ok(COORDSYS_LAYOUT_05),
        6 => Ok(COORDSYS_LAYOUT_06),
        7 => Ok(COORDSYS_LAYOUT_07),
        8 => Ok(COORDSYS_LAYOUT_08),
        _ => Err(unsupported_level(DictKind::CoordSys, level)),
    }
}

/// Level 5: no group, no location.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordSysL5 {
    pub key_nm: String,
    pub dat_knm: String,
    pub elp_knm: String,
    pub prj_knm: String,
    pub unit: String,
    pub(crate) body: CoordSysBody,
    pub quad: i16,
    pub protect: i16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoordSysL6 {
    pub l5: CoordSysL5,
    pub group: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoordSysL7 {
    pub l6: CoordSysL6,
    pub locatn: String,
    pub cntry_st: String,
    pub epsg: i32,
    pub srid: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CoordSysRecord {
    L5(CoordSysL5),
    L6(CoordSysL6),
    L7(CoordSysL7),
    L8(CoordSysDef),
}

impl CoordSysRecord {
    pub fn decode(level: u8, bytes: &[u8]) -> Result<Self, GeoframeError> {
        match level {
            5 => {
                let mut r = RecordReader::new(bytes, "level 5 coordinate system");
                let key_nm = r.chars(KEY_NAME_LEN)?;
                let dat_knm = r.chars(KEY_NAME_LEN)?;
                let elp_knm = r.chars(KEY_NAME_LEN)?;
                let prj_knm = r.chars(KEY_NAME_LEN)?;
                let unit = r.chars(UNIT_NAME_LEN)?;
                let body = CoordSysBody::read(&mut r)?;
                let quad = r.i16()?;
                let protect = r.i16()?;
                r.bytes(8)?;
                r.finish()?;
                Ok(CoordSysRecord::L5(CoordSysL5 {
                    key_nm,
                    dat_knm,
                    elp_knm,
                    prj_knm,
                    unit,
                    body,
                    quad,
                    protect,
                }))
            }
            6 => {
                let mut r = RecordReader::new(bytes, "level 6 coordinate system");
                let key_nm = r.chars(KEY_NAME_LEN)?;
                let dat_knm = r.chars(KEY_NAME_LEN)?;
                let elp_knm = r.chars(KEY_NAME_LEN)?;
                let prj_knm = r.chars(KEY_NAME_LEN)?;
                let group = r.chars(KEY_NAME_LEN)?;
                let unit = r.chars(UNIT_NAME_LEN)?;
                let body = CoordSysBody::read(&mut r)?;
                let quad = r.i16()?;
                let protect = r.i16()?;
                r.bytes(8)?;
                r.finish()?;
                Ok(CoordSysRecord::L6(CoordSysL6 {
                    l5: CoordSysL5 {
                        key_nm,
                        dat_knm,
                        elp_knm,
                        prj_knm,
                        unit,
                        body,
                        quad,
                        protect,
                    },
                    group,
                }))
            }
            7 => {
                let mut r = RecordReader::new(bytes, "level 7 coordinate system");
                let key_nm = r.chars(KEY_NAME_LEN)?;
                let dat_knm = r.chars(KEY_NAME_LEN)?;
                let elp_knm = r.chars(KEY_NAME_LEN)?;
                let prj_knm = r.chars(KEY_NAME_LEN)?;
                let group = r.chars(KEY_NAME_LEN)?;
                let locatn = r.chars(KEY_NAME_LEN)?;
                let cntry_st = r.chars(CNTRY_ST_LEN)?;
                let unit = r.chars(UNIT_NAME_LEN)?;
                let body = CoordSysBody::read(&mut r)?;
                let quad = r.i16()?;
                let protect = r.i16()?;
                let epsg = r.i32()?;
                let srid = r.i32()?;
                r.bytes(8)?;
                r.finish()?;
                Ok(CoordSysRecord::L7(CoordSysL7 {
                    l6: CoordSysL6 {
                        l5: CoordSysL5 {
                            key_nm,
                            dat_knm,
                            elp_knm,
                            prj_knm,
                            unit,
                            body,
                            quad,
                            protect,
                        },
                        group,
                    },
                    locatn,
                    cntry_st,
                    epsg,
                    srid,
                }))
            }
            8 => Ok(CoordSysRecord::L8(CoordSysDef::decode_current(bytes)?)),
            _ => Err(unsupported_level(DictKind::CoordSys, level)),
        }
    }

    pub fn key_name(&self) -> &str {
        match self {
            CoordSysRecord::L5(r) => &r.key_nm,
            CoordSysRecord::L6(r) => &r.l5.key_nm,
            CoordSysRecord::L7(r) => &r.l6.l5.key_nm,
            CoordSysRecord::L8(r) => &r.key_nm,
        }
    }

    pub fn upgrade(self) -> Self {
        match self {
            CoordSysRecord::L5(rec) => CoordSysRecord::L6(upgrade_5_to_6(rec)),
            CoordSysRecord::L6(rec) => CoordSysRecord::L7(upgrade_6_to_7(rec)),
            CoordSysRecord::L7(rec) => CoordSysRecord::L8(upgrade_7_to_8(rec)),
            current @ CoordSysRecord::L8(_) => current,
        }
    }
}

/// How a legacy projection variant located the y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LegacyVariant {
    Azimuth,
    Point,
}

const LEGACY_VARIANTS: &[(&str, &str, LegacyVariant)] = &[
    ("AZMEA-AZ", "AZMEA", LegacyVariant::Azimuth),
    ("AZMEA-PT", "AZMEA", LegacyVariant::Point),
    ("AZMED-AZ", "AZMED", LegacyVariant::Azimuth),
    ("AZMED-PT", "AZMED", LegacyVariant::Point),
    ("OSTRO-AZ", "OSTRO", LegacyVariant::Azimuth),
    ("OSTRO-PT", "OSTRO", LegacyVariant::Point),
];

fn upgrade_5_to_6(mut rec: CoordSysL5) -> CoordSysL6 {
    if let Some(&(old, base, variant)) = LEGACY_VARIANTS
        .iter()
        .find(|(old, _, _)| eq_key(old, &rec.prj_knm))
    {
        if variant == LegacyVariant::Point {
            let [org_lng, org_lat, ..] = rec.body.scalars;
            let (pt_lng, pt_lat) = (rec.body.prm[0], rec.body.prm[1]);
            rec.body.prm[0] = spherical_azimuth(org_lng, org_lat, pt_lng, pt_lat);
            rec.body.prm[1] = 0.0;
        }
        debug!(key = %rec.key_nm, old, base, "merged legacy projection variant");
        rec.prj_knm = base.to_string();
    }
    if rec.quad == 0 {
        rec.quad = 1;
    }
    CoordSysL6 {
        l5: rec,
        group: String::new(),
    }
}

fn upgrade_6_to_7(mut rec: CoordSysL6) -> CoordSysL7 {
    if let Some(new) = legacy_unit_rename(&rec.l5.unit) {
        rec.l5.unit = new.to_string();
    }
    CoordSysL7 {
        l6: rec,
        locatn: String::new(),
        cntry_st: String::new(),
        epsg: 0,
        srid: 0,
    }
}

fn upgrade_7_to_8(rec: CoordSysL7) -> CoordSysDef {
    let CoordSysL7 {
        l6,
        locatn,
        cntry_st,
        epsg,
        srid,
    } = rec;
    let CoordSysL6 { l5, group } = l6;
    let mut def = CoordSysDef {
        key_nm: l5.key_nm,
        dat_knm: l5.dat_knm,
        elp_knm: l5.elp_knm,
        prj_knm: l5.prj_knm,
        group,
        locatn,
        cntry_st,
        unit: l5.unit,
        quad: l5.quad,
        protect: l5.protect,
        epsg,
        srid,
        ..Default::default()
    };
    l5.body.apply(&mut def);
    match projection_by_key(&def.prj_knm) {
        Ok(info) => {
            for (slot, value) in def.prm.iter_mut().enumerate() {
                if !info.uses_slot(slot) {
                    *value = 0.0;
                }
            }
        }
        Err(_) => warn!(
            key = %def.key_nm,
            projection = %def.prj_knm,
            "unknown projection, parameters left as stored"
        ),
    }
    def
}

pub fn decode_and_migrate(level: u8, bytes: &[u8]) -> Result<CoordSysDef, GeoframeError> {
    let mut rec = CoordSysRecord::decode(level, bytes)?;
    loop {
        match rec {
            CoordSysRecord::L8(def) => return Ok(def),
            older => {
                rec = older.upgrade();
                validate_migrated_name(DictKind::CoordSys, rec.key_name())?;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_coordsys_migration {
    use super::*;
    use crate::codec::{layout_size, RecordWriter};
    use approx::assert_abs_diff_eq;

    /// Level 5 record writer used by the migration tests and the integration tests.
    pub(crate) fn level5_bytes(
        name: &str,
        prj: &str,
        unit: &str,
        prm: &[f64],
        org: (f64, f64),
        quad: i16,
    ) -> Vec<u8> {
        let mut params = [0.0; PRJ_PARAM_COUNT];
        params[..prm.len()].copy_from_slice(prm);
        let mut w = RecordWriter::default();
        w.chars(name, KEY_NAME_LEN)
            .chars("WGS84", KEY_NAME_LEN)
            .chars("", KEY_NAME_LEN)
            .chars(prj, KEY_NAME_LEN)
            .chars(unit, UNIT_NAME_LEN)
            .doubles(&params)
            .doubles(&[org.0, org.1, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0])
            .doubles(&[0.0; 10])
            .chars("legacy", DESC_LEN)
            .chars("", DESC_LEN)
            .i16(quad)
            .i16(1)
            .zeros(8);
        w.into_bytes()
    }

    #[test]
    fn test_layout_sizes() {
        assert_eq!(layout_size(COORDSYS_LAYOUT_05), 588);
        assert_eq!(layout_size(COORDSYS_LAYOUT_06), 612);
        assert_eq!(layout_size(COORDSYS_LAYOUT_07), 692);
    }

    #[test]
    fn test_point_variant_merged() {
        let bytes = level5_bytes("OLDAZ", "AZMEA-PT", "METRE", &[10.0, 45.0], (0.0, 45.0), 0);
        let def = decode_and_migrate(5, &bytes).unwrap();
        assert_eq!(def.prj_knm, "AZMEA");
        assert_eq!(def.unit, "METER");
        assert_eq!(def.quad, 1);
        let expected = spherical_azimuth(0.0, 45.0, 10.0, 45.0);
        assert_abs_diff_eq!(def.prm[0], expected, epsilon = 1e-12);
        assert_eq!(def.prm[1], 0.0);
    }

    #[test]
    fn test_azimuth_variant_keeps_azimuth() {
        let bytes = level5_bytes("OLDST", "OSTRO-AZ", "METER", &[12.5], (5.0, 52.0), -2);
        let def = decode_and_migrate(5, &bytes).unwrap();
        assert_eq!(def.prj_knm, "OSTRO");
        assert_eq!(def.prm[0], 12.5);
        assert_eq!(def.quad, -2);
    }

    #[test]
    fn test_unused_slots_zeroed() {
        let bytes = level5_bytes("OLDTM", "TM", "USFOOT", &[-75.0, 99.0, 7.0], (0.0, 0.0), 1);
        let def = decode_and_migrate(5, &bytes).unwrap();
        assert_eq!(def.unit, "FOOT");
        assert_eq!(def.prm[0], -75.0);
        assert!(def.prm[1..].iter().all(|&p| p == 0.0));
    }
}
