//! Coordinate system definitions (`Coordsys.CSD`).

use std::borrow::Cow;

use crate::{
    codec::{FieldKind, RecordReader, RecordWriter},
    constants::{
        Degree, CNTRY_ST_LEN, DESC_LEN, KEY_NAME_LEN, PRJ_PARAM_COUNT, UNIT_NAME_LEN,
    },
    dictionary::{DictKind, DictRecord},
    geoframe_errors::GeoframeError,
    migration,
};

/// Current (level 8) coordinate system record layout.
pub const COORDSYS_LAYOUT_08: &[FieldKind] = &[
    FieldKind::Chars(KEY_NAME_LEN),          // key_nm
    FieldKind::Chars(KEY_NAME_LEN),          // dat_knm
    FieldKind::Chars(KEY_NAME_LEN),          // elp_knm
    FieldKind::Chars(KEY_NAME_LEN),          // prj_knm
    FieldKind::Chars(KEY_NAME_LEN),          // group
    FieldKind::Chars(KEY_NAME_LEN),          // locatn
    FieldKind::Chars(CNTRY_ST_LEN),          // cntry_st
    FieldKind::Chars(UNIT_NAME_LEN),         // unit
    FieldKind::Doubles(PRJ_PARAM_COUNT),     // prm1..prm24
    FieldKind::Doubles(8), // org_lng org_lat x_off y_off scl_red unit_scl map_scl scale
    FieldKind::Doubles(2), // zero
    FieldKind::Doubles(2), // ll_min
    FieldKind::Doubles(2), // ll_max
    FieldKind::Doubles(2), // xy_min
    FieldKind::Doubles(2), // xy_max
    FieldKind::Chars(DESC_LEN),              // desc_nm
    FieldKind::Chars(DESC_LEN),              // source
    FieldKind::I16,                          // quad
    FieldKind::I16,                          // protect
    FieldKind::I16,                          // epsg_qd
    FieldKind::I16,                          // wkt_flvr
    FieldKind::I32,                          // epsg
    FieldKind::I32,                          // srid
    FieldKind::Chars(8),                     // fill
];

/// Coordinate system definition.
///
/// Exactly one of `dat_knm` / `elp_knm` is set: a system is referenced either
/// to a datum or directly to an ellipsoid (cartographically referenced). The
/// meaning of `prm` depends on the projection, see
/// [`ProjectionInfo`](crate::projection::ProjectionInfo).
#[derive(Debug, Clone, PartialEq)]
pub struct CoordSysDef {
    pub key_nm: String,
    pub dat_knm: String,
    pub elp_knm: String,
    pub prj_knm: String,
    pub group: String,
    pub locatn: String,
    pub cntry_st: String,
    pub unit: String,
    pub prm: [f64; PRJ_PARAM_COUNT],
    pub org_lng: Degree,
    pub org_lat: Degree,
    pub x_off: f64,
    pub y_off: f64,
    pub scl_red: f64,
    /// Meters (or degrees) per unit.
    pub unit_scl: f64,
    pub map_scl: f64,
    /// Combined scale: `1 / (unit_scl * map_scl)`.
    pub scale: f64,
    /// Absolute values below these are written as zero.
    pub zero: [f64; 2],
    pub ll_min: [Degree; 2],
    pub ll_max: [Degree; 2],
    pub xy_min: [f64; 2],
    pub xy_max: [f64; 2],
    pub desc_nm: String,
    pub source: String,
    pub quad: i16,
    pub protect: i16,
    pub epsg_qd: i16,
    pub wkt_flvr: i16,
    pub epsg: i32,
    pub srid: i32,
}

impl Default for CoordSysDef {
    fn default() -> Self {
        CoordSysDef {
            key_nm: String::new(),
            dat_knm: String::new(),
            elp_knm: String::new(),
            prj_knm: String::new(),
            group: String::new(),
            locatn: String::new(),
            cntry_st: String::new(),
            unit: String::new(),
            prm: [0.0; PRJ_PARAM_COUNT],
            org_lng: 0.0,
            org_lat: 0.0,
            x_off: 0.0,
            y_off: 0.0,
            scl_red: 0.0,
            unit_scl: 0.0,
            map_scl: 0.0,
            scale: 0.0,
            zero: [0.0; 2],
            ll_min: [0.0; 2],
            ll_max: [0.0; 2],
            xy_min: [0.0; 2],
            xy_max: [0.0; 2],
            desc_nm: String::new(),
            source: String::new(),
            quad: 0,
            protect: 0,
            epsg_qd: 0,
            wkt_flvr: 0,
            epsg: 0,
            srid: 0,
        }
    }
}

impl CoordSysDef {
    pub fn new(key_nm: &str, prj_knm: &str, unit: &str) -> Self {
        CoordSysDef {
            key_nm: key_nm.to_string(),
            prj_knm: prj_knm.to_string(),
            unit: unit.to_string(),
            ..Default::default()
        }
    }

    /// `true` when the system is referenced to a datum (and can be datum-shifted).
    pub fn is_geodetic(&self) -> bool {
        !self.dat_knm.is_empty()
    }

    /// Name of the datum, or of the ellipsoid for cartographically referenced systems.
    pub fn reference_name(&self) -> &str {
        if self.is_geodetic() {
            &self.dat_knm
        } else {
            &self.elp_knm
        }
    }

    pub fn ll_extents_empty(&self) -> bool {
        self.ll_min == [0.0; 2] && self.ll_max == [0.0; 2]
    }

    pub(crate) fn decode_current(bytes: &[u8]) -> Result<Self, GeoframeError> {
        let mut r = RecordReader::new(bytes, "coordinate system");
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
        let epsg_qd = r.i16()?;
        let wkt_flvr = r.i16()?;
        let epsg = r.i32()?;
        let srid = r.i32()?;
        r.bytes(8)?;
        r.finish()?;
        let mut def = CoordSysDef {
            key_nm,
            dat_knm,
            elp_knm,
            prj_knm,
            group,
            locatn,
            cntry_st,
            unit,
            quad,
            protect,
            epsg_qd,
            wkt_flvr,
            epsg,
            srid,
            ..Default::default()
        };
        body.apply(&mut def);
        Ok(def)
    }
}

/// The numeric block and descriptions, identical at every format level.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CoordSysBody {
    pub prm: [f64; PRJ_PARAM_COUNT],
    pub scalars: [f64; 8],
    pub zero: [f64; 2],
    pub ll_min: [f64; 2],
    pub ll_max: [f64; 2],
    pub xy_min: [f64; 2],
    pub xy_max: [f64; 2],
    pub desc_nm: String,
    pub source: String,
}

impl CoordSysBody {
    pub(crate) fn read(r: &mut RecordReader) -> Result<Self, GeoframeError> {
        Ok(CoordSysBody {
            prm: r.doubles::<PRJ_PARAM_COUNT>()?,
            scalars: r.doubles::<8>()?,
            zero: r.doubles::<2>()?,
            ll_min: r.doubles::<2>()?,
            ll_max: r.doubles::<2>()?,
            xy_min: r.doubles::<2>()?,
            xy_max: r.doubles::<2>()?,
            desc_nm: r.chars(DESC_LEN)?,
            source: r.chars(DESC_LEN)?,
        })
    }

    pub(crate) fn apply(self, def: &mut CoordSysDef) {
        let [org_lng, org_lat, x_off, y_off, scl_red, unit_scl, map_scl, scale] = self.scalars;
        def.prm = self.prm;
        def.org_lng = org_lng;
        def.org_lat = org_lat;
        def.x_off = x_off;
        def.y_off = y_off;
        def.scl_red = scl_red;
        def.unit_scl = unit_scl;
        def.map_scl = map_scl;
        def.scale = scale;
        def.zero = self.zero;
        def.ll_min = self.ll_min;
        def.ll_max = self.ll_max;
        def.xy_min = self.xy_min;
        def.xy_max = self.xy_max;
        def.desc_nm = self.desc_nm;
        def.source = self.source;
    }
}

impl DictRecord for CoordSysDef {
    const KIND: DictKind = DictKind::CoordSys;

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
        migration::coordsys::layout(level).map(Cow::Borrowed)
    }

    fn encode(&self) -> Vec<u8> {
        let mut w = RecordWriter::with_capacity(696);
        w.chars(&self.key_nm, KEY_NAME_LEN)
            .chars(&self.dat_knm, KEY_NAME_LEN)
            .chars(&self.elp_knm, KEY_NAME_LEN)
            .chars(&self.prj_knm, KEY_NAME_LEN)
            .chars(&self.group, KEY_NAME_LEN)
            .chars(&self.locatn, KEY_NAME_LEN)
            .chars(&self.cntry_st, CNTRY_ST_LEN)
            .chars(&self.unit, UNIT_NAME_LEN)
            .doubles(&self.prm)
            .doubles(&[
                self.org_lng,
                self.org_lat,
                self.x_off,
                self.y_off,
                self.scl_red,
                self.unit_scl,
                self.map_scl,
                self.scale,
            ])
            .doubles(&self.zero)
            .doubles(&self.ll_min)
            .doubles(&self.ll_max)
            .doubles(&self.xy_min)
            .doubles(&self.xy_max)
            .chars(&self.desc_nm, DESC_LEN)
            .chars(&self.source, DESC_LEN)
            .i16(self.quad)
            .i16(self.protect)
            .i16(self.epsg_qd)
            .i16(self.wkt_flvr)
            .i32(self.epsg)
            .i32(self.srid)
            .zeros(8);
        w.into_bytes()
    }

    fn decode_level(level: u8, bytes: &[u8]) -> Result<Self, GeoframeError> {
        migration::coordsys::decode_and_migrate(level, bytes)
    }
}

#[cfg(test)]
pub(crate) mod test_coordsys_def {
    use super::*;
    use crate::codec::{decode_record, encode_record, layout_size, ByteOrder, Obfuscation};

    pub(crate) fn utm31n() -> CoordSysDef {
        let mut def = CoordSysDef::new("UTM84-31N", "UTM", "METER");
        def.dat_knm = "WGS84".into();
        def.group = "UTM".into();
        def.prm[0] = 31.0;
        def.prm[1] = 1.0;
        def.org_lng = 3.0;
        def.x_off = 500_000.0;
        def.scl_red = 0.9996;
        def.unit_scl = 1.0;
        def.map_scl = 1.0;
        def.scale = 1.0;
        def.quad = 1;
        def.ll_min = [0.0, 0.0];
        def.ll_max = [6.0, 84.0];
        def.desc_nm = "UTM zone 31 north, WGS84".into();
        def.epsg = 32631;
        def.protect = 1;
        def
    }

    #[test]
    fn test_encode_matches_layout() {
        assert_eq!(layout_size(COORDSYS_LAYOUT_08), 696);
        assert_eq!(utm31n().encode().len(), 696);
    }

    #[test]
    fn test_codec_round_trip() {
        let def = utm31n();
        for order in [ByteOrder::Little, ByteOrder::Big] {
            for obf in [Obfuscation::Plain, Obfuscation::Key(0x91)] {
                let bytes = encode_record(&def, order, obf).unwrap();
                let back: CoordSysDef = decode_record(&bytes, 8, order).unwrap();
                assert_eq!(back, def);
            }
        }
    }

    #[test]
    fn test_reference_name() {
        let mut def = utm31n();
        assert!(def.is_geodetic());
        assert_eq!(def.reference_name(), "WGS84");
        def.dat_knm.clear();
        def.elp_knm = "GRS1980".into();
        assert_eq!(def.reference_name(), "GRS1980");
    }
}
