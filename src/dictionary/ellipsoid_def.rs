//! Ellipsoid definitions (`Elipsoid.CSD`).

use std::borrow::Cow;

use hifitime::{Duration, Epoch};

use crate::{
    codec::{FieldKind, RecordReader, RecordWriter},
    constants::{DESC_LEN, KEY_NAME_LEN},
    dictionary::{DictKind, DictRecord},
    geodesy::Ellipsoid,
    geoframe_errors::GeoframeError,
    migration,
};

/// Current (level 8) ellipsoid record layout.
pub const ELLIPSOID_LAYOUT_08: &[FieldKind] = &[
    FieldKind::Chars(KEY_NAME_LEN), // key_nm
    FieldKind::Chars(KEY_NAME_LEN), // group
    FieldKind::F64,                 // e_rad
    FieldKind::F64,                 // p_rad
    FieldKind::F64,                 // flat
    FieldKind::F64,                 // ecent
    FieldKind::Chars(DESC_LEN),     // desc_nm
    FieldKind::Chars(DESC_LEN),     // source
    FieldKind::I16,                 // protect
    FieldKind::I16,                 // wkt_flvr
    FieldKind::I32,                 // epsg
    FieldKind::I32,                 // created (days since 1990-01-01)
    FieldKind::Chars(8),            // fill
];

/// Reference ellipsoid definition.
///
/// Radii are in meters; `flat` and `ecent` are derived from the radii and
/// kept consistent by [`EllipsoidDef::new`] and the compiler.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EllipsoidDef {
    pub key_nm: String,
    pub group: String,
    pub e_rad: f64,
    pub p_rad: f64,
    pub flat: f64,
    pub ecent: f64,
    pub desc_nm: String,
    pub source: String,
    pub protect: i16,
    pub wkt_flvr: i16,
    pub epsg: i32,
    /// Creation day number counted from 1990-01-01, `0` when unknown.
    pub created: i32,
}

impl EllipsoidDef {
    /// Build an ellipsoid from its two radii, deriving flattening and eccentricity.
    pub fn new(key_nm: &str, e_rad: f64, p_rad: f64) -> Self {
        let mut def = EllipsoidDef {
            key_nm: key_nm.to_string(),
            e_rad,
            p_rad,
            ..Default::default()
        };
        def.derive_shape();
        def
    }

    /// Recompute `flat` and `ecent` from the two radii.
    pub fn derive_shape(&mut self) {
        if self.e_rad > 0.0 {
            self.flat = 1.0 - self.p_rad / self.e_rad;
            let e_sq = self.flat * (2.0 - self.flat);
            self.ecent = e_sq.max(0.0).sqrt();
        }
    }

    /// First eccentricity squared.
    pub fn ecc_squared(&self) -> f64 {
        self.ecent * self.ecent
    }

    /// Shape consumed by the projection and datum shift math.
    pub fn shape(&self) -> Ellipsoid {
        Ellipsoid::new(self.e_rad, self.ecc_squared())
    }

    pub fn is_sphere(&self) -> bool {
        self.ecent == 0.0
    }

    /// Creation date as an epoch, if one was recorded.
    pub fn created_epoch(&self) -> Option<Epoch> {
        (self.created > 0).then(|| {
            Epoch::from_gregorian_tai_at_midnight(1990, 1, 1) + Duration::from_days(self.created as f64)
        })
    }

    /// Record the creation date.
    pub fn set_created_epoch(&mut self, epoch: Epoch) {
        let base = Epoch::from_gregorian_tai_at_midnight(1990, 1, 1);
        let days = (epoch - base).to_unit(hifitime::Unit::Day);
        self.created = (days + 1e-9).floor().max(0.0) as i32;
    }

    pub(crate) fn decode_current(bytes: &[u8]) -> Result<Self, GeoframeError> {
        let mut r = RecordReader::new(bytes, "ellipsoid");
        let def = EllipsoidDef {
            key_nm: r.chars(KEY_NAME_LEN)?,
            group: r.chars(KEY_NAME_LEN)?,
            e_rad: r.f64()?,
            p_rad: r.f64()?,
            flat: r.f64()?,
            ecent: r.f64()?,
            desc_nm: r.chars(DESC_LEN)?,
            source: r.chars(DESC_LEN)?,
            protect: r.i16()?,
            wkt_flvr: r.i16()?,
            epsg: r.i32()?,
            created: r.i32()?,
        };
        r.bytes(8)?;
        r.finish()?;
        Ok(def)
    }
}

impl DictRecord for EllipsoidDef {
    const KIND: DictKind = DictKind::Ellipsoid;

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
        migration::ellipsoid::layout(level).map(Cow::Borrowed)
    }

    fn encode(&self) -> Vec<u8> {
        let mut w = RecordWriter::with_capacity(228);
        w.chars(&self.key_nm, KEY_NAME_LEN)
            .chars(&self.group, KEY_NAME_LEN)
            .f64(self.e_rad)
            .f64(self.p_rad)
            .f64(self.flat)
            .f64(self.ecent)
            .chars(&self.desc_nm, DESC_LEN)
            .chars(&self.source, DESC_LEN)
            .i16(self.protect)
            .i16(self.wkt_flvr)
            .i32(self.epsg)
            .i32(self.created)
            .zeros(8);
        w.into_bytes()
    }

    fn decode_level(level: u8, bytes: &[u8]) -> Result<Self, GeoframeError> {
        migration::ellipsoid::decode_and_migrate(level, bytes)
    }
}

#[cfg(test)]
mod test_ellipsoid_def {
    use super::*;
    use crate::codec::{decode_record, encode_record, layout_size, ByteOrder, Obfuscation};
    use approx::assert_relative_eq;

    fn grs80() -> EllipsoidDef {
        let mut def = EllipsoidDef::new("GRS1980", 6_378_137.0, 6_356_752.314_140_36);
        def.desc_nm = "Geodetic Reference System of 1980".into();
        def.source = "Stem, L.E., Jan 1989".into();
        def.protect = 1;
        def.epsg = 7019;
        def
    }

    #[test]
    fn test_derived_shape() {
        let def = grs80();
        assert_relative_eq!(1.0 / def.flat, 298.257_222_101, epsilon = 1e-6);
        assert_relative_eq!(def.ecent, 0.081_819_191_042_8, epsilon = 1e-12);
    }

    #[test]
    fn test_encode_matches_layout() {
        assert_eq!(grs80().encode().len(), layout_size(ELLIPSOID_LAYOUT_08));
    }

    #[test]
    fn test_codec_round_trip_all_variants() {
        let def = grs80();
        for order in [ByteOrder::Little, ByteOrder::Big] {
            for obf in [Obfuscation::Plain, Obfuscation::Key(0xA7)] {
                let bytes = encode_record(&def, order, obf).unwrap();
                let back: EllipsoidDef = decode_record(&bytes, 8, order).unwrap();
                assert_eq!(back, def, "{order:?} {obf:?}");
            }
        }
    }

    #[test]
    fn test_created_epoch() {
        let mut def = grs80();
        assert!(def.created_epoch().is_none());
        let epoch = Epoch::from_gregorian_tai_at_midnight(2001, 5, 12);
        def.set_created_epoch(epoch);
        assert_eq!(def.created_epoch().unwrap(), epoch);
    }
}
