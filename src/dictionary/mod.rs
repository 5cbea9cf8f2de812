//! # Dictionaries
//!
//! The engine keeps its definitions in four binary dictionaries:
//!
//! | kind                      | record                                  | default file            |
//! |---------------------------|-----------------------------------------|-------------------------|
//! | coordinate systems        | [`CoordSysDef`](coordsys_def::CoordSysDef)  | `Coordsys.CSD`          |
//! | datums                    | [`DatumDef`](datum_def::DatumDef)           | `Datums.CSD`            |
//! | ellipsoids                | [`EllipsoidDef`](ellipsoid_def::EllipsoidDef) | `Elipsoid.CSD`        |
//! | geodetic transformations  | [`GxTransformDef`](gx_def::GxTransformDef)  | `GeodeticTransform.CSD` |
//!
//! Each file is a magic number followed by fixed-size records sorted by key
//! name (case-insensitive). [`store::DictionaryFile`] provides lookup and
//! enumeration, [`merge`] the upgrade merge, [`groups`] the category table.

pub mod coordsys_def;
pub mod datum_def;
pub mod ellipsoid_def;
pub mod groups;
pub mod gx_def;
pub mod merge;
pub mod store;

use std::{borrow::Cow, fmt};

use crate::{
    codec::{layout_size, ByteOrder, FieldKind},
    geoframe_errors::GeoframeError,
};

/// The kind of records held by a dictionary file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DictKind {
    CoordSys,
    Datum,
    Ellipsoid,
    GeodeticTransform,
}

impl DictKind {
    pub const ALL: [DictKind; 4] = [
        DictKind::CoordSys,
        DictKind::Datum,
        DictKind::Ellipsoid,
        DictKind::GeodeticTransform,
    ];

    /// Two-letter tag used in the magic number.
    pub const fn magic_tag(self) -> [u8; 2] {
        match self {
            DictKind::CoordSys => *b"CS",
            DictKind::Datum => *b"DT",
            DictKind::Ellipsoid => *b"EL",
            DictKind::GeodeticTransform => *b"GX",
        }
    }
}

impl fmt::Display for DictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DictKind::CoordSys => "coordinate system",
            DictKind::Datum => "datum",
            DictKind::Ellipsoid => "ellipsoid",
            DictKind::GeodeticTransform => "geodetic transformation",
        };
        write!(f, "{name}")
    }
}

/// A fixed-layout record stored in a binary dictionary.
///
/// Implementations describe the layout of every format level they can read
/// and decode any of them into the current in-memory definition (running the
/// migration chain for older levels). Encoding always produces the current
/// level in canonical byte order.
pub trait DictRecord: Sized + Clone + PartialEq + fmt::Debug {
    const KIND: DictKind;

    fn key_name(&self) -> &str;

    fn group(&self) -> &str;

    /// Protection flag: `1` for distribution records, `0` for user records.
    fn protect(&self) -> i16;

    /// Layout of a record at `level`.
    fn layout(level: u8) -> Result<Cow<'static, [FieldKind]>, GeoframeError>;

    /// Layout of one particular record. Records whose layout depends on their
    /// own content (a tagged parameter union) override this; `bytes` are
    /// deobfuscated but still in file `order`.
    fn refine_layout(
        level: u8,
        _bytes: &[u8],
        _order: ByteOrder,
    ) -> Result<Cow<'static, [FieldKind]>, GeoframeError> {
        Self::layout(level)
    }

    /// Encode at the current level, canonical order, not obfuscated.
    fn encode(&self) -> Vec<u8>;

    /// Decode canonical bytes written at `level` and migrate to the current format.
    fn decode_level(level: u8, bytes: &[u8]) -> Result<Self, GeoframeError>;

    fn record_size(level: u8) -> Result<usize, GeoframeError> {
        Ok(layout_size(&Self::layout(level)?))
    }
}

pub(crate) fn unsupported_level(kind: DictKind, level: u8) -> GeoframeError {
    GeoframeError::format(format!("{kind} dictionaries have no format level {level}"))
}
