//! # Versioned migration engine
//!
//! Each dictionary kind keeps a private record shape per historical format
//! level. A record read from an older file is decoded into its level-tagged
//! variant and then walked up a strict chain of pure `LevelN → LevelN+1`
//! steps until it reaches the current shape:
//!
//! ```text
//! coordinate systems  5 ─▶ 6 ─▶ 7 ─▶ 8
//! datums              5 ─▶ 6 ─▶ 7 ─▶ 8
//! ellipsoids          5 ─▶ 7 ─▶ 8          (level-6 files use the level-5 shape)
//! ```
//!
//! Every step copies fields forward, zero-fills the fields introduced by the
//! next level and applies the one-time fixups tied to that release. The key
//! name is re-validated after each step; a failure is a fatal
//! [`GeoframeError::Format`].

pub mod coordsys;
pub mod datum;
pub mod ellipsoid;

use tracing::debug;

use crate::{
    constants::{GX_NAME_LEN, KEY_NAME_LEN},
    dictionary::DictKind,
    geoframe_errors::GeoframeError,
    key_name::validate_key_name,
};

pub(crate) fn validate_migrated_name(kind: DictKind, name: &str) -> Result<(), GeoframeError> {
    let width = match kind {
        DictKind::GeodeticTransform => GX_NAME_LEN,
        _ => KEY_NAME_LEN,
    };
    validate_key_name(name, width).map_err(|reason| {
        debug!(%kind, name, "migrated record rejected");
        GeoframeError::format(format!("{kind} record failed name validation after migration: {reason}"))
    })
}
