//! # Binary record codec
//!
//! Fixed-layout dictionary records travel through four steps between disk
//! and memory:
//!
//! ```text
//! read:  raw bytes ─▶ deobfuscate ─▶ normalize byte order ─▶ decode fields ─▶ migrate
//! write: record ─▶ encode fields ─▶ (swap for big-endian) ─▶ obfuscate ─▶ raw bytes
//! ```
//!
//! The layout of a record at a given format level is described by a
//! [`FieldKind`] slice owned by the record type (see
//! [`DictRecord`](crate::dictionary::DictRecord)); this module only knows how
//! to walk such descriptors.

pub mod byte_order;
pub mod field;
pub mod magic;
pub mod obfuscation;

pub use byte_order::{
    layout_size, normalize_byte_order, reserved_offset, swap_fields, ByteOrder, FieldKind,
};
pub use field::{chars_to_string, RecordReader, RecordWriter};
pub use magic::{detect_magic, expect_magic, magic_value, DictMagic};
pub use obfuscation::{deobfuscate, obfuscate};

use crate::{dictionary::DictRecord, geoframe_errors::GeoframeError};

/// Obfuscation applied when encoding a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Obfuscation {
    #[default]
    Plain,
    /// Rolling XOR seeded with this (non-zero) byte.
    Key(u8),
}

/// Decode one raw on-disk record written at `level` in `order` and migrate it
/// to the current format.
pub fn decode_record<R: DictRecord>(
    raw: &[u8],
    level: u8,
    order: crate::codec::ByteOrder,
) -> Result<R, GeoframeError> {
    let mut bytes = raw.to_vec();
    let base = R::layout(level)?;
    if bytes.len() != layout_size(&base) {
        return Err(GeoframeError::format(format!(
            "{} record at level {level} must be {} bytes, found {}",
            R::KIND,
            layout_size(&base),
            bytes.len()
        )));
    }
    deobfuscate(&mut bytes, reserved_offset(&base)?);
    let layout = R::refine_layout(level, &bytes, order)?;
    normalize_byte_order(&mut bytes, &layout, order)?;
    R::decode_level(level, &bytes)
}

/// Encode a record at the current level in the requested byte order.
pub fn encode_record<R: DictRecord>(
    record: &R,
    order: ByteOrder,
    obfuscation: Obfuscation,
) -> Result<Vec<u8>, GeoframeError> {
    let level = crate::constants::CURRENT_LEVEL;
    let mut bytes = record.encode();
    let layout = R::refine_layout(level, &bytes, ByteOrder::canonical())?;
    if bytes.len() != layout_size(&layout) {
        return Err(GeoframeError::format(format!(
            "{} encoder produced {} bytes, layout expects {}",
            R::KIND,
            bytes.len(),
            layout_size(&layout)
        )));
    }
    if !order.is_canonical() {
        swap_fields(&mut bytes, &layout);
    }
    if let Obfuscation::Key(seed) = obfuscation {
        let offset = reserved_offset(&layout)?;
        bytes[offset] = seed;
        obfuscate(&mut bytes, offset);
    }
    Ok(bytes)
}
