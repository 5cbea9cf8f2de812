//! Byte-order normalization driven by a typed field layout.
//!
//! Every fixed-size dictionary record is described by a [`FieldKind`] slice
//! that lists its fields in on-disk order. Records are always decoded from
//! the canonical **little-endian** representation: when a file was written
//! in big-endian order, [`normalize_byte_order`] walks the layout and swaps
//! each numeric field in place before the field decoder runs. Character
//! blocks are left untouched.
//!
//! # Example
//!
//! ```rust
//! use geoframe::codec::{normalize_byte_order, ByteOrder, FieldKind};
//!
//! let layout = [FieldKind::I16, FieldKind::Chars(2)];
//! let mut bytes = [0x00, 0x01, b'a', b'b'];
//! normalize_byte_order(&mut bytes, &layout, ByteOrder::Big).unwrap();
//! assert_eq!(bytes, [0x01, 0x00, b'a', b'b']);
//! ```

use std::fmt;

use crate::geoframe_errors::GeoframeError;

/// Byte order of a binary file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

impl ByteOrder {
    /// Byte order of the machine running this code.
    pub fn host() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    /// Order the field decoders expect.
    pub const fn canonical() -> Self {
        ByteOrder::Little
    }

    pub fn is_canonical(self) -> bool {
        self == ByteOrder::canonical()
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::Little => write!(f, "little-endian"),
            ByteOrder::Big => write!(f, "big-endian"),
        }
    }
}

/// One field of a fixed record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    I16,
    I32,
    F32,
    F64,
    /// `n` consecutive doubles.
    Doubles(usize),
    /// `n`-byte character block, never swapped.
    Chars(usize),
}

impl FieldKind {
    pub const fn size(self) -> usize {
        match self {
            FieldKind::I16 => 2,
            FieldKind::I32 | FieldKind::F32 => 4,
            FieldKind::F64 => 8,
            FieldKind::Doubles(n) => 8 * n,
            FieldKind::Chars(n) => n,
        }
    }
}

/// Total byte size of a layout.
pub const fn layout_size(layout: &[FieldKind]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < layout.len() {
        total += layout[i].size();
        i += 1;
    }
    total
}

/// Offset of the first byte of the trailing reserved field.
///
/// Every dictionary layout ends with a `Chars` fill block whose first byte
/// doubles as the obfuscation key.
pub fn reserved_offset(layout: &[FieldKind]) -> Result<usize, GeoframeError> {
    match layout.last() {
        Some(FieldKind::Chars(n)) if *n > 0 => Ok(layout_size(layout) - n),
        _ => Err(GeoframeError::format(
            "record layout does not end with a reserved character block",
        )),
    }
}

/// Swap every numeric field of `bytes` so that a record stored in `order`
/// becomes canonical. No-op for canonical files.
///
/// Return
/// ----------
/// * `Err(GeoframeError::Format)` when `bytes` does not have the layout size.
pub fn normalize_byte_order(
    bytes: &mut [u8],
    layout: &[FieldKind],
    order: ByteOrder,
) -> Result<(), GeoframeError> {
    let expected = layout_size(layout);
    if bytes.len() != expected {
        return Err(GeoframeError::format(format!(
            "record size mismatch: expected {expected} bytes, found {}",
            bytes.len()
        )));
    }
    if order.is_canonical() {
        return Ok(());
    }
    swap_fields(bytes, layout);
    Ok(())
}

/// Unconditionally swap every numeric field. Applying it twice restores the input.
pub fn swap_fields(bytes: &mut [u8], layout: &[FieldKind]) {
    let mut offset = 0;
    for field in layout {
        match *field {
            FieldKind::I16 => bytes[offset..offset + 2].reverse(),
            FieldKind::I32 | FieldKind::F32 => bytes[offset..offset + 4].reverse(),
            FieldKind::F64 => bytes[offset..offset + 8].reverse(),
            FieldKind::Doubles(n) => {
                for chunk in bytes[offset..offset + 8 * n].chunks_exact_mut(8) {
                    chunk.reverse();
                }
            }
            FieldKind::Chars(_) => {}
        }
        offset += field.size();
    }
}
