//! Magic-number detection for binary dictionaries.
//!
//! The first four bytes of every dictionary file identify the kind of
//! records it holds and the on-disk format level. The tag is four ASCII
//! bytes (`CSD8`, `DTD7`, `ELD5`, …) stored as a 32-bit integer in the byte
//! order of the platform that wrote the file, so a big-endian file shows the
//! tag reversed (`8DSC`). Detection tries the canonical order first and the
//! swapped order second; anything else is a [`GeoframeError::Format`].

use crate::{codec::ByteOrder, dictionary::DictKind, geoframe_errors::GeoframeError};

/// Magic value of a dictionary kind at a format level.
pub const fn magic_value(kind: DictKind, level: u8) -> u32 {
    let tag = kind.magic_tag();
    u32::from_le_bytes([tag[0], tag[1], b'D', b'0' + level])
}

/// Format levels that can be read, per dictionary kind.
pub const fn supported_levels(kind: DictKind) -> &'static [u8] {
    match kind {
        DictKind::CoordSys | DictKind::Datum | DictKind::Ellipsoid => &[5, 6, 7, 8],
        DictKind::GeodeticTransform => &[8],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictMagic {
    pub kind: DictKind,
    pub level: u8,
    pub order: ByteOrder,
}

impl DictMagic {
    pub fn current(kind: DictKind) -> Self {
        DictMagic {
            kind,
            level: crate::constants::CURRENT_LEVEL,
            order: ByteOrder::canonical(),
        }
    }

    /// The four bytes written at the head of a file.
    pub fn to_bytes(self) -> [u8; 4] {
        let value = magic_value(self.kind, self.level);
        match self.order {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }
}

fn lookup(value: u32) -> Option<(DictKind, u8)> {
    DictKind::ALL.iter().find_map(|&kind| {
        supported_levels(kind)
            .iter()
            .find(|&&level| magic_value(kind, level) == value)
            .map(|&level| (kind, level))
    })
}

/// Identify kind, level and byte order from the first four bytes of a file.
pub fn detect_magic(head: [u8; 4]) -> Result<DictMagic, GeoframeError> {
    if let Some((kind, level)) = lookup(u32::from_le_bytes(head)) {
        return Ok(DictMagic {
            kind,
            level,
            order: ByteOrder::Little,
        });
    }
    if let Some((kind, level)) = lookup(u32::from_be_bytes(head)) {
        return Ok(DictMagic {
            kind,
            level,
            order: ByteOrder::Big,
        });
    }
    Err(GeoframeError::format(format!(
        "unrecognized dictionary magic number {:#010x}",
        u32::from_le_bytes(head)
    )))
}

/// Detect the magic and check it belongs to the expected dictionary kind.
pub fn expect_magic(head: [u8; 4], kind: DictKind) -> Result<DictMagic, GeoframeError> {
    let magic = detect_magic(head)?;
    if magic.kind != kind {
        return Err(GeoframeError::format(format!(
            "expected a {kind} dictionary, found a {} dictionary",
            magic.kind
        )));
    }
    Ok(magic)
}

#[cfg(test)]
mod test_magic {
    use super::*;

    #[test]
    fn test_detect_little_and_big() {
        let magic = detect_magic(*b"CSD8").unwrap();
        assert_eq!(
            magic,
            DictMagic {
                kind: DictKind::CoordSys,
                level: 8,
                order: ByteOrder::Little
            }
        );

        let magic = detect_magic(*b"5DTD").unwrap();
        assert_eq!(magic.kind, DictKind::Datum);
        assert_eq!(magic.level, 5);
        assert_eq!(magic.order, ByteOrder::Big);
    }

    #[test]
    fn test_to_bytes_round_trip() {
        let magic = DictMagic {
            kind: DictKind::Ellipsoid,
            level: 7,
            order: ByteOrder::Big,
        };
        assert_eq!(detect_magic(magic.to_bytes()).unwrap(), magic);
    }

    #[test]
    fn test_unknown_magic() {
        assert!(matches!(
            detect_magic(*b"XXXX"),
            Err(GeoframeError::Format(_))
        ));
        // geodetic transform dictionaries only exist at the current level
        assert!(detect_magic(*b"GXD5").is_err());
    }

    #[test]
    fn test_wrong_kind() {
        assert!(expect_magic(*b"ELD8", DictKind::Datum).is_err());
        assert!(expect_magic(*b"ELD8", DictKind::Ellipsoid).is_ok());
    }
}
