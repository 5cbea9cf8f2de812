//! Per-record rolling XOR obfuscation.
//!
//! A record is obfuscated when the first byte of its trailing reserved block
//! is non-zero. That byte seeds a rolling key; the key byte itself is never
//! transformed, so the same record can always be restored.
//!
//! Reading applies, for every other byte in order:
//!
//! ```text
//! key ^= byte;
//! byte = key;
//! ```
//!
//! and [`obfuscate`] is the exact inverse of that loop.

/// Restore an obfuscated record in place. Records with a zero key byte are left as-is.
pub fn deobfuscate(bytes: &mut [u8], key_offset: usize) {
    let Some(&seed) = bytes.get(key_offset) else {
        return;
    };
    if seed == 0 {
        return;
    }
    let mut key = seed;
    for (i, b) in bytes.iter_mut().enumerate() {
        if i == key_offset {
            continue;
        }
        key ^= *b;
        *b = key;
    }
}

/// Obfuscate a plain record in place using the key byte already stored at `key_offset`.
pub fn obfuscate(bytes: &mut [u8], key_offset: usize) {
    let Some(&seed) = bytes.get(key_offset) else {
        return;
    };
    if seed == 0 {
        return;
    }
    let mut prev = seed;
    for (i, b) in bytes.iter_mut().enumerate() {
        if i == key_offset {
            continue;
        }
        let plain = *b;
        *b = plain ^ prev;
        prev = plain;
    }
}

#[cfg(test)]
mod test_obfuscation {
    use super::*;

    #[test]
    fn test_obfuscate_then_restore() {
        let plain: Vec<u8> = b"NAD83\0\0\0some payload bytes\x5A\0"
            .iter()
            .copied()
            .collect();
        let key_offset = plain.len() - 2;

        let mut bytes = plain.clone();
        obfuscate(&mut bytes, key_offset);
        assert_ne!(bytes, plain);
        assert_eq!(bytes[key_offset], 0x5A);

        deobfuscate(&mut bytes, key_offset);
        assert_eq!(bytes, plain);
    }

    #[test]
    fn test_zero_key_is_plain() {
        let plain = b"WGS84\0\0\0".to_vec();
        let mut bytes = plain.clone();
        obfuscate(&mut bytes, 6);
        assert_eq!(bytes, plain);
        deobfuscate(&mut bytes, 6);
        assert_eq!(bytes, plain);
    }

    #[test]
    fn test_read_side_rolling_key() {
        // seed 0x0F, cipher bytes [0x01, 0x02] -> key 0x0E then 0x0C
        let mut bytes = vec![0x01, 0x02, 0x0F];
        deobfuscate(&mut bytes, 2);
        assert_eq!(bytes, vec![0x0E, 0x0C, 0x0F]);
    }
}
