//! Key name policy shared by every dictionary.
//!
//! Key names are compared case-insensitively (ASCII folding) and may only
//! contain alphanumerics plus the punctuation set `space _ - $ : . ; ~ /`.
//! The first character must be alphanumeric, leading/trailing blanks are
//! rejected and two consecutive spaces are never allowed.
//!
//! The colon doubles as the "unique" character: names carrying it are
//! reserved for user definitions and never collide with distribution
//! records.

use std::{cmp::Ordering, sync::LazyLock};

use regex::Regex;

/// Character marking a user-defined (non-distribution) name.
pub const UNIQUE_CHAR: char = ':';

static KEY_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 _\-$:.;~/]*$").expect("static regex"));

/// Check `name` against the policy. `field_len` is the width of the on-disk
/// field, terminator included.
///
/// Return
/// ----------
/// * `Err(reason)` describing the first violated rule.
pub fn validate_key_name(name: &str, field_len: usize) -> Result<(), String> {
    if name.is_empty() {
        return Err("key name is empty".into());
    }
    if name.len() >= field_len {
        return Err(format!(
            "key name '{name}' is longer than {} characters",
            field_len - 1
        ));
    }
    if name.ends_with(' ') {
        return Err(format!("key name '{name}' has trailing blanks"));
    }
    if name.contains("  ") {
        return Err(format!("key name '{name}' contains consecutive spaces"));
    }
    if !KEY_CHARSET.is_match(name) {
        return Err(format!("key name '{name}' contains invalid characters"));
    }
    Ok(())
}

/// `true` for names reserved to user definitions.
pub fn is_user_name(name: &str) -> bool {
    name.contains(UNIQUE_CHAR)
}

/// Case-insensitive ordering used to sort dictionaries and binary-search them.
pub fn cmp_key(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|c| c.to_ascii_uppercase())
        .cmp(b.bytes().map(|c| c.to_ascii_uppercase()))
}

pub fn eq_key(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Normalized form used as a hash key (the caches, group lists).
pub fn fold_key(name: &str) -> String {
    name.to_ascii_uppercase()
}
