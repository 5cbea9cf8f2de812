//! Fixed table of coordinate system categories.
//!
//! A coordinate system belongs to a category through its `group` field; the
//! table only supplies the display names and the enumeration order.

use crate::key_name::eq_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupInfo {
    pub name: &'static str,
    pub description: &'static str,
}

pub static GROUPS: &[GroupInfo] = &[
    GroupInfo { name: "LL", description: "Lat/Long systems" },
    GroupInfo { name: "WORLD", description: "World and continental systems" },
    GroupInfo { name: "UTM", description: "UTM Zones" },
    GroupInfo { name: "SPCS83", description: "State Planes NAD83" },
    GroupInfo { name: "SPCS27", description: "State Planes NAD27" },
    GroupInfo { name: "SPCSHP", description: "State Planes HARN" },
    GroupInfo { name: "OTHR-US", description: "Other US systems" },
    GroupInfo { name: "CANADA", description: "Canadian systems" },
    GroupInfo { name: "EUROPE", description: "European systems" },
    GroupInfo { name: "ASIA", description: "Asian systems" },
    GroupInfo { name: "AUSNZ", description: "Australia and New Zealand" },
    GroupInfo { name: "AFRICA", description: "African systems" },
    GroupInfo { name: "SAMER", description: "South and Central America" },
    GroupInfo { name: "POLAR", description: "Polar systems" },
    GroupInfo { name: "NERTH", description: "Non-earth systems" },
    GroupInfo { name: "TEST", description: "Test systems" },
    GroupInfo { name: "USER", description: "User defined systems" },
    GroupInfo { name: "LEGACY", description: "Obsolete systems kept for compatibility" },
];

/// Look a category up by name (case-insensitive).
pub fn group_by_name(name: &str) -> Option<&'static GroupInfo> {
    GROUPS.iter().find(|g| eq_key(g.name, name))
}

/// Validity check used by the compiler: an empty group is allowed.
pub fn is_known_group(name: &str) -> bool {
    name.is_empty() || group_by_name(name).is_some()
}

#[cfg(test)]
mod test_groups {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(group_by_name("spcs83").unwrap().description, "State Planes NAD83");
        assert_eq!(group_by_name("UTM").unwrap().description, "UTM Zones");
        assert!(is_known_group(""));
        assert!(!is_known_group("MARS"));
    }
}
