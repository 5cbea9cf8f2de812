//! Linear and angular unit table.
//!
//! Linear factors convert one unit into meters, angular factors convert one
//! unit into degrees. Names are matched case-insensitively. A handful of
//! names used by older dictionaries are renamed by the migration engine
//! (see [`legacy_unit_rename`]).

use crate::{geoframe_errors::GeoframeError, key_name::eq_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Linear,
    Angular,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitInfo {
    pub name: &'static str,
    pub kind: UnitKind,
    /// Meters (linear) or degrees (angular) per unit.
    pub factor: f64,
    pub epsg: u32,
    pub wkt_name: &'static str,
}

const fn linear(name: &'static str, factor: f64, epsg: u32, wkt_name: &'static str) -> UnitInfo {
    UnitInfo {
        name,
        kind: UnitKind::Linear,
        factor,
        epsg,
        wkt_name,
    }
}

const fn angular(name: &'static str, factor: f64, epsg: u32, wkt_name: &'static str) -> UnitInfo {
    UnitInfo {
        name,
        kind: UnitKind::Angular,
        factor,
        epsg,
        wkt_name,
    }
}

pub static UNITS: &[UnitInfo] = &[
    linear("METER", 1.0, 9001, "metre"),
    linear("FOOT", 1200.0 / 3937.0, 9003, "US survey foot"),
    linear("IFOOT", 0.3048, 9002, "foot"),
    linear("KILOMETER", 1000.0, 9036, "kilometre"),
    linear("DECIMETER", 0.1, 0, "decimetre"),
    linear("CENTIMETER", 0.01, 0, "centimetre"),
    linear("MILLIMETER", 0.001, 0, "millimetre"),
    linear("MILE", 1609.347_218_694_437, 0, "US survey mile"),
    linear("IMILE", 1609.344, 9093, "Statute mile"),
    linear("YARD", 3600.0 / 3937.0, 0, "US survey yard"),
    linear("IYARD", 0.9144, 9096, "yard"),
    linear("INCH", 100.0 / 3937.0, 0, "US survey inch"),
    linear("IINCH", 0.0254, 0, "inch"),
    linear("CHAIN", 79200.0 / 3937.0, 9033, "US survey chain"),
    linear("ICHAIN", 20.1168, 9097, "chain"),
    linear("LINK", 792.0 / 3937.0, 9034, "US survey link"),
    linear("ILINK", 0.201168, 9098, "link"),
    linear("FATHOM", 1.8288, 9014, "fathom"),
    linear("NAUTICALMILE", 1852.0, 9030, "nautical mile"),
    linear("GERMANMETER", 1.000_013_596_5, 9031, "German legal metre"),
    linear("CLARKEFOOT", 0.304_797_265_4, 9005, "Clarke's foot"),
    linear("INDIANFOOT", 0.304_799_510_2, 9080, "Indian foot"),
    linear("SEARSYARD", 0.914_398_414_6, 9040, "British yard (Sears 1922)"),
    angular("DEGREE", 1.0, 9102, "degree"),
    angular("GRAD", 0.9, 9105, "grad"),
    angular("GRADE", 0.9, 9105, "grad"),
    angular("MIL", 360.0 / 6400.0, 9114, "mil_6400"),
    angular("MINUTE", 1.0 / 60.0, 9103, "arc-minute"),
    angular("SECOND", 1.0 / 3600.0, 9104, "arc-second"),
    angular("RADIAN", 180.0 / std::f64::consts::PI, 9101, "radian"),
    angular("MICRORADIAN", 180.0e-6 / std::f64::consts::PI, 9109, "microradian"),
];

/// Look a unit up by name.
pub fn unit_by_name(name: &str) -> Result<&'static UnitInfo, GeoframeError> {
    UNITS
        .iter()
        .find(|u| eq_key(u.name, name))
        .ok_or_else(|| GeoframeError::UnknownUnit(name.to_string()))
}

/// Find a unit of the requested kind from its factor (used by the WKT reader).
pub fn unit_by_factor(kind: UnitKind, factor: f64) -> Option<&'static UnitInfo> {
    UNITS
        .iter()
        .find(|u| u.kind == kind && (u.factor - factor).abs() <= 1e-12 * factor.abs().max(1.0))
}

/// Unit names written by older dictionaries and the name that replaced them.
pub fn legacy_unit_rename(name: &str) -> Option<&'static str> {
    const RENAMES: &[(&str, &str)] = &[
        ("METRE", "METER"),
        ("METERS", "METER"),
        ("USFOOT", "FOOT"),
        ("US-FOOT", "FOOT"),
        ("INTFOOT", "IFOOT"),
        ("FEET", "FOOT"),
        ("DEG", "DEGREE"),
        ("DEGREES", "DEGREE"),
        ("GON", "GRAD"),
        ("KM", "KILOMETER"),
    ];
    RENAMES
        .iter()
        .find(|(old, _)| eq_key(old, name))
        .map(|(_, new)| *new)
}
