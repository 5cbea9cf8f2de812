//! # Definition comparator
//!
//! Decides whether two definitions of a coordinate system, datum or
//! ellipsoid describe the same thing, and estimates in meters how far apart
//! positions computed with them would be.
//!
//! Raw fields are only compared after known equivalent representations have
//! been normalized:
//!
//! * UTM and Gauss-Kruger become Transverse Mercator (zone derived central
//!   meridian and scale, unity scale),
//! * Mercator variant B becomes variant A with the scale derived from the
//!   standard parallel,
//! * two standard parallels are compared as an unordered pair,
//! * datums without any shift (WGS84, NAD83, GDA94, ...) are equal to each other,
//! * Bursa-Wolf and coordinate-frame 7 parameter rotations are compared in
//!   one sign convention.
//!
//! Each physical quantity has its own tolerance ([`Tolerances`]) and
//! conversion to meters ([`tolerance::meters`]). Structural differences
//! (another projection, quadrant or reference) have an infinite quality.

pub mod tolerance;

use std::fmt;

use crate::{
    constants::{PRJ_PARAM_COUNT, WGS84_DATUM},
    dictionary::{
        coordsys_def::CoordSysDef,
        datum_def::{DatumDef, To84Via},
        ellipsoid_def::EllipsoidDef,
    },
    geodesy::Ellipsoid,
    geoframe_errors::GeoframeError,
    key_name::eq_key,
    projection::{
        fill_in::fill_in, math::msfn, projection_by_key, ParamKind, ParamRole, ProjFlags,
        ProjectionInfo,
    },
};

pub use tolerance::{Quantity, Tolerances};

/// Datums that coincide with WGS84 at the accuracy of a datum shift.
pub const NULL_DATUMS: &[&str] = &[
    WGS84_DATUM,
    "NAD83",
    "GDA94",
    "NZGD2000",
    "ETRF89",
    "ETRS89",
    "CSRS",
    "SIRGAS2000",
    "HARN",
];

pub fn is_null_datum_name(name: &str) -> bool {
    NULL_DATUMS.iter().any(|n| eq_key(n, name))
}

/// Result of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Number of fields outside their tolerance.
    pub differences: usize,
    /// Description of the first such field.
    pub first_difference: Option<String>,
    /// Worst positional divergence of a single field, meters. Zero when
    /// equivalent.
    pub quality_m: f64,
}

impl Comparison {
    pub fn is_equivalent(&self) -> bool {
        self.differences == 0
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.first_difference {
            None => write!(f, "equivalent"),
            Some(first) => write!(
                f,
                "{} difference(s), first: {first}; quality {:.3} m",
                self.differences, self.quality_m
            ),
        }
    }
}

struct Collector {
    tolerances: Tolerances,
    comparison: Comparison,
}

impl Collector {
    fn new(tolerances: Tolerances) -> Self {
        Collector {
            tolerances,
            comparison: Comparison {
                differences: 0,
                first_difference: None,
                quality_m: 0.0,
            },
        }
    }

    fn record(&mut self, description: String, quality: f64) {
        self.comparison.differences += 1;
        self.comparison.quality_m = self.comparison.quality_m.max(quality);
        self.comparison.first_difference.get_or_insert(description);
    }

    fn value(&mut self, label: &str, quantity: Quantity, original: f64, revised: f64) {
        let delta = revised - original;
        if delta.abs() > self.tolerances.of(quantity) {
            self.record(
                format!("{label}: {original} vs {revised}"),
                tolerance::meters(quantity, delta),
            );
        }
    }

    fn name(&mut self, label: &str, original: &str, revised: &str) {
        if !eq_key(original, revised) {
            self.record(format!("{label}: {original} vs {revised}"), f64::INFINITY);
        }
    }

    fn finish(self) -> Comparison {
        self.comparison
    }
}

// ---------------------------------------------------------------------------
// Ellipsoids and datums
// ---------------------------------------------------------------------------

/// Compare two ellipsoids by their radii.
pub fn compare_ellipsoids(original: &EllipsoidDef, revised: &EllipsoidDef) -> Comparison {
    let mut c = Collector::new(Tolerances::default());
    c.value("equatorial radius", Quantity::Linear, original.e_rad, revised.e_rad);
    c.value("polar radius", Quantity::Linear, original.p_rad, revised.p_rad);
    c.finish()
}

/// Shift parameters in the position-vector convention, `None` for methods
/// whose parameters are not geocentric.
pub(crate) fn effective_shift(datum: &DatumDef) -> Option<([f64; 3], [f64; 3], f64)> {
    if datum.to84_via == To84Via::Wgs84Equivalent {
        return Some(([0.0; 3], [0.0; 3], 0.0));
    }
    let (translation, rotation, scale) = datum.to84_via.parameter_usage();
    if !translation {
        return None;
    }
    let sign = if datum.to84_via == To84Via::SevenParameter { -1.0 } else { 1.0 };
    Some((
        datum.delta,
        if rotation { datum.rotation.map(|r| sign * r) } else { [0.0; 3] },
        if scale { datum.bwscale } else { 0.0 },
    ))
}

/// `true` when the datum does not shift coordinates relative to WGS84.
pub fn is_null_shift(datum: &DatumDef) -> bool {
    matches!(effective_shift(datum), Some((d, r, s)) if d == [0.0; 3] && r == [0.0; 3] && s == 0.0)
}

/// Compare two datums: ellipsoid and effective shift to WGS84.
pub fn compare_datums(original: &DatumDef, revised: &DatumDef) -> Comparison {
    let mut c = Collector::new(Tolerances::default());
    c.name("ellipsoid", &original.ell_knm, &revised.ell_knm);

    if is_null_shift(original) && is_null_shift(revised) {
        return c.finish();
    }
    match (effective_shift(original), effective_shift(revised)) {
        (Some((d1, r1, s1)), Some((d2, r2, s2))) => {
            for (axis, i) in ["x", "y", "z"].into_iter().zip(0..) {
                c.value(&format!("delta {axis}"), Quantity::Linear, d1[i], d2[i]);
            }
            for (axis, i) in ["x", "y", "z"].into_iter().zip(0..) {
                c.value(&format!("rotation {axis}"), Quantity::Rotation, r1[i], r2[i]);
            }
            c.value("scale", Quantity::Ppm, s1, s2);
        }
        _ => {
            if original.to84_via != revised.to84_via {
                c.record(
                    format!("method: {} vs {}", original.to84_via, revised.to84_via),
                    f64::INFINITY,
                );
            }
        }
    }
    c.finish()
}

// ---------------------------------------------------------------------------
// Coordinate systems
// ---------------------------------------------------------------------------

/// What a coordinate system is referenced to, as far as comparison goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceInfo {
    pub shape: Ellipsoid,
    pub null_datum: bool,
}

impl ReferenceInfo {
    /// Guess from the names alone: WGS84 shape, null datum from [`NULL_DATUMS`].
    pub fn from_names(def: &CoordSysDef) -> Self {
        ReferenceInfo {
            shape: Ellipsoid::wgs84(),
            null_datum: def.is_geodetic() && is_null_datum_name(&def.dat_knm),
        }
    }
}

/// Fill in and rewrite `def` into the canonical representation of its family.
pub(crate) fn normalize(def: &CoordSysDef, shape: Ellipsoid) -> Result<(CoordSysDef, &'static ProjectionInfo), GeoframeError> {
    let mut def = fill_in(def)?;
    let mut proj = projection_by_key(&def.prj_knm)?;

    match proj.key {
        "UTM" | "GAUSSK" => {
            // fill_in already derived the meridian, scale and false origin
            let cm = def.org_lng;
            def.prm = [0.0; PRJ_PARAM_COUNT];
            def.prm[0] = cm;
            proj = projection_by_key("TM")?;
            def.prj_knm = proj.key.to_string();
        }
        "MRCAT" => {
            let cm = def.prm[0];
            def.scl_red = msfn(def.prm[1].to_radians(), shape.e_sq);
            def.prm = [0.0; PRJ_PARAM_COUNT];
            def.prm[0] = cm;
            proj = projection_by_key("MRCATK")?;
            def.prj_knm = proj.key.to_string();
        }
        _ => {}
    }

    if let (Some(a), Some(b)) = (
        proj.slot_of(ParamRole::StandardParallel1),
        proj.slot_of(ParamRole::StandardParallel2),
    ) {
        if def.prm[a] > def.prm[b] {
            def.prm.swap(a, b);
        }
    }
    Ok((def, proj))
}

fn param_quantity(kind: ParamKind) -> Quantity {
    match kind {
        ParamKind::Longitude | ParamKind::Latitude | ParamKind::Azimuth | ParamKind::AngularDistance => {
            Quantity::Angle
        }
        ParamKind::Linear => Quantity::Linear,
        ParamKind::Coefficient => Quantity::Scale,
        ParamKind::Integer => Quantity::Code,
    }
}

/// Compare two coordinate systems, guessing their references from the names.
pub fn compare_coordsys(original: &CoordSysDef, revised: &CoordSysDef) -> Result<Comparison, GeoframeError> {
    compare_coordsys_with(
        original,
        ReferenceInfo::from_names(original),
        revised,
        ReferenceInfo::from_names(revised),
    )
}

/// Compare two coordinate systems.
///
/// Arguments
/// -----------------
/// * `original`, `revised`: the two definitions, filled in or not
/// * `original_ref`, `revised_ref`: the shapes and null-datum status of their references
///
/// Return
/// ----------
/// * The comparison, or `UnknownProjection` / `UnknownUnit` when either
///   definition does not resolve.
pub fn compare_coordsys_with(
    original: &CoordSysDef,
    original_ref: ReferenceInfo,
    revised: &CoordSysDef,
    revised_ref: ReferenceInfo,
) -> Result<Comparison, GeoframeError> {
    let (a, proj) = normalize(original, original_ref.shape)?;
    let (b, proj_b) = normalize(revised, revised_ref.shape)?;
    let mut c = Collector::new(Tolerances::default());

    if proj.code != proj_b.code {
        c.name("projection", proj.key, proj_b.key);
        return Ok(c.finish());
    }

    if a.is_geodetic() != b.is_geodetic() {
        c.record(
            format!("reference: {} vs {}", a.reference_name(), b.reference_name()),
            f64::INFINITY,
        );
    } else if !eq_key(a.reference_name(), b.reference_name())
        && !(a.is_geodetic() && original_ref.null_datum && revised_ref.null_datum)
    {
        let label = if a.is_geodetic() { "datum" } else { "ellipsoid" };
        let quality = (original_ref.shape.a - revised_ref.shape.a)
            .abs()
            .max((original_ref.shape.b() - revised_ref.shape.b()).abs());
        c.record(
            format!("{label}: {} vs {}", a.reference_name(), b.reference_name()),
            quality,
        );
    }

    if a.quad != b.quad {
        c.record(format!("quadrant: {} vs {}", a.quad, b.quad), f64::INFINITY);
    }

    let geographic = proj.is_geographic();
    let offset_quantity = if geographic { Quantity::Angle } else { Quantity::Linear };
    c.value("unit scale", Quantity::Scale, a.unit_scl, b.unit_scl);
    c.value("map scale", Quantity::Scale, a.map_scl, b.map_scl);
    c.value("false easting", offset_quantity, a.x_off * a.unit_scl, b.x_off * b.unit_scl);
    c.value("false northing", offset_quantity, a.y_off * a.unit_scl, b.y_off * b.unit_scl);

    if proj.has(ProjFlags::ORG_LNG) || geographic {
        c.value("origin longitude", Quantity::Angle, a.org_lng, b.org_lng);
    }
    if proj.has(ProjFlags::ORG_LAT) {
        c.value("origin latitude", Quantity::Angle, a.org_lat, b.org_lat);
    }
    if proj.has(ProjFlags::SCL_RED) {
        c.value("scale reduction", Quantity::Scale, a.scl_red, b.scl_red);
    }

    for (slot, role) in proj.params.iter().enumerate() {
        let quantity = param_quantity(role.kind());
        let (va, vb) = match quantity {
            Quantity::Linear => (a.prm[slot] * a.unit_scl, b.prm[slot] * b.unit_scl),
            _ => (a.prm[slot], b.prm[slot]),
        };
        let label = role.label();
        if quantity == Quantity::Code {
            if va.round() != vb.round() {
                c.record(format!("{label}: {va} vs {vb}"), f64::INFINITY);
            }
        } else {
            c.value(label, quantity, va, vb);
        }
    }
    Ok(c.finish())
}

#[cfg(test)]
mod test_comparator {
    use super::*;
    use crate::dictionary::coordsys_def::test_coordsys_def::utm31n;

    fn tm_equivalent_of_utm31n() -> CoordSysDef {
        let mut tm = CoordSysDef::new("TM-3E", "TM", "METER");
        tm.dat_knm = "WGS84".into();
        tm.prm[0] = 3.0;
        tm.scl_red = 0.9996;
        tm.x_off = 500_000.0;
        tm
    }

    #[test]
    fn test_utm_equals_explicit_tm() {
        let cmp = compare_coordsys(&utm31n(), &tm_equivalent_of_utm31n()).unwrap();
        assert!(cmp.is_equivalent(), "{cmp}");
        assert_eq!(cmp.quality_m, 0.0);
    }

    #[test]
    fn test_quality_of_a_shifted_meridian() {
        let mut tm = tm_equivalent_of_utm31n();
        tm.prm[0] = 3.001;
        let cmp = compare_coordsys(&utm31n(), &tm).unwrap();
        assert_eq!(cmp.differences, 1);
        assert!(cmp.first_difference.unwrap().starts_with("central meridian"));
        assert!((cmp.quality_m - 111.0).abs() < 1e-6);

        // a second, smaller difference does not add up
        tm.x_off += 5.0;
        let cmp = compare_coordsys(&utm31n(), &tm).unwrap();
        assert_eq!(cmp.differences, 2);
        assert!((cmp.quality_m - 111.0).abs() < 1e-6);
    }

    #[test]
    fn test_feet_false_easting_matches_meters() {
        let mut feet = tm_equivalent_of_utm31n();
        feet.unit = "IFOOT".into();
        feet.x_off = 500_000.0 / 0.3048;
        let cmp = compare_coordsys(&tm_equivalent_of_utm31n(), &feet).unwrap();
        // only the unit itself differs
        assert_eq!(cmp.differences, 1);
        assert!(cmp.first_difference.unwrap().starts_with("unit scale"));
    }

    #[test]
    fn test_reversed_standard_parallels() {
        let mut a = CoordSysDef::new("LCC-A", "LM2SP", "METER");
        a.dat_knm = "NAD83".into();
        a.prm[0] = 33.0;
        a.prm[1] = 45.0;
        a.org_lng = -96.0;
        a.org_lat = 23.0;
        let mut b = a.clone();
        b.prm.swap(0, 1);
        b.dat_knm = "WGS84".into();
        let cmp = compare_coordsys(&a, &b).unwrap();
        assert!(cmp.is_equivalent(), "{cmp}");
    }

    #[test]
    fn test_gauss_kruger_and_mercator_variants() {
        let mut gk = CoordSysDef::new("GK", "GAUSSK", "METER");
        gk.dat_knm = "WGS84".into();
        gk.prm[0] = 9.0;
        let mut tm = gk.clone();
        tm.prj_knm = "TM".into();
        tm.scl_red = 1.0;
        assert!(compare_coordsys(&gk, &tm).unwrap().is_equivalent());

        let mut b = CoordSysDef::new("MERC-B", "MRCAT", "METER");
        b.dat_knm = "WGS84".into();
        b.prm[0] = 51.0;
        b.prm[1] = 42.0;
        let mut a = CoordSysDef::new("MERC-A", "MRCATK", "METER");
        a.dat_knm = "WGS84".into();
        a.prm[0] = 51.0;
        a.scl_red = msfn(42f64.to_radians(), Ellipsoid::wgs84().e_sq);
        assert!(compare_coordsys(&a, &b).unwrap().is_equivalent());
    }

    #[test]
    fn test_structural_differences() {
        let mut other = utm31n();
        other.prj_knm = "LM2SP".into();
        let cmp = compare_coordsys(&utm31n(), &other).unwrap();
        assert_eq!(cmp.differences, 1);
        assert!(cmp.quality_m.is_infinite());

        let mut south = utm31n();
        south.quad = 4;
        assert!(compare_coordsys(&utm31n(), &south).unwrap().quality_m.is_infinite());
    }

    #[test]
    fn test_null_datums_and_rotation_conventions() {
        let nad83 = DatumDef::new("NAD83", "GRS1980", To84Via::Wgs84Equivalent);
        let mut zero = DatumDef::new("GDA94-3P", "GRS1980", To84Via::ThreeParameter);
        assert!(compare_datums(&nad83, &zero).is_equivalent());
        zero.delta = [0.0, 0.0, 1.0];
        let cmp = compare_datums(&nad83, &zero);
        assert_eq!(cmp.differences, 1);
        assert!((cmp.quality_m - 1.0).abs() < 1e-12);

        let mut bursa = DatumDef::new("B", "INTNL", To84Via::BursaWolf);
        bursa.delta = [-87.0, -98.0, -121.0];
        bursa.rotation = [0.1, -0.2, 0.3];
        bursa.bwscale = 1.5;
        let mut frame = bursa.clone();
        frame.to84_via = To84Via::SevenParameter;
        frame.rotation = [-0.1, 0.2, -0.3];
        assert!(compare_datums(&bursa, &frame).is_equivalent());

        let grid = DatumDef::new("G", "INTNL", To84Via::GridFiles);
        assert!(compare_datums(&bursa, &grid).quality_m.is_infinite());
    }

    #[test]
    fn test_ellipsoids() {
        let a = EllipsoidDef::new("GRS1980", 6_378_137.0, 6_356_752.314_14);
        let b = EllipsoidDef::new("WGS84", 6_378_137.0, 6_356_752.314_245);
        assert!(compare_ellipsoids(&a, &b).is_equivalent());
        let c = EllipsoidDef::new("CLRK66", 6_378_206.4, 6_356_583.8);
        let cmp = compare_ellipsoids(&a, &c);
        assert_eq!(cmp.differences, 2);
        // the polar radius is the worst field
        assert!((cmp.quality_m - 168.514_14).abs() < 1e-6);
    }
}
