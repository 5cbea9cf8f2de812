//! Resolved definitions: what the caches hold and the transformations consume.
//!
//! A [`ResolvedCoordSys`] is a coordinate system passed through
//! [`fill_in`], linked to its projection descriptor, unit and reference
//! (datum or ellipsoid), with the projection formulas selected.

use std::fmt;

use tracing::debug;

use crate::{
    constants::{Degree, LlhPoint},
    dictionary::{coordsys_def::CoordSysDef, datum_def::DatumDef, ellipsoid_def::EllipsoidDef},
    geodesy::Ellipsoid,
    geoframe_errors::{GeoframeError, ValidationErrors},
    key_name::eq_key,
    projection::{fill_in::fill_in, math::Projector, projection_by_key, ProjFlags, ProjectionInfo},
    units::{unit_by_name, UnitInfo, UnitKind},
};

/// A datum with its ellipsoid.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDatum {
    pub def: DatumDef,
    pub ellipsoid: EllipsoidDef,
    /// Not read from a dictionary (e.g. a WKT `TOWGS84`): the name alone
    /// does not identify it.
    ad_hoc: bool,
}

impl ResolvedDatum {
    pub fn new(def: DatumDef, ellipsoid: EllipsoidDef) -> Result<Self, GeoframeError> {
        if !eq_key(&def.ell_knm, &ellipsoid.key_nm) {
            return Err(GeoframeError::Validation(ValidationErrors::single(
                &def.key_nm,
                format!(
                    "datum references ellipsoid {} but {} was supplied",
                    def.ell_knm, ellipsoid.key_nm
                ),
            )));
        }
        Ok(ResolvedDatum {
            def,
            ellipsoid,
            ad_hoc: false,
        })
    }

    /// A datum defined outside the dictionaries.
    pub fn ad_hoc(def: DatumDef, ellipsoid: EllipsoidDef) -> Result<Self, GeoframeError> {
        let mut datum = ResolvedDatum::new(def, ellipsoid)?;
        datum.ad_hoc = true;
        Ok(datum)
    }

    pub fn is_ad_hoc(&self) -> bool {
        self.ad_hoc
    }

    pub fn key_name(&self) -> &str {
        &self.def.key_nm
    }

    pub fn shape(&self) -> Ellipsoid {
        self.ellipsoid.shape()
    }
}

/// What a coordinate system is referenced to.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    Datum(ResolvedDatum),
    /// Cartographically referenced: no datum shift is possible.
    Ellipsoid(EllipsoidDef),
}

#[derive(Debug)]
pub struct ResolvedCoordSys {
    /// The definition after fill-in.
    pub def: CoordSysDef,
    pub projection: &'static ProjectionInfo,
    pub unit: &'static UnitInfo,
    pub reference: Reference,
    /// `None` when the projection has no formulas in this build.
    projector: Option<Projector>,
}

fn invalid(key: &str, message: impl Into<String>) -> GeoframeError {
    GeoframeError::Validation(ValidationErrors::single(key, message))
}

impl ResolvedCoordSys {
    /// Resolve a definition against its (already loaded) reference.
    ///
    /// Arguments
    /// -----------------
    /// * `def`: the definition as stored; it is filled in here
    /// * `reference`: the datum or ellipsoid named by the definition
    ///
    /// Return
    /// ----------
    /// * The resolved system, or a validation error when the unit kind does
    ///   not match the projection or the reference does not match the names
    ///   in the definition.
    pub fn new(def: &CoordSysDef, reference: Reference) -> Result<Self, GeoframeError> {
        let def = fill_in(def)?;
        let projection = projection_by_key(&def.prj_knm)?;
        let unit = unit_by_name(&def.unit)?;

        let wanted = if projection.is_geographic() {
            UnitKind::Angular
        } else {
            UnitKind::Linear
        };
        if unit.kind != wanted {
            return Err(invalid(
                &def.key_nm,
                format!("unit {} cannot be used with projection {}", unit.name, projection.key),
            ));
        }

        let shape = match &reference {
            Reference::Datum(datum) => {
                if !eq_key(&def.dat_knm, datum.key_name()) {
                    return Err(invalid(&def.key_nm, format!("expected datum {}", def.dat_knm)));
                }
                datum.shape()
            }
            Reference::Ellipsoid(ellipsoid) => {
                if !eq_key(&def.elp_knm, &ellipsoid.key_nm) {
                    return Err(invalid(&def.key_nm, format!("expected ellipsoid {}", def.elp_knm)));
                }
                ellipsoid.shape()
            }
        };

        let projector = if projection.has(ProjFlags::NON_EARTH) {
            None
        } else {
            match Projector::new(&def, shape) {
                Ok(projector) => Some(projector),
                Err(GeoframeError::ProjectionNotSupported(key)) => {
                    debug!(key = %def.key_nm, projection = %key, "resolved without conversion formulas");
                    None
                }
                Err(err) => return Err(err),
            }
        };

        Ok(ResolvedCoordSys {
            def,
            projection,
            unit,
            reference,
            projector,
        })
    }

    pub fn key_name(&self) -> &str {
        &self.def.key_nm
    }

    pub fn datum(&self) -> Option<&ResolvedDatum> {
        match &self.reference {
            Reference::Datum(datum) => Some(datum),
            Reference::Ellipsoid(_) => None,
        }
    }

    pub fn ellipsoid(&self) -> &EllipsoidDef {
        match &self.reference {
            Reference::Datum(datum) => &datum.ellipsoid,
            Reference::Ellipsoid(ellipsoid) => ellipsoid,
        }
    }

    pub fn is_geographic(&self) -> bool {
        self.projection.is_geographic()
    }

    pub fn can_convert(&self) -> bool {
        self.projector.is_some()
    }

    fn projector(&self) -> Result<&Projector, GeoframeError> {
        self.projector
            .as_ref()
            .ok_or_else(|| GeoframeError::ProjectionNotSupported(self.projection.key.to_string()))
    }

    /// System coordinates to geographic `[lng, lat, h]`; the height passes through.
    pub fn to_geographic(&self, point: [f64; 3]) -> Result<LlhPoint, GeoframeError> {
        let [lng, lat] = self.projector()?.unproject(point[0], point[1])?;
        Ok([lng, lat, point[2]])
    }

    /// Geographic `[lng, lat, h]` to system coordinates.
    pub fn from_geographic(&self, llh: &LlhPoint) -> Result<[f64; 3], GeoframeError> {
        let [x, y] = self.projector()?.project(llh[0], llh[1])?;
        Ok([x, y, llh[2]])
    }

    /// `true` when `lng`/`lat` lie inside the useful range of the system.
    pub fn in_useful_range(&self, lng: Degree, lat: Degree) -> bool {
        let [min_lng, min_lat] = self.def.ll_min;
        let [max_lng, max_lat] = self.def.ll_max;
        self.def.ll_extents_empty() || (lng >= min_lng && lng <= max_lng && lat >= min_lat && lat <= max_lat)
    }
}

impl fmt::Display for ResolvedCoordSys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reference = match &self.reference {
            Reference::Datum(datum) => format!("datum {}", datum.key_name()),
            Reference::Ellipsoid(ellipsoid) => format!("ellipsoid {}", ellipsoid.key_nm),
        };
        write!(
            f,
            "{} [{} / {} / {}]",
            self.def.key_nm, self.projection.key, self.unit.name, reference
        )
    }
}

#[cfg(test)]
pub(crate) mod test_resolved {
    use super::*;
    use crate::dictionary::{coordsys_def::test_coordsys_def::utm31n, datum_def::To84Via};

    pub(crate) fn wgs84_datum() -> ResolvedDatum {
        let ellipsoid = EllipsoidDef::new("WGS84", 6_378_137.0, 6_356_752.314_245);
        ResolvedDatum::new(DatumDef::new("WGS84", "WGS84", To84Via::Wgs84Equivalent), ellipsoid).unwrap()
    }

    #[test]
    fn test_resolve_utm() {
        let cs = ResolvedCoordSys::new(&utm31n(), Reference::Datum(wgs84_datum())).unwrap();
        assert!(cs.can_convert());
        assert_eq!(cs.to_string(), "UTM84-31N [UTM / METER / datum WGS84]");
        let xy = cs.from_geographic(&[3.0, 0.0, 12.0]).unwrap();
        assert!((xy[0] - 500_000.0).abs() < 1e-6);
        assert_eq!(xy[2], 12.0);
        assert!(cs.in_useful_range(4.0, 45.0));
        assert!(!cs.in_useful_range(7.0, 45.0));
    }

    #[test]
    fn test_unit_kind_mismatch() {
        let mut def = utm31n();
        def.unit = "DEGREE".into();
        assert!(matches!(
            ResolvedCoordSys::new(&def, Reference::Datum(wgs84_datum())),
            Err(GeoframeError::Validation(_))
        ));
    }

    #[test]
    fn test_wrong_reference() {
        let def = utm31n();
        let other = EllipsoidDef::new("CLRK66", 6_378_206.4, 6_356_583.8);
        assert!(ResolvedCoordSys::new(&def, Reference::Ellipsoid(other)).is_err());
    }

    #[test]
    fn test_formulas_missing_reported_at_conversion() {
        let mut def = CoordSysDef::new("WORLD-ROBIN", "ROBIN", "METER");
        def.dat_knm = "WGS84".into();
        let cs = ResolvedCoordSys::new(&def, Reference::Datum(wgs84_datum())).unwrap();
        assert!(!cs.can_convert());
        assert_eq!(
            cs.to_geographic([0.0, 0.0, 0.0]).unwrap_err(),
            GeoframeError::ProjectionNotSupported("ROBIN".into())
        );
    }
}
