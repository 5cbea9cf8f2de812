//! # Datum to datum conversion paths
//!
//! A [`DatumConversion`] chains the geodetic transformations needed to go
//! from one datum to another:
//!
//! 1. same datum: no step at all,
//! 2. a transformation registered from source to target: one forward step,
//! 3. a reversible transformation from target to source: one inverse step,
//! 4. otherwise through WGS84: the source datum's own path to WGS84, then
//!    the target datum's path to WGS84 inverted.
//!
//! A datum's path to WGS84 is synthesized from its `to84_via` method and
//! parameters, except for regression and grid file methods, which must be
//! registered in the transformation dictionary.

use std::fmt;

use camino::Utf8PathBuf;
use tracing::debug;

use crate::{
    constants::{LlhPoint, WGS84_DATUM},
    dictionary::{
        datum_def::{DatumDef, To84Via},
        ellipsoid_def::EllipsoidDef,
        gx_def::{GeocentricParams, GxMethod, GxParameters, GxTransformDef},
        DictKind,
    },
    geodesy::Ellipsoid,
    geoframe_errors::GeoframeError,
    key_name::eq_key,
};

use super::{Converted, Direction, GxTransform, IterationControls, MethodEnv, TransformStatus};

/// Read access to the definitions a conversion is built from.
pub trait GeodeticCatalog {
    fn datum(&self, name: &str) -> Result<DatumDef, GeoframeError>;

    fn ellipsoid(&self, name: &str) -> Result<EllipsoidDef, GeoframeError>;

    /// A transformation registered from `source` to `target`, if any.
    fn find_transform(&self, source: &str, target: &str) -> Result<Option<GxTransformDef>, GeoframeError>;
}

/// Geocentric method equivalent to a datum's `to84_via`.
pub fn gx_method_for(via: To84Via) -> Option<GxMethod> {
    Some(match via {
        To84Via::Molodensky => GxMethod::Molodensky,
        To84Via::BursaWolf => GxMethod::BursaWolf,
        To84Via::SevenParameter => GxMethod::SevenParameter,
        To84Via::SixParameter => GxMethod::SixParameter,
        To84Via::FourParameter => GxMethod::FourParameter,
        To84Via::ThreeParameter => GxMethod::GeocentricTranslation,
        To84Via::Wgs84Equivalent => GxMethod::Null,
        To84Via::None | To84Via::MultipleRegression | To84Via::GridFiles => return None,
    })
}

/// The transformation taking `datum` to WGS84, `None` for WGS84 itself.
pub fn to_wgs84_def(catalog: &dyn GeodeticCatalog, datum: &DatumDef) -> Result<Option<GxTransformDef>, GeoframeError> {
    if eq_key(&datum.key_nm, WGS84_DATUM) {
        return Ok(None);
    }
    if datum.to84_via.needs_transform_record() {
        return catalog
            .find_transform(&datum.key_nm, WGS84_DATUM)?
            .map(Some)
            .ok_or_else(|| GeoframeError::NotFound {
                dictionary: DictKind::GeodeticTransform,
                key: format!("{}_to_{WGS84_DATUM}", datum.key_nm),
            });
    }
    let method = gx_method_for(datum.to84_via).ok_or_else(|| {
        GeoframeError::invalid_transform(&datum.key_nm, "no transformation method specified")
    })?;
    let params = GeocentricParams {
        delta: datum.delta,
        rotation: datum.rotation,
        scale: datum.bwscale,
    };
    let mut def = GxTransformDef::new(
        &format!("{}_to_{WGS84_DATUM}", datum.key_nm),
        &datum.key_nm,
        WGS84_DATUM,
        method,
        GxParameters::Geocentric(params),
    );
    def.desc_nm = format!("{} to WGS84 via {}", datum.key_nm, datum.to84_via);
    Ok(Some(def))
}

/// Settings shared by every step of a conversion.
#[derive(Debug, Clone)]
pub struct ConversionEnv {
    pub grid_dir: Utf8PathBuf,
    pub defaults: IterationControls,
}

impl Default for ConversionEnv {
    fn default() -> Self {
        ConversionEnv {
            grid_dir: Utf8PathBuf::from("."),
            defaults: IterationControls::default(),
        }
    }
}

fn datum_shape(catalog: &dyn GeodeticCatalog, name: &str) -> Result<Ellipsoid, GeoframeError> {
    match catalog.datum(name) {
        Ok(datum) => Ok(catalog.ellipsoid(&datum.ell_knm)?.shape()),
        Err(GeoframeError::NotFound { .. }) if eq_key(name, WGS84_DATUM) => Ok(Ellipsoid::wgs84()),
        Err(err) => Err(err),
    }
}

fn armed(
    catalog: &dyn GeodeticCatalog,
    def: GxTransformDef,
    direction: Direction,
    env: &ConversionEnv,
) -> Result<GxTransform, GeoframeError> {
    let method_env = MethodEnv {
        src_ellipsoid: datum_shape(catalog, &def.src_dt_knm)?,
        trg_ellipsoid: datum_shape(catalog, &def.trg_dt_knm)?,
        grid_dir: env.grid_dir.clone(),
        defaults: env.defaults,
    };
    let mut gx = GxTransform::new(def);
    gx.initialize(&method_env)?;
    gx.ready(direction)?;
    Ok(gx)
}

/// Chain of armed transformations between two datums.
#[derive(Debug)]
pub struct DatumConversion {
    source: String,
    target: String,
    steps: Vec<GxTransform>,
}

impl DatumConversion {
    /// Build the conversion from `source` to `target`.
    ///
    /// Arguments
    /// -----------------
    /// * `catalog`: Where datum, ellipsoid and transformation definitions are read.
    /// * `source`, `target`: Datum key names.
    /// * `env`: Grid directory and iteration defaults.
    ///
    /// Return
    /// ----------
    /// * The armed chain, or the first lookup or initialization error.
    pub fn build(
        catalog: &dyn GeodeticCatalog,
        source: &str,
        target: &str,
        env: &ConversionEnv,
    ) -> Result<Self, GeoframeError> {
        let mut steps = Vec::new();

        if !eq_key(source, target) {
            if let Some(def) = catalog.find_transform(source, target)? {
                steps.push(armed(catalog, def, Direction::Forward, env)?);
            } else if let Some(def) = catalog
                .find_transform(target, source)?
                .filter(|def| def.reversible)
            {
                steps.push(armed(catalog, def, Direction::Inverse, env)?);
            } else {
                let src = catalog.datum(source)?;
                let trg = catalog.datum(target)?;
                if let Some(def) = to_wgs84_def(catalog, &src)? {
                    steps.push(armed(catalog, def, Direction::Forward, env)?);
                }
                if let Some(def) = to_wgs84_def(catalog, &trg)? {
                    steps.push(armed(catalog, def, Direction::Inverse, env)?);
                }
            }
        }

        debug!(
            source,
            target,
            steps = steps.len(),
            "datum conversion built"
        );
        Ok(DatumConversion {
            source: source.to_string(),
            target: target.to_string(),
            steps,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Names of the chained transformations and their directions.
    pub fn path(&self) -> Vec<(&str, Direction)> {
        self.steps
            .iter()
            .map(|gx| {
                let direction = match gx.state() {
                    super::GxState::InverseReady => Direction::Inverse,
                    _ => Direction::Forward,
                };
                (gx.def().key_nm.as_str(), direction)
            })
            .collect()
    }

    /// `true` when no step changes coordinates.
    pub fn is_null(&self) -> bool {
        self.steps.iter().all(|gx| gx.def().method == GxMethod::Null)
    }

    pub fn is_reentrant(&self) -> bool {
        self.steps.iter().all(GxTransform::is_reentrant)
    }

    /// Convert one point, reporting the most severe status of the chain.
    pub fn convert(&self, ll: &LlhPoint) -> Result<Converted, GeoframeError> {
        let mut point = *ll;
        let mut status = TransformStatus::Ok;
        for gx in &self.steps {
            let step = gx.convert(&point)?;
            point = step.point;
            status = status.worst(step.status);
        }
        Ok(Converted { point, status })
    }
}

impl fmt::Display for DatumConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)?;
        for (name, direction) in self.path() {
            match direction {
                Direction::Forward => write!(f, " [{name}]")?,
                Direction::Inverse => write!(f, " [{name}]^-1")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_conversion {
    use super::*;
    use crate::datum_xfrm::test_pipeline::translation_mulreg;
    use crate::key_name::fold_key;
    use approx::assert_abs_diff_eq;
    use std::collections::HashMap;

    #[derive(Default)]
    pub(crate) struct MemoryCatalog {
        pub datums: HashMap<String, DatumDef>,
        pub ellipsoids: HashMap<String, EllipsoidDef>,
        pub transforms: Vec<GxTransformDef>,
    }

    impl MemoryCatalog {
        pub(crate) fn sample() -> Self {
            let mut cat = MemoryCatalog::default();
            for ell in [
                EllipsoidDef::new("WGS84", 6_378_137.0, 6_356_752.314_245),
                EllipsoidDef::new("CLRK66", 6_378_206.4, 6_356_583.8),
                EllipsoidDef::new("INTNL", 6_378_388.0, 6_356_911.946_13),
            ] {
                cat.ellipsoids.insert(fold_key(&ell.key_nm), ell);
            }

            let mut nad27 = DatumDef::new("NAD27", "CLRK66", To84Via::Molodensky);
            nad27.delta = [-8.0, 160.0, 176.0];
            let mut ed50 = DatumDef::new("ED50", "INTNL", To84Via::BursaWolf);
            ed50.delta = [-87.0, -98.0, -121.0];
            ed50.rotation = [0.1, -0.2, 0.3];
            ed50.bwscale = 1.5;
            let mut local = DatumDef::new("LOCAL", "WGS84", To84Via::MultipleRegression);
            local.desc_nm = "regression datum".into();
            for dt in [
                DatumDef::new("WGS84", "WGS84", To84Via::Wgs84Equivalent),
                DatumDef::new("NAD83", "WGS84", To84Via::Wgs84Equivalent),
                DatumDef::new("TEST1", "WGS84", To84Via::None),
                nad27,
                ed50,
                local,
            ] {
                cat.datums.insert(fold_key(&dt.key_nm), dt);
            }
            cat.transforms.push(translation_mulreg());
            cat
        }
    }

    impl GeodeticCatalog for MemoryCatalog {
        fn datum(&self, name: &str) -> Result<DatumDef, GeoframeError> {
            self.datums.get(&fold_key(name)).cloned().ok_or_else(|| GeoframeError::NotFound {
                dictionary: DictKind::Datum,
                key: name.to_string(),
            })
        }

        fn ellipsoid(&self, name: &str) -> Result<EllipsoidDef, GeoframeError> {
            self.ellipsoids.get(&fold_key(name)).cloned().ok_or_else(|| GeoframeError::NotFound {
                dictionary: DictKind::Ellipsoid,
                key: name.to_string(),
            })
        }

        fn find_transform(&self, source: &str, target: &str) -> Result<Option<GxTransformDef>, GeoframeError> {
            Ok(self
                .transforms
                .iter()
                .find(|gx| eq_key(&gx.src_dt_knm, source) && eq_key(&gx.trg_dt_knm, target))
                .cloned())
        }
    }

    #[test]
    fn test_identity_and_null_paths() {
        let cat = MemoryCatalog::sample();
        let env = ConversionEnv::default();
        let same = DatumConversion::build(&cat, "nad27", "NAD27", &env).unwrap();
        assert!(same.path().is_empty());

        let null = DatumConversion::build(&cat, "NAD83", "WGS84", &env).unwrap();
        assert!(null.is_null());
        let p = [-100.0, 40.0, 10.0];
        assert_eq!(null.convert(&p).unwrap().point, p);
    }

    #[test]
    fn test_hub_path_round_trip() {
        let cat = MemoryCatalog::sample();
        let env = ConversionEnv::default();
        let there = DatumConversion::build(&cat, "NAD27", "ED50", &env).unwrap();
        assert_eq!(
            there.path(),
            [
                ("NAD27_to_WGS84", Direction::Forward),
                ("ED50_to_WGS84", Direction::Inverse)
            ]
        );
        assert_eq!(there.to_string(), "NAD27 -> ED50 [NAD27_to_WGS84] [ED50_to_WGS84]^-1");

        let back = DatumConversion::build(&cat, "ED50", "NAD27", &env).unwrap();
        let p = [5.0, 50.0, 0.0];
        let q = there.convert(&p).unwrap();
        assert_eq!(q.status, TransformStatus::Ok);
        let r = back.convert(&q.point).unwrap();
        assert_abs_diff_eq!(r.point[0], p[0], epsilon = 1e-6);
        assert_abs_diff_eq!(r.point[1], p[1], epsilon = 1e-6);
    }

    #[test]
    fn test_registered_transform_used_both_ways() {
        let cat = MemoryCatalog::sample();
        let env = ConversionEnv::default();
        let fwd = DatumConversion::build(&cat, "LOCAL", "WGS84", &env).unwrap();
        assert_eq!(fwd.path(), [("TRANSLATE", Direction::Forward)]);
        let inv = DatumConversion::build(&cat, "WGS84", "LOCAL", &env).unwrap();
        assert_eq!(inv.path(), [("TRANSLATE", Direction::Inverse)]);
        // LOCAL to NAD83 has no direct entry: regression then null datum.
        let hub = DatumConversion::build(&cat, "LOCAL", "NAD83", &env).unwrap();
        assert_eq!(hub.path().len(), 2);
    }

    #[test]
    fn test_missing_method_and_registration() {
        let mut cat = MemoryCatalog::sample();
        let env = ConversionEnv::default();
        let err = DatumConversion::build(&cat, "TEST1", "WGS84", &env).unwrap_err();
        assert!(matches!(err, GeoframeError::InvalidTransform { .. }));

        cat.transforms.clear();
        let err = DatumConversion::build(&cat, "LOCAL", "NAD27", &env).unwrap_err();
        assert!(matches!(
            err,
            GeoframeError::NotFound {
                dictionary: DictKind::GeodeticTransform,
                ..
            }
        ));
    }
}
