//! # Geoframe: dictionaries, caches and coordinate conversion
//!
//! This module defines the [`Geoframe`](crate::geoframe::Geoframe) struct, the context every
//! consumer goes through. It wires together:
//!
//! 1. **Dictionaries** ([`DictionaryFile`]): coordinate systems, datums and
//!    ellipsoids, plus the optional geodetic transformation dictionary.
//! 2. **Object caches** ([`ObjectCache`]): resolved coordinate systems by key
//!    name and datum conversions by `(source, target)` pair.
//! 3. **Memoised enumerations**: key name lists per dictionary and per group.
//!
//! Every entry point takes `&Geoframe`; the caches sit behind their own
//! locks, so a context can be shared between threads.
//!
//! ## Typical usage
//!
//! ```rust, no_run
//! use geoframe::config::EngineConfig;
//! use geoframe::geoframe::{CoordSysSource, Geoframe};
//!
//! let frame = Geoframe::new(EngineConfig::new("/opt/geodata/dict")).unwrap();
//!
//! // Cached: the second call for the same name is a cache hit
//! let utm = frame.create(CoordSysSource::from("UTM27-17")).unwrap();
//! let ll = frame.create("LL84".into()).unwrap();
//!
//! let converted = frame.transform_point(&utm, &ll, [630_000.0, 4_830_000.0, 0.0]).unwrap();
//! println!("{:?} ({})", converted.point, converted.status);
//! ```
//!
//! ## Notes
//!
//! - Definitions given directly ([`CoordSysSource::Definition`]) or as WKT
//!   ([`CoordSysSource::Wkt`]) are resolved on every call and never cached.
//! - A WKT datum that matches a dictionary datum of the same name is
//!   replaced by the dictionary one. A WKT datum with `TOWGS84` that does not
//!   is used as given; without `TOWGS84` it must exist in the dictionary.
//! - A system referenced to an ellipsoid only takes no datum shift.
//!
//! ## See also
//! ------------
//! * [`ResolvedCoordSys`] – What [`create`](Geoframe::create) returns.
//! * [`DatumConversion`] – The datum step of a transformation.
//! * [`EngineConfig`] – Dictionary locations and cache capacities.

use std::{collections::HashMap, fmt, sync::Arc};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    cache::{CacheStats, CsKey, DatumPairKey, ObjectCache},
    comparator::{compare_coordsys_with, compare_datums, compare_ellipsoids, is_null_shift, Comparison, ReferenceInfo},
    config::EngineConfig,
    constants::KEY_NAME_LEN,
    datum_xfrm::{
        conversion::{ConversionEnv, DatumConversion, GeodeticCatalog},
        Converted, TransformStatus,
    },
    dictionary::{
        coordsys_def::CoordSysDef,
        datum_def::{DatumDef, To84Via},
        ellipsoid_def::EllipsoidDef,
        gx_def::GxTransformDef,
        store::DictionaryFile,
        DictKind,
    },
    geoframe_errors::{GeoframeError, ValidationErrors},
    key_name::{eq_key, fold_key, validate_key_name},
    resolved::{Reference, ResolvedCoordSys, ResolvedDatum},
    wkt::{from_wkt, WktDefinition},
};

/// Where a coordinate system definition comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordSysSource {
    /// Key name in the coordinate system dictionary.
    Key(String),
    /// A definition built by the caller.
    Definition(CoordSysDef),
    /// OGC WKT1 text.
    Wkt(String),
}

impl From<&str> for CoordSysSource {
    fn from(name: &str) -> Self {
        CoordSysSource::Key(name.to_string())
    }
}

impl From<CoordSysDef> for CoordSysSource {
    fn from(def: CoordSysDef) -> Self {
        CoordSysSource::Definition(def)
    }
}

/// Counters of both caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextStats {
    pub coordsys: CacheStats,
    pub datum: CacheStats,
}

#[derive(Default)]
struct Enumerations {
    names: HashMap<DictKind, Arc<Vec<String>>>,
    groups: HashMap<String, Arc<Vec<String>>>,
}

/// Registered transformations by folded `(source, target)` datum names.
type GxIndex = HashMap<(String, String), String>;

pub struct Geoframe {
    config: EngineConfig,
    coordsys: DictionaryFile<CoordSysDef>,
    datums: DictionaryFile<DatumDef>,
    ellipsoids: DictionaryFile<EllipsoidDef>,
    transforms: Option<DictionaryFile<GxTransformDef>>,
    gx_index: OnceCell<GxIndex>,
    cs_cache: ObjectCache<CsKey, ResolvedCoordSys>,
    dt_cache: ObjectCache<DatumPairKey, DatumConversion>,
    enumerations: Mutex<Enumerations>,
}

impl fmt::Debug for Geoframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Geoframe")
            .field("config", &self.config)
            .field("coordsys", &self.coordsys.len())
            .field("datums", &self.datums.len())
            .field("ellipsoids", &self.ellipsoids.len())
            .field("transforms", &self.transforms.as_ref().map(DictionaryFile::len))
            .finish()
    }
}

fn open_transforms(config: &EngineConfig) -> Result<Option<DictionaryFile<GxTransformDef>>, GeoframeError> {
    let path = config.dictionary_path(DictKind::GeodeticTransform);
    if path.exists() {
        DictionaryFile::open(&path).map(Some)
    } else {
        debug!(%path, "no geodetic transformation dictionary, datums go through WGS84");
        Ok(None)
    }
}

impl Geoframe {
    /// Open the dictionaries named by `config`.
    ///
    /// Arguments
    /// -----------------
    /// * `config`: Dictionary locations, grid directory and cache capacities.
    ///
    /// Return
    /// ----------
    /// * The context, or the error of the first dictionary that cannot be
    ///   opened. Only the geodetic transformation dictionary may be missing.
    pub fn new(config: EngineConfig) -> Result<Self, GeoframeError> {
        let coordsys = DictionaryFile::open(&config.dictionary_path(DictKind::CoordSys))?;
        let datums = DictionaryFile::open(&config.dictionary_path(DictKind::Datum))?;
        let ellipsoids = DictionaryFile::open(&config.dictionary_path(DictKind::Ellipsoid))?;
        let transforms = open_transforms(&config)?;

        info!(
            dir = %config.dictionary_dir,
            coordsys = coordsys.len(),
            datums = datums.len(),
            ellipsoids = ellipsoids.len(),
            "geoframe context ready"
        );
        Ok(Geoframe {
            cs_cache: ObjectCache::new("coordsys", config.coordsys_cache),
            dt_cache: ObjectCache::new("datum conversion", config.datum_cache),
            config,
            coordsys,
            datums,
            ellipsoids,
            transforms,
            gx_index: OnceCell::new(),
            enumerations: Mutex::new(Enumerations::default()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Definitions
    // -----------------------------------------------------------------------

    pub fn coordsys_def(&self, name: &str) -> Result<CoordSysDef, GeoframeError> {
        self.coordsys.get(name)
    }

    pub fn datum_def(&self, name: &str) -> Result<DatumDef, GeoframeError> {
        self.datums.get(name)
    }

    pub fn ellipsoid_def(&self, name: &str) -> Result<EllipsoidDef, GeoframeError> {
        self.ellipsoids.get(name)
    }

    pub fn transform_def(&self, name: &str) -> Result<GxTransformDef, GeoframeError> {
        match &self.transforms {
            Some(dict) => dict.get(name),
            None => Err(GeoframeError::NotFound {
                dictionary: DictKind::GeodeticTransform,
                key: name.to_string(),
            }),
        }
    }

    /// A dictionary datum with its ellipsoid.
    pub fn resolve_datum(&self, name: &str) -> Result<ResolvedDatum, GeoframeError> {
        let def = self.datum_def(name)?;
        let ellipsoid = self.ellipsoid_def(&def.ell_knm)?;
        ResolvedDatum::new(def, ellipsoid)
    }

    fn dictionary_reference(&self, def: &CoordSysDef) -> Result<Reference, GeoframeError> {
        if !def.dat_knm.is_empty() {
            Ok(Reference::Datum(self.resolve_datum(&def.dat_knm)?))
        } else if !def.elp_knm.is_empty() {
            Ok(Reference::Ellipsoid(self.ellipsoid_def(&def.elp_knm)?))
        } else {
            Err(GeoframeError::Validation(ValidationErrors::single(
                &def.key_nm,
                "neither a datum nor an ellipsoid is specified",
            )))
        }
    }

    /// The dictionary ellipsoid with the shape of a WKT spheroid.
    ///
    /// Among the equivalent shapes, the one whose key spells the WKT name
    /// (ignoring case and separators) wins, then the closest one.
    fn match_ellipsoid(&self, spheroid: &EllipsoidDef) -> Result<Option<EllipsoidDef>, GeoframeError> {
        let spelling = |name: &str| -> String {
            name.chars()
                .filter(char::is_ascii_alphanumeric)
                .map(|c| c.to_ascii_uppercase())
                .collect()
        };
        let wanted = spelling(&spheroid.key_nm);

        let mut best: Option<(bool, f64, EllipsoidDef)> = None;
        for known in self.ellipsoids.iter()? {
            let known = known?;
            if !compare_ellipsoids(&known, spheroid).is_equivalent() {
                continue;
            }
            let named = spelling(&known.key_nm) == wanted;
            let gap = (known.e_rad - spheroid.e_rad).abs() + (known.p_rad - spheroid.p_rad).abs();
            let better = match &best {
                None => true,
                Some((best_named, best_gap, _)) => (named, -gap) > (*best_named, -best_gap),
            };
            if better {
                best = Some((named, gap, known));
            }
        }
        Ok(best.map(|(_, _, known)| known))
    }

    fn wkt_reference(&self, mut wkt: WktDefinition) -> Result<Reference, GeoframeError> {
        if let Some(known) = self.match_ellipsoid(&wkt.ellipsoid)? {
            debug!(spheroid = %wkt.ellipsoid.key_nm, ellipsoid = %known.key_nm, "WKT spheroid matched");
            if let Some(datum) = wkt.datum.as_mut() {
                datum.ell_knm = known.key_nm.clone();
            }
            wkt.ellipsoid = known;
        }
        let Some(datum) = wkt.datum else {
            return Ok(Reference::Ellipsoid(wkt.ellipsoid));
        };
        match self.resolve_datum(&datum.key_nm) {
            Ok(known) => {
                if datum.to84_via == To84Via::None
                    || compare_datums(&known.def, &datum).is_equivalent()
                {
                    return Ok(Reference::Datum(known));
                }
                warn!(
                    datum = %datum.key_nm,
                    "WKT datum differs from the dictionary datum of the same name, using the WKT one"
                );
            }
            Err(GeoframeError::NotFound { .. }) if datum.to84_via != To84Via::None => {}
            Err(err) => return Err(err),
        }
        Ok(Reference::Datum(ResolvedDatum::ad_hoc(datum, wkt.ellipsoid)?))
    }

    fn load_coordsys(&self, name: &str) -> Result<ResolvedCoordSys, GeoframeError> {
        let def = self.coordsys_def(name)?;
        let reference = self.dictionary_reference(&def)?;
        ResolvedCoordSys::new(&def, reference)
    }

    // -----------------------------------------------------------------------
    // Coordinate systems
    // -----------------------------------------------------------------------

    /// Resolve a coordinate system.
    ///
    /// Arguments
    /// -----------------
    /// * `source`: A dictionary key name (cached), a definition or WKT text
    ///   (both resolved on every call).
    ///
    /// Return
    /// ----------
    /// * The resolved system. The same `Arc` is returned for a key name as long
    ///   as it stays in the cache.
    pub fn create(&self, source: CoordSysSource) -> Result<Arc<ResolvedCoordSys>, GeoframeError> {
        match source {
            CoordSysSource::Key(name) => self
                .cs_cache
                .resolve(&CsKey::new(&name), |_| self.load_coordsys(&name)),
            CoordSysSource::Definition(def) => {
                validate_key_name(&def.key_nm, KEY_NAME_LEN)
                    .map_err(|msg| GeoframeError::Validation(ValidationErrors::single(&def.key_nm, msg)))?;
                let reference = self.dictionary_reference(&def)?;
                Ok(Arc::new(ResolvedCoordSys::new(&def, reference)?))
            }
            CoordSysSource::Wkt(text) => {
                let wkt = from_wkt(&text)?;
                let def = wkt.coordsys.clone();
                let reference = self.wkt_reference(wkt)?;
                Ok(Arc::new(ResolvedCoordSys::new(&def, reference)?))
            }
        }
    }

    /// Resolve every coordinate system of the dictionary, or of one group.
    ///
    /// The results bypass the cache. The first definition that does not
    /// resolve stops the enumeration with its error.
    pub fn create_all(&self, group: Option<&str>) -> Result<Vec<Arc<ResolvedCoordSys>>, GeoframeError> {
        let defs: Vec<CoordSysDef> = match group {
            Some(group) => self.coordsys.iter_group(group)?.collect::<Result<_, _>>()?,
            None => self.coordsys.iter()?.collect::<Result<_, _>>()?,
        };

        let mut references: HashMap<String, Reference> = HashMap::new();
        let mut systems = Vec::with_capacity(defs.len());
        for def in &defs {
            let key = fold_key(def.reference_name());
            let reference = match references.get(&key) {
                Some(reference) => reference.clone(),
                None => {
                    let reference = self.dictionary_reference(def)?;
                    references.insert(key, reference.clone());
                    reference
                }
            };
            systems.push(Arc::new(ResolvedCoordSys::new(def, reference)?));
        }
        debug!(group = ?group, count = systems.len(), "resolved coordinate systems");
        Ok(systems)
    }

    /// Compare two resolved systems, using their actual reference shapes.
    pub fn compare(&self, original: &ResolvedCoordSys, revised: &ResolvedCoordSys) -> Result<Comparison, GeoframeError> {
        compare_coordsys_with(
            &original.def,
            reference_info(original),
            &revised.def,
            reference_info(revised),
        )
    }

    // -----------------------------------------------------------------------
    // Conversion
    // -----------------------------------------------------------------------

    fn conversion_env(&self) -> ConversionEnv {
        ConversionEnv {
            grid_dir: self.config.effective_grid_dir().to_owned(),
            defaults: self.config.iteration,
        }
    }

    /// The datum conversion between two datums of the dictionary (cached).
    pub fn datum_conversion(&self, source: &str, target: &str) -> Result<Arc<DatumConversion>, GeoframeError> {
        let env = self.conversion_env();
        self.dt_cache
            .resolve(&DatumPairKey::new(source, target), |_| {
                DatumConversion::build(self, source, target, &env)
            })
    }

    /// `None` when either system is referenced to an ellipsoid only.
    fn datum_step(
        &self,
        source: &ResolvedCoordSys,
        target: &ResolvedCoordSys,
    ) -> Result<Option<Arc<DatumConversion>>, GeoframeError> {
        let (Some(src), Some(trg)) = (source.datum(), target.datum()) else {
            return Ok(None);
        };
        if !src.is_ad_hoc() && !trg.is_ad_hoc() {
            return self.datum_conversion(src.key_name(), trg.key_name()).map(Some);
        }

        if eq_key(src.key_name(), trg.key_name()) && src.def != trg.def {
            return Err(GeoframeError::invalid_transform(
                src.key_name(),
                "two different datum definitions share this name",
            ));
        }
        let catalog = AdHocCatalog {
            base: self,
            datums: [src, trg].into_iter().filter(|d| d.is_ad_hoc()).collect(),
        };
        let conversion = DatumConversion::build(&catalog, src.key_name(), trg.key_name(), &self.conversion_env())?;
        debug!(%conversion, "uncached conversion for an ad-hoc datum");
        Ok(Some(Arc::new(conversion)))
    }

    fn convert_one(
        source: &ResolvedCoordSys,
        target: &ResolvedCoordSys,
        step: Option<&DatumConversion>,
        point: [f64; 3],
    ) -> Result<Converted, GeoframeError> {
        let ll = source.to_geographic(point)?;
        let mut status = if source.in_useful_range(ll[0], ll[1]) {
            TransformStatus::Ok
        } else {
            TransformStatus::RangeWarning
        };

        let shifted = match step {
            Some(conversion) => {
                let converted = conversion.convert(&ll)?;
                status = status.worst(converted.status);
                converted.point
            }
            None => ll,
        };
        if !target.in_useful_range(shifted[0], shifted[1]) {
            status = status.worst(TransformStatus::RangeWarning);
        }

        Ok(Converted {
            point: target.from_geographic(&shifted)?,
            status,
        })
    }

    /// Convert one point from `source` to `target` coordinates.
    ///
    /// Arguments
    /// -----------------
    /// * `source`, `target`: Resolved systems, see [`create`](Geoframe::create).
    /// * `point`: `[x, y, h]` in `source` units (`[lng, lat, h]` for geographic systems).
    ///
    /// Return
    /// ----------
    /// * The converted point and the most severe status met on the way:
    ///   outside a system's useful range, fallback method, convergence or
    ///   coverage warning of the datum step.
    pub fn transform_point(
        &self,
        source: &ResolvedCoordSys,
        target: &ResolvedCoordSys,
        point: [f64; 3],
    ) -> Result<Converted, GeoframeError> {
        let step = self.datum_step(source, target)?;
        Self::convert_one(source, target, step.as_deref(), point)
    }

    /// Convert `points` in place, returning the most severe status.
    ///
    /// The datum step is looked up once for the whole slice. On error the
    /// points already converted keep their new values.
    pub fn transform_points(
        &self,
        source: &ResolvedCoordSys,
        target: &ResolvedCoordSys,
        points: &mut [[f64; 3]],
    ) -> Result<TransformStatus, GeoframeError> {
        let step = self.datum_step(source, target)?;
        let mut status = TransformStatus::Ok;
        for point in points.iter_mut() {
            let converted = Self::convert_one(source, target, step.as_deref(), *point)?;
            *point = converted.point;
            status = status.worst(converted.status);
        }
        Ok(status)
    }

    /// [`transform_point`](Geoframe::transform_point) between two dictionary systems.
    pub fn transform_by_name(&self, source: &str, target: &str, point: [f64; 3]) -> Result<Converted, GeoframeError> {
        let src = self.create(source.into())?;
        let trg = self.create(target.into())?;
        self.transform_point(&src, &trg, point)
    }

    // -----------------------------------------------------------------------
    // Enumeration
    // -----------------------------------------------------------------------

    fn memoised_names(&self, kind: DictKind) -> Result<Arc<Vec<String>>, GeoframeError> {
        if let Some(names) = self.enumerations.lock().names.get(&kind) {
            return Ok(Arc::clone(names));
        }
        let names = Arc::new(match kind {
            DictKind::CoordSys => self.coordsys.key_names()?,
            DictKind::Datum => self.datums.key_names()?,
            DictKind::Ellipsoid => self.ellipsoids.key_names()?,
            DictKind::GeodeticTransform => match &self.transforms {
                Some(dict) => dict.key_names()?,
                None => Vec::new(),
            },
        });
        Ok(Arc::clone(self.enumerations.lock().names.entry(kind).or_insert(names)))
    }

    pub fn coordsys_names(&self) -> Result<Arc<Vec<String>>, GeoframeError> {
        self.memoised_names(DictKind::CoordSys)
    }

    pub fn datum_names(&self) -> Result<Arc<Vec<String>>, GeoframeError> {
        self.memoised_names(DictKind::Datum)
    }

    pub fn ellipsoid_names(&self) -> Result<Arc<Vec<String>>, GeoframeError> {
        self.memoised_names(DictKind::Ellipsoid)
    }

    pub fn transform_names(&self) -> Result<Arc<Vec<String>>, GeoframeError> {
        self.memoised_names(DictKind::GeodeticTransform)
    }

    /// Key names of the coordinate systems in `group`, in dictionary order.
    pub fn group_members(&self, group: &str) -> Result<Arc<Vec<String>>, GeoframeError> {
        let key = fold_key(group);
        if let Some(members) = self.enumerations.lock().groups.get(&key) {
            return Ok(Arc::clone(members));
        }
        let members: Vec<String> = self
            .coordsys
            .iter_group(group)?
            .map(|item| item.map(|def| def.key_nm))
            .collect::<Result<_, _>>()?;
        Ok(Arc::clone(
            self.enumerations.lock().groups.entry(key).or_insert(Arc::new(members)),
        ))
    }

    fn gx_index(&self) -> Result<&GxIndex, GeoframeError> {
        self.gx_index.get_or_try_init(|| {
            let mut index = GxIndex::new();
            if let Some(dict) = &self.transforms {
                for def in dict.iter()? {
                    let def = def?;
                    index
                        .entry((fold_key(&def.src_dt_knm), fold_key(&def.trg_dt_knm)))
                        .or_insert(def.key_nm);
                }
            }
            debug!(transforms = index.len(), "indexed geodetic transformations");
            Ok(index)
        })
    }

    // -----------------------------------------------------------------------
    // Lifetime
    // -----------------------------------------------------------------------

    pub fn cache_stats(&self) -> ContextStats {
        ContextStats {
            coordsys: self.cs_cache.stats(),
            datum: self.dt_cache.stats(),
        }
    }

    /// Drop every cached object and memoised list.
    ///
    /// Objects still held by callers stay valid.
    pub fn release(&self) {
        self.cs_cache.clear();
        self.dt_cache.clear();
        *self.enumerations.lock() = Enumerations::default();
    }

    /// Reopen the dictionaries, after they were rewritten by a merge or a
    /// compilation, and release everything derived from the old ones.
    pub fn reopen(&mut self) -> Result<(), GeoframeError> {
        self.coordsys = DictionaryFile::open(&self.config.dictionary_path(DictKind::CoordSys))?;
        self.datums = DictionaryFile::open(&self.config.dictionary_path(DictKind::Datum))?;
        self.ellipsoids = DictionaryFile::open(&self.config.dictionary_path(DictKind::Ellipsoid))?;
        self.transforms = open_transforms(&self.config)?;
        self.gx_index.take();
        self.release();
        Ok(())
    }
}

fn reference_info(cs: &ResolvedCoordSys) -> ReferenceInfo {
    ReferenceInfo {
        shape: cs.ellipsoid().shape(),
        null_datum: cs.datum().is_some_and(|datum| is_null_shift(&datum.def)),
    }
}

impl GeodeticCatalog for Geoframe {
    fn datum(&self, name: &str) -> Result<DatumDef, GeoframeError> {
        self.datum_def(name)
    }

    fn ellipsoid(&self, name: &str) -> Result<EllipsoidDef, GeoframeError> {
        self.ellipsoid_def(name)
    }

    fn find_transform(&self, source: &str, target: &str) -> Result<Option<GxTransformDef>, GeoframeError> {
        match self.gx_index()?.get(&(fold_key(source), fold_key(target))) {
            Some(name) => self.transform_def(name).map(Some),
            None => Ok(None),
        }
    }
}

/// Dictionary lookups shadowed by datums defined outside the dictionaries.
struct AdHocCatalog<'a> {
    base: &'a Geoframe,
    datums: Vec<&'a ResolvedDatum>,
}

impl AdHocCatalog<'_> {
    fn is_ad_hoc(&self, name: &str) -> bool {
        self.datums.iter().any(|d| eq_key(d.key_name(), name))
    }
}

impl GeodeticCatalog for AdHocCatalog<'_> {
    fn datum(&self, name: &str) -> Result<DatumDef, GeoframeError> {
        match self.datums.iter().find(|d| eq_key(d.key_name(), name)) {
            Some(datum) => Ok(datum.def.clone()),
            None => self.base.datum(name),
        }
    }

    fn ellipsoid(&self, name: &str) -> Result<EllipsoidDef, GeoframeError> {
        match self.datums.iter().find(|d| eq_key(&d.ellipsoid.key_nm, name)) {
            Some(datum) => Ok(datum.ellipsoid.clone()),
            None => self.base.ellipsoid(name),
        }
    }

    fn find_transform(&self, source: &str, target: &str) -> Result<Option<GxTransformDef>, GeoframeError> {
        if self.is_ad_hoc(source) || self.is_ad_hoc(target) {
            return Ok(None);
        }
        self.base.find_transform(source, target)
    }
}

#[cfg(test)]
mod test_geoframe {
    use super::*;
    use crate::unit_test_global::BUILTIN_DICTIONARIES;
    use approx::assert_abs_diff_eq;

    fn frame() -> Geoframe {
        Geoframe::new(EngineConfig::new(&BUILTIN_DICTIONARIES.1)).unwrap()
    }

    #[test]
    fn test_create_is_cached() {
        let frame = frame();
        let a = frame.create("utm84-31n".into()).unwrap();
        let b = frame.create("UTM84-31N".into()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let stats = frame.cache_stats().coordsys;
        assert_eq!((stats.loads, stats.hits), (1, 1));

        frame.release();
        let c = frame.create("UTM84-31N".into()).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(frame.cache_stats().coordsys.loads, 2);
    }

    #[test]
    fn test_create_unknown() {
        let frame = frame();
        assert_eq!(
            frame.create("NOWHERE".into()).unwrap_err(),
            GeoframeError::NotFound {
                dictionary: DictKind::CoordSys,
                key: "NOWHERE".into()
            }
        );
    }

    #[test]
    fn test_definition_is_not_cached() {
        let frame = frame();
        let mut def = CoordSysDef::new("MY:UTM", "UTM", "METER");
        def.dat_knm = "WGS84".into();
        def.prm[0] = 31.0;
        def.prm[1] = 1.0;
        let cs = frame.create(def.into()).unwrap();
        assert_eq!(cs.def.org_lng, 3.0);
        assert_eq!(frame.cache_stats().coordsys.loads, 0);
    }

    #[test]
    fn test_utm_to_geographic() {
        let frame = frame();
        let converted = frame
            .transform_by_name("UTM84-31N", "LL84", [500_000.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(converted.status, TransformStatus::Ok);
        assert_abs_diff_eq!(converted.point[0], 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(converted.point[1], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_datum_conversion_cached_per_ordered_pair() {
        let frame = frame();
        let ed50 = frame.create("ED50.LL".into()).unwrap();
        let wgs84 = frame.create("LL84".into()).unwrap();

        let forward = frame.transform_point(&ed50, &wgs84, [2.0, 45.0, 0.0]).unwrap();
        let back = frame.transform_point(&wgs84, &ed50, forward.point).unwrap();
        assert_abs_diff_eq!(back.point[0], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(back.point[1], 45.0, epsilon = 1e-6);

        frame.transform_point(&ed50, &wgs84, [2.0, 45.0, 0.0]).unwrap();
        let stats = frame.cache_stats().datum;
        assert_eq!((stats.loads, stats.hits), (2, 1));
    }

    #[test]
    fn test_transform_points_reports_range() {
        let frame = frame();
        let ll = frame.create("LL84".into()).unwrap();
        let utm = frame.create("UTM84-31N".into()).unwrap();
        let mut points = [[3.0, 45.0, 0.0], [30.0, 45.0, 0.0]];
        let status = frame.transform_points(&ll, &utm, &mut points).unwrap();
        assert_eq!(status, TransformStatus::RangeWarning);
        assert_abs_diff_eq!(points[0][0], 500_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_enumerations() {
        let frame = frame();
        assert_eq!(frame.coordsys_names().unwrap().len(), 16);
        assert_eq!(frame.ellipsoid_names().unwrap().len(), 8);
        assert!(frame.transform_names().unwrap().is_empty());
        let utm = frame.group_members("utm").unwrap();
        assert_eq!(utm.len(), 5);
        assert!(Arc::ptr_eq(&utm, &frame.group_members("UTM").unwrap()));

        let all = frame.create_all(Some("UTM")).unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(frame.cache_stats().coordsys.loads, 0);
    }

    #[test]
    fn test_wkt_datum_matched_to_dictionary() {
        let frame = frame();
        let wkt = r#"GEOGCS["LL84",DATUM["WGS84",SPHEROID["WGS 84",6378137,298.257223563],TOWGS84[0,0,0,0,0,0,0]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]]"#;
        let cs = frame.create(CoordSysSource::Wkt(wkt.into())).unwrap();
        assert!(!cs.datum().unwrap().is_ad_hoc());
        assert_eq!(cs.ellipsoid().key_nm, "WGS84");
        assert_eq!(cs.datum().unwrap().def.key_nm, "WGS84");

        // GRS1980 lies within a millimetre of WGS84: the spelling decides
        let sphere_only = r#"GEOGCS["GRS80 based",DATUM["Not_specified_based_on_GRS_1980",SPHEROID["GRS 1980",6378137,298.257222101]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]]"#;
        let cs = frame.create(CoordSysSource::Wkt(sphere_only.into())).unwrap();
        assert_eq!(cs.ellipsoid().key_nm, "GRS1980");
    }

    #[test]
    fn test_wkt_ad_hoc_datum() {
        let frame = frame();
        let wkt = r#"GEOGCS["Shifted",DATUM["MY_DATUM",SPHEROID["GRS 1980",6378137,298.257222101],TOWGS84[100,0,0,0,0,0,0]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]]"#;
        let cs = frame.create(CoordSysSource::Wkt(wkt.into())).unwrap();
        assert!(cs.datum().unwrap().is_ad_hoc());
        assert_eq!(cs.ellipsoid().key_nm, "GRS1980");

        let wgs84 = frame.create("LL84".into()).unwrap();
        let converted = frame.transform_point(&cs, &wgs84, [0.0, 0.0, 0.0]).unwrap();
        // +100 m along X at (0, 0) only moves the height
        assert_abs_diff_eq!(converted.point[0], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(converted.point[2], 100.0, epsilon = 1e-3);
        assert_eq!(frame.cache_stats().datum.loads, 0);

        let unknown = wkt.replace(",TOWGS84[100,0,0,0,0,0,0]", "");
        assert!(matches!(
            frame.create(CoordSysSource::Wkt(unknown)),
            Err(GeoframeError::NotFound { dictionary: DictKind::Datum, .. })
        ));
    }

    #[test]
    fn test_compare_resolved() {
        let frame = frame();
        let utm = frame.create("UTM84-31N".into()).unwrap();
        let mut tm = CoordSysDef::new("TM31", "TM", "METER");
        tm.dat_knm = "WGS84".into();
        tm.prm[0] = 3.0;
        tm.scl_red = 0.9996;
        tm.x_off = 500_000.0;
        let mut shifted = tm.clone();
        let tm = frame.create(tm.into()).unwrap();
        assert!(frame.compare(&utm, &tm).unwrap().is_equivalent());

        shifted.key_nm = "TM32".into();
        shifted.prm[0] = 9.0;
        let shifted = frame.create(shifted.into()).unwrap();
        let comparison = frame.compare(&utm, &shifted).unwrap();
        assert!(!comparison.is_equivalent());
        assert!(comparison.quality_m > 0.0);
    }
}
