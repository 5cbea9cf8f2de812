//! # Datum transformation pipeline
//!
//! A [`GxTransform`] wraps one [`GxTransformDef`] and the method
//! implementation selected from its method code. Its lifecycle is
//!
//! ```text
//! Uninitialized ─initialize─▶ Initialized ─ready(Forward)─▶ ForwardReady
//!                                         └ready(Inverse)─▶ InverseReady
//!                      any state ─disable─▶ Disabled
//! ```
//!
//! Every conversion returns the shifted point with a [`TransformStatus`]:
//!
//! | status               | meaning                                                          |
//! |----------------------|------------------------------------------------------------------|
//! | `Ok`                 | primary method, inside its validity window                       |
//! | `OkViaFallback`      | input outside the window, the fallback method was used           |
//! | `RangeWarning`       | outside the window and no fallback: input returned unchanged, or an iterative inverse residual above `error_val` |
//! | `ConvergenceWarning` | iterative inverse stopped above `cnvrg_val` but within `error_val` |
//!
//! System failures (I/O on grid files) are `Err`.

pub mod conversion;
pub mod geocentric;
pub mod grid;
pub mod iterative;
pub mod molodensky;
pub mod mulreg;

use std::fmt;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    constants::{Degree, LlhPoint},
    dictionary::gx_def::{GxFallback, GxMethod, GxParameters, GxTransformDef},
    geodesy::Ellipsoid,
    geoframe_errors::GeoframeError,
};

pub use iterative::{iterative_inverse, IterationOutcome};

/// Quality tag attached to every converted coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum TransformStatus {
    #[default]
    Ok,
    OkViaFallback,
    ConvergenceWarning,
    RangeWarning,
}

impl TransformStatus {
    pub fn is_warning(self) -> bool {
        matches!(
            self,
            TransformStatus::ConvergenceWarning | TransformStatus::RangeWarning
        )
    }

    /// The more severe of two statuses, used when chaining transformations.
    pub fn worst(self, other: TransformStatus) -> TransformStatus {
        self.max(other)
    }
}

impl fmt::Display for TransformStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TransformStatus::Ok => "ok",
            TransformStatus::OkViaFallback => "ok (fallback method)",
            TransformStatus::ConvergenceWarning => "inverse did not fully converge",
            TransformStatus::RangeWarning => "outside the validity range",
        };
        f.write_str(text)
    }
}

/// A converted point and its status.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Converted {
    pub point: LlhPoint,
    pub status: TransformStatus,
}

impl Converted {
    pub fn ok(point: LlhPoint) -> Self {
        Converted {
            point,
            status: TransformStatus::Ok,
        }
    }
}

/// Outcome of a raw method evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shift {
    Shifted(LlhPoint),
    /// The method has no data for this point (grid coverage).
    OutOfRange,
}

/// One transformation method.
///
/// Methods without a closed-form inverse return `false` from
/// [`has_inverse`](DatumShift::has_inverse); their inverse is computed by
/// [`iterative_inverse`].
pub trait DatumShift: Send + Sync + fmt::Debug {
    fn method(&self) -> GxMethod;

    fn forward(&self, ll: &LlhPoint) -> Result<Shift, GeoframeError>;

    fn has_inverse(&self) -> bool {
        false
    }

    fn inverse(&self, ll: &LlhPoint) -> Result<Shift, GeoframeError> {
        let _ = ll;
        Err(GeoframeError::invalid_transform(
            self.method().name(),
            "method has no analytic inverse",
        ))
    }

    /// Whether the method may be evaluated from several threads at once.
    fn is_reentrant(&self) -> bool {
        true
    }

    /// Release held resources (open grid files).
    fn release(&mut self) {}
}

/// Iteration controls of an iterative inverse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationControls {
    pub max_iterations: u16,
    /// Convergence threshold, degrees.
    pub cnvrg_value: Degree,
    /// Residual above which the result is reported as out of coverage, degrees.
    pub error_value: Degree,
}

impl Default for IterationControls {
    fn default() -> Self {
        IterationControls {
            max_iterations: 10,
            cnvrg_value: 1e-9,
            error_value: 5e-7,
        }
    }
}

impl IterationControls {
    /// Controls of a definition; zero fields take the values of `defaults`.
    pub fn from_def(def: &GxTransformDef, defaults: IterationControls) -> Self {
        IterationControls {
            max_iterations: if def.max_itr > 0 {
                def.max_itr as u16
            } else {
                defaults.max_iterations
            },
            cnvrg_value: if def.cnvrg_val > 0.0 {
                def.cnvrg_val
            } else {
                defaults.cnvrg_value
            },
            error_value: if def.error_val > 0.0 {
                def.error_val
            } else {
                defaults.error_value
            },
        }
    }
}

/// What a method needs from its surroundings to be built.
#[derive(Debug, Clone)]
pub struct MethodEnv {
    pub src_ellipsoid: Ellipsoid,
    pub trg_ellipsoid: Ellipsoid,
    /// Directory relative grid file paths are resolved against.
    pub grid_dir: Utf8PathBuf,
    pub defaults: IterationControls,
}

/// Method registry: build the implementation of `method` from its parameters.
pub fn build_method(
    name: &str,
    method: GxMethod,
    params: &GxParameters,
    env: &MethodEnv,
) -> Result<Box<dyn DatumShift>, GeoframeError> {
    let shift: Box<dyn DatumShift> = match (method, params) {
        (GxMethod::Null, _) => Box::new(geocentric::NullShift),
        (GxMethod::Molodensky, GxParameters::Geocentric(p)) => Box::new(
            molodensky::Molodensky::new(p.delta, env.src_ellipsoid, env.trg_ellipsoid),
        ),
        (m, GxParameters::Geocentric(p)) if m.is_geocentric() => Box::new(
            geocentric::Helmert::new(m, p, env.src_ellipsoid, env.trg_ellipsoid)?,
        ),
        (GxMethod::MultipleRegression, GxParameters::MultipleRegression(p)) => {
            Box::new(mulreg::MultipleRegression::new(p.clone()))
        }
        (GxMethod::GridFiles, GxParameters::GridFiles(files)) => {
            Box::new(grid::GridShift::open(files, env)?)
        }
        (method, _) => {
            return Err(GeoframeError::invalid_transform(
                name,
                format!("parameter block does not match method {method}"),
            ))
        }
    };
    Ok(shift)
}

/// Lifecycle state of a [`GxTransform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GxState {
    Uninitialized,
    Initialized,
    ForwardReady,
    InverseReady,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Inverse,
}

impl Direction {
    pub fn reversed(self) -> Direction {
        match self {
            Direction::Forward => Direction::Inverse,
            Direction::Inverse => Direction::Forward,
        }
    }
}

/// A geodetic transformation instance.
#[derive(Debug)]
pub struct GxTransform {
    def: GxTransformDef,
    state: GxState,
    primary: Option<Box<dyn DatumShift>>,
    fallback: Option<Box<dyn DatumShift>>,
    controls: IterationControls,
}

impl GxTransform {
    pub fn new(def: GxTransformDef) -> Self {
        GxTransform {
            def,
            state: GxState::Uninitialized,
            primary: None,
            fallback: None,
            controls: IterationControls::default(),
        }
    }

    pub fn def(&self) -> &GxTransformDef {
        &self.def
    }

    pub fn state(&self) -> GxState {
        self.state
    }

    pub fn controls(&self) -> IterationControls {
        self.controls
    }

    /// Validate the definition and build the method implementations.
    ///
    /// Return
    /// ----------
    /// * [`GeoframeError::InvalidTransform`] when a method invariant is
    ///   violated, a system error when a grid file cannot be opened.
    pub fn initialize(&mut self, env: &MethodEnv) -> Result<(), GeoframeError> {
        if self.state == GxState::Disabled {
            return Err(GeoframeError::TransformDisabled(self.def.key_nm.clone()));
        }
        self.def
            .check_invariants()
            .map_err(|reason| GeoframeError::invalid_transform(&self.def.key_nm, reason))?;

        let primary = build_method(&self.def.key_nm, self.def.method, &self.def.params, env)?;
        let fallback = match &self.def.fallback {
            Some(GxFallback { method, params }) => Some(build_method(
                &self.def.key_nm,
                *method,
                &GxParameters::Geocentric(*params),
                env,
            )?),
            None => None,
        };
        self.controls = IterationControls::from_def(&self.def, env.defaults);
        self.primary = Some(primary);
        self.fallback = fallback;
        self.state = GxState::Initialized;
        debug!(
            transform = %self.def.key_nm,
            method = %self.def.method,
            fallback = self.fallback.is_some(),
            "geodetic transformation initialized"
        );
        Ok(())
    }

    /// Arm the transformation for one direction.
    pub fn ready(&mut self, direction: Direction) -> Result<(), GeoframeError> {
        match self.state {
            GxState::Uninitialized => Err(GeoframeError::invalid_transform(
                &self.def.key_nm,
                "not initialized",
            )),
            GxState::Disabled => Err(GeoframeError::TransformDisabled(self.def.key_nm.clone())),
            _ => {
                if direction == Direction::Inverse && !self.def.reversible {
                    return Err(GeoframeError::invalid_transform(
                        &self.def.key_nm,
                        "transformation is not reversible",
                    ));
                }
                self.state = match direction {
                    Direction::Forward => GxState::ForwardReady,
                    Direction::Inverse => GxState::InverseReady,
                };
                Ok(())
            }
        }
    }

    /// Release the method implementations; the instance can no longer convert.
    pub fn disable(&mut self) {
        if let Some(mut primary) = self.primary.take() {
            primary.release();
        }
        if let Some(mut fallback) = self.fallback.take() {
            fallback.release();
        }
        self.state = GxState::Disabled;
    }

    /// `false` when any method in use must not be evaluated concurrently.
    pub fn is_reentrant(&self) -> bool {
        self.primary.as_ref().map_or(true, |m| m.is_reentrant())
            && self.fallback.as_ref().map_or(true, |m| m.is_reentrant())
    }

    fn primary(&self) -> Result<&dyn DatumShift, GeoframeError> {
        match self.state {
            GxState::Disabled => Err(GeoframeError::TransformDisabled(self.def.key_nm.clone())),
            _ => self.primary.as_deref().ok_or_else(|| {
                GeoframeError::invalid_transform(&self.def.key_nm, "not initialized")
            }),
        }
    }

    /// Convert in the armed direction.
    pub fn convert(&self, ll: &LlhPoint) -> Result<Converted, GeoframeError> {
        match self.state {
            GxState::ForwardReady => self.forward(ll),
            GxState::InverseReady => self.inverse(ll),
            GxState::Disabled => Err(GeoframeError::TransformDisabled(self.def.key_nm.clone())),
            _ => Err(GeoframeError::invalid_transform(
                &self.def.key_nm,
                "no direction armed",
            )),
        }
    }

    fn out_of_range(&self, ll: &LlhPoint, direction: Direction) -> Result<Converted, GeoframeError> {
        match &self.fallback {
            Some(fallback) => {
                let shifted = match direction {
                    Direction::Forward => fallback.forward(ll)?,
                    Direction::Inverse => fallback.inverse(ll)?,
                };
                match shifted {
                    Shift::Shifted(point) => Ok(Converted {
                        point,
                        status: TransformStatus::OkViaFallback,
                    }),
                    Shift::OutOfRange => Ok(self.range_warning(ll)),
                }
            }
            None => Ok(self.range_warning(ll)),
        }
    }

    fn range_warning(&self, ll: &LlhPoint) -> Converted {
        warn!(
            transform = %self.def.key_nm,
            lng = ll[0],
            lat = ll[1],
            "point outside the validity range, returned unchanged"
        );
        Converted {
            point: *ll,
            status: TransformStatus::RangeWarning,
        }
    }

    /// Source datum to target datum.
    pub fn forward(&self, ll: &LlhPoint) -> Result<Converted, GeoframeError> {
        let primary = self.primary()?;
        if !self.def.range.contains(ll[0], ll[1]) {
            return self.out_of_range(ll, Direction::Forward);
        }
        match primary.forward(ll)? {
            Shift::Shifted(point) => Ok(Converted::ok(point)),
            Shift::OutOfRange => self.out_of_range(ll, Direction::Forward),
        }
    }

    /// Target datum back to source datum.
    pub fn inverse(&self, ll: &LlhPoint) -> Result<Converted, GeoframeError> {
        let primary = self.primary()?;
        if !self.def.range.contains(ll[0], ll[1]) {
            return self.out_of_range(ll, Direction::Inverse);
        }
        if primary.has_inverse() {
            return match primary.inverse(ll)? {
                Shift::Shifted(point) => Ok(Converted::ok(point)),
                Shift::OutOfRange => self.out_of_range(ll, Direction::Inverse),
            };
        }
        match iterative_inverse(|p| primary.forward(p), ll, &self.controls)? {
            IterationOutcome::Converged(point) => Ok(Converted::ok(point)),
            IterationOutcome::Loose(point) => {
                warn!(transform = %self.def.key_nm, "iterative inverse converged loosely");
                Ok(Converted {
                    point,
                    status: TransformStatus::ConvergenceWarning,
                })
            }
            IterationOutcome::Diverged(point) => {
                warn!(transform = %self.def.key_nm, "iterative inverse residual above error value");
                Ok(Converted {
                    point,
                    status: TransformStatus::RangeWarning,
                })
            }
            IterationOutcome::OutOfRange => self.out_of_range(ll, Direction::Inverse),
        }
    }
}

impl Drop for GxTransform {
    fn drop(&mut self) {
        if self.state != GxState::Disabled {
            self.disable();
        }
    }
}

#[cfg(test)]
pub(crate) mod test_pipeline {
    use super::*;
    use crate::dictionary::gx_def::{
        GeocentricParams, GxRange, MulRegParams, MulRegTerm,
    };
    use approx::assert_abs_diff_eq;

    pub(crate) fn env() -> MethodEnv {
        MethodEnv {
            src_ellipsoid: Ellipsoid::wgs84(),
            trg_ellipsoid: Ellipsoid::wgs84(),
            grid_dir: Utf8PathBuf::from("."),
            defaults: IterationControls::default(),
        }
    }

    /// A pure translation in degrees written as a regression: 1.8" north, -3.6" east.
    pub(crate) fn translation_mulreg() -> GxTransformDef {
        let params = MulRegParams {
            lat_off: 45.0,
            lng_off: -75.0,
            kk: 0.1,
            lat_terms: vec![MulRegTerm { u_pow: 0, v_pow: 0, coef: 1.8 }],
            lng_terms: vec![MulRegTerm { u_pow: 0, v_pow: 0, coef: -3.6 }],
            hgt_terms: vec![],
        };
        let mut def = GxTransformDef::new(
            "TRANSLATE",
            "LOCAL",
            "WGS84",
            GxMethod::MultipleRegression,
            GxParameters::MultipleRegression(params),
        );
        def.range = GxRange {
            min_lng: -80.0,
            min_lat: 40.0,
            max_lng: -70.0,
            max_lat: 50.0,
        };
        def
    }

    fn ready(def: GxTransformDef) -> GxTransform {
        let mut gx = GxTransform::new(def);
        gx.initialize(&env()).unwrap();
        gx.ready(Direction::Forward).unwrap();
        gx
    }

    #[test]
    fn test_state_machine() {
        let mut gx = GxTransform::new(translation_mulreg());
        assert_eq!(gx.state(), GxState::Uninitialized);
        assert!(gx.ready(Direction::Forward).is_err());
        gx.initialize(&env()).unwrap();
        assert_eq!(gx.state(), GxState::Initialized);
        gx.ready(Direction::Inverse).unwrap();
        assert_eq!(gx.state(), GxState::InverseReady);
        gx.disable();
        assert_eq!(gx.state(), GxState::Disabled);
        assert!(matches!(
            gx.forward(&[-75.0, 45.0, 0.0]),
            Err(GeoframeError::TransformDisabled(_))
        ));
    }

    #[test]
    fn test_iterative_inverse_of_translation() {
        let gx = ready(translation_mulreg());
        for p in [[-75.0, 45.0, 0.0], [-79.5, 40.5, 10.0], [-70.5, 49.5, -5.0]] {
            let fwd = gx.forward(&p).unwrap();
            assert_eq!(fwd.status, TransformStatus::Ok);
            assert_abs_diff_eq!(fwd.point[1], p[1] + 0.0005, epsilon = 1e-12);
            let back = gx.inverse(&fwd.point).unwrap();
            assert_eq!(back.status, TransformStatus::Ok);
            assert_abs_diff_eq!(back.point[0], p[0], epsilon = gx.controls().cnvrg_value);
            assert_abs_diff_eq!(back.point[1], p[1], epsilon = gx.controls().cnvrg_value);
        }
    }

    #[test]
    fn test_out_of_range_without_fallback() {
        let gx = ready(translation_mulreg());
        let p = [10.0, 10.0, 0.0];
        let out = gx.forward(&p).unwrap();
        assert_eq!(out.status, TransformStatus::RangeWarning);
        assert_eq!(out.point, p);
    }

    #[test]
    fn test_out_of_range_uses_fallback() {
        let mut def = translation_mulreg();
        let params = GeocentricParams::translation(-8.0, 160.0, 176.0);
        def.fallback = Some(GxFallback {
            method: GxMethod::Molodensky,
            params,
        });
        let gx = ready(def);
        let p = [10.0, 10.0, 0.0];
        let out = gx.forward(&p).unwrap();
        assert_eq!(out.status, TransformStatus::OkViaFallback);

        let direct = molodensky::Molodensky::new(params.delta, Ellipsoid::wgs84(), Ellipsoid::wgs84());
        match direct.forward(&p).unwrap() {
            Shift::Shifted(expected) => assert_eq!(out.point, expected),
            Shift::OutOfRange => panic!("molodensky has no range"),
        }
    }

    #[test]
    fn test_invalid_definition_rejected() {
        let mut def = translation_mulreg();
        def.params = GxParameters::GridFiles(vec![]);
        let mut gx = GxTransform::new(def);
        assert!(matches!(
            gx.initialize(&env()),
            Err(GeoframeError::InvalidTransform { .. })
        ));
    }
}
