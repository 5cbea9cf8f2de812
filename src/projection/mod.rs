//! # Projection parameter model
//!
//! Every coordinate system carries 24 generic projection parameters whose
//! meaning depends on the projection. This module holds the static
//! projection table: key name, numeric code, family, feature flags and the
//! role of each used parameter slot ([`ParamRole`]).
//!
//! The table drives:
//! * the dictionary compiler (which keywords are required, range checks),
//! * [`fill_in::fill_in`], which derives implied fields,
//! * the migration engine (slots a projection does not use are zeroed),
//! * the comparator (tolerance per parameter kind),
//! * the formula dispatch of [`math`].

pub mod fill_in;
pub mod math;
pub mod param_roles;
pub mod quadrant;

use std::fmt;

use crate::{constants::PRJ_PARAM_COUNT, geoframe_errors::GeoframeError, key_name::eq_key};

pub use param_roles::{ParamKind, ParamRole};

use ParamRole::*;

/// Broad geometric family, used for default extents and comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjFamily {
    Geographic,
    Cylindrical,
    TransverseCylindrical,
    Conic,
    Azimuthal,
    Pseudocylindrical,
    Oblique,
    Planar,
}

/// Feature flags of a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProjFlags(u32);

impl ProjFlags {
    /// Uses the origin longitude field.
    pub const ORG_LNG: ProjFlags = ProjFlags(0x0001);
    /// Uses the origin latitude field.
    pub const ORG_LAT: ProjFlags = ProjFlags(0x0002);
    /// Uses the scale reduction field.
    pub const SCL_RED: ProjFlags = ProjFlags(0x0004);
    /// Formulas exist for the ellipsoid (not only the sphere).
    pub const ELLIPSOID: ProjFlags = ProjFlags(0x0008);
    /// Followed by an affine post-transformation.
    pub const AFFINE: ProjFlags = ProjFlags(0x0010);
    /// Parameters are derived from a zone number.
    pub const ZONED: ProjFlags = ProjFlags(0x0020);
    /// Plain cartesian system not referenced to the earth.
    pub const NON_EARTH: ProjFlags = ProjFlags(0x0040);
    /// Coordinates are geographic longitude/latitude.
    pub const GEOGRAPHIC: ProjFlags = ProjFlags(0x0080);

    pub const fn empty() -> Self {
        ProjFlags(0)
    }

    pub const fn union(self, other: ProjFlags) -> Self {
        ProjFlags(self.0 | other.0)
    }

    pub const fn contains(self, other: ProjFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for ProjFlags {
    type Output = ProjFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

/// One row of the projection table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionInfo {
    pub key: &'static str,
    pub code: u16,
    pub family: ProjFamily,
    pub flags: ProjFlags,
    /// Roles of parameter slots `0..params.len()`; the remaining slots are unused.
    pub params: &'static [ParamRole],
    /// OGC WKT1 `PROJECTION[...]` name, when the projection has one.
    pub wkt_name: Option<&'static str>,
    pub description: &'static str,
}

impl ProjectionInfo {
    pub fn role(&self, slot: usize) -> Option<ParamRole> {
        self.params.get(slot).copied()
    }

    /// First slot holding `role`.
    pub fn slot_of(&self, role: ParamRole) -> Option<usize> {
        self.params.iter().position(|&r| r == role)
    }

    pub fn uses_slot(&self, slot: usize) -> bool {
        slot < self.params.len()
    }

    /// Bit `i` set when parameter slot `i` is used.
    pub fn used_mask(&self) -> u32 {
        (0..self.params.len().min(PRJ_PARAM_COUNT)).fold(0, |mask, i| mask | (1 << i))
    }

    pub fn has(&self, flag: ProjFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_geographic(&self) -> bool {
        self.has(ProjFlags::GEOGRAPHIC)
    }
}

impl fmt::Display for ProjectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} (code {}): {}", self.key, self.code, self.description)?;
        for (slot, role) in self.params.iter().enumerate() {
            writeln!(f, "  prm{:<2} {role}", slot + 1)?;
        }
        Ok(())
    }
}

const NONE: &[ParamRole] = &[];
const CM: &[ParamRole] = &[CentralMeridian];
const CM_SP: &[ParamRole] = &[CentralMeridian, StandardParallel1];
const SP_SP: &[ParamRole] = &[StandardParallel1, StandardParallel2];
const SP: &[ParamRole] = &[StandardParallel1];
const AZ: &[ParamRole] = &[Azimuth];
const UTM: &[ParamRole] = &[UtmZone, Hemisphere];
const ONE_POINT: &[ParamRole] = &[PointLongitude1, PointLatitude1, Azimuth];
const TWO_POINTS: &[ParamRole] = &[
    PointLongitude1,
    PointLatitude1,
    PointLongitude2,
    PointLatitude2,
];
const BIPOLAR: &[ParamRole] = &[
    PoleALongitude,
    PoleALatitude,
    PoleBLongitude,
    PoleBLatitude,
    PoleDistance,
    PoleParallelDistance1,
    PoleParallelDistance2,
    OriginAzimuth,
];
const KROVAK: &[ParamRole] = &[ObliquePoleLongitude, ObliquePoleLatitude, ObliqueConeParallel];
const MOD_POLYCONIC: &[ParamRole] = &[
    CentralMeridian,
    EasternMeridian,
    NorthernParallel,
    SouthernParallel,
];
const CM_AFFINE: &[ParamRole] = &[
    CentralMeridian,
    AffineA0,
    AffineB0,
    AffineA1,
    AffineA2,
    AffineB1,
    AffineB2,
];
const SP_SP_AFFINE: &[ParamRole] = &[
    StandardParallel1,
    StandardParallel2,
    AffineA0,
    AffineB0,
    AffineA1,
    AffineA2,
    AffineB1,
    AffineB2,
];
const COUNTY_CONIC: &[ParamRole] = &[
    StandardParallel1,
    StandardParallel2,
    GeoidSeparation,
    AverageElevation,
];
const COUNTY_TM: &[ParamRole] = &[CentralMeridian, GeoidSeparation, AverageElevation];
const LOBES: &[ParamRole] = &[LobeMeridian; 12];
const NON_EARTH_SR: &[ParamRole] = &[PlanarScale, Rotation];
const REGION: &[ParamRole] = &[Region];

const OL: ProjFlags = ProjFlags::ORG_LNG;
const OA: ProjFlags = ProjFlags::ORG_LAT;
const SR: ProjFlags = ProjFlags::SCL_RED;
const EL: ProjFlags = ProjFlags::ELLIPSOID;

const fn row(
    key: &'static str,
    code: u16,
    family: ProjFamily,
    flags: ProjFlags,
    params: &'static [ParamRole],
    wkt_name: Option<&'static str>,
    description: &'static str,
) -> ProjectionInfo {
    ProjectionInfo {
        key,
        code,
        family,
        flags,
        params,
        wkt_name,
        description,
    }
}

use ProjFamily as F;

/// The projection table, ordered by code.
pub static PROJECTIONS: &[ProjectionInfo] = &[
    row("LL", 1, F::Geographic, ProjFlags::GEOGRAPHIC.union(EL), NONE, None, "Geographic longitude/latitude"),
    row("TM", 2, F::TransverseCylindrical, OA.union(SR).union(EL), CM, Some("Transverse_Mercator"), "Transverse Mercator"),
    row("UTM", 3, F::TransverseCylindrical, ProjFlags::ZONED.union(EL), UTM, Some("Transverse_Mercator"), "Universal Transverse Mercator"),
    row("GAUSSK", 4, F::TransverseCylindrical, OA.union(SR).union(EL), CM, Some("Transverse_Mercator"), "Gauss-Kruger"),
    row("TRMRKRG", 5, F::TransverseCylindrical, OA.union(SR).union(EL), CM, Some("Transverse_Mercator"), "Transverse Mercator, Kruger series"),
    row("SOTRM", 6, F::TransverseCylindrical, OA.union(SR).union(EL), CM, Some("Transverse_Mercator_South_Orientated"), "South oriented Transverse Mercator"),
    row("TRMERAF", 7, F::TransverseCylindrical, OA.union(SR).union(EL).union(ProjFlags::AFFINE), CM_AFFINE, None, "Transverse Mercator with affine post-processing"),
    row("WCCST", 8, F::TransverseCylindrical, OA.union(SR).union(EL), COUNTY_TM, None, "Wisconsin County Transverse Mercator"),
    row("MNDOTT", 9, F::TransverseCylindrical, OA.union(SR).union(EL), COUNTY_TM, None, "Minnesota DOT Transverse Mercator"),
    row("CSINI", 10, F::TransverseCylindrical, OL.union(OA).union(EL), NONE, Some("Cassini_Soldner"), "Cassini"),
    row("TACYL", 11, F::TransverseCylindrical, OL.union(OA).union(SR).union(EL), NONE, None, "Transverse aspect equal area cylindrical"),
    row("MRCATK", 12, F::Cylindrical, SR.union(EL), CM, Some("Mercator_1SP"), "Mercator, variant A (scale reduction)"),
    row("MRCAT", 13, F::Cylindrical, EL, CM_SP, Some("Mercator_2SP"), "Mercator, variant B (standard parallel)"),
    row("MRCATPV", 14, F::Cylindrical, EL, CM, Some("Popular_Visualisation_Pseudo_Mercator"), "Popular visualisation pseudo Mercator"),
    row("MILLR", 15, F::Cylindrical, ProjFlags::empty(), CM, Some("Miller_Cylindrical"), "Miller cylindrical"),
    row("EDCYL", 16, F::Cylindrical, OA.union(EL), CM_SP, Some("Equirectangular"), "Equidistant cylindrical"),
    row("NACYL", 17, F::Cylindrical, EL, CM_SP, Some("Cylindrical_Equal_Area"), "Normal aspect equal area cylindrical"),
    row("PCARREE", 18, F::Cylindrical, ProjFlags::empty(), CM, Some("Plate_Carree"), "Plate Carree"),
    row("LM1SP", 19, F::Conic, OL.union(OA).union(SR).union(EL), NONE, Some("Lambert_Conformal_Conic_1SP"), "Lambert conformal conic, one standard parallel"),
    row("LM2SP", 20, F::Conic, OL.union(OA).union(EL), SP_SP, Some("Lambert_Conformal_Conic_2SP"), "Lambert conformal conic, two standard parallels"),
    row("LMBLG", 21, F::Conic, OL.union(OA).union(EL), SP_SP, Some("Lambert_Conformal_Conic_2SP_Belgium"), "Lambert conformal conic, Belgian variant"),
    row("LMBRTAF", 22, F::Conic, OL.union(OA).union(EL).union(ProjFlags::AFFINE), SP_SP_AFFINE, None, "Lambert conformal conic with affine post-processing"),
    row("WCCSL", 23, F::Conic, OL.union(OA).union(EL), COUNTY_CONIC, None, "Wisconsin County Lambert"),
    row("MNDOTL", 24, F::Conic, OL.union(OA).union(EL), COUNTY_CONIC, None, "Minnesota DOT Lambert"),
    row("AE", 25, F::Conic, OL.union(OA).union(EL), SP_SP, Some("Albers_Conic_Equal_Area"), "Albers equal area conic"),
    row("EDCNC", 26, F::Conic, OL.union(OA).union(EL), SP_SP, Some("Equidistant_Conic"), "Equidistant conic"),
    row("PLYCN", 27, F::Conic, OL.union(OA).union(EL), NONE, Some("Polyconic"), "American polyconic"),
    row("MODPC", 28, F::Conic, EL, MOD_POLYCONIC, None, "Modified polyconic (Lallemand)"),
    row("BONNE", 29, F::Conic, OL.union(OA).union(EL), NONE, Some("Bonne"), "Bonne pseudoconic"),
    row("KROVAK", 30, F::Conic, OL.union(OA).union(SR).union(EL), KROVAK, Some("Krovak"), "Krovak oblique conformal conic"),
    row("BPCNC", 31, F::Conic, ProjFlags::empty(), BIPOLAR, None, "Bipolar oblique conformal conic"),
    row("AZMEA", 32, F::Azimuthal, OL.union(OA).union(EL), AZ, Some("Lambert_Azimuthal_Equal_Area"), "Lambert azimuthal equal area"),
    row("AZMED", 33, F::Azimuthal, OL.union(OA).union(EL), AZ, Some("Azimuthal_Equidistant"), "Azimuthal equidistant"),
    row("AZEDE", 34, F::Azimuthal, OL.union(OA).union(EL), AZ, None, "Azimuthal equidistant, elevated ellipsoid"),
    row("OSTRO", 35, F::Azimuthal, OL.union(OA).union(SR).union(EL), AZ, Some("Oblique_Stereographic"), "Oblique stereographic"),
    row("PSTRO", 36, F::Azimuthal, OL.union(OA).union(SR).union(EL), NONE, Some("Polar_Stereographic"), "Polar stereographic"),
    row("PSTROSL", 37, F::Azimuthal, OL.union(OA).union(EL), SP, Some("Polar_Stereographic"), "Polar stereographic, standard latitude"),
    row("STERO", 38, F::Azimuthal, OL.union(OA).union(SR), AZ, Some("Stereographic"), "Stereographic (spherical)"),
    row("MSTRO", 39, F::Azimuthal, OL.union(OA).union(SR).union(EL), NONE, None, "Modified stereographic"),
    row("ORTHO", 40, F::Azimuthal, OL.union(OA), NONE, Some("Orthographic"), "Orthographic"),
    row("GNOMC", 41, F::Azimuthal, OL.union(OA), NONE, Some("Gnomonic"), "Gnomonic"),
    row("NZEALAND", 42, F::Azimuthal, OL.union(OA).union(EL), NONE, Some("New_Zealand_Map_Grid"), "New Zealand National Grid"),
    row("SINUS", 43, F::Pseudocylindrical, EL, CM, Some("Sinusoidal"), "Sinusoidal"),
    row("MOLWD", 44, F::Pseudocylindrical, ProjFlags::empty(), CM, Some("Mollweide"), "Mollweide"),
    row("ROBIN", 45, F::Pseudocylindrical, ProjFlags::empty(), CM, Some("Robinson"), "Robinson"),
    row("ECKRT4", 46, F::Pseudocylindrical, ProjFlags::empty(), CM, Some("Eckert_IV"), "Eckert IV"),
    row("ECKRT6", 47, F::Pseudocylindrical, ProjFlags::empty(), CM, Some("Eckert_VI"), "Eckert VI"),
    row("VDGRN", 48, F::Pseudocylindrical, ProjFlags::empty(), CM, Some("VanDerGrinten"), "Van der Grinten"),
    row("WINKL", 49, F::Pseudocylindrical, ProjFlags::empty(), CM_SP, Some("Winkel_Tripel"), "Winkel tripel"),
    row("HMLSN", 50, F::Pseudocylindrical, ProjFlags::empty(), LOBES, None, "Goode homolosine, interrupted"),
    row("HOM1UV", 51, F::Oblique, SR.union(EL), ONE_POINT, Some("Hotine_Oblique_Mercator"), "Oblique Mercator, one point and azimuth, unrectified"),
    row("HOM1XY", 52, F::Oblique, SR.union(EL), ONE_POINT, Some("Hotine_Oblique_Mercator"), "Oblique Mercator, one point and azimuth, rectified"),
    row("HOM2UV", 53, F::Oblique, OA.union(SR).union(EL), TWO_POINTS, Some("Hotine_Oblique_Mercator_Two_Point_Natural_Origin"), "Oblique Mercator, two points, unrectified"),
    row("HOM2XY", 54, F::Oblique, OA.union(SR).union(EL), TWO_POINTS, Some("Hotine_Oblique_Mercator_Two_Point_Natural_Origin"), "Oblique Mercator, two points, rectified"),
    row("RSKEW", 55, F::Oblique, SR.union(EL), ONE_POINT, Some("Rectified_Skew_Orthomorphic"), "Rectified skew orthomorphic, natural origin"),
    row("RSKEWC", 56, F::Oblique, SR.union(EL), ONE_POINT, Some("Rectified_Skew_Orthomorphic_Center"), "Rectified skew orthomorphic, centred"),
    row("SWISS", 57, F::Oblique, OL.union(OA).union(EL), NONE, Some("Swiss_Oblique_Cylindrical"), "Swiss oblique cylindrical"),
    row("OBQCYL", 58, F::Oblique, OL.union(OA).union(SR).union(EL), NONE, None, "Oblique cylindrical (normal conformal)"),
    row("NERTH", 59, F::Planar, ProjFlags::NON_EARTH, NONE, None, "Non-georeferenced cartesian"),
    row("NRTHSRT", 60, F::Planar, ProjFlags::NON_EARTH, NON_EARTH_SR, None, "Non-georeferenced cartesian, scale and rotation"),
    row("SYS34", 61, F::Planar, ProjFlags::ZONED.union(EL), REGION, None, "Danish System 34"),
];

/// Look a projection up by key (case-insensitive).
pub fn projection_by_key(key: &str) -> Result<&'static ProjectionInfo, GeoframeError> {
    PROJECTIONS
        .iter()
        .find(|p| eq_key(p.key, key))
        .ok_or_else(|| GeoframeError::UnknownProjection(key.to_string()))
}

pub fn projection_by_code(code: u16) -> Option<&'static ProjectionInfo> {
    PROJECTIONS.iter().find(|p| p.code == code)
}
