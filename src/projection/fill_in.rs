//! Derivation of the coordinate system fields implied by other fields.
//!
//! [`fill_in`] only ever derives from user supplied inputs (parameters, unit,
//! zone numbers), never from fields it computed itself, so applying it to an
//! already filled definition is a no-op.

use tracing::trace;

use crate::{
    constants::Degree,
    dictionary::coordsys_def::CoordSysDef,
    geodesy::{spherical_azimuth, spherical_distance, spherical_midpoint},
    geoframe_errors::GeoframeError,
    units::unit_by_name,
};

use super::{projection_by_key, ParamRole, ProjFamily, ProjFlags, ProjectionInfo};

pub const UTM_SCALE_REDUCTION: f64 = 0.9996;
pub const UTM_FALSE_EASTING: f64 = 500_000.0;
pub const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Central meridian of a UTM zone.
pub fn utm_central_meridian(zone: i32) -> Degree {
    f64::from(zone) * 6.0 - 183.0
}

/// Return a copy of `def` with every derived field computed.
///
/// Arguments
/// -----------------
/// * `def`: a coordinate system definition, as compiled or read from a dictionary
///
/// Return
/// ----------
/// * The filled definition, or `UnknownProjection` / `UnknownUnit` when the
///   projection or unit name does not resolve.
pub fn fill_in(def: &CoordSysDef) -> Result<CoordSysDef, GeoframeError> {
    let proj = projection_by_key(&def.prj_knm)?;
    let unit = unit_by_name(&def.unit)?;
    let mut out = def.clone();

    if let Some(slot) = proj.slot_of(ParamRole::CentralMeridian) {
        out.org_lng = out.prm[slot];
    }

    match proj.key {
        "UTM" => fill_utm(&mut out, unit.factor),
        "GAUSSK" => out.scl_red = 1.0,
        "BPCNC" => fill_bipolar(&mut out, proj),
        _ => {}
    }

    if proj.has(ProjFlags::SCL_RED) && out.scl_red == 0.0 {
        out.scl_red = 1.0;
    }
    if out.map_scl == 0.0 {
        out.map_scl = 1.0;
    }
    out.unit_scl = unit.factor;
    out.scale = 1.0 / (out.unit_scl * out.map_scl);
    if out.quad == 0 {
        out.quad = 1;
    }

    if out.ll_extents_empty() {
        if let Some((min, max)) = default_extents(&out, proj) {
            out.ll_min = min;
            out.ll_max = max;
        }
    }

    trace!(key = %out.key_nm, projection = proj.key, "coordinate system filled in");
    Ok(out)
}

fn utm_zone(def: &CoordSysDef) -> i32 {
    def.prm[0].round() as i32
}

fn utm_is_south(def: &CoordSysDef) -> bool {
    def.prm[1] < 0.0
}

fn fill_utm(def: &mut CoordSysDef, unit_factor: f64) {
    def.org_lng = utm_central_meridian(utm_zone(def));
    def.org_lat = 0.0;
    def.scl_red = UTM_SCALE_REDUCTION;
    def.x_off = UTM_FALSE_EASTING / unit_factor;
    def.y_off = if utm_is_south(def) {
        UTM_FALSE_NORTHING_SOUTH / unit_factor
    } else {
        0.0
    };
}

/// The working origin of the bipolar oblique conic is the midpoint of the
/// two poles; the azimuth of the line between them is stored with it.
fn fill_bipolar(def: &mut CoordSysDef, proj: &ProjectionInfo) {
    let slot = |role| proj.slot_of(role);
    let (Some(a_lng), Some(a_lat), Some(b_lng), Some(b_lat)) = (
        slot(ParamRole::PoleALongitude),
        slot(ParamRole::PoleALatitude),
        slot(ParamRole::PoleBLongitude),
        slot(ParamRole::PoleBLatitude),
    ) else {
        return;
    };
    let (a_lng, a_lat, b_lng, b_lat) = (def.prm[a_lng], def.prm[a_lat], def.prm[b_lng], def.prm[b_lat]);

    let (mid_lng, mid_lat) = spherical_midpoint(a_lng, a_lat, b_lng, b_lat);
    def.org_lng = mid_lng;
    def.org_lat = mid_lat;
    if let Some(az) = slot(ParamRole::OriginAzimuth) {
        def.prm[az] = spherical_azimuth(a_lng, a_lat, b_lng, b_lat);
    }
    if let Some(dist) = slot(ParamRole::PoleDistance) {
        if def.prm[dist] == 0.0 {
            def.prm[dist] = spherical_distance(a_lng, a_lat, b_lng, b_lat);
        }
    }
}

fn clamp_lat(lat: Degree) -> Degree {
    lat.clamp(-90.0, 90.0)
}

/// Default useful range `([min_lng, min_lat], [max_lng, max_lat])` of a projection.
fn default_extents(def: &CoordSysDef, proj: &ProjectionInfo) -> Option<([Degree; 2], [Degree; 2])> {
    let cm = def.org_lng;
    let around = |d_lng: f64, d_lat: f64| {
        Some((
            [cm - d_lng, clamp_lat(def.org_lat - d_lat)],
            [cm + d_lng, clamp_lat(def.org_lat + d_lat)],
        ))
    };
    match proj.family {
        ProjFamily::Geographic => Some(([-180.0, -90.0], [180.0, 90.0])),
        ProjFamily::TransverseCylindrical if proj.key == "UTM" => {
            if utm_is_south(def) {
                Some(([cm - 3.0, -80.0], [cm + 3.0, 0.0]))
            } else {
                Some(([cm - 3.0, 0.0], [cm + 3.0, 84.0]))
            }
        }
        ProjFamily::TransverseCylindrical => Some(([cm - 3.0, -84.0], [cm + 3.0, 84.0])),
        ProjFamily::Cylindrical => Some(([cm - 180.0, -80.0], [cm + 180.0, 80.0])),
        ProjFamily::Conic => {
            let parallels: Vec<f64> = [ParamRole::StandardParallel1, ParamRole::StandardParallel2]
                .into_iter()
                .filter_map(|role| proj.slot_of(role))
                .map(|slot| def.prm[slot])
                .collect();
            if parallels.is_empty() {
                around(30.0, 15.0)
            } else {
                let lo = parallels.iter().copied().fold(f64::INFINITY, f64::min);
                let hi = parallels.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                Some(([cm - 30.0, clamp_lat(lo - 15.0)], [cm + 30.0, clamp_lat(hi + 15.0)]))
            }
        }
        ProjFamily::Azimuthal => around(45.0, 45.0),
        ProjFamily::Pseudocylindrical => Some(([cm - 180.0, -90.0], [cm + 180.0, 90.0])),
        ProjFamily::Planar if proj.has(ProjFlags::NON_EARTH) => None,
        ProjFamily::Oblique | ProjFamily::Planar => around(15.0, 15.0),
    }
}
