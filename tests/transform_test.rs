use approx::assert_abs_diff_eq;
use camino::Utf8Path;
use geoframe::{
    config::{EngineConfig, GX_FILE},
    datum_xfrm::TransformStatus,
    dictionary::{
        coordsys_def::CoordSysDef,
        gx_def::{GeocentricParams, GxFallback, GxMethod, GxParameters, GxRange, GxTransformDef, MulRegParams, MulRegTerm},
        store::{write_sorted, WriteOptions},
    },
    geoframe::Geoframe,
};

mod common;

/// A constant shift of 1.8" north and 3.6" west, valid over a 10 degree box.
fn regression(key: &str, src: &str, range: GxRange, fallback: Option<GxFallback>) -> GxTransformDef {
    let params = MulRegParams {
        lat_off: (range.min_lat + range.max_lat) / 2.0,
        lng_off: (range.min_lng + range.max_lng) / 2.0,
        kk: 0.1,
        lat_terms: vec![MulRegTerm { u_pow: 0, v_pow: 0, coef: 1.8 }],
        lng_terms: vec![MulRegTerm { u_pow: 0, v_pow: 0, coef: -3.6 }],
        hgt_terms: vec![],
    };
    let mut def = GxTransformDef::new(
        key,
        src,
        "WGS84",
        GxMethod::MultipleRegression,
        GxParameters::MultipleRegression(params),
    );
    def.range = range;
    def.fallback = fallback;
    def
}

fn write_transforms(dir: &Utf8Path) {
    let nad27 = regression(
        "NAD27_to_WGS84_MREG",
        "NAD27",
        GxRange {
            min_lng: -80.0,
            min_lat: 40.0,
            max_lng: -70.0,
            max_lat: 50.0,
        },
        Some(GxFallback {
            method: GxMethod::Molodensky,
            params: GeocentricParams::translation(-8.0, 160.0, 176.0),
        }),
    );
    let tokyo = regression(
        "TOKYO_to_WGS84_MREG",
        "TOKYO",
        GxRange {
            min_lng: 130.0,
            min_lat: 30.0,
            max_lng: 140.0,
            max_lat: 40.0,
        },
        None,
    );
    write_sorted(&dir.join(GX_FILE), vec![tokyo, nad27], WriteOptions::default()).unwrap();
}

#[test]
fn test_projected_round_trip_through_datums() {
    let (_guard, frame) = common::builtin_frame(|config| config);
    let ll84 = frame.create("LL84".into()).unwrap();
    let ed50_utm = frame.create("ED50-UTM31".into()).unwrap();
    let wgs84_utm = frame.create("UTM84-31N".into()).unwrap();

    let start = [2.35, 48.85, 35.0];
    let on_ed50 = frame.transform_point(&ll84, &ed50_utm, start).unwrap();
    let on_wgs84 = frame.transform_point(&ll84, &wgs84_utm, start).unwrap();
    assert_eq!(on_ed50.status, TransformStatus::Ok);
    let dx = on_ed50.point[0] - on_wgs84.point[0];
    let dy = on_ed50.point[1] - on_wgs84.point[1];
    let shift = dx.hypot(dy);
    assert!((50.0..300.0).contains(&shift), "datum shift of {shift} m");

    let back = frame.transform_point(&ed50_utm, &ll84, on_ed50.point).unwrap();
    assert_abs_diff_eq!(back.point[0], start[0], epsilon = 1e-6);
    assert_abs_diff_eq!(back.point[1], start[1], epsilon = 1e-6);
}

#[test]
fn test_cartographic_reference_takes_no_shift() {
    let (_guard, frame) = common::builtin_frame(|config| config);
    let mut def = CoordSysDef::new("SPHERE.LL", "LL", "DEGREE");
    def.elp_knm = "SPHERE".into();
    let sphere = frame.create(def.into()).unwrap();
    let ll84 = frame.create("LL84".into()).unwrap();
    let converted = frame.transform_point(&sphere, &ll84, [10.0, 20.0, 0.0]).unwrap();
    assert_eq!(converted.point, [10.0, 20.0, 0.0]);
    assert_eq!(frame.cache_stats().datum.loads, 0);
}

#[test]
fn test_registered_regression_and_iterative_inverse() {
    let (_guard, dir) = common::builtin_dir();
    write_transforms(&dir);
    let frame = Geoframe::new(EngineConfig::new(&dir)).unwrap();
    assert_eq!(frame.transform_names().unwrap().len(), 2);

    let ll27 = frame.create("LL27".into()).unwrap();
    let ll84 = frame.create("LL84".into()).unwrap();

    let forward = frame.transform_point(&ll27, &ll84, [-75.0, 45.0, 0.0]).unwrap();
    assert_eq!(forward.status, TransformStatus::Ok);
    assert_abs_diff_eq!(forward.point[0], -75.001, epsilon = 1e-12);
    assert_abs_diff_eq!(forward.point[1], 45.0005, epsilon = 1e-12);

    // no analytic inverse: solved by iteration on the forward regression
    let back = frame.transform_point(&ll84, &ll27, forward.point).unwrap();
    assert_eq!(back.status, TransformStatus::Ok);
    let tolerance = frame.config().iteration.cnvrg_value;
    assert_abs_diff_eq!(back.point[0], -75.0, epsilon = tolerance);
    assert_abs_diff_eq!(back.point[1], 45.0, epsilon = tolerance);

    let conversion = frame.datum_conversion("WGS84", "NAD27").unwrap();
    assert_eq!(conversion.to_string(), "WGS84 -> NAD27 [NAD27_to_WGS84_MREG]^-1");
}

#[test]
fn test_outside_coverage() {
    let (_guard, dir) = common::builtin_dir();
    write_transforms(&dir);
    let frame = Geoframe::new(EngineConfig::new(&dir)).unwrap();
    let ll84 = frame.create("LL84".into()).unwrap();

    // NAD27 falls back to its Molodensky parameters
    let ll27 = frame.create("LL27".into()).unwrap();
    let fallback = frame.transform_point(&ll27, &ll84, [-100.0, 35.0, 0.0]).unwrap();
    assert_eq!(fallback.status, TransformStatus::OkViaFallback);
    assert!((fallback.point[0] + 100.0).abs() > 1e-6);

    // TOKYO has no fallback: the point comes back unchanged
    let mut def = CoordSysDef::new("TOKYO.LL", "LL", "DEGREE");
    def.dat_knm = "TOKYO".into();
    let tokyo = frame.create(def.into()).unwrap();
    let mut points = [[135.0, 35.0, 0.0], [100.0, 10.0, 0.0]];
    let status = frame.transform_points(&tokyo, &ll84, &mut points).unwrap();
    assert_eq!(status, TransformStatus::RangeWarning);
    assert_abs_diff_eq!(points[0][1], 35.0005, epsilon = 1e-12);
    assert_eq!(points[1], [100.0, 10.0, 0.0]);
}
