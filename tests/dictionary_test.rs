use geoframe::{
    compiler::{compile, CompileOptions, WarningAction},
    config::ELLIPSOID_FILE,
    dictionary::{
        datum_def::DatumDef,
        ellipsoid_def::EllipsoidDef,
        merge::merge,
        store::{DictionaryFile, WriteOptions},
    },
    geoframe_errors::{Diagnostic, GeoframeError},
};

mod common;

const USER_ELLIPSOIDS: &str = "\
# local additions
EL_NAME: MY:CLARKE
  DESCR: Clarke 1880, local realization
  E_RAD: 6378249.145
  INV_FLAT: 293.465

EL_NAME: WGS84
  DESCR: WGS84 with a typo in the radius
  E_RAD: 6378138.0
  INV_FLAT: 298.257223563
";

#[test]
fn test_compile_then_get() {
    let (_guard, dir) = common::temp_dir();
    let output = dir.join("user.CSD");
    let report = compile::<EllipsoidDef>(
        USER_ELLIPSOIDS,
        &output,
        &CompileOptions::default(),
        &mut |_: &Diagnostic| WarningAction::Continue,
    )
    .unwrap();
    assert_eq!(report.records, 2);
    assert_eq!(report.warnings, 0);

    let dict = DictionaryFile::<EllipsoidDef>::open(&output).unwrap();
    assert_eq!(dict.key_names().unwrap(), vec!["MY:CLARKE", "WGS84"]);
    let clarke = dict.get("my:clarke").unwrap();
    assert_eq!(clarke.key_nm, "MY:CLARKE");
    assert_eq!(clarke.protect, 0);
    assert!(matches!(
        dict.get("CLARKE"),
        Err(GeoframeError::NotFound { .. })
    ));
}

#[test]
fn test_merge_distribution_wins() {
    let (_guard, dir) = common::builtin_dir();
    let previous = dir.join("previous.CSD");
    compile::<EllipsoidDef>(
        USER_ELLIPSOIDS,
        &previous,
        &CompileOptions::default(),
        &mut |_: &Diagnostic| WarningAction::Continue,
    )
    .unwrap();

    let backup = dir.join("previous.bak");
    let report = merge::<EllipsoidDef>(
        &dir.join(ELLIPSOID_FILE),
        &previous,
        Some(&backup),
        WriteOptions::default(),
    )
    .unwrap();
    assert_eq!(report.replaced, 1);
    assert_eq!(report.kept, 1);
    assert_eq!(report.added, 7);

    let merged = DictionaryFile::<EllipsoidDef>::open(&previous).unwrap();
    assert_eq!(merged.len(), 9);
    let wgs84 = merged.get("WGS84").unwrap();
    assert_eq!(wgs84.e_rad, 6_378_137.0);
    assert_eq!(wgs84.protect, 1);
    assert!(merged.contains("MY:CLARKE").unwrap());

    let untouched = DictionaryFile::<EllipsoidDef>::open(&backup).unwrap();
    assert_eq!(untouched.get("WGS84").unwrap().e_rad, 6_378_138.0);
}

#[test]
fn test_rejected_compilation_leaves_no_output() {
    let (_guard, dir) = common::temp_dir();
    let output = dir.join("datums.CSD");
    let result = compile::<DatumDef>(
        "NAME: TEST1\nELLIPSOID: WGS84\n",
        &output,
        &CompileOptions::default(),
        &mut |_: &Diagnostic| WarningAction::Continue,
    );
    match result {
        Err(GeoframeError::Validation(diags)) => {
            assert_eq!(diags.len(), 1);
            assert_eq!(
                diags.0[0],
                Diagnostic::new("TEST1", 1, "no transformation method specified")
            );
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn test_group_enumeration_is_restartable() {
    let (_guard, dir) = common::builtin_dir();
    let dict = DictionaryFile::<DatumDef>::open(&dir.join(geoframe::config::DATUM_FILE)).unwrap();
    let first: Vec<String> = dict
        .iter_group("EUROPE")
        .unwrap()
        .map(|r| r.unwrap().key_nm)
        .collect();
    let second: Vec<String> = dict
        .iter_group("europe")
        .unwrap()
        .map(|r| r.unwrap().key_nm)
        .collect();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}
