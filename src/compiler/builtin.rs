//! Built-in distribution dictionaries.
//!
//! A small, self-consistent set of ellipsoids, datums and coordinate systems
//! shipped as compiler sources, so a host can bootstrap a dictionary
//! directory without any external data.

use camino::Utf8Path;
use tracing::info;

use crate::{
    config::{COORDSYS_FILE, DATUM_FILE, ELLIPSOID_FILE},
    dictionary::{
        coordsys_def::CoordSysDef, datum_def::DatumDef, ellipsoid_def::EllipsoidDef, DictRecord,
    },
    geoframe_errors::{Diagnostic, GeoframeError},
};

use super::{compile, parse_source, Companions, CompileOptions, WarningAction};

pub const ELLIPSOID_SOURCE: &str = include_str!("data/ellipsoids.asc");
pub const DATUM_SOURCE: &str = include_str!("data/datums.asc");
pub const COORDSYS_SOURCE: &str = include_str!("data/coordsys.asc");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinReport {
    pub ellipsoids: usize,
    pub datums: usize,
    pub coordsys: usize,
}

fn key_names<R: DictRecord>(records: &[R]) -> impl Iterator<Item = &str> {
    records.iter().map(|r| r.key_name())
}

/// Compile the built-in sources into `dir` as distribution records.
///
/// Each source is cross-checked against the ones it references: datums
/// against the ellipsoids, coordinate systems against both.
pub fn compile_builtin(dir: &Utf8Path) -> Result<BuiltinReport, GeoframeError> {
    let mut keep_going = |_: &Diagnostic| WarningAction::Continue;

    let mut options = CompileOptions {
        distribution: true,
        ..Default::default()
    };
    let ellipsoids = parse_source::<EllipsoidDef>(ELLIPSOID_SOURCE, &options, &mut keep_going)?;
    options.companions = Companions::default().with_ellipsoids(key_names(&ellipsoids));
    let datums = parse_source::<DatumDef>(DATUM_SOURCE, &options, &mut keep_going)?;
    options.companions = options.companions.with_datums(key_names(&datums));

    let report = BuiltinReport {
        ellipsoids: compile::<EllipsoidDef>(ELLIPSOID_SOURCE, &dir.join(ELLIPSOID_FILE), &options, &mut keep_going)?
            .records,
        datums: compile::<DatumDef>(DATUM_SOURCE, &dir.join(DATUM_FILE), &options, &mut keep_going)?.records,
        coordsys: compile::<CoordSysDef>(COORDSYS_SOURCE, &dir.join(COORDSYS_FILE), &options, &mut keep_going)?
            .records,
    };
    info!(%dir, ?report, "built-in dictionaries compiled");
    Ok(report)
}

#[cfg(test)]
mod test_builtin {
    use super::*;
    use crate::dictionary::store::DictionaryFile;
    use camino::Utf8PathBuf;

    #[test]
    fn test_compile_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let report = compile_builtin(&path).unwrap();
        assert_eq!(
            report,
            BuiltinReport {
                ellipsoids: 8,
                datums: 10,
                coordsys: 16
            }
        );

        let datums = DictionaryFile::<DatumDef>::open(&path.join(DATUM_FILE)).unwrap();
        let osgb = datums.get("osgb").unwrap();
        assert_eq!(osgb.ell_knm, "AIRY30");
        assert_eq!(osgb.protect, 1);

        let systems = DictionaryFile::<CoordSysDef>::open(&path.join(COORDSYS_FILE)).unwrap();
        let utm: Vec<_> = systems
            .iter_group("UTM")
            .unwrap()
            .map(|r| r.unwrap().key_nm)
            .collect();
        assert_eq!(utm.len(), 5);
    }
}
