pub mod cache;
pub mod codec;
pub mod comparator;
pub mod compiler;
pub mod config;
pub mod constants;
pub mod datum_xfrm;
pub mod dictionary;
pub mod geodesy;
pub mod geoframe;
pub mod geoframe_errors;
pub mod key_name;
pub mod migration;
pub mod projection;
pub mod resolved;
pub mod units;
pub mod wkt;

#[cfg(test)]
pub(crate) mod unit_test_global {
    use std::sync::LazyLock;

    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    use crate::compiler::compile_builtin;

    /// The built-in dictionaries, compiled once for the whole test run.
    pub(crate) static BUILTIN_DICTIONARIES: LazyLock<(TempDir, Utf8PathBuf)> = LazyLock::new(|| {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        compile_builtin(&path).unwrap();
        (dir, path)
    });
}
