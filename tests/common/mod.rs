#![allow(dead_code)]

use camino::Utf8PathBuf;
use geoframe::{compiler::compile_builtin, config::EngineConfig, geoframe::Geoframe};
use tempfile::TempDir;

pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn temp_dir() -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, path)
}

/// A fresh directory holding the built-in dictionaries.
pub fn builtin_dir() -> (TempDir, Utf8PathBuf) {
    init_logging();
    let (dir, path) = temp_dir();
    compile_builtin(&path).unwrap();
    (dir, path)
}

/// A context over the built-in dictionaries; the directory lives as long as the guard.
pub fn builtin_frame(configure: impl FnOnce(EngineConfig) -> EngineConfig) -> (TempDir, Geoframe) {
    let (dir, path) = builtin_dir();
    let frame = Geoframe::new(configure(EngineConfig::new(&path))).unwrap();
    (dir, frame)
}
