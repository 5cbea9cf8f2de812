//! # Engine configuration
//!
//! [`EngineConfig`] tells a [`Geoframe`](crate::geoframe::Geoframe) context
//! where its dictionaries and grid files live and how large its caches are.
//! It is plain data: build it with [`EngineConfig::new`] and the `with_*`
//! setters, or deserialize it with serde.
//!
//! ```rust, no_run
//! use geoframe::config::EngineConfig;
//!
//! let config = EngineConfig::new("/opt/geodata/dict")
//!     .with_grid_dir("/opt/geodata/grids")
//!     .with_coordsys_cache(16);
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::{datum_xfrm::IterationControls, dictionary::DictKind};

pub const COORDSYS_FILE: &str = "Coordsys.CSD";
pub const DATUM_FILE: &str = "Datums.CSD";
pub const ELLIPSOID_FILE: &str = "Elipsoid.CSD";
pub const GX_FILE: &str = "GeodeticTransform.CSD";

pub const DEFAULT_COORDSYS_CACHE: usize = 8;
pub const DEFAULT_DATUM_CACHE: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the binary dictionaries.
    pub dictionary_dir: Utf8PathBuf,
    pub coordsys_file: String,
    pub datum_file: String,
    pub ellipsoid_file: String,
    /// Optional: without it every datum goes through WGS84.
    pub gx_file: String,
    /// Where relative grid file names are resolved. Defaults to the
    /// dictionary directory when empty.
    pub grid_dir: Utf8PathBuf,
    pub coordsys_cache: usize,
    pub datum_cache: usize,
    pub iteration: IterationControls,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            dictionary_dir: Utf8PathBuf::from("."),
            coordsys_file: COORDSYS_FILE.to_string(),
            datum_file: DATUM_FILE.to_string(),
            ellipsoid_file: ELLIPSOID_FILE.to_string(),
            gx_file: GX_FILE.to_string(),
            grid_dir: Utf8PathBuf::new(),
            coordsys_cache: DEFAULT_COORDSYS_CACHE,
            datum_cache: DEFAULT_DATUM_CACHE,
            iteration: IterationControls::default(),
        }
    }
}

impl EngineConfig {
    pub fn new(dictionary_dir: impl AsRef<Utf8Path>) -> Self {
        EngineConfig {
            dictionary_dir: dictionary_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn with_grid_dir(mut self, dir: impl AsRef<Utf8Path>) -> Self {
        self.grid_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_coordsys_cache(mut self, capacity: usize) -> Self {
        self.coordsys_cache = capacity;
        self
    }

    pub fn with_datum_cache(mut self, capacity: usize) -> Self {
        self.datum_cache = capacity;
        self
    }

    pub fn with_iteration(mut self, controls: IterationControls) -> Self {
        self.iteration = controls;
        self
    }

    /// Full path of the dictionary of `kind`.
    pub fn dictionary_path(&self, kind: DictKind) -> Utf8PathBuf {
        let file = match kind {
            DictKind::CoordSys => &self.coordsys_file,
            DictKind::Datum => &self.datum_file,
            DictKind::Ellipsoid => &self.ellipsoid_file,
            DictKind::GeodeticTransform => &self.gx_file,
        };
        self.dictionary_dir.join(file)
    }

    pub fn effective_grid_dir(&self) -> &Utf8Path {
        if self.grid_dir.as_str().is_empty() {
            &self.dictionary_dir
        } else {
            &self.grid_dir
        }
    }
}

#[cfg(test)]
mod test_config {
    use super::*;

    #[test]
    fn test_defaults_and_paths() {
        let config = EngineConfig::new("/dict").with_coordsys_cache(2);
        assert_eq!(config.coordsys_cache, 2);
        assert_eq!(config.datum_cache, DEFAULT_DATUM_CACHE);
        assert_eq!(config.dictionary_path(DictKind::Datum), "/dict/Datums.CSD");
        assert_eq!(config.effective_grid_dir(), "/dict");
        assert_eq!(config.clone().with_grid_dir("/g").effective_grid_dir(), "/g");
        assert_eq!(config.iteration, IterationControls::default());
    }
}
