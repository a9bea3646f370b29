//! Engine Settings
//!
//! Configuration consumed once by [`ShaderPackEngine::new`](crate::ShaderPackEngine::new).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use shaderpack::EngineSettings;
//!
//! let settings = EngineSettings {
//!     cache_dir: game_dir.join("shadercache"),
//!     ..Default::default()
//! };
//! ```
//!
//! Settings can also be read from a host configuration file since the struct
//! deserializes with every field optional.

use std::path::PathBuf;

use serde::Deserialize;

/// File extension of persisted bytecode entries.
pub const CACHE_EXTENSION: &str = "spv";

/// Maximum include nesting before preprocessing gives up.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

/// Name of the manifest at the root of every pack.
pub const DEFAULT_MANIFEST_NAME: &str = "pack.json";

/// Global configuration for the shader-pack engine.
///
/// | Field               | Description                                     | Default        |
/// |---------------------|-------------------------------------------------|----------------|
/// | `cache_dir`         | Directory of the persistent bytecode cache      | `shadercache`  |
/// | `max_include_depth` | Include nesting limit of the preprocessor       | `32`           |
/// | `auto_override`     | Main-stage pipelines override same-named hosts  | `true`         |
/// | `manifest_name`     | Manifest file looked up at each pack root       | `pack.json`    |
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Directory holding one `<hex-key>.spv` file per cached artifact.
    ///
    /// Created eagerly when the engine starts. Failing to create it aborts
    /// engine construction.
    pub cache_dir: PathBuf,

    /// Deepest include nesting the preprocessor expands.
    pub max_include_depth: usize,

    /// After a load, register an override `name -> name` for every
    /// main-stage pipeline and enable overrides.
    pub auto_override: bool,

    /// Manifest file name inside a pack directory or archive.
    pub manifest_name: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("shadercache"),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            auto_override: true,
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
        }
    }
}

impl EngineSettings {
    /// Default settings with the cache rooted at `cache_dir`.
    #[must_use]
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Default::default()
        }
    }
}
