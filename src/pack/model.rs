//! Shader Pack Model
//!
//! Plain data describing a loaded pack: the decoded `pack.json` manifest and
//! the shader sources it references. Nothing here has behavior beyond
//! lookups; structural checks live in [`validator`](super::validator).
//!
//! # Manifest Layout
//!
//! ```json
//! {
//!   "name": "Soft Shadows",
//!   "version": "1.2.0",
//!   "author": "someone",
//!   "pipelines": {
//!     "terrain": {
//!       "vertex": "shaders/terrain.vsh",
//!       "fragment": "shaders/terrain.fsh",
//!       "includes": ["shaders/include/common.glsl"],
//!       "blend": "opaque",
//!       "depthTest": true,
//!       "depthWrite": true,
//!       "cullFace": "back",
//!       "stage": "main"
//!     }
//!   }
//! }
//! ```
//!
//! Unknown top-level keys are kept verbatim in [`PackDescriptor::extensions`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::warn;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::compiler::ShaderStage;

/// Source path → source text.
pub type SourceMap = FxHashMap<String, String>;

// ─── Pipeline Config ──────────────────────────────────────────────────────────

/// Color blending requested by a pipeline.
///
/// Manifest values are matched case-insensitively; an unknown value falls
/// back to [`Opaque`](Self::Opaque) with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Opaque,
    /// Opaque blending with alpha-tested discard in the shader.
    Cutout,
    Translucent,
    Add,
    Multiply,
}

impl BlendMode {
    /// Parses a manifest value, accepting the `off` and `alpha` aliases.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "opaque" | "off" => Self::Opaque,
            "cutout" => Self::Cutout,
            "translucent" | "alpha" => Self::Translucent,
            "add" => Self::Add,
            "multiply" => Self::Multiply,
            _ => {
                warn!("Unknown blend mode: {value}, using opaque");
                Self::Opaque
            }
        }
    }
}

impl<'de> Deserialize<'de> for BlendMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|value| Self::parse(&value))
    }
}

/// Triangle faces culled by a pipeline.
///
/// Parsed like [`BlendMode`]; unknown values fall back to [`Back`](Self::Back).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CullFace {
    None,
    Front,
    #[default]
    Back,
}

impl CullFace {
    /// Parses a manifest value, accepting `off` for [`None`](Self::None).
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "none" | "off" => Self::None,
            "front" => Self::Front,
            "back" => Self::Back,
            _ => {
                warn!("Unknown cull mode: {value}, using back");
                Self::Back
            }
        }
    }
}

impl<'de> Deserialize<'de> for CullFace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|value| Self::parse(&value))
    }
}

/// Where in the frame a pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Main,
    PostProcess,
}

fn default_true() -> bool {
    true
}

/// One named pipeline entry of a pack manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    #[serde(default)]
    pub vertex: Option<String>,
    #[serde(default)]
    pub fragment: Option<String>,
    #[serde(default)]
    pub geometry: Option<String>,

    /// Files shipped for `#include` use. Includes referenced from shader
    /// sources are picked up by the loader even when not listed here.
    #[serde(default)]
    pub includes: Vec<String>,

    #[serde(default)]
    pub blend: BlendMode,
    #[serde(default = "default_true")]
    pub depth_test: bool,
    #[serde(default = "default_true")]
    pub depth_write: bool,
    #[serde(default)]
    pub cull_face: CullFace,
    #[serde(default)]
    pub stage: PipelineStage,

    /// Host vertex format name. `None` lets the host take it from its own
    /// template pipeline.
    #[serde(default)]
    pub vertex_format: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            vertex: None,
            fragment: None,
            geometry: None,
            includes: Vec::new(),
            blend: BlendMode::default(),
            depth_test: true,
            depth_write: true,
            cull_face: CullFace::default(),
            stage: PipelineStage::default(),
            vertex_format: None,
        }
    }
}

impl PipelineConfig {
    /// Vertex + fragment pipeline with default render state.
    #[must_use]
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: Some(vertex.into()),
            fragment: Some(fragment.into()),
            ..Default::default()
        }
    }

    /// Every shader stage path this pipeline declares, in stage order.
    pub fn shader_paths(&self) -> impl Iterator<Item = (ShaderStage, &str)> {
        [
            (ShaderStage::Vertex, self.vertex.as_deref()),
            (ShaderStage::Fragment, self.fragment.as_deref()),
            (ShaderStage::Geometry, self.geometry.as_deref()),
        ]
        .into_iter()
        .filter_map(|(stage, path)| path.map(|p| (stage, p)))
    }
}

// ─── Manifest ─────────────────────────────────────────────────────────────────

/// Decoded `pack.json`.
///
/// Missing `name` / `version` decode as empty strings so the validator can
/// report them instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pipelines: BTreeMap<String, PipelineConfig>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl PackManifest {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ─── Pack Descriptor ──────────────────────────────────────────────────────────

/// An immutable, fully loaded shader pack.
///
/// Shared between the engine and every [`CustomPipeline`](crate::pipeline::CustomPipeline)
/// built from it through an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct PackDescriptor {
    manifest: PackManifest,
    sources: SourceMap,
    origin: Option<PathBuf>,
}

impl PackDescriptor {
    #[must_use]
    pub fn new(manifest: PackManifest, sources: SourceMap) -> Self {
        Self {
            manifest,
            sources,
            origin: None,
        }
    }

    /// Empty pack with only metadata; pipelines and sources are added with
    /// [`with_pipeline`](Self::with_pipeline) and [`with_source`](Self::with_source).
    #[must_use]
    pub fn named(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(
            PackManifest {
                name: name.into(),
                version: version.into(),
                ..Default::default()
            },
            SourceMap::default(),
        )
    }

    pub fn from_manifest_json(json: &str, sources: SourceMap) -> serde_json::Result<Self> {
        Ok(Self::new(PackManifest::from_json(json)?, sources))
    }

    #[must_use]
    pub fn with_pipeline(mut self, name: impl Into<String>, config: PipelineConfig) -> Self {
        self.manifest.pipelines.insert(name.into(), config);
        self
    }

    #[must_use]
    pub fn with_source(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.sources.insert(path.into(), text.into());
        self
    }

    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.manifest.author = Some(author.into());
        self
    }

    /// Records where the pack was loaded from (directory or archive).
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    #[inline]
    #[must_use]
    pub fn author(&self) -> Option<&str> {
        self.manifest.author.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.manifest.description.as_deref()
    }

    /// Manifest keys this crate does not interpret.
    #[inline]
    #[must_use]
    pub fn extensions(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.manifest.extensions
    }

    /// Pipelines ordered by name.
    #[inline]
    #[must_use]
    pub fn pipelines(&self) -> &BTreeMap<String, PipelineConfig> {
        &self.manifest.pipelines
    }

    #[must_use]
    pub fn pipeline(&self, name: &str) -> Option<&PipelineConfig> {
        self.manifest.pipelines.get(name)
    }

    /// Every source file of the pack. Doubles as the include universe.
    #[inline]
    #[must_use]
    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    #[must_use]
    pub fn source(&self, path: &str) -> Option<&str> {
        self.sources.get(path).map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn manifest(&self) -> &PackManifest {
        &self.manifest
    }
}
