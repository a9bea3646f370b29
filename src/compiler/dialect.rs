//! Legacy Dialect Detection & Conversion
//!
//! Packs may ship shaders written in the legacy, binding-less style
//! (`uniform mat4 ModelViewMat;`, `uniform sampler2D Sampler0;`). The external
//! compiler only accepts sources with explicit `layout(binding = ..)` /
//! `layout(location = ..)` qualifiers, so such sources go through the host's
//! dialect converter first.
//!
//! Detection is a cheap textual heuristic ([`detect_dialect`]); conversion is
//! an opaque capability ([`DialectConverter`]). A conversion failure is never
//! fatal: the unconverted source is compiled instead and the compiler is
//! expected to reject it with a clear error.

use std::borrow::Cow;

use log::{debug, error, info};

use super::ShaderStage;
use crate::errors::ShaderPackError;

/// Outcome of dialect detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Explicit binding/location qualifiers, or no resources at all.
    Native,
    /// Unqualified uniform/sampler declarations.
    NeedsConversion,
}

/// Classifies a shader source.
///
/// Legacy when (case-insensitively) the source declares a `uniform ` or
/// mentions `sampler2D` / `samplerCube`, and never uses a `layout(binding`
/// or `layout(location` qualifier. Whitespace between `layout`, `(` and the
/// qualifier name is ignored.
#[must_use]
pub fn detect_dialect(source: &str) -> Dialect {
    let lower = source.to_lowercase();

    let has_legacy = lower.contains("uniform ")
        || lower.contains("sampler2d")
        || lower.contains("samplercube");
    if !has_legacy {
        return Dialect::Native;
    }

    let compact: String = lower.chars().filter(|c| !c.is_whitespace()).collect();
    let has_qualifiers = compact.contains("layout(binding") || compact.contains("layout(location");

    if has_qualifiers {
        Dialect::Native
    } else {
        Dialect::NeedsConversion
    }
}

// ─── Resource Binding Metadata ────────────────────────────────────────────────

/// A member of a uniform block produced by conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformField {
    pub name: String,
    pub ty: String,
}

/// A uniform buffer the converted shader expects at `binding`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBufferDescriptor {
    pub binding: u32,
    pub name: String,
    pub fields: Vec<UniformField>,
}

/// A combined image sampler the converted shader expects at `binding`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerDescriptor {
    pub binding: u32,
    pub name: String,
}

/// Binding metadata extracted during conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceBindings {
    pub uniform_buffers: Vec<UniformBufferDescriptor>,
    pub samplers: Vec<SamplerDescriptor>,
}

impl ResourceBindings {
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uniform_buffers.is_empty() && self.samplers.is_empty()
    }
}

/// Result of the external dialect converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedShader {
    pub source: String,
    pub bindings: ResourceBindings,
}

/// Host capability translating legacy sources into the compiler's dialect.
pub trait DialectConverter: Send + Sync {
    fn convert(&self, source: &str, stage: ShaderStage) -> anyhow::Result<ConvertedShader>;
}

/// Converter for hosts without legacy support. Always fails, so legacy
/// sources reach the compiler unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoConversion;

impl DialectConverter for NoConversion {
    fn convert(&self, _source: &str, stage: ShaderStage) -> anyhow::Result<ConvertedShader> {
        anyhow::bail!("legacy {stage} shaders are not supported by this host")
    }
}

/// Source to compile after the dialect pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectOutput<'a> {
    pub source: Cow<'a, str>,
    /// Present only when conversion ran and succeeded.
    pub bindings: Option<ResourceBindings>,
}

/// Runs detection and, when needed, conversion for one shader.
pub fn apply_dialect<'a>(
    name: &str,
    source: &'a str,
    stage: ShaderStage,
    converter: &dyn DialectConverter,
) -> DialectOutput<'a> {
    if detect_dialect(source) == Dialect::Native {
        debug!("{name}: native dialect (fast path)");
        return DialectOutput {
            source: Cow::Borrowed(source),
            bindings: None,
        };
    }

    info!("Converting legacy dialect: {name}");

    match converter.convert(source, stage) {
        Ok(converted) => {
            debug!(
                "{name}: converted -> {} uniform buffers, {} samplers",
                converted.bindings.uniform_buffers.len(),
                converted.bindings.samplers.len()
            );
            DialectOutput {
                source: Cow::Owned(converted.source),
                bindings: Some(converted.bindings),
            }
        }
        Err(cause) => {
            let err = ShaderPackError::Conversion {
                name: name.to_string(),
                cause,
            };
            error!("{err:#}");
            let preview: String = source.chars().take(1000).collect();
            debug!("Source preview:\n{preview}");
            DialectOutput {
                source: Cow::Borrowed(source),
                bindings: None,
            }
        }
    }
}
