#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Shader-pack compilation and pipeline override engine.
//!
//! Loads user shader packs, compiles their shaders through a content-addressed
//! bytecode cache, and lets the host renderer swap its own pipelines for the
//! pack's custom ones.

pub mod compiler;
pub mod engine;
pub mod errors;
pub mod pack;
pub mod pipeline;
pub mod settings;

pub use compiler::{
    BytecodeCompiler, CacheKey, CacheStats, CompiledArtifact, ConvertedShader, Dialect,
    DialectConverter, NoConversion, ResourceBindings, ShaderCache, ShaderCompiler, ShaderStage,
};
pub use engine::{LoadSummary, PackLoadReport, ShaderPackEngine};
pub use errors::{Result, ShaderPackError, ValidationError};
pub use pack::{PackDescriptor, PackLoader, PackRegistry, PipelineConfig};
pub use pipeline::{
    CustomPipeline, HostPipelineBuilder, PipelineBuildRequest, PipelineConfiguration,
    PipelineRegistry, PipelineState, TemplateListener,
};
pub use settings::EngineSettings;
