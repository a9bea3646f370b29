//! Shader compilation module
//!
//! Turns pack shader sources into bytecode artifacts:
//! - preprocessor: textual `#include` expansion
//! - dialect: legacy-dialect detection and conversion boundary
//! - cache: content-addressed memory + disk bytecode cache
//! - orchestrator: `ShaderCompiler`, the single compile entry point

pub mod cache;
pub mod dialect;
pub mod orchestrator;
pub mod preprocessor;
mod stage;

pub use cache::{CacheKey, CacheStats, ShaderCache};
pub use dialect::{
    ConvertedShader, Dialect, DialectConverter, NoConversion, ResourceBindings, SamplerDescriptor,
    UniformBufferDescriptor, UniformField, detect_dialect,
};
pub use orchestrator::{BytecodeCompiler, CompileStats, CompiledArtifact, ShaderCompiler};
pub use preprocessor::{Preprocessor, extract_includes};
pub use stage::ShaderStage;
