//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`ShaderPackError`] covers every failure mode of the
//! load and activation paths:
//! - Pack validation and manifest/archive decoding
//! - Include resolution during preprocessing
//! - Dialect conversion and bytecode compilation
//! - Bytecode cache I/O
//! - Host pipeline construction
//!
//! Not every variant is propagated. Conversion failures and cache I/O failures
//! are logged and then swallowed by the component that hit them; they exist as
//! variants so the log line carries the same shape as every other error.
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, ShaderPackError>`.
//!
//! ```rust,ignore
//! use shaderpack::errors::{ShaderPackError, Result};
//!
//! fn load() -> Result<()> {
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::compiler::ShaderStage;

/// The main error type for the shader-pack engine.
#[derive(Error, Debug)]
pub enum ShaderPackError {
    // ========================================================================
    // Pack Errors
    // ========================================================================
    /// The pack failed structural validation and was rejected.
    #[error("Pack validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The pack manifest could not be decoded.
    #[error("Invalid manifest in {path}: {source}")]
    Manifest {
        /// Location of the manifest that failed to parse
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A pack archive could not be opened or read.
    #[error("Archive error in {path}: {source}")]
    Archive {
        /// Archive path
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// A pack does not contain a manifest.
    #[error("Manifest '{manifest}' not found in {path}")]
    ManifestNotFound {
        /// Pack location
        path: PathBuf,
        /// Expected manifest file name
        manifest: String,
    },

    // ========================================================================
    // Preprocessor Errors
    // ========================================================================
    /// An include directive references a path the pack does not provide.
    #[error("Include not found: '{path}' (referenced in {origin} at line {line})")]
    IncludeNotFound {
        /// The unresolved include path
        path: String,
        /// The source that contains the directive
        origin: String,
        /// 1-based line of the directive
        line: usize,
    },

    /// Include nesting went past the configured depth limit.
    #[error("Include depth exceeded {max_depth} levels - possible circular include at: {path}")]
    IncludeDepthExceeded {
        /// The include that would have been expanded too deep
        path: String,
        /// The configured limit
        max_depth: usize,
    },

    // ========================================================================
    // Compile Errors
    // ========================================================================
    /// Legacy-dialect conversion failed. Logged, never propagated.
    #[error("Dialect conversion failed for {name}: {cause:#}")]
    Conversion {
        /// Logical shader name
        name: String,
        #[source]
        cause: anyhow::Error,
    },

    /// The external bytecode compiler rejected a shader.
    #[error("Shader compilation failed: {name} ({stage}): {cause:#}")]
    Compilation {
        /// Logical shader name
        name: String,
        /// Stage that was being compiled
        stage: ShaderStage,
        #[source]
        cause: anyhow::Error,
    },

    // ========================================================================
    // Cache Errors
    // ========================================================================
    /// The cache directory could not be created.
    #[error("Failed to create shader cache directory {path}: {source}")]
    CacheInit {
        /// Cache directory
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cache entry could not be read, written or deleted. Logged, never propagated.
    #[error("Shader cache I/O error on {path}: {source}")]
    CacheIo {
        /// Entry path
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ========================================================================
    // Pipeline Errors
    // ========================================================================
    /// A pipeline lacks the vertex or fragment stage it needs to be built.
    #[error("Pipeline {pipeline} is missing its {stage} shader source")]
    MissingShader {
        /// Pipeline name
        pipeline: String,
        /// The absent stage
        stage: ShaderStage,
    },

    /// The host failed to build the resource backing a custom pipeline.
    #[error("Failed to initialize pipeline {name}: {cause:#}")]
    PipelineInit {
        /// Custom pipeline name
        name: String,
        #[source]
        cause: anyhow::Error,
    },

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Structural problems found by the pack validator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("shader pack missing name")]
    MissingName,

    #[error("shader pack {pack} missing version")]
    MissingVersion { pack: String },

    #[error("shader pack {pack} has no pipelines defined")]
    NoPipelines { pack: String },

    #[error("pipeline {pipeline} in pack {pack} has no shaders")]
    NoShaders { pack: String, pipeline: String },

    #[error("pipeline {pipeline} in pack {pack} references missing {stage} shader: {path}")]
    MissingShader {
        pack: String,
        pipeline: String,
        stage: ShaderStage,
        path: String,
    },
}

/// Alias for `Result<T, ShaderPackError>`.
pub type Result<T> = std::result::Result<T, ShaderPackError>;
