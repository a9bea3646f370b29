//! Shader Compiler Orchestrator
//!
//! Composes preprocessing, dialect conversion, the bytecode cache and the
//! host's bytecode compiler into a single [`ShaderCompiler::compile`] call:
//!
//! ```text
//! raw source ─► Preprocessor ─► apply_dialect ─► CacheKey::derive
//!                                                    │
//!                              hit ◄── ShaderCache ◄─┘
//!                              miss ─► BytecodeCompiler ─► ShaderCache::put
//! ```
//!
//! The cache key is computed from the **final** source, so editing an include
//! or swapping the converter invalidates exactly the affected artifacts.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use log::{debug, error, info};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::ShaderStage;
use super::cache::{CacheKey, ShaderCache};
use super::dialect::{DialectConverter, ResourceBindings, apply_dialect};
use super::preprocessor::Preprocessor;
use crate::errors::{Result, ShaderPackError};
use crate::pack::SourceMap;
use crate::settings::DEFAULT_MAX_INCLUDE_DEPTH;

/// Host capability turning final shader source into bytecode (e.g. SPIR-V).
pub trait BytecodeCompiler: Send + Sync {
    fn compile(&self, name: &str, source: &str, stage: ShaderStage) -> anyhow::Result<Vec<u8>>;
}

/// One compiled shader stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    /// Logical shader name (the pack-relative source path).
    pub name: String,
    pub stage: ShaderStage,
    pub bytecode: Arc<[u8]>,
    /// Present only when dialect conversion ran.
    pub bindings: Option<ResourceBindings>,
    pub cache_key: CacheKey,
    /// `true` when the bytecode came from the cache instead of the compiler.
    pub from_cache: bool,
}

impl CompiledArtifact {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytecode.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytecode.is_empty()
    }
}

/// Counters accumulated across all compiles of one compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompileStats {
    pub cache_hits: u64,
    pub compiled: u64,
    pub failed: u64,
}

/// Cached, dialect-aware front end to the host's bytecode compiler.
pub struct ShaderCompiler {
    cache: Arc<ShaderCache>,
    compiler: Box<dyn BytecodeCompiler>,
    converter: Box<dyn DialectConverter>,
    max_include_depth: usize,

    /// Shader name → bindings from its last successful conversion.
    metadata: Mutex<FxHashMap<String, ResourceBindings>>,

    cache_hits: AtomicU64,
    compiled: AtomicU64,
    failed: AtomicU64,
}

impl ShaderCompiler {
    #[must_use]
    pub fn new(
        cache: Arc<ShaderCache>,
        compiler: impl BytecodeCompiler + 'static,
        converter: impl DialectConverter + 'static,
    ) -> Self {
        Self {
            cache,
            compiler: Box::new(compiler),
            converter: Box::new(converter),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            metadata: Mutex::new(FxHashMap::default()),
            cache_hits: AtomicU64::new(0),
            compiled: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_max_include_depth(mut self, max_include_depth: usize) -> Self {
        self.max_include_depth = max_include_depth;
        self
    }

    /// Compiles one shader stage.
    ///
    /// `includes` is the include universe, normally the pack's full source
    /// map. Include errors are returned as-is; compiler failures become
    /// [`ShaderPackError::Compilation`].
    pub fn compile(
        &self,
        includes: &SourceMap,
        name: &str,
        raw_source: &str,
        stage: ShaderStage,
        pack_version: &str,
    ) -> Result<CompiledArtifact> {
        let expanded = Preprocessor::new(includes)
            .with_max_depth(self.max_include_depth)
            .preprocess(raw_source, name)?;

        let dialect = apply_dialect(name, &expanded, stage, self.converter.as_ref());
        if let Some(bindings) = &dialect.bindings {
            self.metadata
                .lock()
                .insert(name.to_string(), bindings.clone());
        }

        let source = dialect.source.as_ref();
        let cache_key = CacheKey::derive(name, source, stage, pack_version);

        if let Some(bytecode) = self.cache.get(&cache_key) {
            debug!("Loaded {name} from cache");
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(CompiledArtifact {
                name: name.to_string(),
                stage,
                bytecode,
                bindings: dialect.bindings,
                cache_key,
                from_cache: true,
            });
        }

        info!(
            "Compiling shader: {name} ({stage}). Source: {} chars",
            source.len()
        );
        let start = Instant::now();

        let bytecode: Arc<[u8]> = match self.compiler.compile(name, source, stage) {
            Ok(bytes) => bytes.into(),
            Err(cause) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                error!("Bytecode compilation failed: {name}: {cause:#}");
                return Err(ShaderPackError::Compilation {
                    name: name.to_string(),
                    stage,
                    cause,
                });
            }
        };

        info!("Compiled {name} in {}ms", start.elapsed().as_millis());
        self.compiled.fetch_add(1, Ordering::Relaxed);

        self.cache.put(cache_key, Arc::clone(&bytecode));

        Ok(CompiledArtifact {
            name: name.to_string(),
            stage,
            bytecode,
            bindings: dialect.bindings,
            cache_key,
            from_cache: false,
        })
    }

    /// Bindings recorded by the last conversion of `name`, if any.
    #[must_use]
    pub fn metadata(&self, name: &str) -> Option<ResourceBindings> {
        self.metadata.lock().get(name).cloned()
    }

    #[inline]
    #[must_use]
    pub fn cache(&self) -> &Arc<ShaderCache> {
        &self.cache
    }

    #[must_use]
    pub fn stats(&self) -> CompileStats {
        CompileStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            compiled: self.compiled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ShaderCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderCompiler")
            .field("cache", &self.cache)
            .field("max_include_depth", &self.max_include_depth)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
