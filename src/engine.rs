//! Engine Core Module
//!
//! [`ShaderPackEngine`] is the load session that ties every component
//! together. It owns the bytecode cache, the compiler front end, the pack list
//! and the pipeline registry; the host owns the engine.
//!
//! # Load Flow
//!
//! ```text
//! PackLoader ─► validate ─► PackRegistry
//!                   │
//!                   └─► per pipeline: ShaderCompiler (vertex, fragment, geometry?)
//!                                        │
//!                                        └─► PipelineRegistry::register_pipeline
//! ```
//!
//! A rejected pack contributes nothing. A pipeline that fails to compile is
//! skipped; its siblings in the same pack are still registered.
//!
//! # Example
//!
//! ```rust,ignore
//! use shaderpack::{EngineSettings, NoConversion, ShaderPackEngine};
//!
//! let engine = ShaderPackEngine::new(
//!     EngineSettings::default(),
//!     MySpirvCompiler::new(),
//!     NoConversion,
//!     MyPipelineBuilder::new(device),
//! )?;
//!
//! let summary = engine.load_from_dir(Path::new("shaderpacks"));
//! log::info!("{summary}");
//!
//! // Host side, whenever it creates one of its own pipelines:
//! engine.registry().activate("terrain", &template)?;
//!
//! // Host side, before binding a pipeline:
//! if let Some(handle) = engine.registry().get_override_pipeline("terrain") {
//!     // bind `handle` instead
//! }
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::{debug, error, info};

use crate::compiler::{
    BytecodeCompiler, CompiledArtifact, DialectConverter, ShaderCache, ShaderCompiler, ShaderStage,
};
use crate::errors::{Result, ShaderPackError, ValidationError};
use crate::pack::{PackDescriptor, PackLoader, PackRegistry, PipelineConfig, PipelineStage, validate};
use crate::pipeline::{
    CustomPipeline, HostPipelineBuilder, PipelineConfiguration, PipelineRegistry, TemplateListener,
};
use crate::settings::EngineSettings;

// ─── Reports ──────────────────────────────────────────────────────────────────

/// Outcome of loading one accepted pack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackLoadReport {
    pub pack: String,
    /// Pipelines declared by the manifest.
    pub found: usize,
    /// Pipelines whose every stage compiled.
    pub compiled: usize,
    /// Pipelines added to the registry.
    pub registered: usize,
    /// Pipelines skipped because a stage was missing or failed to compile.
    pub failed: usize,
    /// Names of the registered pipelines.
    pub pipelines: Vec<String>,
}

/// Aggregate outcome of a multi-pack load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub packs_loaded: usize,
    pub packs_rejected: usize,
    pub found: usize,
    pub compiled: usize,
    pub registered: usize,
    pub failed: usize,
}

impl LoadSummary {
    fn add(&mut self, report: &PackLoadReport) {
        self.packs_loaded += 1;
        self.found += report.found;
        self.compiled += report.compiled;
        self.registered += report.registered;
        self.failed += report.failed;
    }
}

impl fmt::Display for LoadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Shader pack loading complete: {} found, {} compiled, {} registered ({} failed, {} packs rejected)",
            self.found, self.compiled, self.registered, self.failed, self.packs_rejected
        )
    }
}

// ─── Engine ───────────────────────────────────────────────────────────────────

/// Shader-pack load session.
///
/// # Lifecycle
///
/// 1. Create with [`ShaderPackEngine::new`] (creates the cache directory)
/// 2. Load packs with [`load_from_dir`](Self::load_from_dir) or [`load_packs`](Self::load_packs)
/// 3. Forward template notifications to [`registry`](Self::registry)
/// 4. Query overrides every time the host binds a pipeline
/// 5. [`reload_from_dir`](Self::reload_from_dir) on resource reload
pub struct ShaderPackEngine<B: HostPipelineBuilder> {
    settings: EngineSettings,
    loader: PackLoader,
    compiler: ShaderCompiler,
    packs: PackRegistry,
    registry: PipelineRegistry<B>,
}

impl<B: HostPipelineBuilder> ShaderPackEngine<B> {
    /// Creates the engine and opens the bytecode cache.
    ///
    /// Fails only when the cache directory cannot be created.
    pub fn new(
        settings: EngineSettings,
        compiler: impl BytecodeCompiler + 'static,
        converter: impl DialectConverter + 'static,
        builder: B,
    ) -> Result<Self> {
        let cache = Arc::new(ShaderCache::new(settings.cache_dir.clone())?);
        let compiler = ShaderCompiler::new(cache, compiler, converter)
            .with_max_include_depth(settings.max_include_depth);

        info!("Shader pack engine initialized");

        Ok(Self {
            loader: PackLoader::new(settings.manifest_name.clone()),
            compiler,
            packs: PackRegistry::new(),
            registry: PipelineRegistry::new(builder),
            settings,
        })
    }

    // ─── Loading ─────────────────────────────────────────────────────────────

    /// Validates, registers and compiles one pack.
    ///
    /// Only validation failure is returned as an error. Per-pipeline failures
    /// are logged and counted in the report.
    pub fn load_pack(
        &self,
        pack: PackDescriptor,
    ) -> std::result::Result<PackLoadReport, ValidationError> {
        validate(&pack)?;

        let pack = Arc::new(pack);
        self.packs.register(Arc::clone(&pack));

        let mut report = PackLoadReport {
            pack: pack.name().to_string(),
            ..Default::default()
        };

        for (name, config) in pack.pipelines() {
            report.found += 1;

            let pipeline = match self.build_pipeline(&pack, name, config) {
                Ok(pipeline) => pipeline,
                Err(e) => {
                    report.failed += 1;
                    error!("Failed to load pipeline {name} from {}: {e}", pack.name());
                    continue;
                }
            };
            report.compiled += 1;

            self.registry.register_pipeline(pipeline);
            report.registered += 1;
            report.pipelines.push(name.clone());
        }

        info!(
            "Loaded pack {}: {} found, {} compiled, {} registered",
            report.pack, report.found, report.compiled, report.registered
        );

        Ok(report)
    }

    /// Loads several packs. Rejected packs are counted, never fatal.
    ///
    /// With `auto_override` set, every registered main-stage pipeline then
    /// overrides the host pipeline of the same name, and overrides are
    /// enabled when at least one pipeline was registered. This is wider than
    /// routing `terrain` alone: a pack that only wants its terrain pipeline
    /// bound should turn `auto_override` off and call
    /// [`PipelineRegistry::set_override`] itself.
    pub fn load_packs(&self, packs: impl IntoIterator<Item = PackDescriptor>) -> LoadSummary {
        let mut summary = LoadSummary::default();
        let mut main_stage = Vec::new();

        for pack in packs {
            match self.load_pack(pack) {
                Ok(report) => {
                    summary.add(&report);
                    main_stage.extend(report.pipelines.into_iter().filter(|name| {
                        self.registry
                            .get_pipeline(name)
                            .is_some_and(|p| p.configuration().stage == PipelineStage::Main)
                    }));
                }
                Err(_) => summary.packs_rejected += 1,
            }
        }

        if self.settings.auto_override {
            for name in &main_stage {
                self.registry.set_override(name, name);
            }
            if summary.registered > 0 {
                self.registry.set_overrides_enabled(true);
            }
        }

        info!("{summary}");
        summary
    }

    /// Loads every pack found in `dir`.
    pub fn load_from_dir(&self, dir: &Path) -> LoadSummary {
        self.load_packs(self.loader.load_all(dir))
    }

    /// Drops every pipeline and pack, then loads `packs`.
    pub fn reload(&self, packs: impl IntoIterator<Item = PackDescriptor>) -> LoadSummary {
        info!("Reloading shader packs");
        self.registry.clear();
        self.packs.clear();
        self.load_packs(packs)
    }

    /// Drops every pipeline and pack, then loads every pack found in `dir`.
    pub fn reload_from_dir(&self, dir: &Path) -> LoadSummary {
        let packs = self.loader.load_all(dir);
        self.reload(packs)
    }

    fn build_pipeline(
        &self,
        pack: &Arc<PackDescriptor>,
        name: &str,
        config: &PipelineConfig,
    ) -> Result<CustomPipeline<B::Handle>> {
        let missing = |stage| ShaderPackError::MissingShader {
            pipeline: name.to_string(),
            stage,
        };
        let vertex_path = config
            .vertex
            .as_deref()
            .ok_or_else(|| missing(ShaderStage::Vertex))?;
        let fragment_path = config
            .fragment
            .as_deref()
            .ok_or_else(|| missing(ShaderStage::Fragment))?;

        debug!("Compiling pipeline {name} from {}", pack.name());

        let vertex = self.compile_stage(pack, name, vertex_path, ShaderStage::Vertex)?;
        let fragment = self.compile_stage(pack, name, fragment_path, ShaderStage::Fragment)?;

        let pipeline = CustomPipeline::new(
            name,
            Arc::clone(pack),
            vertex,
            fragment,
            PipelineConfiguration::from_config(config),
        );

        match config.geometry.as_deref() {
            Some(path) => {
                let geometry = self.compile_stage(pack, name, path, ShaderStage::Geometry)?;
                Ok(pipeline.with_geometry(geometry))
            }
            None => Ok(pipeline),
        }
    }

    fn compile_stage(
        &self,
        pack: &PackDescriptor,
        pipeline: &str,
        path: &str,
        stage: ShaderStage,
    ) -> Result<CompiledArtifact> {
        let source = pack.source(path).ok_or_else(|| ShaderPackError::MissingShader {
            pipeline: pipeline.to_string(),
            stage,
        })?;
        self.compiler
            .compile(pack.sources(), path, source, stage, pack.version())
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &PipelineRegistry<B> {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn packs(&self) -> &PackRegistry {
        &self.packs
    }

    #[inline]
    #[must_use]
    pub fn cache(&self) -> &Arc<ShaderCache> {
        self.compiler.cache()
    }

    #[inline]
    #[must_use]
    pub fn compiler(&self) -> &ShaderCompiler {
        &self.compiler
    }

    #[inline]
    #[must_use]
    pub fn loader(&self) -> &PackLoader {
        &self.loader
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

impl<B: HostPipelineBuilder> TemplateListener<B::Template> for ShaderPackEngine<B> {
    fn on_template_created(&self, pipeline_name: &str, template: &B::Template) {
        self.registry.on_template_created(pipeline_name, template);
    }
}

impl<B: HostPipelineBuilder> fmt::Debug for ShaderPackEngine<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderPackEngine")
            .field("settings", &self.settings)
            .field("compiler", &self.compiler)
            .field("packs", &self.packs)
            .field("registry", &self.registry)
            .finish()
    }
}
