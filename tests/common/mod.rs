//! Shared mocks for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use shaderpack::compiler::{SamplerDescriptor, UniformBufferDescriptor, UniformField};
use shaderpack::pipeline::{HostPipelineBuilder, PipelineBuildRequest};
use shaderpack::{
    BytecodeCompiler, ConvertedShader, DialectConverter, EngineSettings, PackDescriptor,
    PipelineConfig, ResourceBindings, ShaderPackEngine, ShaderStage,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Bytecode Compiler
// ============================================================================

/// Deterministic fake compiler. Bytecode is `<stage tag>\n<source>`.
///
/// Names containing the failure marker are rejected.
#[derive(Clone, Default)]
pub struct MockCompiler {
    calls: Arc<AtomicUsize>,
    sources: Arc<Mutex<Vec<(String, String)>>>,
    fail_marker: Option<String>,
}

impl MockCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Final source the compiler received for `name`, last call wins.
    pub fn source_of(&self, name: &str) -> Option<String> {
        self.sources
            .lock()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.clone())
    }
}

impl BytecodeCompiler for MockCompiler {
    fn compile(&self, name: &str, source: &str, stage: ShaderStage) -> anyhow::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sources
            .lock()
            .push((name.to_string(), source.to_string()));

        if let Some(marker) = &self.fail_marker
            && name.contains(marker.as_str())
        {
            anyhow::bail!("syntax error in {name}");
        }

        Ok(format!("{}\n{source}", stage.tag()).into_bytes())
    }
}

// ============================================================================
// Dialect Converter
// ============================================================================

/// Prepends a version line and reports one uniform buffer and one sampler.
#[derive(Clone, Copy, Default)]
pub struct TaggingConverter;

impl DialectConverter for TaggingConverter {
    fn convert(&self, source: &str, _stage: ShaderStage) -> anyhow::Result<ConvertedShader> {
        Ok(ConvertedShader {
            source: format!("#version 450 // converted\n{source}"),
            bindings: ResourceBindings {
                uniform_buffers: vec![UniformBufferDescriptor {
                    binding: 0,
                    name: "Globals".into(),
                    fields: vec![UniformField {
                        name: "ModelViewMat".into(),
                        ty: "mat4".into(),
                    }],
                }],
                samplers: vec![SamplerDescriptor {
                    binding: 1,
                    name: "Sampler0".into(),
                }],
            },
        })
    }
}

// ============================================================================
// Host Pipeline Builder
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockHandle {
    pub id: u64,
    pub name: String,
    pub template: String,
}

/// What the builder saw for one successful build.
#[derive(Debug, Clone)]
pub struct BuildRecord {
    pub name: String,
    pub vertex_len: usize,
    pub fragment_len: usize,
    pub has_geometry: bool,
    pub uniform_buffers: usize,
    pub samplers: usize,
    pub vertex_format: Option<String>,
}

/// Records every build and release. Template type is the host pipeline name.
#[derive(Clone, Default)]
pub struct RecordingBuilder {
    next_id: Arc<AtomicU64>,
    builds: Arc<Mutex<Vec<BuildRecord>>>,
    released: Arc<Mutex<Vec<MockHandle>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build_count(&self) -> usize {
        self.builds.lock().len()
    }

    pub fn builds(&self) -> Vec<BuildRecord> {
        self.builds.lock().clone()
    }

    pub fn released(&self) -> Vec<MockHandle> {
        self.released.lock().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl HostPipelineBuilder for RecordingBuilder {
    type Template = String;
    type Handle = MockHandle;

    fn build(
        &self,
        template: &String,
        request: &PipelineBuildRequest<'_>,
    ) -> anyhow::Result<MockHandle> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("device lost");
        }

        self.builds.lock().push(BuildRecord {
            name: request.name.to_string(),
            vertex_len: request.vertex.len(),
            fragment_len: request.fragment.len(),
            has_geometry: request.geometry.is_some(),
            uniform_buffers: request.uniform_buffers.len(),
            samplers: request.samplers.len(),
            vertex_format: request.vertex_format.map(str::to_string),
        });

        Ok(MockHandle {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            name: request.name.to_string(),
            template: template.clone(),
        })
    }

    fn release(&self, handle: MockHandle) {
        self.released.lock().push(handle);
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub const COMMON_GLSL: &str = "#define PI 3.14159\n";
pub const TERRAIN_VSH: &str = "#include \"shaders/common.glsl\"\nvoid main() {}\n";
pub const TERRAIN_FSH: &str = "void main() { gl_FragColor = vec4(1.0); }\n";

/// Pack with a single `terrain` pipeline whose vertex shader includes `common.glsl`.
pub fn terrain_pack() -> PackDescriptor {
    let mut config = PipelineConfig::new("shaders/terrain.vsh", "shaders/terrain.fsh");
    config.includes = vec!["shaders/common.glsl".into()];

    PackDescriptor::named("Test Pack", "1.0.0")
        .with_pipeline("terrain", config)
        .with_source("shaders/common.glsl", COMMON_GLSL)
        .with_source("shaders/terrain.vsh", TERRAIN_VSH)
        .with_source("shaders/terrain.fsh", TERRAIN_FSH)
}

pub struct Harness {
    pub engine: ShaderPackEngine<RecordingBuilder>,
    pub compiler: MockCompiler,
    pub builder: RecordingBuilder,
    pub dir: tempfile::TempDir,
}

pub fn harness_with(compiler: MockCompiler) -> Harness {
    init_logger();
    let dir = tempfile::tempdir().expect("tempdir");
    let builder = RecordingBuilder::new();
    let settings = EngineSettings::with_cache_dir(dir.path().join("cache"));
    let engine = ShaderPackEngine::new(settings, compiler.clone(), TaggingConverter, builder.clone())
        .expect("engine");
    Harness {
        engine,
        compiler,
        builder,
        dir,
    }
}

pub fn harness() -> Harness {
    harness_with(MockCompiler::new())
}
