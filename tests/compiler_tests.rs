//! Shader Compiler Tests
//!
//! Tests for:
//! - Cache hits skipping the external compiler
//! - Cache keys following the final (expanded, converted) source
//! - Legacy dialect conversion and binding metadata
//! - Error mapping for compiler and include failures

mod common;

use std::sync::Arc;

use common::{MockCompiler, TaggingConverter, init_logger};
use shaderpack::pack::SourceMap;
use shaderpack::{NoConversion, ShaderCache, ShaderCompiler, ShaderPackError, ShaderStage};

fn sources(entries: &[(&str, &str)]) -> SourceMap {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn compiler_in(dir: &tempfile::TempDir, mock: &MockCompiler) -> ShaderCompiler {
    let cache = Arc::new(ShaderCache::new(dir.path()).unwrap());
    ShaderCompiler::new(cache, mock.clone(), TaggingConverter)
}

// ============================================================================
// Caching
// ============================================================================

#[test]
fn second_compile_hits_cache() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let mock = MockCompiler::new();
    let compiler = compiler_in(&dir, &mock);
    let includes = SourceMap::default();

    let first = compiler
        .compile(&includes, "a.vsh", "void main() {}", ShaderStage::Vertex, "1.0")
        .unwrap();
    let second = compiler
        .compile(&includes, "a.vsh", "void main() {}", ShaderStage::Vertex, "1.0")
        .unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.bytecode, second.bytecode);
    assert_eq!(first.cache_key, second.cache_key);
    assert_eq!(mock.calls(), 1);

    let stats = compiler.stats();
    assert_eq!(stats.compiled, 1);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.failed, 0);
}

#[test]
fn persistent_cache_survives_new_compiler() {
    let dir = tempfile::tempdir().unwrap();
    let includes = SourceMap::default();

    let mock = MockCompiler::new();
    compiler_in(&dir, &mock)
        .compile(&includes, "a.fsh", "void main() {}", ShaderStage::Fragment, "1.0")
        .unwrap();

    let fresh_mock = MockCompiler::new();
    let artifact = compiler_in(&dir, &fresh_mock)
        .compile(&includes, "a.fsh", "void main() {}", ShaderStage::Fragment, "1.0")
        .unwrap();

    assert!(artifact.from_cache);
    assert_eq!(fresh_mock.calls(), 0);
}

#[test]
fn include_change_invalidates_entry() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockCompiler::new();
    let compiler = compiler_in(&dir, &mock);
    let raw = "#include \"common.glsl\"\nvoid main() {}\n";

    let v1 = compiler
        .compile(
            &sources(&[("common.glsl", "#define A 1")]),
            "a.vsh",
            raw,
            ShaderStage::Vertex,
            "1.0",
        )
        .unwrap();
    let v2 = compiler
        .compile(
            &sources(&[("common.glsl", "#define A 2")]),
            "a.vsh",
            raw,
            ShaderStage::Vertex,
            "1.0",
        )
        .unwrap();

    assert_ne!(v1.cache_key, v2.cache_key);
    assert!(!v2.from_cache);
    assert_eq!(mock.calls(), 2);
}

#[test]
fn pack_version_is_part_of_key() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockCompiler::new();
    let compiler = compiler_in(&dir, &mock);
    let includes = SourceMap::default();

    compiler
        .compile(&includes, "a.vsh", "void main() {}", ShaderStage::Vertex, "1.0")
        .unwrap();
    let bumped = compiler
        .compile(&includes, "a.vsh", "void main() {}", ShaderStage::Vertex, "1.1")
        .unwrap();

    assert!(!bumped.from_cache);
    assert_eq!(mock.calls(), 2);
}

// ============================================================================
// Dialect Conversion
// ============================================================================

#[test]
fn legacy_source_is_converted_before_compile() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockCompiler::new();
    let compiler = compiler_in(&dir, &mock);

    let artifact = compiler
        .compile(
            &SourceMap::default(),
            "legacy.fsh",
            "uniform sampler2D Sampler0;\nvoid main() {}\n",
            ShaderStage::Fragment,
            "1.0",
        )
        .unwrap();

    let seen = mock.source_of("legacy.fsh").unwrap();
    assert!(seen.starts_with("#version 450 // converted\n"));

    let bindings = artifact.bindings.expect("bindings recorded");
    assert_eq!(bindings.samplers[0].name, "Sampler0");
    assert_eq!(bindings.uniform_buffers[0].fields[0].name, "ModelViewMat");
    assert_eq!(compiler.metadata("legacy.fsh"), Some(bindings));
}

#[test]
fn native_source_has_no_bindings() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockCompiler::new();
    let compiler = compiler_in(&dir, &mock);

    let artifact = compiler
        .compile(
            &SourceMap::default(),
            "native.fsh",
            "layout(binding = 0) uniform sampler2D s;\nvoid main() {}\n",
            ShaderStage::Fragment,
            "1.0",
        )
        .unwrap();

    assert!(artifact.bindings.is_none());
    assert!(compiler.metadata("native.fsh").is_none());
    assert_eq!(
        mock.source_of("native.fsh").unwrap(),
        "layout(binding = 0) uniform sampler2D s;\nvoid main() {}\n"
    );
}

#[test]
fn failed_conversion_compiles_original_source() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(ShaderCache::new(dir.path()).unwrap());
    let mock = MockCompiler::new();
    let compiler = ShaderCompiler::new(cache, mock.clone(), NoConversion);

    let raw = "uniform mat4 ModelViewMat;\nvoid main() {}\n";
    let artifact = compiler
        .compile(&SourceMap::default(), "legacy.vsh", raw, ShaderStage::Vertex, "1.0")
        .unwrap();

    assert!(artifact.bindings.is_none());
    assert_eq!(mock.source_of("legacy.vsh").unwrap(), raw);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn compiler_failure_maps_to_compilation_error() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockCompiler::failing_on("broken");
    let compiler = compiler_in(&dir, &mock);

    let err = compiler
        .compile(
            &SourceMap::default(),
            "broken.fsh",
            "void main() {}",
            ShaderStage::Fragment,
            "1.0",
        )
        .unwrap_err();

    match err {
        ShaderPackError::Compilation { name, stage, cause } => {
            assert_eq!(name, "broken.fsh");
            assert_eq!(stage, ShaderStage::Fragment);
            assert!(cause.to_string().contains("syntax error"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(compiler.stats().failed, 1);
    assert_eq!(compiler.cache().stats().persistent_count, 0);
}

#[test]
fn missing_include_aborts_before_compiler() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockCompiler::new();
    let compiler = compiler_in(&dir, &mock);

    let err = compiler
        .compile(
            &SourceMap::default(),
            "a.vsh",
            "void main() {}\n#include \"gone.glsl\"\n",
            ShaderStage::Vertex,
            "1.0",
        )
        .unwrap_err();

    assert!(matches!(
        err,
        ShaderPackError::IncludeNotFound { ref path, line: 2, .. } if path == "gone.glsl"
    ));
    assert_eq!(mock.calls(), 0);
}

#[test]
fn include_depth_limit_is_configurable() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(ShaderCache::new(dir.path()).unwrap());
    let compiler =
        ShaderCompiler::new(cache, MockCompiler::new(), NoConversion).with_max_include_depth(1);

    let includes = sources(&[
        ("a.glsl", "#include \"b.glsl\"\n"),
        ("b.glsl", "float b;\n"),
    ]);
    let err = compiler
        .compile(&includes, "x.vsh", "#include \"a.glsl\"\n", ShaderStage::Vertex, "1.0")
        .unwrap_err();

    assert!(matches!(
        err,
        ShaderPackError::IncludeDepthExceeded { max_depth: 1, .. }
    ));
}
