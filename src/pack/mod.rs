//! Shader packs: model, validation, loading and the pack list.

pub mod loader;
pub mod model;
pub mod registry;
pub mod validator;

pub use loader::{ArchiveReader, DirectoryReader, PackLoader, PackReader};
pub use model::{
    BlendMode, CullFace, PackDescriptor, PackManifest, PipelineConfig, PipelineStage, SourceMap,
};
pub use registry::PackRegistry;
pub use validator::validate;
