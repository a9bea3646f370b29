//! Custom pipelines and host overrides
//!
//! - configuration: manifest render state resolved to `wgpu` types
//! - host: traits the embedding renderer implements
//! - custom: one compiled pipeline and its activation lifecycle
//! - registry: name index, activation dispatch and the override table

pub mod configuration;
pub mod custom;
pub mod host;
pub mod registry;

pub use configuration::{ADDITIVE_BLENDING, MULTIPLY_BLENDING, PipelineConfiguration};
pub use custom::{CustomPipeline, PipelineState};
pub use host::{HostPipelineBuilder, PipelineBuildRequest, TemplateListener};
pub use registry::{PipelineId, PipelineRegistry, RegistryStats};
