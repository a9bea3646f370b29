//! Host Integration Traits
//!
//! The engine never talks to a graphics API itself. Custom pipelines are
//! finished by the host in two steps:
//!
//! 1. The host creates its own template pipeline (the one it would normally
//!    render with) and announces it through [`TemplateListener`].
//! 2. The registry hands the template plus a [`PipelineBuildRequest`] to the
//!    host's [`HostPipelineBuilder`], which returns an opaque handle.
//!
//! Handles are released through the same builder when a pipeline is disposed.

use super::configuration::PipelineConfiguration;
use crate::compiler::{SamplerDescriptor, UniformBufferDescriptor};

/// Everything a host needs to build the resource behind one custom pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineBuildRequest<'a> {
    pub name: &'a str,
    /// Vertex format requested by the pack. `None` means "use the template's".
    pub vertex_format: Option<&'a str>,
    pub vertex: &'a [u8],
    pub fragment: &'a [u8],
    pub geometry: Option<&'a [u8]>,
    /// Uniform buffers of all stages whose source went through conversion.
    pub uniform_buffers: &'a [UniformBufferDescriptor],
    pub samplers: &'a [SamplerDescriptor],
    pub configuration: &'a PipelineConfiguration,
}

/// Host capability that turns compiled bytecode into a usable pipeline.
pub trait HostPipelineBuilder: Send + Sync {
    /// The host's own pipeline object announced via [`TemplateListener`].
    type Template;
    /// Opaque reference to the built resource. Cloned out of the registry on
    /// every override lookup, so it should be cheap (an `Arc` or an index).
    type Handle: Clone + Send + Sync;

    fn build(
        &self,
        template: &Self::Template,
        request: &PipelineBuildRequest<'_>,
    ) -> anyhow::Result<Self::Handle>;

    fn release(&self, handle: Self::Handle);
}

/// Receiver of "template pipeline created" notifications.
pub trait TemplateListener<T> {
    fn on_template_created(&self, pipeline_name: &str, template: &T);
}
