use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;

use super::configuration::PipelineConfiguration;
use super::host::{HostPipelineBuilder, PipelineBuildRequest};
use crate::compiler::{CompiledArtifact, SamplerDescriptor, UniformBufferDescriptor};
use crate::errors::{Result, ShaderPackError};
use crate::pack::PackDescriptor;

/// Observable lifecycle of a [`CustomPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Compiled and registered; waiting for the host template.
    Registered,
    /// Host resource built. Override lookups return its handle.
    Initialized,
    /// Host resource released. Terminal.
    Disposed,
}

enum Lifecycle<H> {
    Registered,
    Initialized(H),
    Disposed,
}

/// A compiled pack pipeline and, once activated, its host resource.
///
/// Activation and disposal serialize on an internal lock, so two concurrent
/// template notifications build at most one host resource.
pub struct CustomPipeline<H> {
    name: String,
    pack: Arc<PackDescriptor>,
    vertex: CompiledArtifact,
    fragment: CompiledArtifact,
    geometry: Option<CompiledArtifact>,
    configuration: PipelineConfiguration,
    lifecycle: Mutex<Lifecycle<H>>,
}

impl<H: Clone> CustomPipeline<H> {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        pack: Arc<PackDescriptor>,
        vertex: CompiledArtifact,
        fragment: CompiledArtifact,
        configuration: PipelineConfiguration,
    ) -> Self {
        Self {
            name: name.into(),
            pack,
            vertex,
            fragment,
            geometry: None,
            configuration,
            lifecycle: Mutex::new(Lifecycle::Registered),
        }
    }

    #[must_use]
    pub fn with_geometry(mut self, geometry: CompiledArtifact) -> Self {
        self.geometry = Some(geometry);
        self
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Builds the host resource from `template`.
    ///
    /// Calling this on an initialized pipeline logs a warning and does nothing.
    /// On build failure the pipeline stays `Registered` so a later template
    /// notification can retry.
    pub fn initialize<B>(&self, builder: &B, template: &B::Template) -> Result<()>
    where
        B: HostPipelineBuilder<Handle = H>,
    {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Initialized(_) => {
                warn!("Pipeline {} already initialized", self.name);
                return Ok(());
            }
            Lifecycle::Disposed => {
                warn!("Pipeline {} was disposed, not initializing", self.name);
                return Ok(());
            }
            Lifecycle::Registered => {}
        }

        let (uniform_buffers, samplers) = self.collect_bindings();
        let request = PipelineBuildRequest {
            name: &self.name,
            vertex_format: self.configuration.vertex_format.as_deref(),
            vertex: &self.vertex.bytecode,
            fragment: &self.fragment.bytecode,
            geometry: self.geometry.as_ref().map(|g| &*g.bytecode),
            uniform_buffers: &uniform_buffers,
            samplers: &samplers,
            configuration: &self.configuration,
        };

        let handle = builder
            .build(template, &request)
            .map_err(|cause| ShaderPackError::PipelineInit {
                name: self.name.clone(),
                cause,
            })?;

        *lifecycle = Lifecycle::Initialized(handle);
        info!("Initialized custom pipeline: {}", self.name);
        Ok(())
    }

    /// Releases the host resource, if any. Idempotent.
    pub fn dispose<B>(&self, builder: &B)
    where
        B: HostPipelineBuilder<Handle = H>,
    {
        let previous = std::mem::replace(&mut *self.lifecycle.lock(), Lifecycle::Disposed);
        if let Lifecycle::Initialized(handle) = previous {
            builder.release(handle);
            debug!("Disposed custom pipeline: {}", self.name);
        }
    }

    /// The host handle while initialized.
    #[must_use]
    pub fn handle(&self) -> Option<H> {
        match &*self.lifecycle.lock() {
            Lifecycle::Initialized(handle) => Some(handle.clone()),
            Lifecycle::Registered | Lifecycle::Disposed => None,
        }
    }

    /// Binding metadata of all converted stages, in stage order.
    fn collect_bindings(&self) -> (Vec<UniformBufferDescriptor>, Vec<SamplerDescriptor>) {
        let mut uniform_buffers = Vec::new();
        let mut samplers = Vec::new();
        for artifact in self.artifacts() {
            if let Some(bindings) = &artifact.bindings {
                uniform_buffers.extend(bindings.uniform_buffers.iter().cloned());
                samplers.extend(bindings.samplers.iter().cloned());
            }
        }
        (uniform_buffers, samplers)
    }
}

impl<H> CustomPipeline<H> {
    #[must_use]
    pub fn state(&self) -> PipelineState {
        match *self.lifecycle.lock() {
            Lifecycle::Registered => PipelineState::Registered,
            Lifecycle::Initialized(_) => PipelineState::Initialized,
            Lifecycle::Disposed => PipelineState::Disposed,
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state() == PipelineState::Initialized
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn pack(&self) -> &Arc<PackDescriptor> {
        &self.pack
    }

    #[inline]
    #[must_use]
    pub fn vertex(&self) -> &CompiledArtifact {
        &self.vertex
    }

    #[inline]
    #[must_use]
    pub fn fragment(&self) -> &CompiledArtifact {
        &self.fragment
    }

    #[inline]
    #[must_use]
    pub fn geometry(&self) -> Option<&CompiledArtifact> {
        self.geometry.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn configuration(&self) -> &PipelineConfiguration {
        &self.configuration
    }

    /// Vertex, fragment, then geometry when present.
    pub fn artifacts(&self) -> impl Iterator<Item = &CompiledArtifact> {
        [Some(&self.vertex), Some(&self.fragment), self.geometry.as_ref()]
            .into_iter()
            .flatten()
    }
}

impl<H> std::fmt::Debug for CustomPipeline<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomPipeline")
            .field("name", &self.name)
            .field("pack", &self.pack.name())
            .field("state", &self.state())
            .field("configuration", &self.configuration)
            .finish_non_exhaustive()
    }
}
