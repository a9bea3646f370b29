//! Pipeline Registry & Override Manager
//!
//! Owns every [`CustomPipeline`] of the loaded packs and the override table
//! the host consults when it is about to bind one of its own pipelines.
//!
//! # Storage
//!
//! Pipelines live in a `SlotMap` keyed by [`PipelineId`], with a name index
//! beside it. Overrides map a host pipeline name to a custom pipeline **name**,
//! so re-registering a pipeline under the same name keeps its overrides.
//!
//! # Activation
//!
//! ```text
//! register_pipeline ──► Registered ──(template created)──► Initialized ──► Disposed
//!                            ▲                   │ build failed
//!                            └───────────────────┘
//! ```
//!
//! Host builder calls (`build` / `release`) are never made while the registry
//! lock is held.

use std::fmt;
use std::sync::Arc;

use log::{debug, error, info, warn};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use super::custom::CustomPipeline;
use super::host::{HostPipelineBuilder, TemplateListener};
use crate::errors::Result;

new_key_type! {
    /// Stable handle of a registered custom pipeline.
    pub struct PipelineId;
}

/// Snapshot of registry occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    pub registered: usize,
    pub initialized: usize,
    pub overrides: usize,
    pub overrides_enabled: bool,
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Registered {} custom pipelines ({} initialized, {} overrides)",
            self.registered, self.initialized, self.overrides
        )
    }
}

struct RegistryInner<H> {
    pipelines: SlotMap<PipelineId, Arc<CustomPipeline<H>>>,
    by_name: FxHashMap<String, PipelineId>,
    /// Host pipeline name → custom pipeline name.
    overrides: FxHashMap<String, String>,
    overrides_enabled: bool,
}

impl<H> Default for RegistryInner<H> {
    fn default() -> Self {
        Self {
            pipelines: SlotMap::with_key(),
            by_name: FxHashMap::default(),
            overrides: FxHashMap::default(),
            overrides_enabled: false,
        }
    }
}

impl<H> RegistryInner<H> {
    fn lookup(&self, name: &str) -> Option<&Arc<CustomPipeline<H>>> {
        self.by_name.get(name).and_then(|id| self.pipelines.get(*id))
    }
}

/// Name-indexed custom pipelines plus the host override table.
pub struct PipelineRegistry<B: HostPipelineBuilder> {
    builder: B,
    inner: RwLock<RegistryInner<B::Handle>>,
}

impl<B: HostPipelineBuilder> PipelineRegistry<B> {
    #[must_use]
    pub fn new(builder: B) -> Self {
        Self {
            builder,
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    #[inline]
    #[must_use]
    pub fn builder(&self) -> &B {
        &self.builder
    }

    // ─── Pipelines ───────────────────────────────────────────────────────────

    /// Registers `pipeline` under its name.
    ///
    /// A previously registered pipeline with the same name is removed and
    /// disposed.
    pub fn register_pipeline(&self, pipeline: CustomPipeline<B::Handle>) -> PipelineId {
        let name = pipeline.name().to_string();
        let pipeline = Arc::new(pipeline);

        let (id, replaced) = {
            let mut inner = self.inner.write();
            let replaced = inner
                .by_name
                .remove(&name)
                .and_then(|old| inner.pipelines.remove(old));
            let id = inner.pipelines.insert(pipeline);
            inner.by_name.insert(name.clone(), id);
            (id, replaced)
        };

        if let Some(old) = replaced {
            info!("Replacing custom pipeline: {name}");
            old.dispose(&self.builder);
        } else {
            info!("Registered custom pipeline: {name}");
        }

        id
    }

    #[must_use]
    pub fn get_pipeline(&self, name: &str) -> Option<Arc<CustomPipeline<B::Handle>>> {
        self.inner.read().lookup(name).cloned()
    }

    #[must_use]
    pub fn get_pipeline_by_id(&self, id: PipelineId) -> Option<Arc<CustomPipeline<B::Handle>>> {
        self.inner.read().pipelines.get(id).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().by_name.contains_key(name)
    }

    /// Registered pipeline names, sorted.
    #[must_use]
    pub fn pipeline_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().by_name.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().pipelines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().pipelines.is_empty()
    }

    // ─── Activation ──────────────────────────────────────────────────────────

    /// Handles the host's "template pipeline created" notification.
    ///
    /// Returns `Ok(false)` when no custom pipeline has that name. Repeated
    /// notifications for an initialized pipeline are no-ops.
    pub fn activate(&self, pipeline_name: &str, template: &B::Template) -> Result<bool> {
        let Some(pipeline) = self.get_pipeline(pipeline_name) else {
            debug!("No custom pipeline for template: {pipeline_name}");
            return Ok(false);
        };

        pipeline.initialize(&self.builder, template)?;
        Ok(true)
    }

    // ─── Overrides ───────────────────────────────────────────────────────────

    /// Routes the host pipeline `host_name` to the custom pipeline
    /// `custom_name`. Returns `false` when `custom_name` is not registered.
    pub fn set_override(&self, host_name: &str, custom_name: &str) -> bool {
        let mut inner = self.inner.write();
        if !inner.by_name.contains_key(custom_name) {
            warn!("Cannot override {host_name}: custom pipeline {custom_name} not found");
            return false;
        }

        inner
            .overrides
            .insert(host_name.to_string(), custom_name.to_string());
        info!("Registered override: {host_name} -> {custom_name}");
        true
    }

    /// Removes the override of `host_name`. Returns whether one existed.
    pub fn remove_override(&self, host_name: &str) -> bool {
        self.inner.write().overrides.remove(host_name).is_some()
    }

    /// Handle to bind instead of the host pipeline `host_name`.
    ///
    /// `None` unless overrides are enabled, an override exists and its target
    /// is initialized.
    #[must_use]
    pub fn get_override_pipeline(&self, host_name: &str) -> Option<B::Handle> {
        let pipeline = {
            let inner = self.inner.read();
            if !inner.overrides_enabled {
                return None;
            }
            let custom_name = inner.overrides.get(host_name)?;
            Arc::clone(inner.lookup(custom_name)?)
        };
        pipeline.handle()
    }

    pub fn set_overrides_enabled(&self, enabled: bool) {
        self.inner.write().overrides_enabled = enabled;
        info!(
            "Pipeline overrides {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    #[must_use]
    pub fn overrides_enabled(&self) -> bool {
        self.inner.read().overrides_enabled
    }

    // ─── Housekeeping ────────────────────────────────────────────────────────

    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let inner = self.inner.read();
        RegistryStats {
            registered: inner.pipelines.len(),
            initialized: inner
                .pipelines
                .values()
                .filter(|p| p.is_initialized())
                .count(),
            overrides: inner.overrides.len(),
            overrides_enabled: inner.overrides_enabled,
        }
    }

    /// Disposes every pipeline, drops all overrides and disables overriding.
    pub fn clear(&self) {
        let drained: Vec<_> = {
            let mut inner = self.inner.write();
            inner.by_name.clear();
            inner.overrides.clear();
            inner.overrides_enabled = false;
            inner.pipelines.drain().map(|(_, p)| p).collect()
        };

        for pipeline in &drained {
            pipeline.dispose(&self.builder);
        }

        info!("Cleared {} custom pipelines", drained.len());
    }
}

impl<B: HostPipelineBuilder> TemplateListener<B::Template> for PipelineRegistry<B> {
    fn on_template_created(&self, pipeline_name: &str, template: &B::Template) {
        if let Err(e) = self.activate(pipeline_name, template) {
            error!("{e}");
        }
    }
}

impl<B: HostPipelineBuilder> fmt::Debug for PipelineRegistry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineRegistry")
            .field("pipelines", &self.pipeline_names())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
