//! Resolved Render State
//!
//! Maps the manifest-level [`PipelineConfig`] into the `wgpu` state types the
//! host builder consumes directly.
//!
//! | Manifest        | Resolved                                            |
//! |-----------------|-----------------------------------------------------|
//! | `opaque`        | no blending                                         |
//! | `cutout`        | no blending, `alpha_test = true`                    |
//! | `translucent`   | `BlendState::ALPHA_BLENDING`                        |
//! | `add`           | `src * 1 + dst * 1` color, `OVER` alpha             |
//! | `multiply`      | `src * dst` color, `OVER` alpha                     |
//! | `depthTest`     | `LessEqual`, otherwise `Always`                     |
//! | `cullFace`      | `none` → `None`, `front`/`back` → `Some(Face)`      |

use crate::pack::{BlendMode, CullFace, PipelineConfig, PipelineStage};

/// Additive color blending.
pub const ADDITIVE_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent::OVER,
};

/// Multiplicative color blending.
pub const MULTIPLY_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Dst,
        dst_factor: wgpu::BlendFactor::Zero,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent::OVER,
};

/// Render state of one custom pipeline, ready for the host builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfiguration {
    pub blend: Option<wgpu::BlendState>,
    pub depth_compare: wgpu::CompareFunction,
    pub depth_write: bool,
    pub cull_mode: Option<wgpu::Face>,
    /// The fragment shader discards below an alpha threshold.
    pub alpha_test: bool,
    pub stage: PipelineStage,
    pub vertex_format: Option<String>,
}

impl Default for PipelineConfiguration {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl PipelineConfiguration {
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        let blend = match config.blend {
            BlendMode::Opaque | BlendMode::Cutout => None,
            BlendMode::Translucent => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendMode::Add => Some(ADDITIVE_BLENDING),
            BlendMode::Multiply => Some(MULTIPLY_BLENDING),
        };

        let depth_compare = if config.depth_test {
            wgpu::CompareFunction::LessEqual
        } else {
            wgpu::CompareFunction::Always
        };

        let cull_mode = match config.cull_face {
            CullFace::None => None,
            CullFace::Front => Some(wgpu::Face::Front),
            CullFace::Back => Some(wgpu::Face::Back),
        };

        Self {
            blend,
            depth_compare,
            depth_write: config.depth_write,
            cull_mode,
            alpha_test: config.blend == BlendMode::Cutout,
            stage: config.stage,
            vertex_format: config.vertex_format.clone(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_translucent(&self) -> bool {
        self.blend.is_some()
    }
}

impl From<&PipelineConfig> for PipelineConfiguration {
    fn from(config: &PipelineConfig) -> Self {
        Self::from_config(config)
    }
}
