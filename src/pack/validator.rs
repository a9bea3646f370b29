//! Structural checks run before a pack is compiled or registered.

use log::{error, info};

use super::model::PackDescriptor;
use crate::errors::ValidationError;

/// Validates pack structure. The first problem found is returned.
///
/// A rejected pack must be dropped by the caller; nothing of it is compiled.
pub fn validate(pack: &PackDescriptor) -> Result<(), ValidationError> {
    let result = check(pack);
    match &result {
        Ok(()) => info!("Shader pack {} validated successfully", pack.name()),
        Err(e) => error!("Rejected shader pack: {e}"),
    }
    result
}

fn check(pack: &PackDescriptor) -> Result<(), ValidationError> {
    if pack.name().is_empty() {
        return Err(ValidationError::MissingName);
    }

    if pack.version().is_empty() {
        return Err(ValidationError::MissingVersion {
            pack: pack.name().to_string(),
        });
    }

    if pack.pipelines().is_empty() {
        return Err(ValidationError::NoPipelines {
            pack: pack.name().to_string(),
        });
    }

    for (name, pipeline) in pack.pipelines() {
        if pipeline.vertex.is_none() && pipeline.fragment.is_none() {
            return Err(ValidationError::NoShaders {
                pack: pack.name().to_string(),
                pipeline: name.clone(),
            });
        }

        for (stage, path) in pipeline.shader_paths() {
            if pack.source(path).is_none() {
                return Err(ValidationError::MissingShader {
                    pack: pack.name().to_string(),
                    pipeline: name.clone(),
                    stage,
                    path: path.to_string(),
                });
            }
        }
    }

    Ok(())
}
