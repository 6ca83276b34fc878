use mandrel_engine::types::FeatureTree;
use serde::Deserialize;

use crate::errors::LoadError;
use crate::metadata::ProjectMetadata;
use crate::save::FORMAT_VERSION;

/// The top-level file structure for deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectFileRaw {
    pub format: String,
    pub version: u32,
    pub project: ProjectMetadata,
    pub features: FeatureTree,
}

/// Deserialize a project from JSON, validating format and version and
/// migrating older files forward.
pub fn load_project(json: &str) -> Result<(FeatureTree, ProjectMetadata), LoadError> {
    let raw: ProjectFileRaw =
        serde_json::from_str(json).map_err(|e| LoadError::ParseError(e.to_string()))?;

    if raw.format != "mandrel" {
        return Err(LoadError::UnknownFormat(raw.format));
    }
    if raw.version > FORMAT_VERSION {
        return Err(LoadError::FutureVersion {
            file_version: raw.version,
            supported_version: FORMAT_VERSION,
        });
    }

    let tree = if raw.version < FORMAT_VERSION {
        crate::migrate::migrate(raw.features, raw.version, FORMAT_VERSION)?
    } else {
        raw.features
    };

    Ok((tree, raw.project))
}
