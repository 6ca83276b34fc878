use mandrel_engine::types::FeatureTree;
use serde::Serialize;

use crate::metadata::ProjectMetadata;

/// Current file format version.
pub const FORMAT_VERSION: u32 = 1;

/// The top-level file structure. Only the parametric recipe is persisted
/// — features, operations, GeomRefs. Kernel handles and entity ids are
/// not serializable by construction, so they cannot leak in here.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectFile {
    pub format: String,
    pub version: u32,
    pub project: ProjectMetadata,
    pub features: FeatureTree,
}

/// Serialize a project to pretty-printed JSON.
pub fn save_project(tree: &FeatureTree, metadata: &ProjectMetadata) -> String {
    let file = ProjectFile {
        format: "mandrel".to_string(),
        version: FORMAT_VERSION,
        project: metadata.clone(),
        features: tree.clone(),
    };
    serde_json::to_string_pretty(&file).expect("FeatureTree serialization should never fail")
}
