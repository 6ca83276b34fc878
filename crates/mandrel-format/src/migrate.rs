use mandrel_engine::types::FeatureTree;

use crate::errors::LoadError;

/// Apply format migrations from `from_version` up to `to_version`,
/// sequentially. Version 1 is the only version so far; add match arms
/// (1 => migrate_v1_to_v2) as the format evolves.
pub fn migrate(
    tree: FeatureTree,
    from_version: u32,
    to_version: u32,
) -> Result<FeatureTree, LoadError> {
    if from_version != to_version {
        return Err(LoadError::MigrationFailed {
            from: from_version,
            to: to_version,
            reason: format!(
                "no migration path from v{} to v{}",
                from_version, to_version
            ),
        });
    }
    Ok(tree)
}
