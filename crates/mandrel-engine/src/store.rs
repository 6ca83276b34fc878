//! FeatureStore — mutations on the feature tree. Pure data-structure
//! logic: no geometry, no kernel. Every geometry-affecting mutation
//! returns the earliest index the rebuild engine must replay from.

use uuid::Uuid;

use crate::types::{Feature, FeatureTree, Operation};

/// Errors from tree mutations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("index {index} out of range (tree has {len} features)")]
    InvalidIndex { index: usize, len: usize },

    #[error("feature {feature} would reference {referenced} at or after its own index")]
    ForwardReference { feature: Uuid, referenced: Uuid },

    #[error("feature not found: {id}")]
    FeatureNotFound { id: Uuid },
}

impl FeatureTree {
    /// Append a feature. With an active rollback point the feature goes
    /// right after it (the usual CAD "insert at the bar" behavior) and
    /// the rollback point advances over it.
    pub fn append(&mut self, name: String, operation: Operation) -> Result<(Uuid, usize), StoreError> {
        let position = match self.active_index {
            Some(idx) => (idx + 1).min(self.features.len()),
            None => self.features.len(),
        };
        let id = self.insert(position, name, operation)?;
        if self.active_index.is_some() {
            self.active_index = Some(position);
        }
        Ok((id, position))
    }

    /// Insert a feature at an index. The new feature may only reference
    /// features strictly before `index`.
    pub fn insert(
        &mut self,
        index: usize,
        name: String,
        operation: Operation,
    ) -> Result<Uuid, StoreError> {
        if index > self.features.len() {
            return Err(StoreError::InvalidIndex {
                index,
                len: self.features.len(),
            });
        }
        let id = Uuid::new_v4();
        self.check_references(id, &operation, index)?;

        self.features.insert(
            index,
            Feature {
                id,
                name,
                operation,
                suppressed: false,
            },
        );
        if let Some(ref mut idx) = self.active_index {
            if index <= *idx {
                *idx += 1;
            }
        }
        Ok(id)
    }

    /// Replace a feature's operation. Returns the dirty index.
    pub fn edit_operation(&mut self, id: Uuid, operation: Operation) -> Result<usize, StoreError> {
        let pos = self
            .feature_index(id)
            .ok_or(StoreError::FeatureNotFound { id })?;
        self.check_references(id, &operation, pos)?;
        self.features[pos].operation = operation;
        Ok(pos)
    }

    /// Rename a feature. Does not dirty any geometry.
    pub fn rename(&mut self, id: Uuid, name: String) -> Result<(), StoreError> {
        let feature = self
            .features
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(StoreError::FeatureNotFound { id })?;
        feature.name = name;
        Ok(())
    }

    /// Delete a feature. Succeeds even when surviving GeomRefs anchor it:
    /// the dependents turn Errored(AnchorNotFound) on the next rebuild
    /// rather than blocking the delete. Returns the dirty index.
    pub fn delete(&mut self, id: Uuid) -> Result<usize, StoreError> {
        let pos = self
            .feature_index(id)
            .ok_or(StoreError::FeatureNotFound { id })?;
        self.features.remove(pos);
        if let Some(ref mut idx) = self.active_index {
            if pos <= *idx && *idx > 0 {
                *idx -= 1;
            }
        }
        Ok(pos.min(self.features.len()))
    }

    /// Move a feature to a new index. Fails with ForwardReference when the
    /// move would put any feature after something it references (moving a
    /// feature ahead of its anchor, or behind a dependent).
    pub fn reorder(&mut self, id: Uuid, new_index: usize) -> Result<usize, StoreError> {
        let old_index = self
            .feature_index(id)
            .ok_or(StoreError::FeatureNotFound { id })?;
        if new_index >= self.features.len() {
            return Err(StoreError::InvalidIndex {
                index: new_index,
                len: self.features.len(),
            });
        }

        let mut moved = self.features.clone();
        let feature = moved.remove(old_index);
        moved.insert(new_index, feature);
        validate_reference_order(&moved)?;

        self.features = moved;
        Ok(old_index.min(new_index))
    }

    /// Suppress or unsuppress a feature. Returns the dirty index.
    pub fn set_suppressed(&mut self, id: Uuid, suppressed: bool) -> Result<usize, StoreError> {
        let pos = self
            .feature_index(id)
            .ok_or(StoreError::FeatureNotFound { id })?;
        self.features[pos].suppressed = suppressed;
        Ok(pos)
    }

    /// Move the rollback point. Returns the dirty index: the first feature
    /// whose active/inactive state can change.
    pub fn set_rollback(&mut self, index: Option<usize>) -> Result<usize, StoreError> {
        if let Some(idx) = index {
            if idx >= self.features.len() {
                return Err(StoreError::InvalidIndex {
                    index: idx,
                    len: self.features.len(),
                });
            }
        }
        let old_bound = self.active_bound();
        self.active_index = index;
        let new_bound = self.active_bound();
        Ok(old_bound.min(new_bound))
    }

    /// Reject operations referencing `own_index` or anything after it.
    /// References to ids absent from the tree are allowed here — they
    /// surface as AnchorNotFound at rebuild time instead.
    fn check_references(
        &self,
        feature: Uuid,
        operation: &Operation,
        own_index: usize,
    ) -> Result<(), StoreError> {
        for referenced in operation.referenced_features() {
            if let Some(pos) = self.feature_index(referenced) {
                if pos >= own_index || referenced == feature {
                    return Err(StoreError::ForwardReference {
                        feature,
                        referenced,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Check the "anchor strictly earlier" invariant over a whole ordering.
fn validate_reference_order(features: &[Feature]) -> Result<(), StoreError> {
    for (index, feature) in features.iter().enumerate() {
        for referenced in feature.operation.referenced_features() {
            if let Some(pos) = features.iter().position(|f| f.id == referenced) {
                if pos >= index {
                    return Err(StoreError::ForwardReference {
                        feature: feature.id,
                        referenced,
                    });
                }
            }
        }
    }
    Ok(())
}
