//! RebuildEngine — replays the feature tree through the geometry
//! capability, resolving references against the already-rebuilt prefix
//! and recording provenance per feature.
//!
//! Rebuilds are generation-stamped. The shared counter is the cancellation
//! signal: it is checked cooperatively at every feature boundary, and a
//! rebuild that lost its place commits nothing — staged results from an
//! abandoned generation are dropped, never merged into the cache.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use mandrel_kernel::SolidHandle;
use mandrel_ops::{
    execute_boolean, execute_chamfer, execute_extrude, execute_fillet, execute_revolve,
    execute_shell, BooleanKind, KernelSession, OpError, OpResult,
};
use mandrel_types::OutputKey;

use crate::resolve::{resolve_body, resolve_geom_ref, ResolveError, ResolvedRef, ResolverConfig};
use crate::types::{BooleanOpKind, Feature, FeatureTree, Operation};

/// Monotonic stamp shared between the engine and whoever submits rebuild
/// requests. Cloning hands out another view of the same counter.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter(Arc<AtomicU64>);

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next generation. The claimer becomes the newest request.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why one feature failed to build. The cause is kept structured for
/// display, never flattened to a string.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FeatureError {
    #[error("reference resolution failed: {0}")]
    Resolution(#[from] ResolveError),

    #[error("operation failed: {0}")]
    OperationFailed(#[from] OpError),

    #[error("sketch feature {id} not found or not built")]
    SketchNotFound { id: Uuid },

    #[error("no target body upstream to cut from")]
    NoTargetBody,
}

/// Per-feature outcome of the latest committed rebuild.
#[derive(Debug, Clone)]
pub enum FeatureStatus {
    /// Built and cached.
    Built,
    /// Suppressed or beyond the rollback point; no result, by design.
    Inactive,
    /// This feature itself failed.
    Errored { error: FeatureError },
    /// An upstream dependency failed; this feature was not attempted.
    Blocked { source: Uuid },
}

impl FeatureStatus {
    pub fn is_errored(&self) -> bool {
        matches!(self, FeatureStatus::Errored { .. })
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, FeatureStatus::Blocked { .. })
    }
}

/// How a rebuild request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// Ran to completion and committed its results.
    Completed { generation: u64 },
    /// A newer request arrived mid-flight; nothing was committed.
    Superseded { generation: u64 },
}

/// The replay engine and its session cache. The cache is keyed by feature
/// id, owned exclusively here, and invalidated (never mutated) from the
/// dirty index onward.
pub struct RebuildEngine {
    cache: HashMap<Uuid, OpResult>,
    statuses: HashMap<Uuid, FeatureStatus>,
    generations: GenerationCounter,
    committed_generation: u64,
    config: ResolverConfig,
}

impl RebuildEngine {
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default())
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        Self {
            cache: HashMap::new(),
            statuses: HashMap::new(),
            generations: GenerationCounter::new(),
            committed_generation: 0,
            config,
        }
    }

    /// The shared generation counter. Submitting a newer request is done
    /// by claiming the next generation on this counter.
    pub fn generations(&self) -> GenerationCounter {
        self.generations.clone()
    }

    pub fn committed_generation(&self) -> u64 {
        self.committed_generation
    }

    pub fn result(&self, feature: Uuid) -> Option<&OpResult> {
        self.cache.get(&feature)
    }

    pub fn status(&self, feature: Uuid) -> Option<&FeatureStatus> {
        self.statuses.get(&feature)
    }

    pub fn resolver_config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Replay `tree` from `dirty_from`. Features before the dirty index
    /// keep their cached results without touching the kernel; everything
    /// from it onward is re-executed in tree order.
    pub fn rebuild(
        &mut self,
        tree: &FeatureTree,
        session: &mut dyn KernelSession,
        dirty_from: usize,
    ) -> RebuildOutcome {
        let generation = self.generations.next();
        let bound = tree.active_bound();
        tracing::debug!(generation, dirty_from, bound, "rebuild start");

        let mut staged: HashMap<Uuid, OpResult> = HashMap::new();
        let mut staged_status: HashMap<Uuid, FeatureStatus> = HashMap::new();
        // Features this rebuild could not produce results for; dependents
        // of anything in here become Blocked instead of being attempted.
        let mut failed: BTreeSet<Uuid> = BTreeSet::new();

        for (index, feature) in tree.features.iter().enumerate() {
            if index < dirty_from {
                // Clean prefix: cache hit, no kernel calls.
                if let Some(result) = self.cache.get(&feature.id) {
                    staged.insert(feature.id, result.clone());
                }
                let status = self
                    .statuses
                    .get(&feature.id)
                    .cloned()
                    .unwrap_or(FeatureStatus::Inactive);
                if status.is_errored() || status.is_blocked() {
                    failed.insert(feature.id);
                }
                staged_status.insert(feature.id, status);
                continue;
            }

            // Cooperative cancellation, checked at feature boundaries only.
            if self.generations.current() != generation {
                tracing::debug!(generation, "rebuild superseded; discarding staged results");
                return RebuildOutcome::Superseded { generation };
            }

            if index >= bound || feature.suppressed {
                staged_status.insert(feature.id, FeatureStatus::Inactive);
                continue;
            }

            if let Some(source) = feature
                .operation
                .referenced_features()
                .into_iter()
                .find(|id| failed.contains(id))
            {
                staged_status.insert(feature.id, FeatureStatus::Blocked { source });
                failed.insert(feature.id);
                continue;
            }

            match execute_feature(feature, index, tree, session, &staged, &self.config) {
                Ok(result) => {
                    staged_status.insert(feature.id, FeatureStatus::Built);
                    staged.insert(feature.id, result);
                }
                Err(error) => {
                    tracing::warn!(feature = %feature.id, name = %feature.name, %error, "feature errored");
                    staged_status.insert(feature.id, FeatureStatus::Errored { error });
                    failed.insert(feature.id);
                }
            }
        }

        if self.generations.current() != generation {
            tracing::debug!(generation, "rebuild superseded at commit; discarding");
            return RebuildOutcome::Superseded { generation };
        }

        self.cache = staged;
        self.statuses = staged_status;
        self.committed_generation = generation;
        tracing::debug!(generation, features = tree.features.len(), "rebuild committed");
        RebuildOutcome::Completed { generation }
    }
}

impl Default for RebuildEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a feature's inputs against the rebuilt prefix and run its
/// operation through the dispatch table.
fn execute_feature(
    feature: &Feature,
    index: usize,
    tree: &FeatureTree,
    session: &mut dyn KernelSession,
    results: &HashMap<Uuid, OpResult>,
    config: &ResolverConfig,
) -> Result<OpResult, FeatureError> {
    match &feature.operation {
        // Sketches store solved geometry; they produce no kernel output
        // of their own but must appear in the cache so dependents can
        // check they were built.
        Operation::Sketch { .. } => Ok(OpResult::empty()),

        Operation::Extrude { params } => {
            let profiles = sketch_profiles(params.sketch, results, tree)?;
            let outer = profiles.outer_loops();
            if params.profile_index >= outer.len() {
                return Err(OpError::ProfileOutOfRange {
                    index: params.profile_index,
                    count: outer.len(),
                }
                .into());
            }
            let direction = params.direction.unwrap_or(profiles.plane.normal);

            let faces = session
                .faces_from_profile(profiles)
                .map_err(OpError::from)?;
            let face = faces[params.profile_index.min(faces.len() - 1)];

            if params.cut {
                // Sweep the tool into the body, then subtract it from the
                // explicit target or the nearest solid upstream.
                let tool_dir = [-direction[0], -direction[1], -direction[2]];
                let target = cut_target(params.target.as_ref(), index, tree, results)?;
                let tool = execute_extrude(session, face, tool_dir, params.depth, None)?;
                let tool_handle = tool
                    .output(&OutputKey::Primary)
                    .map(|b| b.handle.clone())
                    .ok_or(FeatureError::NoTargetBody)?;
                Ok(execute_boolean(
                    session,
                    &target,
                    &tool_handle,
                    BooleanKind::Subtract,
                )?)
            } else {
                Ok(execute_extrude(session, face, direction, params.depth, None)?)
            }
        }

        Operation::Revolve { params } => {
            let profiles = sketch_profiles(params.sketch, results, tree)?;
            let outer = profiles.outer_loops();
            if params.profile_index >= outer.len() {
                return Err(OpError::ProfileOutOfRange {
                    index: params.profile_index,
                    count: outer.len(),
                }
                .into());
            }
            let faces = session
                .faces_from_profile(profiles)
                .map_err(OpError::from)?;
            let face = faces[params.profile_index.min(faces.len() - 1)];
            Ok(execute_revolve(
                session,
                face,
                params.axis_origin,
                params.axis_direction,
                params.angle,
            )?)
        }

        Operation::Fillet { params } => {
            let target = anchored_solid(&params.edges, results)?;
            let (edges, warnings) = resolve_entities(&params.edges, results, session, config)?;
            let mut result = execute_fillet(session, &target, &edges, params.radius)?;
            result.diagnostics.warnings.extend(warnings);
            Ok(result)
        }

        Operation::Chamfer { params } => {
            let target = anchored_solid(&params.edges, results)?;
            let (edges, warnings) = resolve_entities(&params.edges, results, session, config)?;
            let mut result = execute_chamfer(session, &target, &edges, params.distance)?;
            result.diagnostics.warnings.extend(warnings);
            Ok(result)
        }

        Operation::Shell { params } => {
            let target = anchored_solid(&params.open_faces, results)?;
            let (faces, warnings) =
                resolve_entities(&params.open_faces, results, session, config)?;
            let mut result = execute_shell(session, &target, &faces, params.thickness)?;
            result.diagnostics.warnings.extend(warnings);
            Ok(result)
        }

        Operation::BooleanCombine { params } => {
            let blank = resolve_body(&params.blank, results)?.handle.clone();
            let tool = resolve_body(&params.tool, results)?.handle.clone();
            let kind = match params.kind {
                BooleanOpKind::Union => BooleanKind::Union,
                BooleanOpKind::Subtract => BooleanKind::Subtract,
                BooleanOpKind::Intersect => BooleanKind::Intersect,
            };
            Ok(execute_boolean(session, &blank, &tool, kind)?)
        }
    }
}

/// Look up the solved profiles of a sketch feature. The sketch must be
/// in the tree and already built this rebuild.
fn sketch_profiles<'a>(
    sketch_id: Uuid,
    results: &HashMap<Uuid, OpResult>,
    tree: &'a FeatureTree,
) -> Result<&'a mandrel_types::SolvedProfileSet, FeatureError> {
    if !results.contains_key(&sketch_id) {
        return Err(FeatureError::SketchNotFound { id: sketch_id });
    }
    match tree.find_feature(sketch_id).map(|f| &f.operation) {
        Some(Operation::Sketch { profiles }) => Ok(profiles),
        _ => Err(FeatureError::SketchNotFound { id: sketch_id }),
    }
}

/// The solid a fillet/chamfer/shell operates on: the anchored output of
/// the first entity reference.
fn anchored_solid(
    refs: &[mandrel_types::GeomRef],
    results: &HashMap<Uuid, OpResult>,
) -> Result<SolidHandle, FeatureError> {
    let first = refs.first().ok_or_else(|| {
        FeatureError::OperationFailed(OpError::InvalidParameter {
            reason: "operation needs at least one entity reference".to_string(),
        })
    })?;
    Ok(resolve_body(first, results)?.handle.clone())
}

/// Resolve a list of entity references, pooling BestEffort warnings.
fn resolve_entities(
    refs: &[mandrel_types::GeomRef],
    results: &HashMap<Uuid, OpResult>,
    session: &dyn KernelSession,
    config: &ResolverConfig,
) -> Result<(Vec<mandrel_kernel::EntityId>, Vec<String>), FeatureError> {
    let mut entities = Vec::with_capacity(refs.len());
    let mut warnings = Vec::new();
    for geom_ref in refs {
        let ResolvedRef {
            entity,
            warnings: mut w,
        } = resolve_geom_ref(geom_ref, results, session.probe(), config)?;
        entities.push(entity);
        warnings.append(&mut w);
    }
    Ok((entities, warnings))
}

/// The body a cut extrude subtracts from: the explicit target reference
/// when given, otherwise the most recent built solid upstream.
fn cut_target(
    target: Option<&mandrel_types::GeomRef>,
    index: usize,
    tree: &FeatureTree,
    results: &HashMap<Uuid, OpResult>,
) -> Result<SolidHandle, FeatureError> {
    if let Some(geom_ref) = target {
        return Ok(resolve_body(geom_ref, results)?.handle.clone());
    }
    for feature in tree.features[..index].iter().rev() {
        if feature.suppressed {
            continue;
        }
        if let Some(result) = results.get(&feature.id) {
            if let Some(body) = result.output(&OutputKey::Primary) {
                return Ok(body.handle.clone());
            }
        }
    }
    Err(FeatureError::NoTargetBody)
}
