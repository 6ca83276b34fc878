//! GeomRefResolver — turns a persistent GeomRef into the concrete entity
//! it denotes in the current rebuilt state.
//!
//! Resolution order: anchor, named output, then the selector — role
//! lookup (exact, the common path), signature similarity (fuzzy), or an
//! explicit query. The ResolvePolicy decides whether a miss is a hard
//! error or a best guess plus warning.

use std::cmp::Ordering;
use std::collections::HashMap;

use uuid::Uuid;

use mandrel_kernel::{EntityId, KernelProbe};
use mandrel_ops::{signature_similarity, BodyOutput, OpResult, ROLE_THRESHOLD};
use mandrel_types::{
    GeomRef, OutputKey, QueryFilter, ResolvePolicy, Role, Selector, TieBreak, TopoSignature,
};

/// Thresholds for fuzzy resolution. The signature floor is deliberately
/// lower than the role-assignment threshold: a reference that once had a
/// confident role may still be recoverable from a weaker signature match.
#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    pub signature_floor: f64,
    pub role_threshold: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            signature_floor: 0.5,
            role_threshold: ROLE_THRESHOLD,
        }
    }
}

/// Errors from GeomRef resolution.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("anchor {anchor} has no built result")]
    AnchorNotFound { anchor: Uuid },

    #[error("output {output:?} not found in anchor result")]
    OutputNotFound { output: OutputKey },

    #[error("best signature match {score:.3} is below the floor {floor:.3}")]
    BelowThreshold { score: f64, floor: f64 },

    #[error("no entity matches the selector")]
    NoMatch,

    #[error("{candidates} entities match and no tie-break is set")]
    AmbiguousMatch { candidates: usize },
}

/// A successful resolution: the concrete entity plus any warnings a
/// BestEffort fallback picked up on the way.
#[derive(Debug, Clone)]
pub struct ResolvedRef {
    pub entity: EntityId,
    pub warnings: Vec<String>,
}

/// Resolve a GeomRef against the already-rebuilt upstream results.
pub fn resolve_geom_ref(
    geom_ref: &GeomRef,
    results: &HashMap<Uuid, OpResult>,
    probe: &dyn KernelProbe,
    config: &ResolverConfig,
) -> Result<ResolvedRef, ResolveError> {
    let (result, body) = locate_output(geom_ref, results)?;

    match &geom_ref.selector {
        Selector::Role { role, index } => {
            resolve_by_role(result, role, *index, geom_ref.policy)
        }
        Selector::Signature { signature } => {
            resolve_by_signature(geom_ref, body, signature, probe, config)
        }
        Selector::Query { query } => {
            let candidates = probe.signatures_of(&body.handle, geom_ref.kind);
            resolve_by_query(&candidates, &query.filters, query.tie_break.as_ref(), geom_ref.policy)
        }
    }
}

/// Resolve a body-level reference: the anchored output itself, without
/// selecting an entity inside it.
pub fn resolve_body<'a>(
    geom_ref: &GeomRef,
    results: &'a HashMap<Uuid, OpResult>,
) -> Result<&'a BodyOutput, ResolveError> {
    locate_output(geom_ref, results).map(|(_, body)| body)
}

fn locate_output<'a>(
    geom_ref: &GeomRef,
    results: &'a HashMap<Uuid, OpResult>,
) -> Result<(&'a OpResult, &'a BodyOutput), ResolveError> {
    let (anchor_id, output_key) = match &geom_ref.anchor {
        mandrel_types::Anchor::Feature { feature_id, output } => (*feature_id, output),
        // Datum features are not in the operation set; a datum anchor can
        // never have a built result.
        mandrel_types::Anchor::Datum { datum_id } => {
            return Err(ResolveError::AnchorNotFound { anchor: *datum_id })
        }
    };

    let result = results
        .get(&anchor_id)
        .ok_or(ResolveError::AnchorNotFound { anchor: anchor_id })?;
    let body = result
        .output(output_key)
        .ok_or_else(|| ResolveError::OutputNotFound {
            output: output_key.clone(),
        })?;
    Ok((result, body))
}

/// Fast path: scan role assignments for the Nth entity with the role.
fn resolve_by_role(
    result: &OpResult,
    role: &Role,
    index: usize,
    policy: ResolvePolicy,
) -> Result<ResolvedRef, ResolveError> {
    let matching = result.provenance.entities_with_role(role);
    if matching.is_empty() {
        return Err(ResolveError::NoMatch);
    }
    if let Some(&entity) = matching.get(index) {
        return Ok(ResolvedRef {
            entity,
            warnings: Vec::new(),
        });
    }
    match policy {
        ResolvePolicy::Strict => Err(ResolveError::NoMatch),
        ResolvePolicy::BestEffort => Ok(ResolvedRef {
            entity: *matching.last().unwrap(),
            warnings: vec![format!(
                "role {:?} index {} clamped to {} (best effort)",
                role,
                index,
                matching.len() - 1
            )],
        }),
    }
}

/// Fuzzy path: score every live entity of the requested kind against the
/// stored fingerprint. Equal scores prefer the candidate whose adjacency
/// token agrees, then the smallest id, so repeated runs agree.
fn resolve_by_signature(
    geom_ref: &GeomRef,
    body: &BodyOutput,
    stored: &TopoSignature,
    probe: &dyn KernelProbe,
    config: &ResolverConfig,
) -> Result<ResolvedRef, ResolveError> {
    let candidates = probe.signatures_of(&body.handle, geom_ref.kind);
    if candidates.is_empty() {
        return Err(ResolveError::NoMatch);
    }

    let stored_token = stored.adjacency.map(|f| f.token);
    let mut scored: Vec<(EntityId, f64, bool)> = candidates
        .iter()
        .map(|(id, sig)| {
            let token_agrees = match (stored_token, sig.adjacency.map(|f| f.token)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            };
            (*id, signature_similarity(stored, sig), token_agrees)
        })
        .collect();
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(b.2.cmp(&a.2))
            .then(a.0.cmp(&b.0))
    });

    let (entity, score, _) = scored[0];
    if score >= config.signature_floor {
        let mut warnings = Vec::new();
        if score < config.role_threshold {
            warnings.push(format!("signature match confidence {:.1}%", score * 100.0));
        }
        return Ok(ResolvedRef { entity, warnings });
    }
    match geom_ref.policy {
        ResolvePolicy::Strict => Err(ResolveError::BelowThreshold {
            score,
            floor: config.signature_floor,
        }),
        ResolvePolicy::BestEffort => Ok(ResolvedRef {
            entity,
            warnings: vec![format!(
                "signature match {:.1}% below floor {:.1}% (best effort)",
                score * 100.0,
                config.signature_floor * 100.0
            )],
        }),
    }
}

/// Explicit path: filters narrow the candidates, the tie-break picks one.
fn resolve_by_query(
    candidates: &[(EntityId, TopoSignature)],
    filters: &[QueryFilter],
    tie_break: Option<&TieBreak>,
    policy: ResolvePolicy,
) -> Result<ResolvedRef, ResolveError> {
    if candidates.is_empty() {
        return Err(ResolveError::NoMatch);
    }

    let survivors: Vec<&(EntityId, TopoSignature)> = candidates
        .iter()
        .filter(|(_, sig)| filters.iter().all(|f| filter_matches(f, sig)))
        .collect();

    match survivors.len() {
        0 => match policy {
            ResolvePolicy::Strict => Err(ResolveError::NoMatch),
            ResolvePolicy::BestEffort => {
                let all: Vec<&(EntityId, TopoSignature)> = candidates.iter().collect();
                let entity = apply_tie_break(&all, tie_break);
                Ok(ResolvedRef {
                    entity,
                    warnings: vec![
                        "no entity passed the query filters; picked the tie-break winner of all candidates (best effort)"
                            .to_string(),
                    ],
                })
            }
        },
        1 => Ok(ResolvedRef {
            entity: survivors[0].0,
            warnings: Vec::new(),
        }),
        n => match tie_break {
            Some(rule) => Ok(ResolvedRef {
                entity: apply_tie_break(&survivors, Some(rule)),
                warnings: Vec::new(),
            }),
            None => match policy {
                ResolvePolicy::Strict => Err(ResolveError::AmbiguousMatch { candidates: n }),
                ResolvePolicy::BestEffort => Ok(ResolvedRef {
                    entity: apply_tie_break(&survivors, None),
                    warnings: vec![format!(
                        "{n} entities matched; picked the smallest id (best effort)"
                    )],
                }),
            },
        },
    }
}

fn filter_matches(filter: &QueryFilter, sig: &TopoSignature) -> bool {
    match filter {
        QueryFilter::SurfaceType { surface_type } => {
            sig.surface_type.as_deref() == Some(surface_type.as_str())
        }
        QueryFilter::NormalWithin {
            direction,
            tolerance,
        } => match sig.normal {
            Some(n) => {
                let dot = n[0] * direction[0] + n[1] * direction[1] + n[2] * direction[2];
                let len = (direction[0].powi(2) + direction[1].powi(2) + direction[2].powi(2))
                    .sqrt()
                    .max(1e-12);
                (dot / len).clamp(-1.0, 1.0).acos() <= *tolerance
            }
            None => false,
        },
        QueryFilter::NearPoint { point, distance } => match sig.centroid {
            Some(c) => {
                let d = ((c[0] - point[0]).powi(2)
                    + (c[1] - point[1]).powi(2)
                    + (c[2] - point[2]).powi(2))
                .sqrt();
                d <= *distance
            }
            None => false,
        },
        QueryFilter::AreaBetween { min, max } => match sig.area {
            Some(a) => a >= *min && a <= *max,
            None => false,
        },
    }
}

/// Pick one survivor. No rule (or a rule missing its input field on every
/// side) falls back to the smallest id, which is always deterministic.
fn apply_tie_break(
    survivors: &[&(EntityId, TopoSignature)],
    tie_break: Option<&TieBreak>,
) -> EntityId {
    debug_assert!(!survivors.is_empty());
    match tie_break {
        Some(TieBreak::LargestArea) => survivors
            .iter()
            .max_by(|a, b| {
                let area_a = a.1.area.unwrap_or(f64::NEG_INFINITY);
                let area_b = b.1.area.unwrap_or(f64::NEG_INFINITY);
                area_a
                    .partial_cmp(&area_b)
                    .unwrap_or(Ordering::Equal)
                    .then(b.0.cmp(&a.0))
            })
            .map(|(id, _)| *id)
            .unwrap(),
        Some(TieBreak::NearestTo { point }) => survivors
            .iter()
            .min_by(|a, b| {
                let d = |sig: &TopoSignature| {
                    sig.centroid
                        .map(|c| {
                            ((c[0] - point[0]).powi(2)
                                + (c[1] - point[1]).powi(2)
                                + (c[2] - point[2]).powi(2))
                            .sqrt()
                        })
                        .unwrap_or(f64::INFINITY)
                };
                d(&a.1)
                    .partial_cmp(&d(&b.1))
                    .unwrap_or(Ordering::Equal)
                    .then(a.0.cmp(&b.0))
            })
            .map(|(id, _)| *id)
            .unwrap(),
        Some(TieBreak::SmallestId) | None => {
            survivors.iter().map(|(id, _)| *id).min().unwrap()
        }
    }
}
