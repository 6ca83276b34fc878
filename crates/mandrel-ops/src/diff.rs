//! Before/after topology diff — the provenance engine.
//!
//! Low-level ids are not stable across topology-changing operations, so
//! plain set difference is only the first pass: entities that vanished and
//! appeared in the same operation are then paired by signature similarity
//! to recover "same logical entity under a new id" relationships, and each
//! pairing is classified by how the neighborhood degree changed.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use mandrel_kernel::EntityId;
use mandrel_types::{TopoKind, TopoSignature};

use crate::result::{EntityRecord, Rewrite, RewriteReason};
use crate::similarity::{signature_similarity, signatures_match, MOVE_EPSILON, ROLE_THRESHOLD};
use crate::snapshot::TopoSnapshot;

/// Output of diffing two snapshots. All vectors are in deterministic
/// order: created/deleted ascending by id, modified ascending by
/// (before, after).
#[derive(Debug, Clone, Default)]
pub struct DiffOutcome {
    pub created: Vec<EntityRecord>,
    pub deleted: Vec<EntityRecord>,
    pub modified: Vec<Rewrite>,
}

/// Diff two topology snapshots. For an operation with no input solid
/// (the first extrude), pass `TopoSnapshot::empty()` as `before`.
pub fn diff_snapshots(before: &TopoSnapshot, after: &TopoSnapshot) -> DiffOutcome {
    let mut outcome = DiffOutcome::default();
    for kind in [TopoKind::Face, TopoKind::Edge, TopoKind::Vertex] {
        diff_kind(
            before.of_kind(kind),
            after.of_kind(kind),
            kind,
            &mut outcome,
        );
    }
    tracing::debug!(
        created = outcome.created.len(),
        deleted = outcome.deleted.len(),
        modified = outcome.modified.len(),
        "topology diff"
    );
    outcome
}

fn diff_kind(
    before: &[(EntityId, TopoSignature)],
    after: &[(EntityId, TopoSignature)],
    kind: TopoKind,
    outcome: &mut DiffOutcome,
) {
    let before_map: BTreeMap<EntityId, &TopoSignature> =
        before.iter().map(|(id, sig)| (*id, sig)).collect();
    let after_map: BTreeMap<EntityId, &TopoSignature> =
        after.iter().map(|(id, sig)| (*id, sig)).collect();

    // Survivors: same id on both sides. A drifted signature means the
    // entity moved without losing identity.
    for (id, sig_before) in &before_map {
        if let Some(sig_after) = after_map.get(id) {
            if !signatures_match(sig_before, sig_after, MOVE_EPSILON) {
                outcome.modified.push(Rewrite {
                    before: *id,
                    after: *id,
                    reason: RewriteReason::Moved,
                });
            }
        }
    }

    let gone: Vec<EntityId> = before_map
        .keys()
        .filter(|id| !after_map.contains_key(id))
        .copied()
        .collect();
    let fresh: Vec<EntityId> = after_map
        .keys()
        .filter(|id| !before_map.contains_key(id))
        .copied()
        .collect();

    // Candidate pairings above the threshold, best first; equal scores
    // fall back to ascending ids so reruns agree byte for byte.
    struct Candidate {
        before: EntityId,
        after: EntityId,
        score: f64,
    }
    let mut candidates: Vec<Candidate> = Vec::new();
    for &g in &gone {
        for &f in &fresh {
            let score = signature_similarity(before_map[&g], after_map[&f]);
            if score >= ROLE_THRESHOLD {
                candidates.push(Candidate {
                    before: g,
                    after: f,
                    score,
                });
            }
        }
    }
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a.before.cmp(&b.before))
            .then(a.after.cmp(&b.after))
    });

    // Greedy acceptance. A pair is taken while at least one side is still
    // unmatched, so one before-entity may fan out to several afters
    // (split) and several befores may converge on one after (merged), but
    // two already-matched entities never gain a second link.
    let mut afters_of: BTreeMap<EntityId, Vec<EntityId>> = BTreeMap::new();
    let mut befores_of: BTreeMap<EntityId, Vec<EntityId>> = BTreeMap::new();
    for c in &candidates {
        let b_taken = afters_of.contains_key(&c.before);
        let a_taken = befores_of.contains_key(&c.after);
        if b_taken && a_taken {
            continue;
        }
        afters_of.entry(c.before).or_default().push(c.after);
        befores_of.entry(c.after).or_default().push(c.before);
    }

    let mut rewrites: Vec<Rewrite> = Vec::new();
    let mut seen: BTreeSet<(EntityId, EntityId)> = BTreeSet::new();
    for (&b, afters) in &afters_of {
        for &a in afters {
            if !seen.insert((b, a)) {
                continue;
            }
            let reason = if afters.len() > 1 {
                RewriteReason::Split
            } else if befores_of[&a].len() > 1 {
                RewriteReason::Merged
            } else {
                one_to_one_reason(before_map[&b], after_map[&a])
            };
            rewrites.push(Rewrite {
                before: b,
                after: a,
                reason,
            });
        }
    }
    rewrites.sort_by(|x, y| x.before.cmp(&y.before).then(x.after.cmp(&y.after)));
    outcome.modified.extend(rewrites);

    for &id in &gone {
        if !afters_of.contains_key(&id) {
            outcome.deleted.push(EntityRecord {
                id,
                kind,
                signature: before_map[&id].clone(),
            });
        }
    }
    for &id in &fresh {
        if !befores_of.contains_key(&id) {
            outcome.created.push(EntityRecord {
                id,
                kind,
                signature: after_map[&id].clone(),
            });
        }
    }
}

/// One before-entity became exactly one after-entity: trimmed when the
/// neighborhood degree is unchanged, moved otherwise.
fn one_to_one_reason(before: &TopoSignature, after: &TopoSignature) -> RewriteReason {
    match (before.adjacency, after.adjacency) {
        (Some(fb), Some(fa)) if fb.degree != fa.degree => RewriteReason::Moved,
        _ => RewriteReason::Trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_sig(area: f64, centroid: [f64; 3], degree: u32) -> TopoSignature {
        TopoSignature {
            surface_type: Some("planar".to_string()),
            area: Some(area),
            length: None,
            centroid: Some(centroid),
            normal: Some([0.0, 0.0, 1.0]),
            bbox: None,
            adjacency: Some(mandrel_types::AdjacencyFingerprint { degree, token: 7 }),
        }
    }

    fn snap(faces: Vec<(u64, TopoSignature)>) -> TopoSnapshot {
        TopoSnapshot {
            faces: faces
                .into_iter()
                .map(|(id, sig)| (EntityId(id), sig))
                .collect(),
            edges: Vec::new(),
            vertices: Vec::new(),
        }
    }

    #[test]
    fn pure_creation_from_empty_before() {
        let after = snap(vec![(1, face_sig(4.0, [0.0; 3], 4))]);
        let out = diff_snapshots(&TopoSnapshot::empty(), &after);
        assert_eq!(out.created.len(), 1);
        assert!(out.deleted.is_empty());
        assert!(out.modified.is_empty());
    }

    #[test]
    fn survivor_with_drifted_signature_is_moved() {
        let before = snap(vec![(1, face_sig(4.0, [0.0; 3], 4))]);
        let after = snap(vec![(1, face_sig(4.0, [0.5, 0.0, 0.0], 4))]);
        let out = diff_snapshots(&before, &after);
        assert_eq!(out.modified.len(), 1);
        assert_eq!(out.modified[0].reason, RewriteReason::Moved);
        assert_eq!(out.modified[0].before, out.modified[0].after);
    }

    #[test]
    fn reissued_similar_entity_pairs_as_trimmed() {
        let before = snap(vec![(1, face_sig(4.0, [0.0; 3], 4))]);
        let after = snap(vec![(9, face_sig(3.8, [0.0; 3], 4))]);
        let out = diff_snapshots(&before, &after);
        assert!(out.created.is_empty());
        assert!(out.deleted.is_empty());
        assert_eq!(out.modified.len(), 1);
        assert_eq!(out.modified[0].before, EntityId(1));
        assert_eq!(out.modified[0].after, EntityId(9));
        assert_eq!(out.modified[0].reason, RewriteReason::Trimmed);
    }

    #[test]
    fn one_before_to_two_afters_is_split() {
        let before = snap(vec![(1, face_sig(4.0, [0.0; 3], 4))]);
        let after = snap(vec![
            (8, face_sig(3.9, [0.0; 3], 4)),
            (9, face_sig(3.9, [0.1, 0.0, 0.0], 4)),
        ]);
        let out = diff_snapshots(&before, &after);
        assert_eq!(out.modified.len(), 2);
        assert!(out
            .modified
            .iter()
            .all(|r| r.reason == RewriteReason::Split));
    }

    #[test]
    fn two_befores_to_one_after_is_merged() {
        let before = snap(vec![
            (1, face_sig(4.0, [0.0; 3], 4)),
            (2, face_sig(4.0, [0.1, 0.0, 0.0], 4)),
        ]);
        let after = snap(vec![(9, face_sig(7.9, [0.05, 0.0, 0.0], 4))]);
        let out = diff_snapshots(&before, &after);
        // Area ratio credit keeps both candidates above the threshold.
        assert_eq!(out.modified.len(), 2);
        assert!(out
            .modified
            .iter()
            .all(|r| r.reason == RewriteReason::Merged));
    }

    #[test]
    fn dissimilar_entities_stay_created_and_deleted() {
        let before = snap(vec![(1, face_sig(4.0, [0.0; 3], 4))]);
        let mut far = face_sig(4.0, [9.0, 9.0, 9.0], 4);
        far.surface_type = Some("cylindrical".to_string());
        let after = snap(vec![(9, far)]);
        let out = diff_snapshots(&before, &after);
        assert_eq!(out.created.len(), 1);
        assert_eq!(out.deleted.len(), 1);
        assert!(out.modified.is_empty());
    }

    #[test]
    fn equal_scores_break_ties_by_ascending_id() {
        let before = snap(vec![(1, face_sig(4.0, [0.0; 3], 4))]);
        let after = snap(vec![
            (8, face_sig(4.0, [0.0; 3], 4)),
            (9, face_sig(4.0, [0.0; 3], 4)),
        ]);
        let out1 = diff_snapshots(&before, &after);
        let out2 = diff_snapshots(&before, &after);
        assert_eq!(out1.modified, out2.modified);
        // Both afters tie perfectly; the fan-out keeps them attached to
        // the single before in ascending order.
        assert_eq!(out1.modified[0].after, EntityId(8));
    }
}
