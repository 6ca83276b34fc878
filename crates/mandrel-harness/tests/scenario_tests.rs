//! End-to-end scenarios: role-stable edits, anchor deletion, signature
//! fallback under geometric drift, and rebuild supersession.

use std::collections::HashMap;

use mandrel_engine::rebuild::{FeatureError, FeatureStatus, RebuildOutcome};
use mandrel_engine::resolve::{resolve_geom_ref, ResolveError, ResolverConfig};
use mandrel_engine::Engine;
use mandrel_harness::*;
use mandrel_kernel::{KernelProbe, MockKernel};
use mandrel_types::{Role, TopoKind};

// ── Scenario A: role lookup survives a parameter edit ──────────────────────

#[test]
fn fillet_role_ref_survives_sketch_edit() {
    init_test_logging();
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();

    let sketch = engine
        .add_feature("Sketch 1", rect_sketch_op(100.0, 50.0), &mut kernel)
        .unwrap();
    let extrude = engine
        .add_feature("Extrude 1", extrude_op(sketch, 10.0), &mut kernel)
        .unwrap();
    let fillet = engine
        .add_feature(
            "Fillet 1",
            fillet_op(extrude, Role::EndCapPosEdge { index: 1 }, 0, 1.0),
            &mut kernel,
        )
        .unwrap();
    assert_built(&engine, fillet, "initial build").unwrap();

    // Widen the plate; the cap edge role is unchanged, so the reference
    // resolves on the fast path with no fallback and no warnings.
    engine
        .edit_feature(sketch, rect_sketch_op(120.0, 50.0), &mut kernel)
        .unwrap();

    assert_built(&engine, fillet, "after sketch edit").unwrap();
    let result = engine.result(fillet).unwrap();
    assert!(result.diagnostics.warnings.is_empty());
    assert_role_assigned(&engine, fillet, &Role::FilletFace { index: 0 }, "fillet face").unwrap();
}

// ── Scenario B: deleting the anchor errors exactly one feature ─────────────

#[test]
fn deleting_the_extrude_errors_the_fillet_only() {
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();

    let sketch = engine
        .add_feature("Sketch 1", rect_sketch_op(100.0, 50.0), &mut kernel)
        .unwrap();
    let extrude = engine
        .add_feature("Extrude 1", extrude_op(sketch, 10.0), &mut kernel)
        .unwrap();
    let fillet = engine
        .add_feature(
            "Fillet 1",
            fillet_op(extrude, Role::EndCapPosEdge { index: 1 }, 0, 1.0),
            &mut kernel,
        )
        .unwrap();

    engine.delete_feature(extrude, &mut kernel).unwrap();

    match engine.status(fillet) {
        Some(FeatureStatus::Errored {
            error: FeatureError::Resolution(ResolveError::AnchorNotFound { anchor }),
        }) => assert_eq!(*anchor, extrude),
        other => panic!("expected Errored(AnchorNotFound), got {other:?}"),
    }

    let snapshot = engine.tree_snapshot();
    assert_eq!(snapshot.errored().count(), 1);
    assert_eq!(snapshot.blocked().count(), 0);
    assert!(matches!(engine.status(sketch), Some(FeatureStatus::Built)));

    // The deletion is one undo away from a healthy tree.
    assert!(engine.undo(&mut kernel));
    assert_built(&engine, fillet, "after undo").unwrap();
}

// ── Scenario C: signature fallback on a hexagonal prism ────────────────────

#[test]
fn hex_prism_signature_fallback_is_stable() {
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();

    let sketch = engine
        .add_feature("Sketch 1", ngon_sketch_op(6, 10.0), &mut kernel)
        .unwrap();
    let extrude = engine
        .add_feature("Extrude 1", extrude_op(sketch, 5.0), &mut kernel)
        .unwrap();
    let fillet = engine
        .add_feature(
            "Fillet 1",
            fillet_op(extrude, Role::EndCapPosEdge { index: 2 }, 0, 0.5),
            &mut kernel,
        )
        .unwrap();
    assert_built(&engine, fillet, "hex build").unwrap();

    // Fingerprint one of the six near-identical wall faces.
    let wall = engine
        .result(extrude)
        .unwrap()
        .provenance
        .entities_with_role(&Role::WallFace { index: 2 })[0];
    let stored = kernel.signature(wall, TopoKind::Face);
    let stored_centroid = stored.centroid.unwrap();
    let geom_ref = signature_ref(extrude, TopoKind::Face, stored);

    // Shift every signature slightly by growing the hexagon.
    engine
        .edit_feature(sketch, ngon_sketch_op(6, 10.5), &mut kernel)
        .unwrap();
    assert_built(&engine, fillet, "after hex edit").unwrap();

    let mut results = HashMap::new();
    results.insert(extrude, engine.result(extrude).unwrap().clone());
    let config = ResolverConfig::default();

    let first = resolve_geom_ref(&geom_ref, &results, &kernel, &config).unwrap();
    let second = resolve_geom_ref(&geom_ref, &results, &kernel, &config).unwrap();
    // Stable run to run.
    assert_eq!(first.entity, second.entity);

    // And it picked the wall at the same angular position, not one of the
    // five siblings.
    let resolved_sig = kernel.signature(first.entity, TopoKind::Face);
    let c = resolved_sig.centroid.unwrap();
    let dist = ((c[0] - stored_centroid[0]).powi(2)
        + (c[1] - stored_centroid[1]).powi(2)
        + (c[2] - stored_centroid[2]).powi(2))
    .sqrt();
    assert!(dist < 1.0, "matched a wall {dist} away from the original");
}

// ── Scenario D: rapid successive edits ─────────────────────────────────────

#[test]
fn superseded_rebuild_commits_nothing() {
    let mut engine = Engine::new();
    // The second construction call of the rebuild "receives" a newer
    // request: the wrapper claims the next generation mid-flight.
    let mut session = SupersedingSession::new(MockKernel::new(), engine.generations(), 2);

    let sketch = engine
        .add_feature("Sketch 1", rect_sketch_op(10.0, 10.0), &mut session)
        .unwrap();
    let committed = engine.committed_generation();

    let extrude = engine
        .add_feature("Extrude 1", extrude_op(sketch, 4.0), &mut session)
        .unwrap();
    assert!(session.bumped());

    // The in-flight rebuild was abandoned: no partial cache write, no
    // generation commit.
    assert!(engine.result(extrude).is_none());
    assert_eq!(engine.committed_generation(), committed);

    // The newest request replays and commits normally.
    let outcome = engine.rebuild_from(0, &mut session);
    assert!(matches!(outcome, RebuildOutcome::Completed { .. }));
    assert!(engine.result(extrude).is_some());
    assert!(engine.committed_generation() > committed);
}
