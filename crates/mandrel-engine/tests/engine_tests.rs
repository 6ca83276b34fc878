use std::collections::HashMap;

use mandrel_engine::rebuild::{FeatureError, FeatureStatus};
use mandrel_engine::resolve::{resolve_geom_ref, ResolveError, ResolverConfig};
use mandrel_engine::store::StoreError;
use mandrel_engine::types::*;
use mandrel_engine::Engine;
use mandrel_kernel::{KernelProbe, MockKernel};
use mandrel_types::*;
use uuid::Uuid;

fn rect_sketch_op(width: f64, height: f64) -> Operation {
    Operation::Sketch {
        profiles: SolvedProfileSet {
            plane: SketchPlane {
                origin: [0.0, 0.0, 0.0],
                normal: [0.0, 0.0, 1.0],
                x_axis: [1.0, 0.0, 0.0],
            },
            loops: vec![ProfileLoop {
                points: vec![
                    [0.0, 0.0],
                    [width, 0.0],
                    [width, height],
                    [0.0, height],
                ],
                is_outer: true,
            }],
        },
    }
}

fn extrude_op(sketch: Uuid, depth: f64) -> Operation {
    Operation::Extrude {
        params: ExtrudeParams {
            sketch,
            profile_index: 0,
            depth,
            direction: None,
            cut: false,
            target: None,
        },
    }
}

fn edge_ref(feature_id: Uuid, role: Role, policy: ResolvePolicy) -> GeomRef {
    GeomRef {
        kind: TopoKind::Edge,
        anchor: Anchor::Feature {
            feature_id,
            output: OutputKey::Primary,
        },
        selector: Selector::Role { role, index: 0 },
        policy,
    }
}

fn fillet_op(anchor: Uuid, role: Role, radius: f64, policy: ResolvePolicy) -> Operation {
    Operation::Fillet {
        params: FilletParams {
            edges: vec![edge_ref(anchor, role, policy)],
            radius,
        },
    }
}

/// Sketch + extrude + fillet, all built.
fn plate(engine: &mut Engine, kernel: &mut MockKernel) -> (Uuid, Uuid, Uuid) {
    let sketch = engine
        .add_feature("Sketch 1", rect_sketch_op(100.0, 50.0), kernel)
        .unwrap();
    let extrude = engine
        .add_feature("Extrude 1", extrude_op(sketch, 10.0), kernel)
        .unwrap();
    let fillet = engine
        .add_feature(
            "Fillet 1",
            fillet_op(
                extrude,
                Role::EndCapPosEdge { index: 1 },
                1.0,
                ResolvePolicy::Strict,
            ),
            kernel,
        )
        .unwrap();
    (sketch, extrude, fillet)
}

// ── Store ──────────────────────────────────────────────────────────────────

#[test]
fn append_and_insert_keep_tree_order() {
    let mut tree = FeatureTree::new();
    let (a, _) = tree.append("A".to_string(), rect_sketch_op(1.0, 1.0)).unwrap();
    let (b, _) = tree.append("B".to_string(), rect_sketch_op(1.0, 1.0)).unwrap();
    let c = tree.insert(1, "C".to_string(), rect_sketch_op(1.0, 1.0)).unwrap();

    let order: Vec<Uuid> = tree.features.iter().map(|f| f.id).collect();
    assert_eq!(order, vec![a, c, b]);
}

#[test]
fn insert_past_the_end_is_invalid_index() {
    let mut tree = FeatureTree::new();
    let err = tree
        .insert(3, "X".to_string(), rect_sketch_op(1.0, 1.0))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidIndex { index: 3, len: 0 }));
}

#[test]
fn insert_with_forward_reference_is_rejected() {
    let mut tree = FeatureTree::new();
    let (sketch, _) = tree.append("Sketch".to_string(), rect_sketch_op(1.0, 1.0)).unwrap();
    let (extrude, _) = tree.append("Extrude".to_string(), extrude_op(sketch, 5.0)).unwrap();

    // A fillet at index 0 would reference the extrude behind it.
    let err = tree
        .insert(
            0,
            "Fillet".to_string(),
            fillet_op(extrude, Role::EndCapPosEdge { index: 0 }, 1.0, ResolvePolicy::Strict),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::ForwardReference { .. }));
}

#[test]
fn reorder_ahead_of_anchor_is_rejected() {
    let mut tree = FeatureTree::new();
    let (sketch, _) = tree.append("Sketch".to_string(), rect_sketch_op(1.0, 1.0)).unwrap();
    let (extrude, _) = tree.append("Extrude".to_string(), extrude_op(sketch, 5.0)).unwrap();
    let (fillet, _) = tree
        .append(
            "Fillet".to_string(),
            fillet_op(extrude, Role::EndCapPosEdge { index: 0 }, 1.0, ResolvePolicy::Strict),
        )
        .unwrap();

    let err = tree.reorder(fillet, 0).unwrap_err();
    assert!(matches!(err, StoreError::ForwardReference { .. }));

    // Moving the extrude behind the fillet is just as illegal.
    let err = tree.reorder(extrude, 2).unwrap_err();
    assert!(matches!(err, StoreError::ForwardReference { .. }));
}

#[test]
fn delete_of_an_anchor_succeeds() {
    let mut tree = FeatureTree::new();
    let (sketch, _) = tree.append("Sketch".to_string(), rect_sketch_op(1.0, 1.0)).unwrap();
    let (extrude, _) = tree.append("Extrude".to_string(), extrude_op(sketch, 5.0)).unwrap();
    tree.append(
        "Fillet".to_string(),
        fillet_op(extrude, Role::EndCapPosEdge { index: 0 }, 1.0, ResolvePolicy::Strict),
    )
    .unwrap();

    let dirty = tree.delete(extrude).unwrap();
    assert_eq!(dirty, 1);
    assert_eq!(tree.features.len(), 2);
}

#[test]
fn mutations_report_the_earliest_dirty_index() {
    let mut tree = FeatureTree::new();
    let (sketch, _) = tree.append("Sketch".to_string(), rect_sketch_op(1.0, 1.0)).unwrap();
    let (extrude, _) = tree.append("Extrude".to_string(), extrude_op(sketch, 5.0)).unwrap();

    assert_eq!(tree.edit_operation(extrude, extrude_op(sketch, 7.0)).unwrap(), 1);
    assert_eq!(tree.set_suppressed(extrude, true).unwrap(), 1);
    assert_eq!(tree.set_rollback(Some(0)).unwrap(), 1);
    assert_eq!(tree.set_rollback(None).unwrap(), 1);
}

#[test]
fn rollback_index_out_of_range_is_invalid() {
    let mut tree = FeatureTree::new();
    tree.append("A".to_string(), rect_sketch_op(1.0, 1.0)).unwrap();
    assert!(matches!(
        tree.set_rollback(Some(5)),
        Err(StoreError::InvalidIndex { .. })
    ));
}

// ── Rebuild and statuses ───────────────────────────────────────────────────

#[test]
fn sketch_and_extrude_build_with_roles() {
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();
    let sketch = engine
        .add_feature("Sketch 1", rect_sketch_op(1.0, 1.0), &mut kernel)
        .unwrap();
    let extrude = engine
        .add_feature("Extrude 1", extrude_op(sketch, 5.0), &mut kernel)
        .unwrap();

    assert!(matches!(engine.status(sketch), Some(FeatureStatus::Built)));
    assert!(matches!(engine.status(extrude), Some(FeatureStatus::Built)));

    let result = engine.result(extrude).unwrap();
    assert_eq!(result.outputs.len(), 1);
    assert!(!result.provenance.roles.is_empty());
}

#[test]
fn suppressed_feature_is_inactive_without_result() {
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();
    let (_, extrude, fillet) = plate(&mut engine, &mut kernel);

    engine.set_suppressed(fillet, true, &mut kernel).unwrap();
    assert!(matches!(engine.status(fillet), Some(FeatureStatus::Inactive)));
    assert!(engine.result(fillet).is_none());
    // Upstream untouched.
    assert!(matches!(engine.status(extrude), Some(FeatureStatus::Built)));
}

#[test]
fn rollback_deactivates_the_suffix() {
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();
    let (sketch, extrude, fillet) = plate(&mut engine, &mut kernel);

    engine.set_rollback(Some(1), &mut kernel).unwrap();
    assert!(matches!(engine.status(sketch), Some(FeatureStatus::Built)));
    assert!(matches!(engine.status(extrude), Some(FeatureStatus::Built)));
    assert!(matches!(engine.status(fillet), Some(FeatureStatus::Inactive)));

    engine.set_rollback(None, &mut kernel).unwrap();
    assert!(matches!(engine.status(fillet), Some(FeatureStatus::Built)));
}

#[test]
fn kernel_failure_marks_errored_and_blocks_dependents() {
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();
    let (sketch, extrude, fillet) = plate(&mut engine, &mut kernel);

    kernel.fail_next_op("flaky boolean core");
    engine
        .edit_feature(extrude, extrude_op(sketch, 12.0), &mut kernel)
        .unwrap();

    match engine.status(extrude) {
        Some(FeatureStatus::Errored {
            error: FeatureError::OperationFailed(_),
        }) => {}
        other => panic!("expected Errored(OperationFailed), got {other:?}"),
    }
    match engine.status(fillet) {
        Some(FeatureStatus::Blocked { source }) => assert_eq!(*source, extrude),
        other => panic!("expected Blocked, got {other:?}"),
    }
    assert!(engine.result(extrude).is_none());
    assert!(engine.result(fillet).is_none());

    // The sketch is unrelated to the failure and still fine.
    assert!(matches!(engine.status(sketch), Some(FeatureStatus::Built)));
}

#[test]
fn best_effort_clamp_builds_with_warning() {
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();
    let sketch = engine
        .add_feature("Sketch 1", rect_sketch_op(1.0, 1.0), &mut kernel)
        .unwrap();
    let extrude = engine
        .add_feature("Extrude 1", extrude_op(sketch, 5.0), &mut kernel)
        .unwrap();

    // Index 99 does not exist; BestEffort clamps instead of failing.
    let op = Operation::Fillet {
        params: FilletParams {
            edges: vec![GeomRef {
                kind: TopoKind::Edge,
                anchor: Anchor::Feature {
                    feature_id: extrude,
                    output: OutputKey::Primary,
                },
                selector: Selector::Role {
                    role: Role::EndCapPosEdge { index: 0 },
                    index: 99,
                },
                policy: ResolvePolicy::BestEffort,
            }],
            radius: 0.5,
        },
    };
    let fillet = engine.add_feature("Fillet 1", op, &mut kernel).unwrap();

    assert!(matches!(engine.status(fillet), Some(FeatureStatus::Built)));
    let warnings = &engine.result(fillet).unwrap().diagnostics.warnings;
    assert!(warnings.iter().any(|w| w.contains("clamped")));
}

// ── Resolver ───────────────────────────────────────────────────────────────

fn built_extrude(
    engine: &mut Engine,
    kernel: &mut MockKernel,
) -> (Uuid, HashMap<Uuid, mandrel_ops::OpResult>) {
    let sketch = engine
        .add_feature("Sketch 1", rect_sketch_op(2.0, 3.0), kernel)
        .unwrap();
    let extrude = engine
        .add_feature("Extrude 1", extrude_op(sketch, 4.0), kernel)
        .unwrap();
    let mut results = HashMap::new();
    results.insert(extrude, engine.result(extrude).unwrap().clone());
    (extrude, results)
}

#[test]
fn role_selector_resolves_exactly() {
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();
    let (extrude, results) = built_extrude(&mut engine, &mut kernel);

    let geom_ref = GeomRef {
        kind: TopoKind::Face,
        anchor: Anchor::Feature {
            feature_id: extrude,
            output: OutputKey::Primary,
        },
        selector: Selector::Role {
            role: Role::EndCapPos,
            index: 0,
        },
        policy: ResolvePolicy::Strict,
    };
    let resolved =
        resolve_geom_ref(&geom_ref, &results, &kernel, &ResolverConfig::default()).unwrap();

    let expected = results[&extrude].provenance.entities_with_role(&Role::EndCapPos)[0];
    assert_eq!(resolved.entity, expected);
    assert!(resolved.warnings.is_empty());
}

#[test]
fn missing_anchor_is_anchor_not_found() {
    let kernel = MockKernel::new();
    let geom_ref = GeomRef {
        kind: TopoKind::Face,
        anchor: Anchor::Feature {
            feature_id: Uuid::new_v4(),
            output: OutputKey::Primary,
        },
        selector: Selector::Role {
            role: Role::EndCapPos,
            index: 0,
        },
        policy: ResolvePolicy::Strict,
    };
    let err = resolve_geom_ref(
        &geom_ref,
        &HashMap::new(),
        &kernel,
        &ResolverConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ResolveError::AnchorNotFound { .. }));
}

#[test]
fn missing_output_is_output_not_found() {
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();
    let (extrude, results) = built_extrude(&mut engine, &mut kernel);

    let geom_ref = GeomRef {
        kind: TopoKind::Face,
        anchor: Anchor::Feature {
            feature_id: extrude,
            output: OutputKey::Secondary { index: 3 },
        },
        selector: Selector::Role {
            role: Role::EndCapPos,
            index: 0,
        },
        policy: ResolvePolicy::Strict,
    };
    let err = resolve_geom_ref(&geom_ref, &results, &kernel, &ResolverConfig::default())
        .unwrap_err();
    assert!(matches!(err, ResolveError::OutputNotFound { .. }));
}

#[test]
fn signature_selector_finds_the_fingerprinted_face() {
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();
    let (extrude, results) = built_extrude(&mut engine, &mut kernel);

    let wall = results[&extrude]
        .provenance
        .entities_with_role(&Role::WallFace { index: 2 })[0];
    let stored = kernel.signature(wall, TopoKind::Face);

    let geom_ref = GeomRef {
        kind: TopoKind::Face,
        anchor: Anchor::Feature {
            feature_id: extrude,
            output: OutputKey::Primary,
        },
        selector: Selector::Signature { signature: stored },
        policy: ResolvePolicy::Strict,
    };
    let resolved =
        resolve_geom_ref(&geom_ref, &results, &kernel, &ResolverConfig::default()).unwrap();
    assert_eq!(resolved.entity, wall);
}

#[test]
fn hopeless_signature_is_below_threshold_under_strict() {
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();
    let (extrude, results) = built_extrude(&mut engine, &mut kernel);

    let stored = TopoSignature {
        surface_type: Some("conical".to_string()),
        area: Some(1.0e6),
        length: None,
        centroid: Some([500.0, 500.0, 500.0]),
        normal: None,
        bbox: None,
        adjacency: None,
    };
    let mut geom_ref = GeomRef {
        kind: TopoKind::Face,
        anchor: Anchor::Feature {
            feature_id: extrude,
            output: OutputKey::Primary,
        },
        selector: Selector::Signature { signature: stored },
        policy: ResolvePolicy::Strict,
    };
    let err = resolve_geom_ref(&geom_ref, &results, &kernel, &ResolverConfig::default())
        .unwrap_err();
    assert!(matches!(err, ResolveError::BelowThreshold { .. }));

    // BestEffort downgrades the same miss to a warning.
    geom_ref.policy = ResolvePolicy::BestEffort;
    let resolved =
        resolve_geom_ref(&geom_ref, &results, &kernel, &ResolverConfig::default()).unwrap();
    assert!(!resolved.warnings.is_empty());
}

#[test]
fn query_selector_filters_and_tie_breaks() {
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();
    let (extrude, results) = built_extrude(&mut engine, &mut kernel);

    // The only planar face with a +Z normal is the positive end cap.
    let geom_ref = GeomRef {
        kind: TopoKind::Face,
        anchor: Anchor::Feature {
            feature_id: extrude,
            output: OutputKey::Primary,
        },
        selector: Selector::Query {
            query: TopoQuery {
                filters: vec![QueryFilter::NormalWithin {
                    direction: [0.0, 0.0, 1.0],
                    tolerance: 0.1,
                }],
                tie_break: None,
            },
        },
        policy: ResolvePolicy::Strict,
    };
    let resolved =
        resolve_geom_ref(&geom_ref, &results, &kernel, &ResolverConfig::default()).unwrap();
    let cap = results[&extrude].provenance.entities_with_role(&Role::EndCapPos)[0];
    assert_eq!(resolved.entity, cap);
}

#[test]
fn ambiguous_query_needs_a_tie_break() {
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();
    let (extrude, results) = built_extrude(&mut engine, &mut kernel);

    let all_planar = TopoQuery {
        filters: vec![QueryFilter::SurfaceType {
            surface_type: "planar".to_string(),
        }],
        tie_break: None,
    };
    let mut geom_ref = GeomRef {
        kind: TopoKind::Face,
        anchor: Anchor::Feature {
            feature_id: extrude,
            output: OutputKey::Primary,
        },
        selector: Selector::Query {
            query: all_planar.clone(),
        },
        policy: ResolvePolicy::Strict,
    };
    let err = resolve_geom_ref(&geom_ref, &results, &kernel, &ResolverConfig::default())
        .unwrap_err();
    assert!(matches!(err, ResolveError::AmbiguousMatch { candidates: 6 }));

    // With a tie-break the same query resolves deterministically.
    let largest = TopoQuery {
        filters: all_planar.filters.clone(),
        tie_break: Some(TieBreak::LargestArea),
    };
    geom_ref.selector = Selector::Query { query: largest };
    let a = resolve_geom_ref(&geom_ref, &results, &kernel, &ResolverConfig::default()).unwrap();
    let b = resolve_geom_ref(&geom_ref, &results, &kernel, &ResolverConfig::default()).unwrap();
    assert_eq!(a.entity, b.entity);
}

// ── History ────────────────────────────────────────────────────────────────

#[test]
fn undo_redo_round_trips_the_tree() {
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();
    let (_, _, fillet) = plate(&mut engine, &mut kernel);

    assert!(engine.undo(&mut kernel));
    assert_eq!(engine.tree.features.len(), 2);
    assert!(engine.result(fillet).is_none());

    assert!(engine.redo(&mut kernel));
    assert_eq!(engine.tree.features.len(), 3);
    assert!(matches!(engine.status(fillet), Some(FeatureStatus::Built)));
}

#[test]
fn new_mutation_after_undo_discards_redo() {
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();
    let (sketch, _, _) = plate(&mut engine, &mut kernel);

    engine.undo(&mut kernel);
    assert!(engine.can_redo());

    engine
        .add_feature("Extrude B", extrude_op(sketch, 3.0), &mut kernel)
        .unwrap();
    assert!(!engine.can_redo());
    assert!(!engine.redo(&mut kernel));
}

#[test]
fn undo_to_empty_tree_and_back() {
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();
    let sketch = engine
        .add_feature("Sketch 1", rect_sketch_op(1.0, 1.0), &mut kernel)
        .unwrap();

    assert!(engine.undo(&mut kernel));
    assert!(engine.tree.features.is_empty());
    assert!(!engine.undo(&mut kernel));

    assert!(engine.redo(&mut kernel));
    assert_eq!(engine.tree.features[0].id, sketch);
    assert!(matches!(engine.status(sketch), Some(FeatureStatus::Built)));
}

// ── Snapshot ───────────────────────────────────────────────────────────────

#[test]
fn snapshot_reports_status_per_feature() {
    let mut engine = Engine::new();
    let mut kernel = MockKernel::new();
    let (_, extrude, fillet) = plate(&mut engine, &mut kernel);

    engine.delete_feature(extrude, &mut kernel).unwrap();
    let snapshot = engine.tree_snapshot();

    assert_eq!(snapshot.features.len(), 2);
    assert_eq!(snapshot.errored().count(), 1);
    assert_eq!(snapshot.blocked().count(), 0);
    let errored = snapshot.errored().next().unwrap();
    assert_eq!(errored.id, fillet);
    assert_eq!(errored.kind, "Fillet");
}
