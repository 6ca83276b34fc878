//! Assertion helpers with diagnostic output: expected vs actual plus the
//! tree's current error state, so a failing scenario explains itself.

use uuid::Uuid;

use mandrel_engine::rebuild::FeatureStatus;
use mandrel_engine::Engine;
use mandrel_kernel::{KernelProbe, SolidHandle};
use mandrel_types::{OutputKey, Role, TopoKind};

/// Unified error type for the harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("no result for feature {id}")]
    NoResult { id: Uuid },
}

/// Assert a feature built cleanly.
pub fn assert_built(engine: &Engine, id: Uuid, ctx: &str) -> Result<(), HarnessError> {
    match engine.status(id) {
        Some(FeatureStatus::Built) => Ok(()),
        other => Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] expected Built, got {:?}.\n{}",
                ctx,
                other,
                tree_report(engine)
            ),
        }),
    }
}

/// Assert exact entity counts (V, E, F) for a feature's primary output.
pub fn assert_topology_eq(
    engine: &Engine,
    probe: &dyn KernelProbe,
    id: Uuid,
    expected_v: usize,
    expected_e: usize,
    expected_f: usize,
    ctx: &str,
) -> Result<(), HarnessError> {
    let handle = primary_handle(engine, id)?;
    let v = probe.entities(&handle, TopoKind::Vertex).len();
    let e = probe.entities(&handle, TopoKind::Edge).len();
    let f = probe.entities(&handle, TopoKind::Face).len();

    if v == expected_v && e == expected_e && f == expected_f {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] expected V={} E={} F={}, got V={} E={} F={}",
                ctx, expected_v, expected_e, expected_f, v, e, f,
            ),
        })
    }
}

/// Assert a role was assigned in a feature's provenance.
pub fn assert_role_assigned(
    engine: &Engine,
    id: Uuid,
    role: &Role,
    ctx: &str,
) -> Result<(), HarnessError> {
    let result = engine.result(id).ok_or(HarnessError::NoResult { id })?;
    if !result.provenance.entities_with_role(role).is_empty() {
        return Ok(());
    }
    let available: Vec<String> = result
        .provenance
        .roles
        .iter()
        .map(|(_, r)| format!("{:?}", r))
        .collect();
    Err(HarnessError::AssertionFailed {
        detail: format!(
            "[{}] expected role {:?} not found. Available: [{}]",
            ctx,
            role,
            available.join(", "),
        ),
    })
}

/// The primary output handle of a built feature.
pub fn primary_handle(engine: &Engine, id: Uuid) -> Result<SolidHandle, HarnessError> {
    engine
        .result(id)
        .and_then(|r| r.output(&OutputKey::Primary))
        .map(|b| b.handle.clone())
        .ok_or(HarnessError::NoResult { id })
}

/// One line per feature: name, kind, status.
pub fn tree_report(engine: &Engine) -> String {
    engine
        .tree_snapshot()
        .features
        .iter()
        .map(|f| format!("  {} ({}): {:?}", f.name, f.kind, f.status))
        .collect::<Vec<_>>()
        .join("\n")
}
