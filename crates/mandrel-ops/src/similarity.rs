use mandrel_types::TopoSignature;

/// Minimum similarity for the differ to pair a deleted entity with a
/// created one (and for role assignment to trust the pairing).
pub const ROLE_THRESHOLD: f64 = 0.7;

/// Numeric slack when deciding whether a surviving entity's signature
/// changed at all.
pub const MOVE_EPSILON: f64 = 1e-9;

/// Weighted similarity between two signatures, 0.0 to 1.0.
///
/// Weights: surface/curve kind 3.0, area 2.0, centroid 2.0, normal 2.0,
/// length 2.0. A component is excluded from the normalization whenever
/// either side lacks the field, so sparse signatures still score on what
/// they do carry.
pub fn signature_similarity(a: &TopoSignature, b: &TopoSignature) -> f64 {
    let mut score = 0.0;
    let mut weight = 0.0;

    if let (Some(ka), Some(kb)) = (&a.surface_type, &b.surface_type) {
        weight += 3.0;
        if ka == kb {
            score += 3.0;
        }
    }

    if let (Some(area_a), Some(area_b)) = (a.area, b.area) {
        weight += 2.0;
        score += 2.0 * ratio_credit(area_a, area_b);
    }

    if let (Some(ca), Some(cb)) = (a.centroid, b.centroid) {
        weight += 2.0;
        let d = ((ca[0] - cb[0]).powi(2) + (ca[1] - cb[1]).powi(2) + (ca[2] - cb[2]).powi(2))
            .sqrt();
        // Full credit at coincidence, none at 10 units apart.
        score += 2.0 * (1.0 - (d / 10.0).min(1.0));
    }

    if let (Some(na), Some(nb)) = (a.normal, b.normal) {
        weight += 2.0;
        let dot = na[0] * nb[0] + na[1] * nb[1] + na[2] * nb[2];
        score += 2.0 * ((dot + 1.0) / 2.0).clamp(0.0, 1.0);
    }

    if let (Some(la), Some(lb)) = (a.length, b.length) {
        weight += 2.0;
        score += 2.0 * ratio_credit(la, lb);
    }

    if weight > 0.0 {
        score / weight
    } else {
        0.0
    }
}

/// Whether two signatures are the same within `eps` on every shared field.
/// Used to detect survivors that moved without changing id.
pub fn signatures_match(a: &TopoSignature, b: &TopoSignature, eps: f64) -> bool {
    if a.surface_type != b.surface_type {
        return false;
    }
    if !opt_close(a.area, b.area, eps) || !opt_close(a.length, b.length, eps) {
        return false;
    }
    if !opt3_close(a.centroid, b.centroid, eps) || !opt3_close(a.normal, b.normal, eps) {
        return false;
    }
    match (a.adjacency, b.adjacency) {
        (Some(fa), Some(fb)) if fa != fb => return false,
        _ => {}
    }
    true
}

/// 1.0 for equal magnitudes, falling off linearly with relative difference.
fn ratio_credit(a: f64, b: f64) -> f64 {
    let max = a.abs().max(b.abs());
    if max < 1e-12 {
        return 1.0;
    }
    1.0 - ((a - b).abs() / max).min(1.0)
}

fn opt_close(a: Option<f64>, b: Option<f64>, eps: f64) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => (x - y).abs() <= eps * x.abs().max(y.abs()).max(1.0),
        (None, None) => true,
        _ => false,
    }
}

fn opt3_close(a: Option<[f64; 3]>, b: Option<[f64; 3]>, eps: f64) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => x
            .iter()
            .zip(y.iter())
            .all(|(p, q)| (p - q).abs() <= eps * p.abs().max(q.abs()).max(1.0)),
        (None, None) => true,
        _ => false,
    }
}
