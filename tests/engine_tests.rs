//! Integration Tests
//!
//! End-to-end tests for the Strata dataset graph engine: derivation,
//! propagation, lazy projection, and persistence working together.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde_json::json;

use strata::model::{ParamMap, PointData, PointId, ProjectionKind, TransformationKind};
use strata::snapshot::Snapshot;
use strata::Workspace;

fn params(value: serde_json::Value) -> ParamMap {
    value.as_object().unwrap().clone()
}

/// A 150-point, 4-dimensional reference dataset split into three labeled
/// groups of 50, in the shape of the classic iris data.
fn three_class_workspace() -> (Workspace, uuid::Uuid, Vec<Vec<PointId>>) {
    let mut ws = Workspace::new();
    let layer = ws.store_mut().create_layer("reference", 4, None, None);

    let mut rng = StdRng::seed_from_u64(7);
    let noise = Normal::new(0.0, 0.3).unwrap();
    let centers = [
        [5.0, 3.4, 1.5, 0.2],
        [5.9, 2.8, 4.3, 1.3],
        [6.6, 3.0, 5.6, 2.0],
    ];

    let mut batch = Vec::new();
    for (class, center) in centers.iter().enumerate() {
        for i in 0..50 {
            let vector: Vec<f64> = center.iter().map(|c| c + noise.sample(&mut rng)).collect();
            let mut metadata = ParamMap::new();
            metadata.insert("class".to_string(), json!(class));
            batch.push(
                PointData::new(format!("class{}_{}", class, i), vector).with_metadata(metadata),
            );
        }
    }
    let admitted = ws.store_mut().add_points_bulk(layer.id, batch).unwrap();
    assert_eq!(ws.store().get_layer(layer.id).unwrap().point_count, 150);

    let mut by_class = vec![Vec::new(), Vec::new(), Vec::new()];
    for point in &admitted {
        let class = point.metadata.get("class").unwrap().as_u64().unwrap() as usize;
        by_class[class].push(point.id);
    }
    assert!(by_class.iter().all(|ids| ids.len() == 50));
    (ws, layer.id, by_class)
}

// === Custom Axes ===

#[test]
fn test_custom_axes_projection_is_orthonormal() {
    let (mut ws, layer_id, by_class) = three_class_workspace();

    // Barycenter per class, axes from class 1 to classes 2 and 0.
    let b0 = ws
        .store_mut()
        .create_barycenter(layer_id, &by_class[0], "class0_center")
        .unwrap();
    let b1 = ws
        .store_mut()
        .create_barycenter(layer_id, &by_class[1], "class1_center")
        .unwrap();
    let b2 = ws
        .store_mut()
        .create_barycenter(layer_id, &by_class[2], "class2_center")
        .unwrap();

    let axis_x = ws
        .store_mut()
        .create_custom_axis("one_to_two", layer_id, b1.id, b2.id)
        .unwrap();
    let axis_y = ws
        .store_mut()
        .create_custom_axis("one_to_zero", layer_id, b1.id, b0.id)
        .unwrap();

    let projection = ws
        .create_projection(
            "axes view",
            ProjectionKind::CustomAxes,
            layer_id,
            2,
            params(json!({
                "axes": [
                    {"type": "direction", "vector": axis_x.vector},
                    {"type": "direction", "vector": axis_y.vector},
                ],
                "axis_x_id": axis_x.id.to_string(),
                "axis_y_id": axis_y.id.to_string(),
            })),
            true,
        )
        .unwrap();

    let coords = ws.projection_coordinates(projection.id).unwrap();
    let find = |id: PointId| {
        coords
            .iter()
            .find(|p| p.id == id)
            .map(|p| (p.coordinates[0], p.coordinates[1]))
            .unwrap()
    };
    let (x1, y1) = find(b1.id);
    let (x2, y2) = find(b2.id);
    let (x0, y0) = find(b0.id);

    // The image of each axis displacement has unit norm...
    let dx = (x2 - x1, y2 - y1);
    let dy = (x0 - x1, y0 - y1);
    let dx_len = (dx.0 * dx.0 + dx.1 * dx.1).sqrt();
    let dy_len = (dy.0 * dy.0 + dy.1 * dy.1).sqrt();
    assert!(
        (dx_len - 1.0).abs() < 1e-10,
        "axis x image must have unit length, got {}",
        dx_len
    );
    assert!(
        (dy_len - 1.0).abs() < 1e-10,
        "axis y image must have unit length, got {}",
        dy_len
    );

    // ...lands exactly on the output basis...
    assert!((dx.0 - 1.0).abs() < 1e-10 && dx.1.abs() < 1e-10);
    assert!(dy.0.abs() < 1e-10 && (dy.1 - 1.0).abs() < 1e-10);

    // ...and the two images are mutually orthogonal.
    let dot = dx.0 * dy.0 + dx.1 * dy.1;
    assert!(dot.abs() < 1e-10, "axis images must be orthogonal, dot = {}", dot);
}

#[test]
fn test_single_axis_projection_zero_fills_second_dimension() {
    let (mut ws, layer_id, by_class) = three_class_workspace();
    let b1 = ws
        .store_mut()
        .create_barycenter(layer_id, &by_class[1], "c1")
        .unwrap();
    let b2 = ws
        .store_mut()
        .create_barycenter(layer_id, &by_class[2], "c2")
        .unwrap();
    let axis = ws
        .store_mut()
        .create_custom_axis("only", layer_id, b1.id, b2.id)
        .unwrap();

    let projection = ws
        .create_projection(
            "one axis",
            ProjectionKind::CustomAxes,
            layer_id,
            2,
            params(json!({"axes": [{"type": "direction", "vector": axis.vector}]})),
            false,
        )
        .unwrap();

    let coords = ws.projection_coordinates(projection.id).unwrap();
    assert!(coords.iter().all(|p| p.coordinates[1] == 0.0));
    // The axis is not degenerate: spread exists on the first coordinate.
    let spread = coords
        .iter()
        .map(|p| p.coordinates[0])
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(spread > 0.0);
}

// === Projection Cache ===

#[test]
fn test_coordinates_are_idempotent() {
    let (mut ws, layer_id, _) = three_class_workspace();
    let projection = ws
        .create_projection(
            "pca",
            ProjectionKind::Pca,
            layer_id,
            2,
            ParamMap::new(),
            false,
        )
        .unwrap();

    let first: Vec<Vec<f64>> = ws
        .projection_coordinates(projection.id)
        .unwrap()
        .iter()
        .map(|p| p.coordinates.clone())
        .collect();
    let second: Vec<Vec<f64>> = ws
        .projection_coordinates(projection.id)
        .unwrap()
        .iter()
        .map(|p| p.coordinates.clone())
        .collect();

    assert_eq!(first, second, "two reads with no change must be bit-identical");
}

#[test]
fn test_parameter_update_recomputes() {
    let (mut ws, layer_id, _) = three_class_workspace();
    let projection = ws
        .create_projection(
            "direct",
            ProjectionKind::Direct,
            layer_id,
            2,
            params(json!({"dim_x": 0, "dim_y": 1})),
            false,
        )
        .unwrap();

    let before: Vec<f64> = ws.projection_coordinates(projection.id).unwrap()[0]
        .coordinates
        .clone();

    ws.update_projection(
        projection.id,
        None,
        Some(params(json!({"dim_x": 2, "dim_y": 3}))),
    )
    .unwrap();
    assert!(!ws.projections().is_computed(projection.id));

    let after: Vec<f64> = ws.projection_coordinates(projection.id).unwrap()[0]
        .coordinates
        .clone();
    assert_ne!(before, after, "new parameters must produce a fresh result");
}

// === Propagation ===

#[test]
fn test_chain_edit_replaces_downstream_only() {
    let mut ws = Workspace::new();
    let a = ws.store_mut().create_layer("A", 2, None, None);
    let admitted = ws
        .store_mut()
        .add_points_bulk(
            a.id,
            vec![
                PointData::new("p", vec![1.0, 1.0]),
                PointData::new("q", vec![2.0, 3.0]),
            ],
        )
        .unwrap();
    let p_id = admitted[0].id;

    let scale = |f: f64| params(json!({"scale_factors": [f, f]}));

    let tb = ws
        .create_transformation("b", TransformationKind::Scaling, a.id, scale(2.0))
        .unwrap();
    let b = tb.target_layer_id.unwrap();
    let tc = ws
        .create_transformation("c", TransformationKind::Scaling, b, scale(10.0))
        .unwrap();
    let c = tc.target_layer_id.unwrap();
    let td = ws
        .create_transformation("d", TransformationKind::Scaling, c, scale(100.0))
        .unwrap();
    let d = td.target_layer_id.unwrap();
    let tsibling = ws
        .create_transformation("side", TransformationKind::Scaling, a.id, scale(7.0))
        .unwrap();
    let sibling = tsibling.target_layer_id.unwrap();

    let (_, report) = ws
        .update_transformation(tb.id, None, None, Some(scale(5.0)))
        .unwrap();
    let report = report.unwrap();
    assert!(report.is_clean());

    let new_b = ws
        .transforms()
        .get_transformation(tb.id)
        .unwrap()
        .target_layer_id
        .unwrap();
    let new_c = ws
        .transforms()
        .get_transformation(tc.id)
        .unwrap()
        .target_layer_id
        .unwrap();
    let new_d = ws
        .transforms()
        .get_transformation(td.id)
        .unwrap()
        .target_layer_id
        .unwrap();

    // New identities for the chain, old layers gone.
    assert!(new_b != b && new_c != c && new_d != d);
    assert!(ws.store().get_layer(b).is_none());
    assert!(ws.store().get_layer(c).is_none());
    assert!(ws.store().get_layer(d).is_none());

    // Root and sibling untouched.
    assert!(ws.store().get_layer(a.id).is_some());
    assert_eq!(
        ws.transforms()
            .get_transformation(tsibling.id)
            .unwrap()
            .target_layer_id,
        Some(sibling)
    );

    // Vectors reflect the new transform composed through the chain.
    let moved = ws.store().get_point(new_d, p_id).unwrap();
    assert_eq!(moved.vector, vec![5000.0, 5000.0]);
}

#[test]
fn test_propagation_preserves_layer_names() {
    let mut ws = Workspace::new();
    let a = ws.store_mut().create_layer("A", 1, None, None);
    ws.store_mut()
        .add_point(a.id, PointData::new("p", vec![1.0]))
        .unwrap();

    let tb = ws
        .create_transformation("grow", TransformationKind::Scaling, a.id, ParamMap::new())
        .unwrap();
    let b = tb.target_layer_id.unwrap();
    let b_name = ws.store().get_layer(b).unwrap().name.clone();
    assert_eq!(b_name, "A_grow");

    let tc = ws
        .create_transformation("shift", TransformationKind::Scaling, b, ParamMap::new())
        .unwrap();
    let c = tc.target_layer_id.unwrap();
    let c_name = ws.store().get_layer(c).unwrap().name.clone();

    ws.update_transformation(
        tb.id,
        None,
        None,
        Some(params(json!({"scale_factors": [4.0]}))),
    )
    .unwrap();

    let new_b = ws
        .transforms()
        .get_transformation(tb.id)
        .unwrap()
        .target_layer_id
        .unwrap();
    let new_c = ws
        .transforms()
        .get_transformation(tc.id)
        .unwrap()
        .target_layer_id
        .unwrap();
    assert_eq!(ws.store().get_layer(new_b).unwrap().name, b_name);
    assert_eq!(ws.store().get_layer(new_c).unwrap().name, c_name);
}

#[test]
fn test_propagation_halts_failed_branch_only() {
    // A -> B (2D) -> C, where C's producer becomes impossible after B
    // shrinks to one dimension.
    let mut ws = Workspace::new();
    let a = ws.store_mut().create_layer("A", 2, None, None);
    ws.store_mut()
        .add_point(a.id, PointData::new("p", vec![1.0, 2.0]))
        .unwrap();

    let tb = ws
        .create_transformation("b", TransformationKind::Scaling, a.id, ParamMap::new())
        .unwrap();
    let b = tb.target_layer_id.unwrap();
    // C applies a fixed 2x2 matrix, valid while B stays 2-dimensional.
    let tc = ws
        .create_transformation(
            "c",
            TransformationKind::Linear,
            b,
            params(json!({"matrix": [[1.0, 0.0], [0.0, 1.0]]})),
        )
        .unwrap();
    let c = tc.target_layer_id.unwrap();

    // Edit B's producer into a 1-output linear map: C's 2x2 matrix can no
    // longer apply, so that branch must halt.
    let (_, report) = ws
        .update_transformation(
            tb.id,
            None,
            Some(TransformationKind::Linear),
            Some(params(json!({"matrix": [[1.0, 1.0]]}))),
        )
        .unwrap();
    let report = report.unwrap();

    assert_eq!(report.failed_branches.len(), 1);
    assert_eq!(report.failed_branches[0].0, tc.id);
    // The failed branch keeps its stale target; the edited node moved on.
    assert!(ws.store().get_layer(c).is_some());
    let new_b = ws
        .transforms()
        .get_transformation(tb.id)
        .unwrap()
        .target_layer_id
        .unwrap();
    assert_ne!(new_b, b);
    assert_eq!(ws.store().get_layer(new_b).unwrap().dimensionality, 1);
}

// === Point Identity ===

#[test]
fn test_point_identity_preserved_by_scaling() {
    let mut ws = Workspace::new();
    let layer = ws.store_mut().create_layer("base", 3, None, None);
    let point = ws
        .store_mut()
        .add_point(layer.id, PointData::new("tracked", vec![1.5, -2.0, 0.5]))
        .unwrap();

    let t = ws
        .create_transformation(
            "double",
            TransformationKind::Scaling,
            layer.id,
            params(json!({"scale_factors": [2.0, 2.0, 2.0]})),
        )
        .unwrap();
    let target = t.target_layer_id.unwrap();

    let moved = ws.store().get_point(target, point.id).unwrap();
    assert_eq!(moved.id, point.id, "identity must survive derivation");
    assert_eq!(moved.vector, vec![3.0, -4.0, 1.0]);
    assert_eq!(moved.label, "tracked");
}

// === Persistence ===

#[test]
fn test_snapshot_round_trip_graph() {
    // 3 layers, 2 transformations, 3 projections.
    let mut ws = Workspace::new();
    let base = ws.store_mut().create_layer("base", 2, None, None);
    ws.store_mut()
        .add_points_bulk(
            base.id,
            vec![
                PointData::new("a", vec![1.0, 2.0]),
                PointData::new("b", vec![3.0, 4.0]),
            ],
        )
        .unwrap();
    let t1 = ws
        .create_transformation("x2", TransformationKind::Scaling, base.id, ParamMap::new())
        .unwrap();
    let mid = t1.target_layer_id.unwrap();
    let t2 = ws
        .create_transformation(
            "spin",
            TransformationKind::Rotation,
            mid,
            params(json!({"angle": 1.0})),
        )
        .unwrap();
    let top = t2.target_layer_id.unwrap();
    ws.create_projection("v1", ProjectionKind::Pca, base.id, 2, ParamMap::new(), false)
        .unwrap();
    ws.create_projection("v2", ProjectionKind::Direct, mid, 2, ParamMap::new(), false)
        .unwrap();
    ws.create_projection("v3", ProjectionKind::Violin, top, 2, ParamMap::new(), false)
        .unwrap();

    let saved = ws.snapshot("graph", "three layers");
    let serialized = serde_json::to_string(&saved).unwrap();
    let reloaded: Snapshot = serde_json::from_str(&serialized).unwrap();

    let mut restored = Workspace::new();
    restored.restore(&reloaded).unwrap();

    // Identical layer ids and vectors.
    for layer in ws.store().list_layers() {
        let twin = restored.store().get_layer(layer.id).unwrap();
        assert_eq!(twin.name, layer.name);
        assert_eq!(twin.point_count, layer.point_count);
        for point in ws.store().get_points(layer.id, None) {
            let restored_point = restored.store().get_point(layer.id, point.id).unwrap();
            assert_eq!(restored_point.vector, point.vector);
        }
    }

    // Identical transformation wiring and parameter maps (including the
    // derived values PCA-style transforms write back).
    for t in ws.transforms().list_transformations() {
        let twin = restored.transforms().get_transformation(t.id).unwrap();
        assert_eq!(twin.source_layer_id, t.source_layer_id);
        assert_eq!(twin.target_layer_id, t.target_layer_id);
        assert_eq!(twin.parameters, t.parameters);
    }

    // Identical projections, including seeds.
    for p in ws.projections().list_projections() {
        let twin = restored.projections().get_projection(p.id).unwrap();
        assert_eq!(twin.kind, p.kind);
        assert_eq!(twin.random_seed, p.random_seed);
        assert_eq!(twin.parameters, p.parameters);
    }

    // The restored graph is alive: editing the first transformation still
    // propagates through the restored chain.
    let (_, report) = restored
        .update_transformation(
            t1.id,
            None,
            None,
            Some(params(json!({"scale_factors": [5.0, 5.0]}))),
        )
        .unwrap();
    let report = report.unwrap();
    assert!(report.is_clean());
    assert_eq!(report.reapplied_transformations, vec![t2.id]);
}
