//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::model::{ParamMap, ProjectionKind, TransformationKind};
use crate::snapshot::{self, Snapshot};
use crate::workspace::Workspace;

/// Generate a synthetic dataset and write it out as a snapshot.
pub fn synthetic(
    path: &Path,
    points: usize,
    dimensions: usize,
    clusters: usize,
) -> Result<()> {
    info!(
        "generating {} points, {} dimensions, {} clusters",
        points, dimensions, clusters
    );

    let mut ws = Workspace::new();
    let layer = ws
        .store_mut()
        .generate_synthetic_data(points, dimensions, clusters, "synthetic")?;

    ws.snapshot("synthetic", "generated dataset")
        .save_to_file(path)
        .with_context(|| format!("writing snapshot to {}", path.display()))?;

    println!(
        "Wrote layer '{}' ({} points) to {}",
        layer.name,
        layer.point_count,
        path.display()
    );
    Ok(())
}

/// Load a snapshot, derive a doubled layer, and project it with PCA.
pub fn demo(path: &Path) -> Result<()> {
    let mut ws = load_workspace(path)?;
    let base = ws
        .store()
        .list_layers()
        .first()
        .map(|layer| (layer.id, layer.name.clone()))
        .context("snapshot contains no layers")?;

    info!("deriving and projecting from layer '{}'", base.1);
    let transformation = ws.create_transformation(
        "doubled",
        TransformationKind::Scaling,
        base.0,
        ParamMap::new(),
    )?;
    let target = transformation
        .target_layer_id
        .context("transformation was not applied")?;

    let view = ws.create_projection("pca view", ProjectionKind::Pca, target, 2, ParamMap::new(), true)?;
    let coords = ws
        .try_projection_coordinates(view.id)
        .context("projection could not be computed")?;

    println!("Projected {} points; first rows:", coords.len());
    for point in coords.iter().take(5) {
        println!(
            "  {}  ({:.3}, {:.3})",
            point.label, point.coordinates[0], point.coordinates[1]
        );
    }
    Ok(())
}

/// Print a snapshot's graph structure.
pub fn show(path: &Path) -> Result<()> {
    let ws = load_workspace(path)?;

    println!("Layers:");
    for layer in ws.store().list_layers() {
        let origin = if layer.is_derived { "derived" } else { "root" };
        println!(
            "  {}  '{}'  {}d x {} points  [{}]",
            layer.id, layer.name, layer.dimensionality, layer.point_count, origin
        );
    }

    println!("Transformations:");
    for t in ws.transforms().list_transformations() {
        println!(
            "  {}  '{}'  {}  {} -> {}",
            t.id,
            t.name,
            t.kind,
            t.source_layer_id,
            t.target_layer_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "(unapplied)".to_string())
        );
    }

    println!("Projections:");
    for p in ws.projections().list_projections() {
        println!(
            "  {}  '{}'  {}  on {}  seed {}",
            p.id, p.name, p.kind, p.layer_id, p.random_seed
        );
    }
    Ok(())
}

/// List snapshot files in a directory.
pub fn list(dir: &Path) -> Result<()> {
    let found = snapshot::list_snapshots(dir);
    if found.is_empty() {
        println!("No snapshots in {}", dir.display());
        return Ok(());
    }
    for info in found {
        println!("  {}  {}  {}", info.filename, info.name, info.description);
    }
    Ok(())
}

fn load_workspace(path: &Path) -> Result<Workspace> {
    let snapshot = Snapshot::load_from_file(path)
        .with_context(|| format!("loading snapshot from {}", path.display()))?;
    let mut ws = Workspace::new();
    ws.restore(&snapshot)?;
    info!(
        "loaded snapshot '{}' ({} layers)",
        snapshot.name,
        snapshot.layers.len()
    );
    Ok(ws)
}
