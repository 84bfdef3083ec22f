//! Graph snapshots.
//!
//! A snapshot captures every layer (with its points), transformation,
//! projection, selection, and custom axis, including ids, names, parameter
//! maps, and source/target references, so an identical graph can be
//! reconstructed later. Point ids survive the round trip, which is what
//! keeps cross-layer point tracking working after a save/load cycle.
//!
//! Cached projection coordinates are deliberately not captured: they are
//! ephemeral and recomputed lazily after a restore.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::Result;
use crate::model::{
    CustomAxis, Layer, LayerId, Point, PointData, Projection, Selection, Transformation,
};
use crate::workspace::Workspace;

/// Serializable image of a whole workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Layers in creation order.
    pub layers: Vec<Layer>,
    /// Points per layer, in storage order.
    pub points: HashMap<LayerId, Vec<Point>>,
    pub transformations: Vec<Transformation>,
    pub projections: Vec<Projection>,
    #[serde(default)]
    pub selections: Vec<Selection>,
    #[serde(default)]
    pub axes: Vec<CustomAxis>,
}

/// Listing entry for a saved snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub filename: String,
    pub name: String,
    pub description: String,
}

impl Snapshot {
    /// Capture the current state of a workspace.
    pub fn capture(
        workspace: &Workspace,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let store = workspace.store();
        let layers: Vec<Layer> = store.list_layers().into_iter().cloned().collect();
        let points = layers
            .iter()
            .map(|layer| {
                let layer_points: Vec<Point> = store
                    .get_points(layer.id, None)
                    .into_iter()
                    .cloned()
                    .collect();
                (layer.id, layer_points)
            })
            .collect();
        let axes = layers
            .iter()
            .flat_map(|layer| store.list_custom_axes(layer.id))
            .cloned()
            .collect();

        Self {
            name: name.into(),
            description: description.into(),
            created_at: Utc::now(),
            layers,
            points,
            transformations: workspace
                .transforms()
                .list_transformations()
                .into_iter()
                .cloned()
                .collect(),
            projections: workspace
                .projections()
                .list_projections()
                .into_iter()
                .cloned()
                .collect(),
            selections: store.list_selections().into_iter().cloned().collect(),
            axes,
        }
    }

    /// Replace a workspace's state with this snapshot's content.
    ///
    /// Ids are restored verbatim; projection caches start cold.
    pub fn restore_into(&self, workspace: &mut Workspace) -> Result<()> {
        workspace.clear();
        let (store, transforms, projections) = workspace.components_mut();

        for layer in &self.layers {
            store.insert_layer(layer.clone());
            if let Some(points) = self.points.get(&layer.id) {
                let batch: Vec<PointData> = points.iter().map(PointData::from).collect();
                store.add_points_bulk(layer.id, batch)?;
            }
        }
        for selection in &self.selections {
            store.insert_selection(selection.clone());
        }
        for axis in &self.axes {
            store.insert_custom_axis(axis.clone());
        }
        for transformation in &self.transformations {
            transforms.insert_transformation(transformation.clone());
        }
        for projection in &self.projections {
            projections.insert_projection(projection.clone());
        }

        debug!(
            "restored snapshot '{}': {} layers, {} transformations, {} projections",
            self.name,
            self.layers.len(),
            self.transformations.len(),
            self.projections.len()
        );
        Ok(())
    }

    /// Write the snapshot as pretty-printed JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Read a snapshot back from JSON.
    pub fn load_from_file(path: &Path) -> Result<Snapshot> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Filesystem-friendly file stem for a snapshot name.
pub fn file_stem(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Path of a named snapshot inside a directory.
pub fn snapshot_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.json", file_stem(name)))
}

/// List the snapshot files in a directory. Unreadable or non-snapshot JSON
/// files are skipped.
pub fn list_snapshots(dir: &Path) -> Vec<SnapshotInfo> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match Snapshot::load_from_file(path) {
            Ok(snapshot) => found.push(SnapshotInfo {
                filename: path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                name: snapshot.name,
                description: snapshot.description,
            }),
            Err(err) => debug!("skipping {}: {}", path.display(), err),
        }
    }
    found.sort_by(|a, b| a.filename.cmp(&b.filename));
    found
}
