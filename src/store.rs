//! Annotation snapshot reader
//!
//! The annotation store is reached through [`AnnotationStore`]. [`SnapshotFile`]
//! is the JSON adapter: a dump of the store's label, image and annotation rows.

use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{ExportError, ExportResult};
use crate::types::{AnnotatedImage, BoundingBox, DroppedBox};

/// A label row
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LabelRecord {
    pub id: u32,
    pub name: String,
}

/// An image row with its annotation rows
#[derive(Debug, Clone, Deserialize)]
pub struct ImageRecord {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub is_annotated: bool,
    #[serde(default)]
    pub annotations: Vec<BoxRecord>,
}

// Box fields stay untyped until validation so a bad box drops only itself
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoxRecord {
    #[serde(default)]
    pub label_id: Value,
    #[serde(default)]
    pub x_center: Value,
    #[serde(default)]
    pub y_center: Value,
    #[serde(default)]
    pub width: Value,
    #[serde(default)]
    pub height: Value,
}

/// Read-only access to the external annotation store
pub trait AnnotationStore {
    fn labels(&self) -> ExportResult<Vec<LabelRecord>>;
    fn images(&self) -> ExportResult<Vec<ImageRecord>>;
}

/// Annotation store dumped to a single JSON document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub labels: Vec<LabelRecord>,
    #[serde(default)]
    pub images: Vec<ImageRecord>,
}

impl SnapshotFile {
    /// Parse a snapshot file directly from a buffered file stream
    pub fn open(path: &Path) -> ExportResult<Self> {
        let file = File::open(path).map_err(|e| store_error(path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| store_error(path, e))
    }

    pub fn from_json_str(json: &str) -> ExportResult<Self> {
        serde_json::from_str(json).map_err(|e| store_error("<inline>", e))
    }
}

impl AnnotationStore for SnapshotFile {
    fn labels(&self) -> ExportResult<Vec<LabelRecord>> {
        Ok(self.labels.clone())
    }

    fn images(&self) -> ExportResult<Vec<ImageRecord>> {
        Ok(self.images.clone())
    }
}

fn store_error(path: impl Into<PathBuf>, e: impl std::fmt::Display) -> ExportError {
    ExportError::Store {
        path: path.into(),
        msg: e.to_string(),
    }
}

/// Immutable working set of one export run
#[derive(Debug, Clone)]
pub struct AnnotationSnapshot {
    pub images: Vec<AnnotatedImage>,
    pub labels: BTreeMap<u32, String>,
    pub dropped_boxes: Vec<DroppedBox>,
}

/// Collect every annotated image and the label table from the store.
///
/// Malformed boxes are dropped and recorded; the image keeps its remaining
/// boxes. Fails with [`ExportError::EmptyDataset`] when nothing is annotated.
pub fn read_snapshot(store: &dyn AnnotationStore) -> ExportResult<AnnotationSnapshot> {
    let labels: BTreeMap<u32, String> = store
        .labels()?
        .into_iter()
        .map(|label| (label.id, label.name))
        .collect();

    let mut images = Vec::new();
    let mut dropped_boxes = Vec::new();

    for record in store.images()?.into_iter().filter(|r| r.is_annotated) {
        let mut boxes = Vec::with_capacity(record.annotations.len());
        for (index, raw) in record.annotations.iter().enumerate() {
            match validate_box(&record.filename, index, raw) {
                Ok(bbox) => boxes.push(bbox),
                Err(e) => {
                    warn!("Dropping box: {}", e);
                    dropped_boxes.push(DroppedBox {
                        filename: record.filename.clone(),
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }
        images.push(AnnotatedImage {
            filename: record.filename,
            width: record.width,
            height: record.height,
            boxes,
        });
    }

    if images.is_empty() {
        return Err(ExportError::EmptyDataset);
    }

    debug!(
        "Snapshot holds {} annotated images and {} labels",
        images.len(),
        labels.len()
    );

    Ok(AnnotationSnapshot {
        images,
        labels,
        dropped_boxes,
    })
}

/// Validate one raw box row into a [`BoundingBox`]
pub fn validate_box(filename: &str, index: usize, raw: &BoxRecord) -> ExportResult<BoundingBox> {
    let invalid = |msg: String| ExportError::InvalidBox {
        filename: filename.to_string(),
        index,
        msg,
    };

    let label_id = raw
        .label_id
        .as_u64()
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| invalid(format!("label_id {} is not a valid id", raw.label_id)))?;

    let coord = |name: &str, value: &Value| -> ExportResult<f64> {
        match value.as_f64() {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(invalid(format!("{} {} is not a finite number", name, value))),
        }
    };

    Ok(BoundingBox::new(
        label_id,
        coord("x_center", &raw.x_center)?,
        coord("y_center", &raw.y_center)?,
        coord("width", &raw.width)?,
        coord("height", &raw.height)?,
    ))
}
