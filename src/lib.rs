//! Annotation to YOLO dataset exporter
//!
//! This library turns a snapshot of annotated images into a YOLO training
//! dataset: letterboxed square images split into train/valid partitions,
//! remapped label files and a dataset descriptor.

pub mod config;
pub mod conversion;
pub mod dataset;
pub mod error;
pub mod io;
pub mod letterbox;
pub mod remap;
pub mod response;
pub mod store;
pub mod types;
pub mod utils;
pub mod yolo_dataset;

// Re-export commonly used types and functions
pub use config::{Args, ExportConfig, ExportOptions};
pub use dataset::partition;
pub use error::{ExportError, ExportResult};
pub use io::{setup_output_directories, DatasetDescriptor, OutputDirs};
pub use letterbox::{render_image, LetterboxGeometry};
pub use remap::remap_box;
pub use response::{ExportFailure, ExportResponse, ExportStage};
pub use store::{read_snapshot, AnnotationSnapshot, AnnotationStore, SnapshotFile};
pub use types::{AnnotatedImage, BoundingBox, DatasetSplit, ExportSummary, Partition};
pub use yolo_dataset::{export_dataset, export_from_args, export_response, run_export};
