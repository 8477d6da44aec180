use serde::Serialize;
use std::fmt;

// A bounding box in YOLO form: center and extent, normalized to [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub label_id: u32,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(label_id: u32, x_center: f64, y_center: f64, width: f64, height: f64) -> Self {
        Self {
            label_id,
            x_center,
            y_center,
            width,
            height,
        }
    }

    /// Format as one line of a YOLO label file
    pub fn to_yolo_line(&self) -> String {
        format!(
            "{} {:.6} {:.6} {:.6} {:.6}\n",
            self.label_id, self.x_center, self.y_center, self.width, self.height
        )
    }
}

// An image flagged as annotated, with boxes normalized against its original size
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedImage {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub boxes: Vec<BoundingBox>,
}

/// The two partitions of an exported dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Train,
    Valid,
}

impl Partition {
    pub const ALL: [Partition; 2] = [Partition::Train, Partition::Valid];

    pub fn dir_name(self) -> &'static str {
        match self {
            Partition::Train => "train",
            Partition::Valid => "valid",
        }
    }

    pub(crate) fn progress_label(self) -> &'static str {
        match self {
            Partition::Train => "Train",
            Partition::Valid => "Valid",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

// Struct to hold the split datasets for training and validation
#[derive(Debug, Clone, Default)]
pub struct DatasetSplit {
    pub train: Vec<AnnotatedImage>,
    pub valid: Vec<AnnotatedImage>,
}

impl DatasetSplit {
    pub fn images(&self, partition: Partition) -> &[AnnotatedImage] {
        match partition {
            Partition::Train => &self.train,
            Partition::Valid => &self.valid,
        }
    }

    pub fn len(&self) -> usize {
        self.train.len() + self.valid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An image left out of the export, and why
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedImage {
    pub filename: String,
    pub partition: Partition,
    pub reason: String,
}

/// A box dropped while reading the snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedBox {
    pub filename: String,
    pub index: usize,
    pub reason: String,
}

/// Result of processing one image
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOutcome {
    Exported { boxes_written: usize },
    Skipped(SkippedImage),
}

// Summary of a completed export run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSummary {
    pub train: usize,
    pub valid: usize,
    pub target_size: u32,
    pub output_dir: String,
    pub descriptor: String,
    pub boxes_written: usize,
    pub skipped_images: Vec<SkippedImage>,
    pub dropped_boxes: Vec<DroppedBox>,
}

impl ExportSummary {
    pub fn new(target_size: u32, output_dir: String, descriptor: String) -> Self {
        Self {
            train: 0,
            valid: 0,
            target_size,
            output_dir,
            descriptor,
            boxes_written: 0,
            skipped_images: Vec::new(),
            dropped_boxes: Vec::new(),
        }
    }

    pub fn record(&mut self, partition: Partition, outcome: ImageOutcome) {
        match outcome {
            ImageOutcome::Exported { boxes_written } => {
                match partition {
                    Partition::Train => self.train += 1,
                    Partition::Valid => self.valid += 1,
                }
                self.boxes_written += boxes_written;
            }
            ImageOutcome::Skipped(skipped) => self.skipped_images.push(skipped),
        }
    }

    pub fn print_summary(&self) {
        log::info!("=== Export Summary ===");
        log::info!("Train images: {}", self.train);
        log::info!("Valid images: {}", self.valid);
        log::info!("Boxes written: {}", self.boxes_written);
        log::info!("Image size: {0}x{0}", self.target_size);
        log::info!("Output directory: {}", self.output_dir);

        if !self.skipped_images.is_empty() {
            log::warn!("Skipped images: {}", self.skipped_images.len());
            for skipped in &self.skipped_images {
                log::warn!("  {} ({}): {}", skipped.filename, skipped.partition, skipped.reason);
            }
        }
        if !self.dropped_boxes.is_empty() {
            log::warn!("Dropped boxes: {}", self.dropped_boxes.len());
        }
    }
}

impl fmt::Display for ExportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dataset split (train: {}, valid: {})\nimage size: {}x{}\noutput directory: {}\ndescriptor: {}",
            self.train, self.valid, self.target_size, self.target_size, self.output_dir, self.descriptor
        )?;
        if !self.skipped_images.is_empty() || !self.dropped_boxes.is_empty() {
            write!(
                f,
                "\nskipped images: {}, dropped boxes: {}",
                self.skipped_images.len(),
                self.dropped_boxes.len()
            )?;
        }
        Ok(())
    }
}
