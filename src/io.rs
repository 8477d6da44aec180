use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::JPEG_QUALITY;
use crate::error::{ExportError, ExportResult};
use crate::types::{BoundingBox, Partition};
use crate::utils::{create_output_directory, create_unique_directory, descriptor_root};

// Paths to the output directories of one export run
#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub run_dir: PathBuf,
    pub train_images_dir: PathBuf,
    pub valid_images_dir: PathBuf,
    pub train_labels_dir: PathBuf,
    pub valid_labels_dir: PathBuf,
}

impl OutputDirs {
    pub fn images_dir(&self, partition: Partition) -> &Path {
        match partition {
            Partition::Train => &self.train_images_dir,
            Partition::Valid => &self.valid_images_dir,
        }
    }

    pub fn labels_dir(&self, partition: Partition) -> &Path {
        match partition {
            Partition::Train => &self.train_labels_dir,
            Partition::Valid => &self.valid_labels_dir,
        }
    }

    /// Name of the run directory, e.g. `output_20250101_120000`
    pub fn run_name(&self) -> String {
        self.run_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Set up a fresh `output_<timestamp>` tree under `output_root`
pub fn setup_output_directories(output_root: &Path, timestamp: &str) -> ExportResult<OutputDirs> {
    let run_dir = create_unique_directory(output_root, &format!("output_{}", timestamp))?;
    let images_dir = run_dir.join("images");
    let labels_dir = run_dir.join("labels");

    Ok(OutputDirs {
        train_images_dir: create_output_directory(&images_dir.join(Partition::Train.dir_name()))?,
        valid_images_dir: create_output_directory(&images_dir.join(Partition::Valid.dir_name()))?,
        train_labels_dir: create_output_directory(&labels_dir.join(Partition::Train.dir_name()))?,
        valid_labels_dir: create_output_directory(&labels_dir.join(Partition::Valid.dir_name()))?,
        run_dir,
    })
}

/// Encode the canvas to `path`, picking the format from the extension.
///
/// JPEG, and any extension without an available encoder, is written as JPEG at
/// a fixed quality.
pub fn save_canvas(canvas: &RgbImage, path: &Path) -> ExportResult<()> {
    let encode_err = |source| ExportError::Encode {
        path: path.to_path_buf(),
        source,
    };

    match ImageFormat::from_path(path) {
        Ok(format) if format != ImageFormat::Jpeg && format.writing_enabled() => {
            canvas.save_with_format(path, format).map_err(encode_err)
        }
        _ => {
            let file = File::create(path).map_err(|e| ExportError::write(path, e))?;
            let mut writer = BufWriter::new(file);
            let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
            canvas.write_with_encoder(encoder).map_err(encode_err)?;
            writer.flush().map_err(|e| ExportError::write(path, e))
        }
    }
}

/// Write one YOLO line per box to `path`
pub fn write_label_file(path: &Path, boxes: &[BoundingBox]) -> ExportResult<()> {
    let file = File::create(path).map_err(|e| ExportError::write(path, e))?;
    let mut writer = BufWriter::new(file);
    for bbox in boxes {
        writer
            .write_all(bbox.to_yolo_line().as_bytes())
            .map_err(|e| ExportError::write(path, e))?;
    }
    writer.flush().map_err(|e| ExportError::write(path, e))
}

/// The dataset.yaml manifest read by the training pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDescriptor {
    pub root: String,
    pub train: String,
    pub val: String,
    pub test: Option<String>,
    pub names: BTreeMap<u32, String>,
}

impl DatasetDescriptor {
    pub fn new(root: String, names: BTreeMap<u32, String>) -> Self {
        Self {
            root,
            train: format!("images/{}", Partition::Train.dir_name()),
            val: format!("images/{}", Partition::Valid.dir_name()),
            test: None,
            names,
        }
    }

    pub fn to_yaml(&self) -> String {
        let mut yaml_content = String::from(
            "# Train/val/test sets as 1) dir: path/to/imgs, 2) file: path/to/imgs.txt, or 3) list: [path/to/imgs1, path/to/imgs2, ..]\n",
        );
        yaml_content.push_str(&format!("path: {} # dataset root dir\n", self.root));
        yaml_content.push_str(&format!("train: {} # train images\n", self.train));
        yaml_content.push_str(&format!("val: {} # val images\n", self.val));
        match &self.test {
            Some(test) => yaml_content.push_str(&format!("test: {} # test images (optional)\n", test)),
            None => yaml_content.push_str("test: # test images (optional)\n"),
        }
        yaml_content.push_str("\n# Classes\nnames:\n");

        // BTreeMap iterates in ascending id order
        for (id, name) in &self.names {
            yaml_content.push_str(&format!("  {}: {}\n", id, yaml_scalar(name)));
        }
        yaml_content
    }
}

// Label names are free text; quote any that YAML would not read back verbatim
fn yaml_scalar(name: &str) -> String {
    if !needs_quoting(name) {
        return name.to_string();
    }
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for c in name.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => quoted.push_str(&format!("\\u{:04x}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn needs_quoting(name: &str) -> bool {
    const INDICATORS: &[char] = &[
        '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@', '`',
    ];
    const RESERVED: &[&str] = &["~", "null", "true", "false", "yes", "no", "on", "off"];

    name.is_empty()
        || name.trim() != name
        || name.starts_with(INDICATORS)
        || name.ends_with(':')
        || name.contains(": ")
        || name.contains(" #")
        || name.chars().any(|c| c.is_control() || c == '\\' || c == '"')
        || RESERVED.contains(&name.to_ascii_lowercase().as_str())
        || name.parse::<f64>().is_ok()
}

/// File name of the descriptor for a run
pub fn descriptor_file_name(target_size: u32, timestamp: &str) -> String {
    format!("dataset_{0}x{0}_{1}.yaml", target_size, timestamp)
}

/// Create the dataset yaml file inside the run directory
pub fn create_dataset_yaml(
    output_dirs: &OutputDirs,
    file_name: &str,
    labels: &BTreeMap<u32, String>,
) -> ExportResult<DatasetDescriptor> {
    let descriptor = DatasetDescriptor::new(descriptor_root(&output_dirs.run_dir), labels.clone());
    let path = output_dirs.run_dir.join(file_name);

    let file = File::create(&path).map_err(|e| ExportError::write(&path, e))?;
    let mut dataset_yaml = BufWriter::new(file);
    dataset_yaml
        .write_all(descriptor.to_yaml().as_bytes())
        .and_then(|_| dataset_yaml.flush())
        .map_err(|e| ExportError::write(&path, e))?;

    Ok(descriptor)
}
