use clap::Parser;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ExportError, ExportResult};

pub const DEFAULT_SPLIT_RATIO: f64 = 0.8;
pub const DEFAULT_TARGET_SIZE: u32 = 640;
/// Largest accepted side length; the canvas is allocated as `size * size` RGB pixels
pub const MAX_TARGET_SIZE: u32 = 8192;
pub const JPEG_QUALITY: u8 = 95;

/// Command-line arguments for exporting annotations as a YOLO dataset.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Args {
    /// JSON snapshot of the annotation store
    #[arg(short = 's', long = "snapshot")]
    pub snapshot: PathBuf,

    /// Directory holding the source images
    #[arg(short = 'i', long = "images_dir", default_value = "base_images")]
    pub images_dir: PathBuf,

    /// Directory under which each run creates its own output folder
    #[arg(short = 'o', long = "output_dir", default_value = "output")]
    pub output_dir: PathBuf,

    /// Proportion of the dataset to use for training
    #[arg(long = "split_ratio", default_value_t = DEFAULT_SPLIT_RATIO, value_parser = validate_ratio)]
    pub split_ratio: f64,

    /// Side length of the square output images
    #[arg(long = "image_size", default_value_t = DEFAULT_TARGET_SIZE, value_parser = validate_target_size)]
    pub image_size: u32,

    /// Seed for random shuffling; a fresh split is drawn when omitted
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// JSON export request, e.g. '{"split_ratio": 0.8, "image_size": 640}'.
    /// Replaces --split_ratio, --image_size and --seed when given.
    #[arg(long = "request")]
    pub request: Option<String>,
}

impl Args {
    /// Build the run configuration, validating the request payload if any
    pub fn export_config(&self) -> ExportResult<ExportConfig> {
        let options = match &self.request {
            Some(json) => ExportOptions::from_request_json(json)?,
            None => ExportOptions::new(self.split_ratio, self.image_size, self.seed)?,
        };
        Ok(ExportConfig {
            options,
            images_dir: self.images_dir.clone(),
            output_root: self.output_dir.clone(),
        })
    }
}

// Validate that the ratio is in (0, 1]
fn validate_ratio(s: &str) -> Result<f64, String> {
    match f64::from_str(s) {
        Ok(val) if validate_ratio_value(val).is_ok() => Ok(val),
        _ => Err("SPLIT_RATIO must be greater than 0.0 and at most 1.0".to_string()),
    }
}

// Validate that the size is a positive integer no larger than MAX_TARGET_SIZE
fn validate_target_size(s: &str) -> Result<u32, String> {
    match u32::from_str(s) {
        Ok(val) if validate_target_size_value(val).is_ok() => Ok(val),
        _ => Err(format!(
            "IMAGE_SIZE must be a positive integer no larger than {}",
            MAX_TARGET_SIZE
        )),
    }
}

pub(crate) fn validate_target_size_value(size: u32) -> ExportResult<u32> {
    if size > 0 && size <= MAX_TARGET_SIZE {
        Ok(size)
    } else {
        Err(ExportError::InvalidTargetSize {
            value: size.to_string(),
        })
    }
}

pub(crate) fn validate_ratio_value(ratio: f64) -> ExportResult<f64> {
    if ratio > 0.0 && ratio <= 1.0 {
        Ok(ratio)
    } else {
        Err(ExportError::InvalidRatio {
            value: ratio.to_string(),
        })
    }
}

/// Validated per-run export parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    pub split_ratio: f64,
    pub target_size: u32,
    pub seed: Option<u64>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            split_ratio: DEFAULT_SPLIT_RATIO,
            target_size: DEFAULT_TARGET_SIZE,
            seed: None,
        }
    }
}

// Raw request payload; values are checked one by one rather than coerced
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExportRequest {
    #[serde(default)]
    split_ratio: Option<Value>,
    #[serde(default, alias = "target_size")]
    image_size: Option<Value>,
    #[serde(default)]
    seed: Option<Value>,
}

impl ExportOptions {
    pub fn new(split_ratio: f64, target_size: u32, seed: Option<u64>) -> ExportResult<Self> {
        validate_ratio_value(split_ratio)?;
        validate_target_size_value(target_size)?;
        Ok(Self {
            split_ratio,
            target_size,
            seed,
        })
    }

    /// Validate a JSON request payload; absent or null fields take their defaults
    pub fn from_request_json(json: &str) -> ExportResult<Self> {
        let request: ExportRequest = serde_json::from_str(json)
            .map_err(|e| ExportError::InvalidRequest(e.to_string()))?;

        let split_ratio = match request.split_ratio {
            None | Some(Value::Null) => DEFAULT_SPLIT_RATIO,
            Some(value) => value.as_f64().ok_or_else(|| ExportError::InvalidRatio {
                value: value.to_string(),
            })?,
        };

        let target_size = match request.image_size {
            None | Some(Value::Null) => DEFAULT_TARGET_SIZE,
            Some(value) => value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| ExportError::InvalidTargetSize {
                    value: value.to_string(),
                })?,
        };

        let seed = match request.seed {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.as_u64().ok_or_else(|| {
                ExportError::InvalidRequest(format!("seed must be a non-negative integer, got {}", value))
            })?),
        };

        Self::new(split_ratio, target_size, seed)
    }
}

/// Everything one export run needs
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub options: ExportOptions,
    pub images_dir: PathBuf,
    pub output_root: PathBuf,
}

impl ExportConfig {
    pub fn new(images_dir: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            options: ExportOptions::default(),
            images_dir: images_dir.into(),
            output_root: output_root.into(),
        }
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }
}
