//! Error taxonomy for the export pipeline.

use std::path::PathBuf;
use thiserror::Error;

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no annotated images to export")]
    EmptyDataset,

    #[error("split ratio must be a number in (0, 1], got {value}")]
    InvalidRatio { value: String },

    #[error("image size must be a positive integer, got {value}")]
    InvalidTargetSize { value: String },

    #[error("invalid export request: {0}")]
    InvalidRequest(String),

    #[error("failed to read annotation store at {path}: {msg}")]
    Store { path: PathBuf, msg: String },

    #[error("image decode error at {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid image dimensions {width}x{height}")]
    InvalidImageDimensions { width: u32, height: u32 },

    #[error("invalid box #{index} in {filename}: {msg}")]
    InvalidBox {
        filename: String,
        index: usize,
        msg: String,
    },

    #[error("io error at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image encode error at {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl ExportError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Recoverable errors skip a single image or box; everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ImageDecode { .. } | Self::InvalidImageDimensions { .. } | Self::InvalidBox { .. }
        )
    }

    /// Stable slug used in structured responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyDataset => "empty_dataset",
            Self::InvalidRatio { .. } => "invalid_ratio",
            Self::InvalidTargetSize { .. } => "invalid_target_size",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Store { .. } => "store",
            Self::ImageDecode { .. } => "image_decode",
            Self::InvalidImageDimensions { .. } => "invalid_image_dimensions",
            Self::InvalidBox { .. } => "invalid_box",
            Self::Write { .. } => "write",
            Self::Encode { .. } => "encode",
        }
    }
}
