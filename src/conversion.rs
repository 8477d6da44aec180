use image::{DynamicImage, GenericImageView, ImageError, ImageReader, ImageResult};
use indicatif::ProgressBar;
use log::{debug, warn};
use rayon::prelude::*;
use std::path::Path;

use crate::error::{ExportError, ExportResult};
use crate::io::{save_canvas, write_label_file, OutputDirs};
use crate::letterbox::{render_image, LetterboxGeometry};
use crate::remap::remap_box;
use crate::types::{AnnotatedImage, BoundingBox, ImageOutcome, Partition, SkippedImage};

/// Process one partition's images in parallel.
///
/// Undecodable images come back as [`ImageOutcome::Skipped`]; the first write
/// failure stops the partition and is returned as the error.
pub fn process_images_in_parallel(
    partition: Partition,
    images: &[AnnotatedImage],
    source_dir: &Path,
    output_dirs: &OutputDirs,
    target_size: u32,
    pb: &ProgressBar,
) -> ExportResult<Vec<ImageOutcome>> {
    images
        .par_iter()
        .map(|image| {
            let outcome = process_image(partition, image, source_dir, output_dirs, target_size);
            pb.inc(1);
            outcome
        })
        .collect()
}

/// Letterbox a single image, write it, and write its remapped label file
pub fn process_image(
    partition: Partition,
    image: &AnnotatedImage,
    source_dir: &Path,
    output_dirs: &OutputDirs,
    target_size: u32,
) -> ExportResult<ImageOutcome> {
    let source_path = source_dir.join(&image.filename);

    let decoded = match decode_image(&source_path) {
        Ok(decoded) => decoded,
        Err(source) => {
            return Ok(skip(
                partition,
                image,
                ExportError::ImageDecode {
                    path: source_path,
                    source,
                },
            ))
        }
    };

    // Geometry follows the decoded pixels; the stored size is informational
    let (orig_width, orig_height) = decoded.dimensions();
    if (orig_width, orig_height) != (image.width, image.height) {
        warn!(
            "{}: stored size {}x{} differs from decoded size {}x{}",
            image.filename, image.width, image.height, orig_width, orig_height
        );
    }

    let geometry = match LetterboxGeometry::compute(orig_width, orig_height, target_size) {
        Ok(geometry) => geometry,
        Err(e) if e.is_recoverable() => return Ok(skip(partition, image, e)),
        Err(e) => return Err(e),
    };

    let sanitized_name = sanitize_filename::sanitize(&image.filename);
    let image_output_path = output_dirs.images_dir(partition).join(&sanitized_name);
    let canvas = render_image(&decoded, &geometry);
    save_canvas(&canvas, &image_output_path)?;

    let boxes: Vec<BoundingBox> = image
        .boxes
        .iter()
        .map(|bbox| remap_box(bbox, orig_width, orig_height, &geometry))
        .collect();

    let label_output_path = output_dirs
        .labels_dir(partition)
        .join(&sanitized_name)
        .with_extension("txt");
    write_label_file(&label_output_path, &boxes)?;

    debug!(
        "{} -> {} ({}x{} at scale {:.4}, {} boxes)",
        image.filename,
        image_output_path.display(),
        geometry.resized_width,
        geometry.resized_height,
        geometry.scale,
        boxes.len()
    );

    Ok(ImageOutcome::Exported {
        boxes_written: boxes.len(),
    })
}

// Sniff the format from the file's leading bytes; the extension is only a fallback
fn decode_image(path: &Path) -> ImageResult<DynamicImage> {
    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(ImageError::IoError)?
        .decode()
}

fn skip(partition: Partition, image: &AnnotatedImage, e: ExportError) -> ImageOutcome {
    warn!("Skipping {}: {}", image.filename, e);
    ImageOutcome::Skipped(SkippedImage {
        filename: image.filename.clone(),
        partition,
        reason: e.to_string(),
    })
}
