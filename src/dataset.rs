use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::validate_ratio_value;
use crate::error::ExportResult;
use crate::types::{AnnotatedImage, DatasetSplit};

/// Split the images into training and validation sets
///
/// The images are shuffled with `seed`, or with fresh entropy when `None`, and
/// the first `floor(len * ratio)` go to train.
pub fn partition(
    mut images: Vec<AnnotatedImage>,
    ratio: f64,
    seed: Option<u64>,
) -> ExportResult<DatasetSplit> {
    validate_ratio_value(ratio)?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    images.shuffle(&mut rng);

    let train_count = train_count(images.len(), ratio);
    let valid = images.split_off(train_count);

    info!(
        "Split {} images into train: {}, valid: {}",
        images.len() + valid.len(),
        images.len(),
        valid.len()
    );

    Ok(DatasetSplit {
        train: images,
        valid,
    })
}

/// Number of training images for a dataset of `len` images
pub fn train_count(len: usize, ratio: f64) -> usize {
    ((len as f64 * ratio).floor() as usize).min(len)
}
