use chrono::Local;
use log::info;

use crate::config::{Args, ExportConfig};
use crate::conversion::process_images_in_parallel;
use crate::dataset::partition;
use crate::error::{ExportError, ExportResult};
use crate::io::{create_dataset_yaml, descriptor_file_name, setup_output_directories};
use crate::response::{ExportFailure, ExportResponse, ExportStage};
use crate::store::{read_snapshot, AnnotationStore, SnapshotFile};
use crate::types::{ExportSummary, Partition};
use crate::utils::create_progress_bar;

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

fn failed(stage: ExportStage) -> impl Fn(ExportError) -> ExportFailure {
    move |error| ExportFailure { stage, error }
}

/// Main export pipeline
///
/// Collecting -> Splitting -> Transforming -> Writing -> Done. Undecodable
/// images are skipped and reported in the summary; any other error stops the
/// run at the stage it happened in. Output written before a failure is left
/// on disk.
pub fn run_export(
    store: &dyn AnnotationStore,
    config: &ExportConfig,
) -> Result<ExportSummary, ExportFailure> {
    let options = &config.options;

    info!("Collecting annotated images...");
    let snapshot = read_snapshot(store).map_err(failed(ExportStage::Collecting))?;
    info!(
        "Collected {} annotated images ({} labels).",
        snapshot.images.len(),
        snapshot.labels.len()
    );

    info!("Splitting dataset with ratio {}...", options.split_ratio);
    let split = partition(snapshot.images, options.split_ratio, options.seed)
        .map_err(failed(ExportStage::Splitting))?;

    let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    let output_dirs = setup_output_directories(&config.output_root, &timestamp)
        .map_err(failed(ExportStage::Writing))?;
    let descriptor_name = descriptor_file_name(options.target_size, &timestamp);

    let mut summary = ExportSummary::new(
        options.target_size,
        output_dirs.run_name(),
        descriptor_name.clone(),
    );
    summary.dropped_boxes = snapshot.dropped_boxes;

    info!(
        "Letterboxing images to {0}x{0} into {1}...",
        options.target_size,
        output_dirs.run_dir.display()
    );
    for part in Partition::ALL {
        let images = split.images(part);
        if images.is_empty() {
            continue;
        }
        let pb = create_progress_bar(images.len() as u64, part.progress_label());
        let outcomes = process_images_in_parallel(
            part,
            images,
            &config.images_dir,
            &output_dirs,
            options.target_size,
            &pb,
        )
        .map_err(failed(ExportStage::Transforming))?;
        pb.finish_with_message(format!("{} processing complete", part.progress_label()));

        for outcome in outcomes {
            summary.record(part, outcome);
        }
    }

    info!("Creating {}...", descriptor_name);
    create_dataset_yaml(&output_dirs, &descriptor_name, &snapshot.labels)
        .map_err(failed(ExportStage::Writing))?;

    info!("Export completed successfully.");
    summary.print_summary();
    Ok(summary)
}

/// Run the pipeline, discarding the failing stage
pub fn export_dataset(store: &dyn AnnotationStore, config: &ExportConfig) -> ExportResult<ExportSummary> {
    run_export(store, config).map_err(|failure| failure.error)
}

/// Run the pipeline and wrap the outcome for the caller
pub fn export_response(store: &dyn AnnotationStore, config: &ExportConfig) -> ExportResponse {
    ExportResponse::from(run_export(store, config))
}

/// Validate the command line, open the snapshot it names and run the export.
///
/// Bad options fail in the configuring stage, before the snapshot is read.
pub fn export_from_args(args: &Args) -> ExportResponse {
    let outcome = args
        .export_config()
        .map_err(failed(ExportStage::Configuring))
        .and_then(|config| {
            let store = SnapshotFile::open(&args.snapshot).map_err(failed(ExportStage::Collecting))?;
            run_export(&store, &config)
        });
    ExportResponse::from(outcome)
}
