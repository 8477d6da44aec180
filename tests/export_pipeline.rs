use image::{GenericImageView, GrayImage, ImageFormat, ImageReader, Luma, Rgb, RgbImage};
use serde_json::json;
use std::fs;
use std::path::Path;

use yolo_export::store::{BoxRecord, ImageRecord, LabelRecord};
use yolo_export::{
    export_dataset, export_response, run_export, ExportConfig, ExportError, ExportOptions,
    ExportStage, SnapshotFile,
};

fn box_record(label_id: u32, cx: f64, cy: f64, w: f64, h: f64) -> BoxRecord {
    BoxRecord {
        label_id: json!(label_id),
        x_center: json!(cx),
        y_center: json!(cy),
        width: json!(w),
        height: json!(h),
    }
}

fn image_record(filename: &str, width: u32, height: u32, boxes: Vec<BoxRecord>) -> ImageRecord {
    ImageRecord {
        filename: filename.to_string(),
        width,
        height,
        is_annotated: true,
        annotations: boxes,
    }
}

fn labels() -> Vec<LabelRecord> {
    vec![
        LabelRecord {
            id: 2,
            name: "dog".to_string(),
        },
        LabelRecord {
            id: 1,
            name: "cat".to_string(),
        },
    ]
}

fn write_rgb(dir: &Path, name: &str, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, Rgb([30, 120, 200]))
        .save(dir.join(name))
        .unwrap();
}

fn config(root: &Path, ratio: f64, target_size: u32) -> ExportConfig {
    ExportConfig::new(root.join("base_images"), root.join("output"))
        .with_options(ExportOptions::new(ratio, target_size, Some(42)).unwrap())
}

fn count_files(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

#[test]
fn test_export_ten_images() {
    let temp_dir = tempfile::tempdir().unwrap();
    let images_dir = temp_dir.path().join("base_images");
    fs::create_dir_all(&images_dir).unwrap();

    let mut records = Vec::new();
    for i in 0..10 {
        let name = format!("img{}.jpg", i);
        write_rgb(&images_dir, &name, 120, 80);
        records.push(image_record(
            &name,
            120,
            80,
            vec![box_record(1, 0.5, 0.5, 0.2, 0.2), box_record(2, 0.1, 0.9, 0.1, 0.1)],
        ));
    }
    let store = SnapshotFile {
        labels: labels(),
        images: records,
    };

    let summary = export_dataset(&store, &config(temp_dir.path(), 0.8, 64)).unwrap();

    assert_eq!(summary.train, 8);
    assert_eq!(summary.valid, 2);
    assert_eq!(summary.target_size, 64);
    assert_eq!(summary.boxes_written, 20);
    assert!(summary.skipped_images.is_empty());
    assert!(summary.output_dir.starts_with("output_"));

    let run_dir = temp_dir.path().join("output").join(&summary.output_dir);
    assert_eq!(count_files(&run_dir.join("images/train")), 8);
    assert_eq!(count_files(&run_dir.join("images/valid")), 2);
    assert_eq!(count_files(&run_dir.join("labels/train")), 8);
    assert_eq!(count_files(&run_dir.join("labels/valid")), 2);

    for entry in fs::read_dir(run_dir.join("images/train")).unwrap() {
        let path = entry.unwrap().path();
        let exported = image::open(&path).unwrap();
        assert_eq!(exported.dimensions(), (64, 64));

        let label_path = run_dir
            .join("labels/train")
            .join(path.file_stem().unwrap())
            .with_extension("txt");
        let labels = fs::read_to_string(label_path).unwrap();
        assert_eq!(labels.lines().count(), 2);
    }

    assert!(summary.descriptor.starts_with("dataset_64x64_"));
    let yaml = fs::read_to_string(run_dir.join(&summary.descriptor)).unwrap();
    assert!(yaml.contains(&format!("path: {} # dataset root dir", run_dir.to_string_lossy())));
    assert!(yaml.contains("train: images/train"));
    assert!(yaml.contains("val: images/valid"));
    assert!(yaml.ends_with("names:\n  1: cat\n  2: dog\n"));
}

#[test]
fn test_export_remaps_labels() {
    let temp_dir = tempfile::tempdir().unwrap();
    let images_dir = temp_dir.path().join("base_images");
    fs::create_dir_all(&images_dir).unwrap();
    write_rgb(&images_dir, "wide.png", 1000, 500);

    let store = SnapshotFile {
        labels: labels(),
        images: vec![image_record(
            "wide.png",
            1000,
            500,
            vec![
                box_record(1, 0.5, 0.5, 0.2, 0.2),
                box_record(2, 0.95, 0.5, 0.3, 2.0),
            ],
        )],
    };

    let summary = export_dataset(&store, &config(temp_dir.path(), 1.0, 640)).unwrap();
    assert_eq!(summary.train, 1);
    assert_eq!(summary.valid, 0);

    let run_dir = temp_dir.path().join("output").join(&summary.output_dir);
    let labels = fs::read_to_string(run_dir.join("labels/train/wide.txt")).unwrap();
    assert_eq!(
        labels,
        "1 0.500000 0.250000 0.200000 0.100000\n2 0.950000 0.250000 0.300000 1.000000\n"
    );

    // PNG stays lossless: the padding below the resized image is pure white
    let exported = image::open(run_dir.join("images/train/wide.png"))
        .unwrap()
        .to_rgb8();
    assert_eq!(exported.dimensions(), (640, 640));
    assert_eq!(*exported.get_pixel(320, 330), Rgb([255, 255, 255]));
    assert_eq!(*exported.get_pixel(639, 639), Rgb([255, 255, 255]));
    let inside = exported.get_pixel(320, 160);
    assert!(inside[0] < 40 && inside[2] > 190, "{:?}", inside);
}

#[test]
fn test_export_skips_undecodable_image() {
    let temp_dir = tempfile::tempdir().unwrap();
    let images_dir = temp_dir.path().join("base_images");
    fs::create_dir_all(&images_dir).unwrap();

    let mut records = Vec::new();
    for i in 0..4 {
        let name = format!("ok{}.jpg", i);
        write_rgb(&images_dir, &name, 50, 100);
        records.push(image_record(&name, 50, 100, vec![box_record(1, 0.5, 0.5, 0.5, 0.5)]));
    }
    fs::write(images_dir.join("broken.jpg"), b"definitely not a jpeg").unwrap();
    records.push(image_record("broken.jpg", 50, 100, vec![box_record(1, 0.5, 0.5, 0.5, 0.5)]));

    let store = SnapshotFile {
        labels: labels(),
        images: records,
    };

    let response = export_response(&store, &config(temp_dir.path(), 0.8, 32));
    assert!(response.is_success());

    let summary = export_dataset(&store, &config(temp_dir.path(), 0.8, 32)).unwrap();
    assert_eq!(summary.train + summary.valid, 4);
    assert_eq!(summary.skipped_images.len(), 1);
    assert_eq!(summary.skipped_images[0].filename, "broken.jpg");

    let run_dir = temp_dir.path().join("output").join(&summary.output_dir);
    let exported = count_files(&run_dir.join("images/train")) + count_files(&run_dir.join("images/valid"));
    assert_eq!(exported, 4);
    assert!(!run_dir.join("labels/train/broken.txt").exists());
    assert!(!run_dir.join("labels/valid/broken.txt").exists());
}

#[test]
fn test_export_missing_source_is_skipped() {
    let temp_dir = tempfile::tempdir().unwrap();
    let images_dir = temp_dir.path().join("base_images");
    fs::create_dir_all(&images_dir).unwrap();
    write_rgb(&images_dir, "present.jpg", 40, 40);

    let store = SnapshotFile {
        labels: labels(),
        images: vec![
            image_record("present.jpg", 40, 40, vec![]),
            image_record("absent.jpg", 40, 40, vec![]),
        ],
    };

    let summary = export_dataset(&store, &config(temp_dir.path(), 1.0, 32)).unwrap();
    assert_eq!(summary.train, 1);
    assert_eq!(summary.skipped_images.len(), 1);
    assert_eq!(summary.skipped_images[0].filename, "absent.jpg");

    // an image without boxes still gets an (empty) label file
    let run_dir = temp_dir.path().join("output").join(&summary.output_dir);
    assert_eq!(
        fs::read_to_string(run_dir.join("labels/train/present.txt")).unwrap(),
        ""
    );
}

#[test]
fn test_export_grayscale_source() {
    let temp_dir = tempfile::tempdir().unwrap();
    let images_dir = temp_dir.path().join("base_images");
    fs::create_dir_all(&images_dir).unwrap();
    GrayImage::from_pixel(80, 40, Luma([90]))
        .save(images_dir.join("gray.png"))
        .unwrap();

    let store = SnapshotFile {
        labels: labels(),
        images: vec![image_record("gray.png", 80, 40, vec![box_record(1, 0.5, 0.5, 1.0, 1.0)])],
    };

    let summary = export_dataset(&store, &config(temp_dir.path(), 1.0, 64)).unwrap();
    let run_dir = temp_dir.path().join("output").join(&summary.output_dir);

    let exported = image::open(run_dir.join("images/train/gray.png")).unwrap();
    assert_eq!(exported.color(), image::ColorType::Rgb8);
    assert_eq!(exported.dimensions(), (64, 64));
}

#[test]
fn test_export_detects_format_from_contents() {
    let temp_dir = tempfile::tempdir().unwrap();
    let images_dir = temp_dir.path().join("base_images");
    fs::create_dir_all(&images_dir).unwrap();
    // PNG bytes behind a .jpg name, and PNG bytes with no extension at all
    for name in ["photo.jpg", "noext"] {
        RgbImage::from_pixel(40, 20, Rgb([10, 200, 60]))
            .save_with_format(images_dir.join(name), ImageFormat::Png)
            .unwrap();
    }

    let store = SnapshotFile {
        labels: labels(),
        images: vec![
            image_record("photo.jpg", 40, 20, vec![box_record(1, 0.5, 0.5, 0.5, 0.5)]),
            image_record("noext", 40, 20, vec![box_record(2, 0.5, 0.5, 1.0, 1.0)]),
        ],
    };

    let summary = export_dataset(&store, &config(temp_dir.path(), 1.0, 64)).unwrap();
    assert_eq!(summary.train, 2);
    assert_eq!(summary.valid, 0);
    assert!(summary.skipped_images.is_empty());

    let run_dir = temp_dir.path().join("output").join(&summary.output_dir);
    for name in ["photo.jpg", "noext"] {
        let reader = ImageReader::open(run_dir.join("images/train").join(name))
            .unwrap()
            .with_guessed_format()
            .unwrap();
        assert_eq!(reader.format(), Some(ImageFormat::Jpeg));
        assert_eq!(reader.decode().unwrap().dimensions(), (64, 64));
    }
    assert!(run_dir.join("labels/train/photo.txt").is_file());
    assert!(run_dir.join("labels/train/noext.txt").is_file());
}

#[test]
fn test_export_empty_dataset_writes_nothing() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut unannotated = image_record("a.jpg", 10, 10, vec![]);
    unannotated.is_annotated = false;
    let store = SnapshotFile {
        labels: labels(),
        images: vec![unannotated],
    };
    let config = config(temp_dir.path(), 0.8, 640);

    let failure = run_export(&store, &config).unwrap_err();
    assert_eq!(failure.stage, ExportStage::Collecting);
    assert!(matches!(failure.error, ExportError::EmptyDataset));
    assert!(!config.output_root.exists());

    let response = export_response(&store, &config);
    assert!(!response.is_success());
    let body: serde_json::Value = serde_json::from_str(&response.to_json()).unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["kind"], "empty_dataset");
    assert_eq!(body["stage"], "collecting");
}

#[test]
fn test_export_runs_never_collide() {
    let temp_dir = tempfile::tempdir().unwrap();
    let images_dir = temp_dir.path().join("base_images");
    fs::create_dir_all(&images_dir).unwrap();
    write_rgb(&images_dir, "a.jpg", 20, 20);

    let store = SnapshotFile {
        labels: labels(),
        images: vec![image_record("a.jpg", 20, 20, vec![box_record(1, 0.5, 0.5, 0.5, 0.5)])],
    };
    let config = config(temp_dir.path(), 0.8, 32);

    let first = export_dataset(&store, &config).unwrap();
    let second = export_dataset(&store, &config).unwrap();

    assert_ne!(first.output_dir, second.output_dir);
    assert_eq!(count_files(&config.output_root), 2);
}

#[test]
fn test_export_write_failure_is_fatal() {
    let temp_dir = tempfile::tempdir().unwrap();
    let images_dir = temp_dir.path().join("base_images");
    fs::create_dir_all(&images_dir).unwrap();
    write_rgb(&images_dir, "a.jpg", 20, 20);

    // the output root is a regular file, so no directory can be created under it
    fs::write(temp_dir.path().join("output"), b"").unwrap();

    let store = SnapshotFile {
        labels: labels(),
        images: vec![image_record("a.jpg", 20, 20, vec![])],
    };

    let failure = run_export(&store, &config(temp_dir.path(), 0.8, 32)).unwrap_err();
    assert_eq!(failure.stage, ExportStage::Writing);
    assert!(matches!(failure.error, ExportError::Write { .. }));
}

#[test]
fn test_export_response_success_payload() {
    let temp_dir = tempfile::tempdir().unwrap();
    let images_dir = temp_dir.path().join("base_images");
    fs::create_dir_all(&images_dir).unwrap();
    write_rgb(&images_dir, "a.jpg", 20, 20);
    write_rgb(&images_dir, "b.jpg", 20, 20);

    let store = SnapshotFile::from_json_str(
        &json!({
            "labels": [{"id": 1, "name": "cat"}],
            "images": [
                {"filename": "a.jpg", "width": 20, "height": 20, "is_annotated": true,
                 "annotations": [{"label_id": 1, "x_center": 0.5, "y_center": 0.5, "width": 0.5, "height": 0.5},
                                 {"label_id": 1, "x_center": "bad", "y_center": 0.5, "width": 0.5, "height": 0.5}]},
                {"filename": "b.jpg", "width": 20, "height": 20, "is_annotated": true}
            ]
        })
        .to_string(),
    )
    .unwrap();

    let response = export_response(&store, &config(temp_dir.path(), 0.5, 32));
    let body: serde_json::Value = serde_json::from_str(&response.to_json()).unwrap();

    assert_eq!(body["status"], "success");
    assert_eq!(body["summary"]["train"], 1);
    assert_eq!(body["summary"]["valid"], 1);
    assert_eq!(body["summary"]["target_size"], 32);
    assert_eq!(body["summary"]["dropped_boxes"].as_array().unwrap().len(), 1);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("train: 1, valid: 1"));
}
