use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{ExportError, ExportResult};

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
                label
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Create a directory and its parents, keeping whatever is already there
pub fn create_output_directory(path: &Path) -> ExportResult<PathBuf> {
    fs::create_dir_all(path).map_err(|e| ExportError::write(path, e))?;
    Ok(path.to_path_buf())
}

/// Create a brand-new directory `<parent>/<name>`, appending `_1`, `_2`, ...
/// when the name is taken. Never reuses an existing directory.
pub fn create_unique_directory(parent: &Path, name: &str) -> ExportResult<PathBuf> {
    create_output_directory(parent)?;

    let mut attempt = 0usize;
    loop {
        let candidate = if attempt == 0 {
            parent.join(name)
        } else {
            parent.join(format!("{}_{}", name, attempt))
        };
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                log::warn!("Directory {:?} already exists, trying the next name", candidate);
                attempt += 1;
            }
            Err(e) => return Err(ExportError::write(candidate, e)),
        }
    }
}

/// Path written as the dataset root in the descriptor.
///
/// Relative paths are already anchored at the invocation directory and are kept
/// as they are; absolute paths below the current directory are made relative.
pub fn descriptor_root(run_dir: &Path) -> String {
    let root = if run_dir.is_relative() {
        run_dir.to_path_buf()
    } else {
        std::env::current_dir()
            .ok()
            .and_then(|cwd| run_dir.strip_prefix(cwd).ok().map(Path::to_path_buf))
            .unwrap_or_else(|| run_dir.to_path_buf())
    };
    root.to_string_lossy().replace('\\', "/")
}
