use clap::Parser;

use log::{error, info};
use std::process::ExitCode;

use yolo_export::{export_from_args, Args, ExportResponse};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    info!("Starting the export process...");

    let response = export_from_args(&args);

    println!("{}", response.to_json());

    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        if let ExportResponse::Error { message, .. } = &response {
            error!("Export failed: {}", message);
        }
        ExitCode::FAILURE
    }
}
