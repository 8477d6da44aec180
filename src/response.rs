//! Structured outcome of an export run, as handed to the boundary layer.

use serde::Serialize;
use std::fmt;

use crate::error::ExportError;
use crate::types::ExportSummary;

/// Stage of the export state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStage {
    Configuring,
    Collecting,
    Splitting,
    Transforming,
    Writing,
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportStage::Configuring => "configuring",
            ExportStage::Collecting => "collecting",
            ExportStage::Splitting => "splitting",
            ExportStage::Transforming => "transforming",
            ExportStage::Writing => "writing",
        };
        f.write_str(name)
    }
}

/// A fatal error together with the stage it stopped the run in
#[derive(Debug)]
pub struct ExportFailure {
    pub stage: ExportStage,
    pub error: ExportError,
}

impl fmt::Display for ExportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "export failed while {}: {}", self.stage, self.error)
    }
}

impl std::error::Error for ExportFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExportResponse {
    Success {
        message: String,
        summary: ExportSummary,
    },
    Error {
        stage: ExportStage,
        kind: &'static str,
        message: String,
    },
}

impl ExportResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, ExportResponse::Success { .. })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            format!("{{\"status\":\"error\",\"kind\":\"serialize\",\"message\":\"{}\"}}", e)
        })
    }
}

impl From<Result<ExportSummary, ExportFailure>> for ExportResponse {
    fn from(result: Result<ExportSummary, ExportFailure>) -> Self {
        match result {
            Ok(summary) => ExportResponse::Success {
                message: summary.to_string(),
                summary,
            },
            Err(failure) => ExportResponse::Error {
                stage: failure.stage,
                kind: failure.error.kind(),
                message: failure.error.to_string(),
            },
        }
    }
}
