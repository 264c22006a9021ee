use std::path::PathBuf;

use thiserror::Error;

/// Terminal pipeline conditions reported to the operator.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("File not found: {0:?}")]
    NotFound(PathBuf),

    #[error("Unsupported file type: {0:?} (supported: .html, .htm, .pdf)")]
    UnsupportedFormat(String),

    #[error("{} validation error(s)", .0.len())]
    Validation(Vec<String>),
}
