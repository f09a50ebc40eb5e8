//! Error types for ingest and output.
//!
//! Engine stages never fail the batch: traversal defects are counted in
//! [`TraversalStats`](crate::TraversalStats), rejected and unstructurable
//! records are reported in [`PipelineReport`](crate::PipelineReport).
//! Only the I/O edges return [`PipelineError`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid row at line {line}: {reason}")]
    InvalidRow { line: u64, reason: String },

    #[error("no CSV files found under {0:?}")]
    NoInputFiles(PathBuf),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
