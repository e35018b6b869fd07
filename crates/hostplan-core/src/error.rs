//! Error types for loading the input models.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for model loading.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while reading one of the input models.
///
/// All of these abort the planning run: a partially loaded model never
/// produces a partial plan.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("service {0} appears more than once in the candidate model")]
    DuplicateService(String),
}
