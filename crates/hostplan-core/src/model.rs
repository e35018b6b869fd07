//! Loading of the services and infrastructure models.
//!
//! The models arrive as JSON arrays of `{ "name", "properties" }` records,
//! produced by an upstream parser.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{ModelError, ModelResult};
use crate::types::{Service, Target};

/// Deserialize a JSON document, labelling parse errors with `what`.
pub fn parse_json<T: DeserializeOwned>(content: &str, what: &str) -> ModelResult<T> {
    serde_json::from_str(content).map_err(|source| ModelError::Parse {
        what: what.to_string(),
        source,
    })
}

/// Read and deserialize a JSON file.
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> ModelResult<T> {
    let content = std::fs::read_to_string(path).map_err(|source| ModelError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_json(&content, &path.display().to_string())
}

pub fn load_services(path: &Path) -> ModelResult<Vec<Service>> {
    load_json_file(path)
}

pub fn load_targets(path: &Path) -> ModelResult<Vec<Target>> {
    load_json_file(path)
}
