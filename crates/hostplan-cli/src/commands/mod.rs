pub mod divide;
pub mod index;
pub mod ports;

use std::path::Path;

use anyhow::Context;
use hostplan_core::PlanConfig;

/// Load the config file if one was given, otherwise use defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<PlanConfig> {
    match path {
        Some(path) => PlanConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(PlanConfig::default()),
    }
}
