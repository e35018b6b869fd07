pub mod config;
pub mod error;
pub mod model;
pub mod types;

pub use config::PlanConfig;
pub use error::{ModelError, ModelResult};
pub use types::*;
