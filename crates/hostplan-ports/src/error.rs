//! Error types for the port allocator.

use thiserror::Error;

use crate::pool::PoolKey;

/// Result type alias for port pool operations.
pub type PortResult<T> = Result<T, PortError>;

/// Errors that can occur while loading, allocating, or persisting ports.
#[derive(Debug, Error)]
pub enum PortError {
    #[error("invalid port range {min}..={max}")]
    InvalidRange { min: u16, max: u16 },

    #[error("port range exhausted in {pool} pool, no port left for {service}")]
    Exhausted { pool: PoolKey, service: String },

    #[error("port {port} reserved for both {first} and {second} in {pool} pool")]
    DuplicatePort {
        pool: PoolKey,
        port: u16,
        first: String,
        second: String,
    },

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),
}
