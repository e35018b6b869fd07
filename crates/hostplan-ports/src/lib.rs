//! hostplan-ports — port pool allocator for planned services.
//!
//! Assigns port numbers to services that ask for one and remembers them
//! across runs through a persisted JSON state file, so an already deployed
//! service keeps its port.
//!
//! # Architecture
//!
//! A [`PortPool`] is a plain value: loaded (or created empty) at the start
//! of a run, mutated by [`assign_ports`], and persisted at the end. Callers
//! that share one state file across processes must serialize access
//! themselves.

pub mod assign;
pub mod error;
pub mod pool;

pub use assign::{PortAssignment, PortMode, assign_ports};
pub use error::{PortError, PortResult};
pub use pool::{PoolKey, PortPool, PortRange, PortReservation};
