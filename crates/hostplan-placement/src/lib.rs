//! hostplan distribution engine — candidate index and allocation strategies.
//!
//! This crate turns a candidate model (which targets *may* host each
//! service) into a final distribution (which targets *do*). It does NOT
//! assign ports (that's `hostplan-ports`), but the [`TargetIndex`] built
//! here is what the port allocator uses to validate reservations.
//!
//! # Components
//!
//! - **`candidate`** — Candidate model (service → candidate targets)
//! - **`index`** — Sorted target → services index with binary-search lookups
//! - **`strategy`** — None / Greedy / HighestBidder / LowestBidder

pub mod candidate;
pub mod index;
pub mod strategy;

pub use candidate::{CandidateEntry, CandidateModel};
pub use index::{TargetEntry, TargetIndex};
pub use strategy::{Assignment, Distribution, Strategy, UnknownStrategy, distribute};
