#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Service-coverage analysis.
//!
//! Buffers every facility at its type's service radius, merges the buffers
//! in bounded batches, clips the merge to the county and derives the gap
//! polygon plus a per-ward population apportionment.

pub mod engine;
pub mod union;

pub use engine::{CoverageOutcome, CoverageResult, WardCoverage, WardFootprint, compute_coverage};
pub use union::batched_union;

/// Errors that end a coverage computation with no usable result.
///
/// Per-entity geometry problems (a facility buffer or a ward that cannot be
/// repaired) are not here: those skip the entity with a logged warning and
/// processing continues.
#[derive(Debug, thiserror::Error)]
pub enum CoverageError {
    /// The county boundary itself is irreparably invalid.
    #[error("Boundary geometry for {name} could not be repaired")]
    InvalidBoundary {
        /// Boundary name.
        name: String,
    },
}
