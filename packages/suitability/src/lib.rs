#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Site suitability analysis.
//!
//! Lays a candidate lattice over the coverage gap, scores each candidate on
//! five normalized factors and greedily selects a spatially diversified
//! top-K recommendation set. The pipeline module ties the stages together
//! into the wire-level suitability and density reports.

pub mod grid;
pub mod pipeline;
pub mod scoring;
pub mod selection;

use std::time::{Duration, Instant};

pub use grid::{CandidateGrid, spacing_km_for};
pub use pipeline::{
    AreaDensityReport, RegionData, SuitabilityReport, SuitabilityRequest, area_density_report,
    density_surface_report, run_suitability,
};
pub use scoring::{
    ScoreFailure, ScoredCandidate, ScoringContext, SubScores, WardIndex, score_candidate,
};
pub use selection::{SelectedSite, Selection, select_top_k};

/// Errors that end a suitability analysis with no usable result.
///
/// Per-candidate problems never appear here: a candidate that cannot be
/// scored is dropped with a logged warning and the batch continues.
#[derive(Debug, thiserror::Error)]
pub enum SuitabilityError {
    /// Required reference data could not be found.
    #[error("Data unavailable: {message}")]
    DataUnavailable {
        /// What was missing.
        message: String,
    },

    /// The request itself is unusable.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Diagnostic for the caller.
        message: String,
    },

    /// Coverage computation failed outright.
    #[error(transparent)]
    Coverage(#[from] caresite_coverage::CoverageError),

    /// The density raster could not be read.
    #[error(transparent)]
    Raster(#[from] caresite_raster::RasterError),

    /// The deadline expired before a single candidate was scored.
    #[error("Deadline expired before any candidate was scored")]
    DeadlineExpired,

    /// The gap is not empty, yet no candidate survived scoring.
    #[error("No viable candidate sites survived scoring")]
    NoViableCandidates,
}

/// A caller-supplied work budget, checked between candidates so long
/// analyses never run away from an interactive caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// No limit.
    Unbounded,
    /// Expires at a wall-clock instant.
    At(Instant),
    /// Expires once the given number of checks is spent. The scoring loop
    /// performs one check per candidate, so this bounds work by count
    /// instead of time.
    Checks(usize),
}

impl Deadline {
    /// No limit.
    #[must_use]
    pub const fn none() -> Self {
        Self::Unbounded
    }

    /// Expires `budget` from now.
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Instant::now()
            .checked_add(budget)
            .map_or(Self::Unbounded, Self::At)
    }

    /// Expires after `checks` calls to [`Deadline::expired`].
    #[must_use]
    pub const fn after_checks(checks: usize) -> Self {
        Self::Checks(checks)
    }

    /// Whether the budget is spent. Counted budgets tick down one check per
    /// call.
    #[must_use]
    pub fn expired(&mut self) -> bool {
        match self {
            Self::Unbounded => false,
            Self::At(at) => Instant::now() >= *at,
            Self::Checks(left) => {
                if *left == 0 {
                    true
                } else {
                    *left -= 1;
                    false
                }
            }
        }
    }
}
