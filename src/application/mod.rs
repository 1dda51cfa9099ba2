//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with the record store to implement
//! data entry and the two matching reports.

mod matching;
mod registry;

pub use matching::{
    CompatibilityReport, MatchingService, MatchingSnapshot, PairOutcome, Ranking, RejectedRow,
};
pub use registry::RegistryService;
