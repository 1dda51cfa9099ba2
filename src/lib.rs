//! # Kidney Match
//!
//! Donor/recipient registry for a kidney transplant matching workflow.
//!
//! This crate provides:
//! - Typed donor and recipient records with boundary validation
//! - A pairwise compatibility filter (blood type, HLA, antibody screen)
//! - A priority scorer and ranked waiting list
//! - Local SQLite storage and a terminal UI for data entry and reports
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Records, compatibility filter, priority scorer
//! - `ports`: The record store contract
//! - `adapters`: SQLite store, log redaction
//! - `application`: Registry and matching services over a store
//! - `config`: Startup configuration from the environment
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{
    compatibility_report, is_compatible, priority_score, ranked_recipients, Donor, Recipient,
};

/// Result type for kidney-match operations
pub type Result<T> = std::result::Result<T, KidneyMatchError>;

/// Main error type for kidney-match
#[derive(Debug, thiserror::Error)]
pub enum KidneyMatchError {
    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] domain::InvalidRecord),

    #[error("Invalid input: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
