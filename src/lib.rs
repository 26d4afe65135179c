//! Catalog-Harvest: a polite, resumable catalog sampler
//!
//! This crate samples bibliographic records from a catalog web interface that
//! exposes records by sequential numeric identifier. It draws a random set of
//! identifiers, fetches and extracts each record one at a time, checkpoints its
//! progress, and can be interrupted and resumed without refetching anything.

pub mod config;
pub mod harvester;
pub mod output;
pub mod sampler;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Catalog-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Cannot sample {requested} identifiers from a range of {available}")]
    InvalidSampleSize { requested: u64, available: u64 },

    #[error("Invalid identifier range: {min} > {max}")]
    InvalidRange { min: u64, max: u64 },

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::HarvestPhase,
        to: state::HarvestPhase,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

// Re-export commonly used types
pub use config::Config;
pub use harvester::{Coordinator, FetchResult, Fetcher, FieldExtractor, RawFields};
pub use state::{HarvestPhase, HarvestState};
pub use storage::{CheckpointStore, JsonFileStore, Record};
