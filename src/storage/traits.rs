//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::storage::Record;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for checkpoint backend implementations
///
/// A checkpoint is always the full accumulated record set. Saving replaces the
/// previous snapshot as a whole so a crash can lose at most the records gathered
/// since the last save.
pub trait CheckpointStore {
    /// Loads the last saved snapshot
    ///
    /// Never fails: a missing, unreadable or corrupt checkpoint is the same as
    /// having no prior progress.
    fn load(&self) -> Vec<Record>;

    /// Replaces the stored snapshot with `records`
    fn save(&mut self, records: &[Record]) -> StorageResult<()>;
}
