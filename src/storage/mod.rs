//! Storage module for persisting harvest progress
//!
//! This module handles everything written to disk by a harvest:
//! - The `Record` data model shared by checkpoints and the final output
//! - The `CheckpointStore` seam used by the coordinator
//! - A JSON file implementation with atomic snapshot writes

mod json;
mod traits;

pub use json::{read_records, write_records, JsonFileStore};
pub use traits::{CheckpointStore, StorageError, StorageResult};

use crate::harvester::RawFields;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One harvested catalog entry
///
/// Optional fields serialize as explicit `null` so a missing value is never
/// confused with an absent key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub title: String,
    pub author: Option<String>,
    pub co_author: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    pub item_type: Option<String>,
    pub shelving_location: Option<String>,
    pub call_number: Option<String>,
}

impl Record {
    /// Builds a record from extracted fields
    ///
    /// Returns `None` when the page yielded no non-empty title, which is the
    /// only thing that makes a record count toward the harvest target.
    pub fn from_fields(id: u64, fields: RawFields) -> Option<Self> {
        let title = fields.title?.trim().to_string();
        if title.is_empty() {
            return None;
        }

        Some(Self {
            id,
            title,
            author: fields.author,
            co_author: fields.co_author,
            language: fields.language,
            country: fields.country,
            subjects: fields.subjects,
            item_type: fields.item_type,
            shelving_location: fields.shelving_location,
            call_number: fields.call_number,
        })
    }
}

/// Removes records whose id was already seen, keeping the first occurrence
///
/// Returns the number of records dropped.
pub fn dedup_by_id(records: &mut Vec<Record>) -> usize {
    let before = records.len();
    let mut seen = HashSet::with_capacity(records.len());
    records.retain(|record| seen.insert(record.id));
    before - records.len()
}
