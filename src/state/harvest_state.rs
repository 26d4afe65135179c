//! Per-run harvest state
//!
//! Owned exclusively by the coordinator for the length of one run.

use crate::storage::Record;
use std::collections::{HashSet, VecDeque};

/// Running tally of how candidate fetches ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    /// Records accepted this run
    pub collected: u64,
    /// Remote reported no such record
    pub not_found: u64,
    /// Request exceeded the timeout
    pub timed_out: u64,
    /// Any other transport failure
    pub transport_errors: u64,
    /// Page fetched but yielded no usable title
    pub rejected: u64,
}

/// Accumulated records plus the candidate pool still to try
#[derive(Debug, Default)]
pub struct HarvestState {
    accumulated: Vec<Record>,
    accumulated_ids: HashSet<u64>,
    remaining: VecDeque<u64>,
    attempts: u64,
    loaded: usize,
    counts: OutcomeCounts,
}

impl HarvestState {
    /// Seeds the state with records recovered from a checkpoint
    ///
    /// Later duplicates of an id are ignored. Records with a blank title are
    /// dropped so their identifiers stay eligible for sampling.
    pub fn from_checkpoint(records: Vec<Record>) -> Self {
        let mut state = Self::default();
        let mut blank = 0;
        for record in records {
            if record.title.trim().is_empty() {
                blank += 1;
                continue;
            }
            if state.accumulated_ids.insert(record.id) {
                state.accumulated.push(record);
            }
        }
        if blank > 0 {
            tracing::warn!(
                "Checkpoint contained {} records without a title, dropping them",
                blank
            );
        }
        state.loaded = state.accumulated.len();
        state
    }

    /// Installs the sampled candidate pool
    ///
    /// Identifiers already present in `accumulated` are dropped. Returns how many
    /// were removed that way.
    pub fn set_candidates(&mut self, candidates: Vec<u64>) -> usize {
        let before = candidates.len();
        self.remaining = candidates
            .into_iter()
            .filter(|id| !self.accumulated_ids.contains(id))
            .collect();
        before - self.remaining.len()
    }

    /// Takes the next unresolved candidate and counts the attempt
    pub fn next_candidate(&mut self) -> Option<u64> {
        let id = self.remaining.pop_front()?;
        self.attempts += 1;
        Some(id)
    }

    /// Appends a validated record
    ///
    /// Returns false, leaving the state untouched, if the id is already present.
    pub fn push_record(&mut self, record: Record) -> bool {
        if !self.accumulated_ids.insert(record.id) {
            return false;
        }
        self.accumulated.push(record);
        self.counts.collected += 1;
        true
    }

    pub fn contains(&self, id: u64) -> bool {
        self.accumulated_ids.contains(&id)
    }

    pub fn accumulated(&self) -> &[Record] {
        &self.accumulated
    }

    pub fn accumulated_len(&self) -> u64 {
        self.accumulated.len() as u64
    }

    pub fn remaining_len(&self) -> usize {
        self.remaining.len()
    }

    pub fn has_candidates(&self) -> bool {
        !self.remaining.is_empty()
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Number of records recovered from the checkpoint at startup
    pub fn loaded(&self) -> usize {
        self.loaded
    }

    pub fn counts(&self) -> &OutcomeCounts {
        &self.counts
    }

    pub fn counts_mut(&mut self) -> &mut OutcomeCounts {
        &mut self.counts
    }
}
