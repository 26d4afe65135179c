//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `HarvestPhase`: the phase machine a run moves through
//! - `HarvestState`: accumulated records, candidate pool and outcome counters

mod harvest_state;
mod phase;

// Re-export main types
pub use harvest_state::{HarvestState, OutcomeCounts};
pub use phase::HarvestPhase;
