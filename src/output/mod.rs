//! Output module for reporting harvest results
//!
//! - `summary`: the end-of-run report built during finalization
//! - `stats`: statistics over an existing record file

mod stats;
mod summary;

pub use stats::{compute_statistics, load_statistics, print_statistics, DatasetStatistics};
pub use summary::{format_summary, print_summary, HarvestSummary};
