//! End-of-run harvest summary
//!
//! Produced by the coordinator during finalization regardless of how the main
//! loop ended.

use crate::state::{HarvestPhase, OutcomeCounts};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Summary of one harvest run
#[derive(Debug, Clone)]
pub struct HarvestSummary {
    /// How the main loop ended; `Running` means it aborted on an error
    pub outcome: HarvestPhase,

    /// Configured success target
    pub target: u64,

    /// Records recovered from the checkpoint at startup
    pub loaded: usize,

    /// Records written to the output file
    pub total_records: u64,

    /// Fetch attempts made this run
    pub attempts: u64,

    /// Per-outcome tallies for this run
    pub counts: OutcomeCounts,

    /// Candidates left untried
    pub candidates_left: usize,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Final output file
    pub output_path: PathBuf,

    /// Error that aborted the main loop, if any
    pub error: Option<String>,
}

impl HarvestSummary {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    /// Short label for the terminal branch
    pub fn outcome_label(&self) -> &'static str {
        match self.outcome {
            HarvestPhase::TargetReached => "target reached",
            HarvestPhase::Exhausted => "candidates exhausted",
            HarvestPhase::Interrupted => "interrupted",
            _ => "failed",
        }
    }
}

/// Formats a summary as plain text for the terminal
pub fn format_summary(summary: &HarvestSummary) -> String {
    let mut out = String::new();

    out.push_str("=== Harvest Summary ===\n\n");
    out.push_str(&format!("Outcome: {}\n", summary.outcome_label()));
    if let Some(error) = &summary.error {
        out.push_str(&format!("Error: {}\n", error));
    }
    out.push_str(&format!(
        "Records: {}/{} ({} from checkpoint, {} new)\n",
        summary.total_records, summary.target, summary.loaded, summary.counts.collected
    ));
    out.push_str(&format!("Total attempts: {}\n", summary.attempts));
    out.push_str(&format!("  Not found: {}\n", summary.counts.not_found));
    out.push_str(&format!("  Timed out: {}\n", summary.counts.timed_out));
    out.push_str(&format!(
        "  Transport errors: {}\n",
        summary.counts.transport_errors
    ));
    out.push_str(&format!("  Without title: {}\n", summary.counts.rejected));
    out.push_str(&format!("Candidates left: {}\n", summary.candidates_left));
    out.push_str(&format!(
        "Started: {}\n",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "Duration: {} seconds ({:.2} minutes)\n",
        summary.duration_seconds(),
        summary.duration_seconds() as f64 / 60.0
    ));
    out.push_str(&format!("Output: {}\n", summary.output_path.display()));

    out
}

/// Prints a summary to stdout
pub fn print_summary(summary: &HarvestSummary) {
    println!("\n{}", format_summary(summary));
}
