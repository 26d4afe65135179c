//! Statistics over a harvested record set
//!
//! Backs the `--stats` CLI mode: read an output or checkpoint file and report
//! what the sample looks like.

use crate::storage::{read_records, Record};
use crate::HarvestError;
use std::collections::HashMap;
use std::path::Path;

/// Dataset statistics summary
#[derive(Debug, Clone, Default)]
pub struct DatasetStatistics {
    /// Total number of records
    pub total_records: u64,

    /// Smallest and largest identifier seen
    pub id_span: Option<(u64, u64)>,

    /// Records with each optional field present
    pub with_author: u64,
    pub with_co_author: u64,
    pub with_call_number: u64,

    /// Count of records by language
    pub languages: HashMap<String, u64>,

    /// Count of records by country
    pub countries: HashMap<String, u64>,

    /// Count of records by item type
    pub item_types: HashMap<String, u64>,

    /// Most frequent subjects, descending
    pub top_subjects: Vec<(String, u64)>,
}

/// Number of subjects kept in `top_subjects`
const TOP_SUBJECTS: usize = 10;

/// Computes statistics for a record set
pub fn compute_statistics(records: &[Record]) -> DatasetStatistics {
    let mut stats = DatasetStatistics {
        total_records: records.len() as u64,
        ..DatasetStatistics::default()
    };
    let mut subjects: HashMap<String, u64> = HashMap::new();

    for record in records {
        stats.id_span = Some(match stats.id_span {
            Some((lo, hi)) => (lo.min(record.id), hi.max(record.id)),
            None => (record.id, record.id),
        });

        if record.author.is_some() {
            stats.with_author += 1;
        }
        if record.co_author.is_some() {
            stats.with_co_author += 1;
        }
        if record.call_number.is_some() {
            stats.with_call_number += 1;
        }

        bump(&mut stats.languages, record.language.as_deref());
        bump(&mut stats.countries, record.country.as_deref());
        bump(&mut stats.item_types, record.item_type.as_deref());

        for subject in &record.subjects {
            *subjects.entry(subject.clone()).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, u64)> = subjects.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_SUBJECTS);
    stats.top_subjects = ranked;

    stats
}

fn bump(counts: &mut HashMap<String, u64>, value: Option<&str>) {
    let key = value.unwrap_or("(missing)");
    *counts.entry(key.to_string()).or_insert(0) += 1;
}

/// Loads a record file and computes its statistics
pub fn load_statistics(path: &Path) -> Result<DatasetStatistics, HarvestError> {
    let records = read_records(path)?;
    Ok(compute_statistics(&records))
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &DatasetStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Total records: {}", stats.total_records);
    if let Some((lo, hi)) = stats.id_span {
        println!("Identifier span: {} - {}", lo, hi);
    }

    println!("\nField coverage:");
    println!("  Author: {}", stats.with_author);
    println!("  Co-author: {}", stats.with_co_author);
    println!("  Call number: {}", stats.with_call_number);

    print_breakdown("Languages", &stats.languages);
    print_breakdown("Countries", &stats.countries);
    print_breakdown("Item types", &stats.item_types);

    if !stats.top_subjects.is_empty() {
        println!("\nTop subjects:");
        for (subject, count) in &stats.top_subjects {
            println!("  {}: {}", subject, count);
        }
    }
}

fn print_breakdown(heading: &str, counts: &HashMap<String, u64>) {
    if counts.is_empty() {
        return;
    }

    println!("\n{}:", heading);
    let mut entries: Vec<_> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (value, count) in entries {
        println!("  {}: {}", value, count);
    }
}
