use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Catalog-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub harvest: HarvestConfig,
    pub identity: IdentityConfig,
    pub output: OutputConfig,
}

/// Remote catalog description
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Record page URL with an `{id}` placeholder
    #[serde(rename = "url-template")]
    pub url_template: String,

    /// Text that marks a "record does not exist" page served with a 200 status
    #[serde(rename = "not-found-marker")]
    pub not_found_marker: String,

    /// Smallest identifier to sample (inclusive)
    #[serde(rename = "id-min")]
    pub id_min: u64,

    /// Largest identifier to sample (inclusive)
    #[serde(rename = "id-max")]
    pub id_max: u64,
}

/// Harvest loop behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Number of valid records to collect before stopping
    pub target: u64,

    /// Number of candidate identifiers to draw (defaults to `target`)
    #[serde(rename = "sample-size", default)]
    pub sample_size: Option<u64>,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Save a checkpoint every time this many records have been accumulated
    #[serde(rename = "checkpoint-interval")]
    pub checkpoint_interval: u64,

    /// Lower bound of the pause between requests (milliseconds)
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the pause between requests (milliseconds)
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,
}

impl HarvestConfig {
    /// Number of candidate identifiers the sampler should draw
    pub fn effective_sample_size(&self) -> u64 {
        self.sample_size.unwrap_or(self.target)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Request identity sent with every fetch of a run
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language")]
    pub accept_language: String,

    #[serde(default)]
    pub referer: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the final JSON output file
    #[serde(rename = "output-path")]
    pub output_path: String,

    /// Path to the checkpoint file (derived from `output_path` when absent)
    #[serde(rename = "checkpoint-path", default)]
    pub checkpoint_path: Option<String>,
}

impl OutputConfig {
    /// Resolves the checkpoint location
    ///
    /// `records.json` becomes `records_progress.json` unless a path is configured.
    pub fn checkpoint_path(&self) -> PathBuf {
        if let Some(path) = &self.checkpoint_path {
            return PathBuf::from(path);
        }

        let output = PathBuf::from(&self.output_path);
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "records".to_string());
        let file_name = match output.extension() {
            Some(ext) => format!("{}_progress.{}", stem, ext.to_string_lossy()),
            None => format!("{}_progress", stem),
        };
        output.with_file_name(file_name)
    }
}
