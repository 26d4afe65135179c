//! Harvest coordinator - main harvest orchestration logic
//!
//! This module contains the main harvest loop, including:
//! - Loading prior progress from the checkpoint
//! - Sampling candidate identifiers and dropping already-harvested ones
//! - Fetching, extracting and validating one candidate at a time
//! - Periodic checkpoints and politeness pacing
//! - Interruption and guaranteed finalization

use crate::config::Config;
use crate::harvester::extractor::{CatalogExtractor, FieldExtractor};
use crate::harvester::fetcher::{FetchResult, Fetcher, HttpFetcher};
use crate::harvester::pacing::Pacer;
use crate::output::HarvestSummary;
use crate::sampler::sample_ids;
use crate::state::{HarvestPhase, HarvestState};
use crate::storage::{write_records, CheckpointStore, JsonFileStore, Record};
use crate::HarvestError;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Main harvest coordinator structure
///
/// Generic over its three collaborators so the loop can run against recorded
/// fixtures instead of the live catalog.
pub struct Coordinator<F, E, S> {
    config: Config,
    fetcher: F,
    extractor: E,
    checkpoint: S,
    pacer: Pacer,
    output_path: PathBuf,
    fresh: bool,
    phase: HarvestPhase,
    state: HarvestState,
}

impl Coordinator<HttpFetcher, CatalogExtractor, JsonFileStore> {
    /// Creates a coordinator against the live catalog
    ///
    /// # Arguments
    ///
    /// * `config` - The harvest configuration
    /// * `fresh` - Ignore any existing checkpoint
    pub fn from_config(config: Config, fresh: bool) -> Result<Self, HarvestError> {
        let fetcher = HttpFetcher::from_config(&config)?;
        let checkpoint = JsonFileStore::new(config.output.checkpoint_path());
        Ok(
            Self::new(config, fetcher, CatalogExtractor::default(), checkpoint)
                .with_fresh_start(fresh),
        )
    }
}

impl<F, E, S> Coordinator<F, E, S>
where
    F: Fetcher,
    E: FieldExtractor,
    S: CheckpointStore,
{
    pub fn new(config: Config, fetcher: F, extractor: E, checkpoint: S) -> Self {
        let pacer = Pacer::from_config(&config.harvest);
        let output_path = PathBuf::from(&config.output.output_path);

        Self {
            config,
            fetcher,
            extractor,
            checkpoint,
            pacer,
            output_path,
            fresh: false,
            phase: HarvestPhase::Init,
            state: HarvestState::default(),
        }
    }

    /// When set, prior progress is not loaded and the next save replaces it
    pub fn with_fresh_start(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }

    pub fn phase(&self) -> HarvestPhase {
        self.phase
    }

    pub fn state(&self) -> &HarvestState {
        &self.state
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Runs one complete harvest
    ///
    /// Loads the checkpoint, samples candidates, runs the fetch loop until the
    /// target is met, candidates run out, or `cancel` fires, then finalizes.
    ///
    /// Finalization (final checkpoint, output file, summary) runs whenever the
    /// fetch loop was entered, including when the loop itself failed or
    /// panicked. A panic is resumed once the records are written. A sampling
    /// error aborts before any fetch and before finalization.
    ///
    /// # Returns
    ///
    /// * `Ok(HarvestSummary)` - Harvest finished and its output was written
    /// * `Err(HarvestError)` - Sampling failed, the loop failed, or the final
    ///   write failed
    pub async fn run(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<HarvestSummary, HarvestError> {
        let started_at = Utc::now();

        self.transition(HarvestPhase::LoadingCheckpoint)?;
        self.load_checkpoint();

        self.transition(HarvestPhase::Sampling)?;
        self.sample_candidates()?;

        self.transition(HarvestPhase::Running)?;
        let outcome = AssertUnwindSafe(self.run_loop(cancel)).catch_unwind().await;
        let loop_result = match outcome {
            Ok(result) => result,
            Err(panic) => {
                tracing::error!("Harvest loop panicked, writing collected records");
                if let Err(e) = self.finalize(started_at, Some("harvest loop panicked".into())) {
                    tracing::error!("Finalization after panic failed: {}", e);
                }
                std::panic::resume_unwind(panic);
            }
        };
        if let Err(e) = &loop_result {
            tracing::error!("Harvest loop aborted: {}", e);
        }

        let loop_error = loop_result.as_ref().err().map(|e| e.to_string());
        let finalize_result = self.finalize(started_at, loop_error);

        loop_result?;
        finalize_result
    }

    fn load_checkpoint(&mut self) {
        if self.fresh {
            tracing::info!("Fresh start requested, ignoring previous progress");
            self.state = HarvestState::default();
            return;
        }

        let records = self.checkpoint.load();
        self.state = HarvestState::from_checkpoint(records);

        if self.state.loaded() > 0 {
            tracing::info!(
                "Loaded previous progress: {} records already harvested",
                self.state.loaded()
            );
        } else {
            tracing::info!("No previous progress found, starting from scratch");
        }
    }

    fn sample_candidates(&mut self) -> Result<(), HarvestError> {
        let catalog = &self.config.catalog;
        let sample_size = self.config.harvest.effective_sample_size();

        tracing::info!(
            "Sampling {} identifiers between {} and {}",
            sample_size,
            catalog.id_min,
            catalog.id_max
        );
        let candidates = sample_ids(
            &mut rand::rng(),
            catalog.id_min,
            catalog.id_max,
            sample_size,
        )?;

        let skipped = self.state.set_candidates(candidates);
        if skipped > 0 {
            tracing::info!("Skipping {} identifiers already in the checkpoint", skipped);
        }
        tracing::debug!("{} candidates to try", self.state.remaining_len());

        Ok(())
    }

    async fn run_loop(&mut self, cancel: &CancellationToken) -> Result<(), HarvestError> {
        let target = self.config.harvest.target;

        loop {
            if self.state.accumulated_len() >= target {
                tracing::info!("Target of {} records reached", target);
                return self.transition(HarvestPhase::TargetReached);
            }

            if cancel.is_cancelled() {
                tracing::info!(
                    "Harvest interrupted, keeping {} records collected so far",
                    self.state.accumulated_len()
                );
                return self.transition(HarvestPhase::Interrupted);
            }

            let Some(id) = self.state.next_candidate() else {
                tracing::info!("Candidate identifiers exhausted before reaching the target");
                return self.transition(HarvestPhase::Exhausted);
            };

            tracing::info!(
                "[{}/{}] Attempt {}: record {}",
                self.state.accumulated_len(),
                target,
                self.state.attempts(),
                id
            );

            let result = self.fetcher.fetch(id).await;
            self.handle_fetch_result(id, result);

            let final_attempt =
                self.state.accumulated_len() >= target || !self.state.has_candidates();
            if !final_attempt && !self.pacer.pause(cancel).await {
                tracing::info!(
                    "Harvest interrupted during pause, keeping {} records collected so far",
                    self.state.accumulated_len()
                );
                return self.transition(HarvestPhase::Interrupted);
            }
        }
    }

    /// Applies the outcome of one fetch
    ///
    /// Every failure is absorbed here; an identifier that yields no record is
    /// simply dropped.
    fn handle_fetch_result(&mut self, id: u64, result: FetchResult) {
        match result {
            FetchResult::Found(body) => {
                let fields = self.extractor.extract(&body);
                match Record::from_fields(id, fields) {
                    Some(record) => self.accept(record),
                    None => {
                        self.state.counts_mut().rejected += 1;
                        tracing::info!("Record {} has no title, skipping", id);
                    }
                }
            }

            FetchResult::NotFound { status } => {
                self.state.counts_mut().not_found += 1;
                tracing::debug!("Record {} not found (HTTP {})", id, status);
            }

            FetchResult::TimedOut => {
                self.state.counts_mut().timed_out += 1;
                tracing::info!("Timed out fetching record {}, skipping", id);
            }

            FetchResult::TransportError(detail) => {
                self.state.counts_mut().transport_errors += 1;
                tracing::warn!("Transport error fetching record {}: {}", id, detail);
            }
        }
    }

    fn accept(&mut self, record: Record) {
        let id = record.id;
        if !self.state.push_record(record) {
            tracing::debug!("Record {} already harvested, ignoring", id);
            return;
        }

        let count = self.state.accumulated_len();
        tracing::debug!("Harvested record {} ({} total)", id, count);

        let interval = self.config.harvest.checkpoint_interval;
        if interval > 0 && count % interval == 0 {
            match self.checkpoint.save(self.state.accumulated()) {
                Ok(()) => tracing::info!(
                    "Progress saved: {}/{} records",
                    count,
                    self.config.harvest.target
                ),
                Err(e) => {
                    tracing::warn!("Failed to save checkpoint at {} records: {}", count, e)
                }
            }
        }
    }

    /// Writes the final checkpoint and output file and builds the summary
    fn finalize(
        &mut self,
        started_at: DateTime<Utc>,
        error: Option<String>,
    ) -> Result<HarvestSummary, HarvestError> {
        let outcome = self.phase;
        self.transition(HarvestPhase::Finalizing)?;

        let records = self.state.accumulated();
        let checkpoint_result = self.checkpoint.save(records);
        if let Err(e) = &checkpoint_result {
            tracing::error!("Failed to save final checkpoint: {}", e);
        }

        let output_result = write_records(&self.output_path, records);
        match &output_result {
            Ok(()) => tracing::info!(
                "{} records saved to {}",
                records.len(),
                self.output_path.display()
            ),
            Err(e) => tracing::error!(
                "Failed to write output {}: {}",
                self.output_path.display(),
                e
            ),
        }

        let summary = HarvestSummary {
            outcome,
            target: self.config.harvest.target,
            loaded: self.state.loaded(),
            total_records: self.state.accumulated_len(),
            attempts: self.state.attempts(),
            counts: *self.state.counts(),
            candidates_left: self.state.remaining_len(),
            started_at,
            finished_at: Utc::now(),
            output_path: self.output_path.clone(),
            error,
        };

        tracing::info!(
            "Harvest finished ({}): {} records, {} attempts",
            summary.outcome_label(),
            summary.total_records,
            summary.attempts
        );

        self.transition(HarvestPhase::Done)?;

        output_result?;
        checkpoint_result?;
        Ok(summary)
    }

    fn transition(&mut self, next: HarvestPhase) -> Result<(), HarvestError> {
        if !self.phase.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!("Harvest phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }
}

/// Runs a complete harvest against the live catalog
///
/// Installs a Ctrl-C handler that requests cooperative cancellation, so an
/// interrupted run still writes everything it collected.
///
/// # Example
///
/// ```no_run
/// use catalog_harvest::config::load_config;
/// use catalog_harvest::harvester::run_harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let summary = run_harvest(config, false).await?;
/// println!("{} records", summary.total_records);
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(config: Config, fresh: bool) -> Result<HarvestSummary, HarvestError> {
    let cancel = CancellationToken::new();

    let signal_token = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current request");
            signal_token.cancel();
        }
    });

    let mut coordinator = Coordinator::from_config(config, fresh)?;
    let result = coordinator.run(&cancel).await;

    signal_task.abort();
    result
}
