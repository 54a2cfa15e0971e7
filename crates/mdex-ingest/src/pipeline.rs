//! Per-kind fetch pipeline
//!
//! `NotStarted -> ListLoaded -> Running -> Completed`
//!
//! The ID list must exist before anything is fetched; a missing or
//! unreadable list fails the pipeline. After that, each ID runs
//! fetch (with retry) -> normalize -> write on the worker pool, and a
//! failure for one ID only removes that ID from this run's output.

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::normalize::{Normalizer, RecordMode};
use crate::pool::WorkerPool;
use crate::progress::create_progress_bar;
use crate::resource::ResourceKind;
use crate::retry::RetryPolicy;
use crate::store::DataStore;
use crate::transport::{CachePolicy, Transport};
use indicatif::ProgressBar;
use mdex_common::EntityId;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Observable state of one sub-pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    ListLoaded { total: usize },
    Running { in_flight: usize, done: usize },
    Completed { total: usize },
}

const PHASE_NOT_STARTED: u8 = 0;
const PHASE_LIST_LOADED: u8 = 1;
const PHASE_RUNNING: u8 = 2;
const PHASE_COMPLETED: u8 = 3;

/// Lock-free progress counters shared by the tasks of one run
#[derive(Debug)]
pub struct PipelineProgress {
    kind: ResourceKind,
    phase: AtomicU8,
    total: AtomicUsize,
    in_flight: AtomicUsize,
    done: AtomicUsize,
}

impl PipelineProgress {
    pub fn new(kind: ResourceKind) -> Self {
        PipelineProgress {
            kind,
            phase: AtomicU8::new(PHASE_NOT_STARTED),
            total: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> PipelineState {
        match self.phase.load(Ordering::SeqCst) {
            PHASE_NOT_STARTED => PipelineState::NotStarted,
            PHASE_LIST_LOADED => PipelineState::ListLoaded {
                total: self.total.load(Ordering::SeqCst),
            },
            PHASE_RUNNING => PipelineState::Running {
                in_flight: self.in_flight.load(Ordering::SeqCst),
                done: self.done.load(Ordering::SeqCst),
            },
            _ => PipelineState::Completed {
                total: self.total.load(Ordering::SeqCst),
            },
        }
    }

    fn list_loaded(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
        self.phase.store(PHASE_LIST_LOADED, Ordering::SeqCst);
        info!(kind = %self.kind, total, "ID list loaded");
    }

    fn running(&self) {
        self.phase.store(PHASE_RUNNING, Ordering::SeqCst);
    }

    fn task_started(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    fn task_finished(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.done.fetch_add(1, Ordering::SeqCst);
    }

    fn completed(&self) {
        self.phase.store(PHASE_COMPLETED, Ordering::SeqCst);
    }
}

/// Why an ID produced no output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipReason {
    /// Retries exhausted or permanent transport failure
    Fetch,
    /// Payload failed structural validation
    Payload,
    /// Could not write the record
    Io,
}

impl SkipReason {
    fn classify(err: &IngestError) -> Self {
        match err {
            IngestError::InvalidPayload { .. } => SkipReason::Payload,
            IngestError::Io { .. } | IngestError::Json(_) | IngestError::MissingInput { .. } => {
                SkipReason::Io
            }
            _ => SkipReason::Fetch,
        }
    }
}

/// Result of one ID's task
#[derive(Debug)]
pub enum TaskOutcome {
    Written(PathBuf),
    Skipped(EntityId, SkipReason),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub fetch: usize,
    pub payload: usize,
    pub io: usize,
}

impl SkipCounts {
    pub fn total(&self) -> usize {
        self.fetch + self.payload + self.io
    }

    pub(crate) fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::Fetch => self.fetch += 1,
            SkipReason::Payload => self.payload += 1,
            SkipReason::Io => self.io += 1,
        }
    }
}

/// Summary of one completed sub-pipeline
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub kind: ResourceKind,
    pub mode: &'static str,
    pub total: usize,
    pub written: usize,
    pub skipped: SkipCounts,
    /// Ascending
    pub skipped_ids: Vec<EntityId>,
    pub duration: Duration,
}

/// Fetches, normalizes and writes every listed ID of one kind
pub struct ResourcePipeline {
    config: IngestConfig,
    store: DataStore,
    transport: Arc<dyn Transport>,
    normalizer: Normalizer,
    retry: RetryPolicy,
    pool: WorkerPool,
}

impl ResourcePipeline {
    pub fn new(config: IngestConfig, store: DataStore, transport: Arc<dyn Transport>) -> Self {
        let normalizer = Normalizer::new(config.language.clone());
        let retry = RetryPolicy::from_config(&config);
        let pool = WorkerPool::new(config.concurrency);

        ResourcePipeline {
            config,
            store,
            transport,
            normalizer,
            retry,
            pool,
        }
    }

    /// Run over the persisted ID list of `kind`
    pub async fn run(&self, kind: ResourceKind, mode: RecordMode) -> Result<PipelineReport> {
        self.run_with_progress(kind, mode, &PipelineProgress::new(kind))
            .await
    }

    /// Same as [`run`](Self::run), reporting state through `progress`
    pub async fn run_with_progress(
        &self,
        kind: ResourceKind,
        mode: RecordMode,
        progress: &PipelineProgress,
    ) -> Result<PipelineReport> {
        let start = Instant::now();
        let ids = self.store.read_ids(kind).await?;
        progress.list_loaded(ids.len());

        let bar = create_progress_bar(ids.len() as u64, kind.as_str(), self.config.show_progress);
        let total = ids.len();
        info!(
            %kind,
            mode = mode.as_str(),
            total,
            concurrency = self.pool.concurrency(),
            "Fetching"
        );

        progress.running();
        let outcomes = self
            .pool
            .run(ids, |id| self.process(kind, mode, id, progress, &bar))
            .await;
        progress.completed();
        bar.finish_and_clear();

        let mut skipped = SkipCounts::default();
        let mut skipped_ids = Vec::new();
        let mut written = 0;
        for outcome in outcomes {
            match outcome {
                TaskOutcome::Written(_) => written += 1,
                TaskOutcome::Skipped(id, reason) => {
                    skipped.record(reason);
                    skipped_ids.push(id);
                }
            }
        }
        skipped_ids.sort_unstable();

        let report = PipelineReport {
            kind,
            mode: mode.as_str(),
            total,
            written,
            skipped,
            skipped_ids,
            duration: start.elapsed(),
        };

        info!(
            %kind,
            mode = mode.as_str(),
            written = report.written,
            skipped = report.skipped.total(),
            secs = report.duration.as_secs_f64(),
            "Pipeline complete"
        );

        Ok(report)
    }

    async fn process(
        &self,
        kind: ResourceKind,
        mode: RecordMode,
        id: EntityId,
        progress: &PipelineProgress,
        bar: &ProgressBar,
    ) -> TaskOutcome {
        progress.task_started();
        let result = self.fetch_and_save(kind, mode, id).await;
        progress.task_finished();
        bar.inc(1);

        match result {
            Ok(path) => {
                debug!(%kind, id, path = %path.display(), "Saved");
                TaskOutcome::Written(path)
            }
            Err(e) => {
                let reason = SkipReason::classify(&e);
                match (&e, reason) {
                    (IngestError::RetriesExhausted { attempts, .. }, _) => {
                        error!(%kind, id, attempts, error = %e, "Giving up");
                    }
                    (_, SkipReason::Io) => error!(%kind, id, error = %e, "Write failed, skipping"),
                    _ => warn!(%kind, id, error = %e, "Skipping record"),
                }
                TaskOutcome::Skipped(id, reason)
            }
        }
    }

    async fn fetch_and_save(
        &self,
        kind: ResourceKind,
        mode: RecordMode,
        id: EntityId,
    ) -> Result<PathBuf> {
        let url = self.config.resource_url(kind.endpoint(), id);
        let label = format!("{kind}/{id}");

        let payload = self
            .retry
            .run(&label, |_| self.transport.get_json(&url, CachePolicy::Default))
            .await?;

        let record = self.normalizer.normalize(mode, kind, id, payload)?;
        self.store
            .write_record(mode.namespace(kind), id, &record)
            .await
    }
}
