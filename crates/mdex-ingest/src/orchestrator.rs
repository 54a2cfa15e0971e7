// Ingestion orchestrator
//
// Runs the pokemon, species and form sub-pipelines side by side and waits
// for all of them. A per-ID skip never fails a stage. A sub-pipeline that
// cannot start (missing ID list, malformed list response) fails only its
// own kind, and is reported after its siblings have settled.

use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::IngestConfig;
use crate::discovery::IdDiscovery;
use crate::error::{IngestError, Result};
use crate::monster::{BuildReport, MonsterBuilder, MonsterSource, TypeTranslator};
use crate::normalize::{Normalizer, RecordMode};
use crate::pipeline::{PipelineReport, ResourcePipeline};
use crate::pool::WorkerPool;
use crate::resource::{Namespace, ResourceKind};
use crate::store::DataStore;
use crate::transport::Transport;

/// IDs found per kind by one discovery pass
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub counts: BTreeMap<String, usize>,
    pub duration: Duration,
}

/// Everything `run_full` did
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorReport {
    pub discovery: DiscoveryReport,
    pub fetched: Vec<PipelineReport>,
    pub monsters: BuildReport,
    pub duration: Duration,
}

pub struct Orchestrator {
    config: IngestConfig,
    store: DataStore,
    transport: Arc<dyn Transport>,
}

impl Orchestrator {
    /// Create a new orchestrator rooted at `config.data_dir`
    pub fn new(config: IngestConfig, transport: Arc<dyn Transport>) -> Self {
        let store = DataStore::new(&config.data_dir);
        Self {
            config,
            store,
            transport,
        }
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    /// Refresh `data/meta/*_ids.json` for every kind
    pub async fn discover_all(&self) -> Result<DiscoveryReport> {
        let (report, failed) = self.discover_kinds(&ResourceKind::ALL).await;
        if !failed.is_empty() {
            return Err(pipeline_failed(&failed));
        }
        Ok(report)
    }

    /// Fetch all three kinds concurrently in `mode`
    pub async fn fetch_all(&self, mode: RecordMode) -> Result<Vec<PipelineReport>> {
        let (reports, failed) = self.fetch_kinds(&ResourceKind::ALL, mode).await;
        if !failed.is_empty() {
            return Err(pipeline_failed(&failed));
        }
        Ok(reports)
    }

    /// Discover `kinds` concurrently. Every kind settles; failed kinds are
    /// returned alongside the counts of the ones that succeeded.
    pub async fn discover_kinds(
        &self,
        kinds: &[ResourceKind],
    ) -> (DiscoveryReport, Vec<ResourceKind>) {
        let start = Instant::now();
        let discovery = IdDiscovery::new(self.config.clone(), Arc::clone(&self.transport));

        info!("Discovering IDs for {} resource kinds", kinds.len());

        let discovery = &discovery;
        let results = join_all(kinds.iter().map(|&kind| async move {
            (kind, discovery.discover_and_persist(kind, &self.store).await)
        }))
        .await;

        let mut counts = BTreeMap::new();
        let mut failed = Vec::new();
        for (kind, result) in results {
            match result {
                Ok((ids, _)) => {
                    counts.insert(kind.to_string(), ids.len());
                }
                Err(e) => {
                    error!(%kind, error = %e, "Discovery failed");
                    failed.push(kind);
                }
            }
        }

        let report = DiscoveryReport {
            counts,
            duration: start.elapsed(),
        };
        info!(
            "Discovery finished in {:.2}s: {:?}",
            report.duration.as_secs_f64(),
            report.counts
        );
        (report, failed)
    }

    /// Run the sub-pipelines of `kinds` concurrently in `mode`. Every
    /// sub-pipeline settles; failed kinds are returned alongside the reports.
    pub async fn fetch_kinds(
        &self,
        kinds: &[ResourceKind],
        mode: RecordMode,
    ) -> (Vec<PipelineReport>, Vec<ResourceKind>) {
        let start = Instant::now();
        let pipeline = ResourcePipeline::new(
            self.config.clone(),
            self.store.clone(),
            Arc::clone(&self.transport),
        );

        info!(
            "Fetching {} resource kinds ({} records)",
            kinds.len(),
            mode.as_str()
        );

        let pipeline = &pipeline;
        let results = join_all(
            kinds
                .iter()
                .map(|&kind| async move { (kind, pipeline.run(kind, mode).await) }),
        )
        .await;

        let mut reports = Vec::with_capacity(results.len());
        let mut failed = Vec::new();
        for (kind, result) in results {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(%kind, error = %e, "Sub-pipeline failed");
                    failed.push(kind);
                }
            }
        }

        let written: usize = reports.iter().map(|r| r.written).sum();
        let skipped: usize = reports.iter().map(|r| r.skipped.total()).sum();
        info!(
            "Fetch finished: {} written, {} skipped, {} kinds failed in {:.2}s",
            written,
            skipped,
            failed.len(),
            start.elapsed().as_secs_f64()
        );

        (reports, failed)
    }

    /// Join pokemon and species records into `data/monster`
    pub async fn build_monsters(&self, source: MonsterSource) -> Result<BuildReport> {
        let translator = TypeTranslator::load(&self.store).await?;
        let builder = MonsterBuilder::new(
            self.store.clone(),
            Normalizer::new(self.config.language.clone()),
            translator,
            WorkerPool::new(self.config.concurrency),
        )
        .show_progress(self.config.show_progress);

        builder.build_all(source).await
    }

    /// Files on disk per namespace for `mode`, plus assembled monsters
    pub async fn summarize(&self, mode: RecordMode) -> Result<BTreeMap<String, usize>> {
        let mut counts = BTreeMap::new();
        for kind in ResourceKind::ALL {
            let namespace = mode.namespace(kind);
            counts.insert(
                namespace.to_string(),
                self.store.count_records(namespace).await?,
            );
        }
        counts.insert(
            Namespace::Monster.to_string(),
            self.store.count_records(Namespace::Monster).await?,
        );

        for (namespace, count) in &counts {
            info!(namespace = namespace.as_str(), count, "Records on disk");
        }
        Ok(counts)
    }

    /// Discover, fetch normalized records, then build monsters.
    ///
    /// A kind that fails discovery is not fetched, and the others carry on.
    /// Monsters are built whenever pokemon and species both made it through.
    /// Any failed kind is reported as [`IngestError::PipelineFailed`] once
    /// all remaining work has settled.
    pub async fn run_full(&self) -> Result<OrchestratorReport> {
        let start = Instant::now();
        info!("Starting full ingestion into {}", self.store.root().display());

        let (discovery, mut failed) = self.discover_kinds(&ResourceKind::ALL).await;

        let discovered: Vec<ResourceKind> = ResourceKind::ALL
            .into_iter()
            .filter(|kind| !failed.contains(kind))
            .collect();
        let (fetched, fetch_failed) = self
            .fetch_kinds(&discovered, RecordMode::Normalized)
            .await;
        failed.extend(fetch_failed);

        let join_ready = !failed.contains(&ResourceKind::Pokemon)
            && !failed.contains(&ResourceKind::Species);
        let monsters = if join_ready {
            match self.build_monsters(MonsterSource::Normalized).await {
                Ok(report) => Some(report),
                Err(e) => {
                    error!(error = %e, "Monster build failed");
                    None
                }
            }
        } else {
            warn!("Skipping monster build: pokemon or species did not complete");
            None
        };

        let duration = start.elapsed();

        let mut failed_names: Vec<String> = ResourceKind::ALL
            .into_iter()
            .filter(|kind| failed.contains(kind))
            .map(|kind| kind.to_string())
            .collect();
        if join_ready && monsters.is_none() {
            failed_names.push(Namespace::Monster.to_string());
        }

        match monsters {
            Some(monsters) if failed_names.is_empty() => {
                info!("Full ingestion complete in {:.2}s", duration.as_secs_f64());
                Ok(OrchestratorReport {
                    discovery,
                    fetched,
                    monsters,
                    duration,
                })
            }
            _ => {
                error!(
                    "Full ingestion finished with failures in {:.2}s: {}",
                    duration.as_secs_f64(),
                    failed_names.join(", ")
                );
                Err(IngestError::PipelineFailed {
                    kinds: failed_names,
                })
            }
        }
    }
}

fn pipeline_failed(kinds: &[ResourceKind]) -> IngestError {
    IngestError::PipelineFailed {
        kinds: kinds.iter().map(ResourceKind::to_string).collect(),
    }
}
