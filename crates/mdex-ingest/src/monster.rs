//! Monster assembly
//!
//! Joins the pokemon and species records of one ID into a localized
//! [`Monster`] at `data/monster/<id>.json`. The set of IDs comes from the
//! species ID list. A missing or invalid input on either side skips that
//! ID; the batch always runs to the end.

use crate::error::{IngestError, Result};
use crate::normalize::{project_pokemon, Normalizer};
use crate::pipeline::{SkipCounts, SkipReason};
use crate::pool::WorkerPool;
use crate::progress::create_progress_bar;
use crate::resource::{Namespace, ResourceKind};
use crate::store::DataStore;
use mdex_common::types::{Monster, PokemonRecord, SpeciesRecord};
use mdex_common::EntityId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Optional override file under `data/mapping`
pub const TYPE_MAP_FILE: &str = "type_map.json";

const BUILTIN_TYPE_LABELS: [(&str, &str); 18] = [
    ("normal", "普"),
    ("fire", "炎"),
    ("water", "水"),
    ("grass", "草"),
    ("electric", "電"),
    ("ice", "氷"),
    ("fighting", "闘"),
    ("poison", "毒"),
    ("ground", "地"),
    ("flying", "飛"),
    ("psychic", "超"),
    ("bug", "虫"),
    ("rock", "岩"),
    ("ghost", "霊"),
    ("dragon", "竜"),
    ("dark", "悪"),
    ("steel", "鋼"),
    ("fairy", "妖"),
];

/// English type name to display label. Unknown names pass through unchanged.
#[derive(Debug, Clone)]
pub struct TypeTranslator {
    labels: HashMap<String, String>,
}

impl Default for TypeTranslator {
    fn default() -> Self {
        TypeTranslator {
            labels: BUILTIN_TYPE_LABELS
                .iter()
                .map(|(en, ja)| (en.to_string(), ja.to_string()))
                .collect(),
        }
    }
}

impl TypeTranslator {
    /// Built-in table extended by `overrides`; overrides win on conflict
    pub fn with_overrides(overrides: HashMap<String, String>) -> Self {
        let mut translator = TypeTranslator::default();
        translator.labels.extend(overrides);
        translator
    }

    /// Built-in table plus `data/mapping/type_map.json` when present
    pub async fn load(store: &DataStore) -> Result<Self> {
        match store.read_mapping::<HashMap<String, String>>(TYPE_MAP_FILE).await? {
            Some(overrides) => {
                info!(entries = overrides.len(), "Loaded type map overrides");
                Ok(TypeTranslator::with_overrides(overrides))
            }
            None => Ok(TypeTranslator::default()),
        }
    }

    pub fn translate(&self, name: &str) -> String {
        self.labels
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    pub fn translate_all(&self, names: &[String]) -> Vec<String> {
        names.iter().map(|n| self.translate(n)).collect()
    }
}

/// Where the join inputs are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonsterSource {
    /// `data/pokemon` and `data/species`
    Normalized,
    /// `data/raw-pokemon` and `data/raw-species`, projected on the fly
    Raw,
}

impl MonsterSource {
    pub fn namespace(&self, kind: ResourceKind) -> Namespace {
        match self {
            MonsterSource::Normalized => Namespace::Normalized(kind),
            MonsterSource::Raw => Namespace::Raw(kind),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MonsterSource::Normalized => "normalized",
            MonsterSource::Raw => "raw",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub source: &'static str,
    pub total: usize,
    pub written: usize,
    pub skipped: SkipCounts,
    /// Ascending
    pub skipped_ids: Vec<EntityId>,
    pub duration: Duration,
}

/// Builds `data/monster` from persisted pokemon and species records
pub struct MonsterBuilder {
    store: DataStore,
    normalizer: Normalizer,
    translator: TypeTranslator,
    pool: WorkerPool,
    show_progress: bool,
}

impl MonsterBuilder {
    pub fn new(
        store: DataStore,
        normalizer: Normalizer,
        translator: TypeTranslator,
        pool: WorkerPool,
    ) -> Self {
        MonsterBuilder {
            store,
            normalizer,
            translator,
            pool,
            show_progress: false,
        }
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Join one ID without writing it
    pub async fn assemble(&self, source: MonsterSource, id: EntityId) -> Result<Monster> {
        let (pokemon, species) = match source {
            MonsterSource::Normalized => {
                let pokemon: PokemonRecord =
                    self.read_input(source, ResourceKind::Pokemon, id).await?;
                let species: SpeciesRecord =
                    self.read_input(source, ResourceKind::Species, id).await?;
                (pokemon, species)
            }
            MonsterSource::Raw => {
                let pokemon: Value = self.read_input(source, ResourceKind::Pokemon, id).await?;
                let species: Value = self.read_input(source, ResourceKind::Species, id).await?;
                (
                    project_pokemon(id, &pokemon)?,
                    self.normalizer.project_species(id, &species)?,
                )
            }
        };

        if pokemon.id != id || species.id != id {
            return Err(IngestError::invalid_payload(
                ResourceKind::Pokemon,
                id,
                format!("join inputs carry ids {} and {}", pokemon.id, species.id),
            ));
        }

        Ok(Monster {
            id,
            name: species.name,
            types: self.translator.translate_all(&pokemon.types),
            stats: pokemon.stats,
            image: pokemon.image.unwrap_or_default(),
        })
    }

    /// Assemble and write `data/monster/<id>.json`
    pub async fn build_one(&self, source: MonsterSource, id: EntityId) -> Result<PathBuf> {
        let monster = self.assemble(source, id).await?;
        self.store.write_record(Namespace::Monster, id, &monster).await
    }

    /// Build every ID of the species list
    pub async fn build_all(&self, source: MonsterSource) -> Result<BuildReport> {
        let start = Instant::now();
        let ids = self.store.read_ids(ResourceKind::Species).await?;
        let total = ids.len();
        info!(source = source.as_str(), total, "Building monsters");

        let bar = create_progress_bar(total as u64, "monster", self.show_progress);
        let outcomes = self
            .pool
            .run(ids, |id| {
                let bar = &bar;
                async move {
                    let result = self.build_one(source, id).await;
                    bar.inc(1);
                    (id, result)
                }
            })
            .await;
        bar.finish_and_clear();

        let mut written = 0;
        let mut skipped = SkipCounts::default();
        let mut skipped_ids = Vec::new();
        for (id, result) in outcomes {
            match result {
                Ok(path) => {
                    debug!(id, path = %path.display(), "Built monster");
                    written += 1;
                }
                Err(e) => {
                    let reason = skip_reason(&e);
                    if reason == SkipReason::Io {
                        error!(id, error = %e, "Monster write failed, skipping");
                    } else {
                        warn!(id, error = %e, "Skipped monster");
                    }
                    skipped.record(reason);
                    skipped_ids.push(id);
                }
            }
        }
        skipped_ids.sort_unstable();

        let report = BuildReport {
            source: source.as_str(),
            total,
            written,
            skipped,
            skipped_ids,
            duration: start.elapsed(),
        };
        info!(
            written = report.written,
            skipped = report.skipped.total(),
            secs = report.duration.as_secs_f64(),
            "Monster build complete"
        );
        Ok(report)
    }

    async fn read_input<T: DeserializeOwned>(
        &self,
        source: MonsterSource,
        kind: ResourceKind,
        id: EntityId,
    ) -> Result<T> {
        let namespace = source.namespace(kind);
        self.store
            .read_record(namespace, id)
            .await
            .map_err(|e| match e {
                IngestError::Json(err) => {
                    IngestError::invalid_payload(kind, id, format!("{namespace}/{id}.json: {err}"))
                }
                other => other,
            })
    }
}

// Missing join inputs are data problems, not disk failures.
fn skip_reason(err: &IngestError) -> SkipReason {
    match err {
        IngestError::MissingInput { .. } | IngestError::InvalidPayload { .. } => {
            SkipReason::Payload
        }
        _ => SkipReason::Io,
    }
}
