//! Record normalization
//!
//! Two variants per resource kind:
//!
//! - **Raw**: the parsed payload is stored unchanged.
//! - **Normalized**: a fixed field set is projected out of the payload.
//!   A missing or mistyped required field fails the record.

use crate::error::{IngestError, Result};
use crate::resource::{Namespace, ResourceKind};
use mdex_common::types::{
    BaseStats, FormRecord, PokemonRecord, SpeciesRecord, STAT_COUNT, UNKNOWN_NAME,
};
use mdex_common::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stat names in persisted slot order
pub const STAT_ORDER: [&str; STAT_COUNT] = [
    "hp",
    "attack",
    "defense",
    "special-attack",
    "special-defense",
    "speed",
];

/// Which variant a pipeline writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordMode {
    Raw,
    Normalized,
}

impl RecordMode {
    pub fn namespace(&self, kind: ResourceKind) -> Namespace {
        match self {
            RecordMode::Raw => Namespace::Raw(kind),
            RecordMode::Normalized => Namespace::Normalized(kind),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordMode::Raw => "raw",
            RecordMode::Normalized => "normalized",
        }
    }
}

/// Output of [`Normalizer::normalize`], serialized as the inner record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Raw(Value),
    Pokemon(PokemonRecord),
    Species(SpeciesRecord),
    Form(FormRecord),
}

// Subsets of the API payloads. Unknown fields are ignored.

#[derive(Deserialize)]
struct ApiNamed {
    name: String,
}

#[derive(Deserialize)]
struct ApiTypeSlot {
    slot: u32,
    #[serde(rename = "type")]
    kind: ApiNamed,
}

#[derive(Deserialize)]
struct ApiStat {
    base_stat: u32,
    stat: ApiNamed,
}

#[derive(Deserialize)]
struct ApiArtwork {
    front_default: Option<String>,
}

#[derive(Deserialize)]
struct ApiOtherSprites {
    #[serde(rename = "official-artwork")]
    official_artwork: Option<ApiArtwork>,
}

#[derive(Deserialize)]
struct ApiSprites {
    other: Option<ApiOtherSprites>,
}

#[derive(Deserialize)]
struct ApiPokemon {
    id: EntityId,
    name: String,
    types: Vec<ApiTypeSlot>,
    stats: Vec<ApiStat>,
    sprites: ApiSprites,
}

#[derive(Deserialize)]
struct ApiLocalizedName {
    name: String,
    language: ApiNamed,
}

#[derive(Deserialize)]
struct ApiSpecies {
    id: EntityId,
    names: Vec<ApiLocalizedName>,
}

/// Maps payloads to persisted records
#[derive(Debug, Clone)]
pub struct Normalizer {
    language: String,
}

impl Normalizer {
    /// `language` selects localized species names (e.g. "ja-Hrkt")
    pub fn new(language: impl Into<String>) -> Self {
        Normalizer {
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn normalize(
        &self,
        mode: RecordMode,
        kind: ResourceKind,
        id: EntityId,
        payload: Value,
    ) -> Result<Record> {
        match (mode, kind) {
            (RecordMode::Raw, _) => Ok(Record::Raw(payload)),
            (RecordMode::Normalized, ResourceKind::Pokemon) => {
                project_pokemon(id, &payload).map(Record::Pokemon)
            }
            (RecordMode::Normalized, ResourceKind::Species) => {
                self.project_species(id, &payload).map(Record::Species)
            }
            (RecordMode::Normalized, ResourceKind::Form) => {
                project_form(id, &payload).map(Record::Form)
            }
        }
    }

    /// Localized species name, falling back to [`UNKNOWN_NAME`]
    pub fn project_species(&self, id: EntityId, payload: &Value) -> Result<SpeciesRecord> {
        let species: ApiSpecies = decode(ResourceKind::Species, id, payload)?;
        check_id(ResourceKind::Species, id, species.id)?;

        let name = species
            .names
            .into_iter()
            .find(|n| n.language.name == self.language)
            .map(|n| n.name)
            .unwrap_or_else(|| UNKNOWN_NAME.to_string());

        Ok(SpeciesRecord { id, name })
    }
}

pub fn project_pokemon(id: EntityId, payload: &Value) -> Result<PokemonRecord> {
    let pokemon: ApiPokemon = decode(ResourceKind::Pokemon, id, payload)?;
    check_id(ResourceKind::Pokemon, id, pokemon.id)?;

    let mut stats = [0u32; STAT_COUNT];
    for (slot, stat_name) in STAT_ORDER.iter().enumerate() {
        let stat = pokemon
            .stats
            .iter()
            .find(|s| s.stat.name == *stat_name)
            .ok_or_else(|| {
                IngestError::invalid_payload(
                    ResourceKind::Pokemon,
                    id,
                    format!("missing base stat '{stat_name}'"),
                )
            })?;
        stats[slot] = stat.base_stat;
    }

    let mut types = pokemon.types;
    types.sort_by_key(|t| t.slot);

    let image = pokemon
        .sprites
        .other
        .and_then(|o| o.official_artwork)
        .and_then(|a| a.front_default);

    Ok(PokemonRecord {
        id,
        name: pokemon.name,
        types: types.into_iter().map(|t| t.kind.name).collect(),
        stats: BaseStats::new(stats),
        image,
    })
}

pub fn project_form(id: EntityId, payload: &Value) -> Result<FormRecord> {
    let form: FormRecord = decode(ResourceKind::Form, id, payload)?;
    check_id(ResourceKind::Form, id, form.id)?;
    Ok(form)
}

fn decode<'a, T>(kind: ResourceKind, id: EntityId, payload: &'a Value) -> Result<T>
where
    T: Deserialize<'a>,
{
    T::deserialize(payload).map_err(|e| IngestError::invalid_payload(kind, id, e.to_string()))
}

fn check_id(kind: ResourceKind, expected: EntityId, actual: EntityId) -> Result<()> {
    if expected != actual {
        return Err(IngestError::invalid_payload(
            kind,
            expected,
            format!("payload carries id {actual}"),
        ));
    }
    Ok(())
}
