//! Resource kinds and output namespaces
//!
//! A resource kind is data, not code: each kind knows its list endpoint,
//! its ID list file and its raw/normalized directories, and one pipeline
//! implementation serves all three.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A category of remote entity with its own endpoints and file namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Pokemon,
    Species,
    Form,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Pokemon,
        ResourceKind::Species,
        ResourceKind::Form,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pokemon => "pokemon",
            ResourceKind::Species => "species",
            ResourceKind::Form => "form",
        }
    }

    /// Path segment of the list/detail endpoint under the API base
    pub fn endpoint(&self) -> &'static str {
        match self {
            ResourceKind::Pokemon => "pokemon",
            ResourceKind::Species => "pokemon-species",
            ResourceKind::Form => "pokemon-form",
        }
    }

    /// File name of the discovered ID list under `data/meta`
    pub fn ids_file(&self) -> &'static str {
        match self {
            ResourceKind::Pokemon => "pokemon_ids.json",
            ResourceKind::Species => "species_ids.json",
            ResourceKind::Form => "form_ids.json",
        }
    }

    /// Directory of normalized records
    pub fn normalized_dir(&self) -> &'static str {
        match self {
            ResourceKind::Pokemon => "pokemon",
            ResourceKind::Species => "species",
            ResourceKind::Form => "forms",
        }
    }

    /// Directory of verbatim payloads
    pub fn raw_dir(&self) -> &'static str {
        match self {
            ResourceKind::Pokemon => "raw-pokemon",
            ResourceKind::Species => "raw-species",
            ResourceKind::Form => "raw-forms",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory a record is written to, relative to the data root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Raw(ResourceKind),
    Normalized(ResourceKind),
    Monster,
}

impl Namespace {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Namespace::Raw(kind) => kind.raw_dir(),
            Namespace::Normalized(kind) => kind.normalized_dir(),
            Namespace::Monster => "monster",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}
