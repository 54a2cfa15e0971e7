//! Record shapes persisted under the data directory
//!
//! Every struct here is written as pretty-printed JSON, one record per
//! `<id>.json` file. Field order follows declaration order, so repeated
//! runs over identical input produce identical bytes.

use serde::{Deserialize, Serialize};

/// Numeric identifier of a remote resource within one resource kind
pub type EntityId = u32;

/// Placeholder used when a species carries no name in the target language
pub const UNKNOWN_NAME: &str = "不明";

/// Number of base stats carried by every monster
pub const STAT_COUNT: usize = 6;

/// Base stats in fixed slot order: HP, Attack, Defense, SpAttack, SpDefense, Speed.
///
/// Serialized as a plain JSON array of six integers. Arrays of any other
/// length are rejected on deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseStats([u32; STAT_COUNT]);

impl BaseStats {
    pub fn new(values: [u32; STAT_COUNT]) -> Self {
        Self(values)
    }

    pub fn as_array(&self) -> &[u32; STAT_COUNT] {
        &self.0
    }

    pub fn hp(&self) -> u32 {
        self.0[0]
    }

    pub fn attack(&self) -> u32 {
        self.0[1]
    }

    pub fn defense(&self) -> u32 {
        self.0[2]
    }

    pub fn special_attack(&self) -> u32 {
        self.0[3]
    }

    pub fn special_defense(&self) -> u32 {
        self.0[4]
    }

    pub fn speed(&self) -> u32 {
        self.0[5]
    }

    /// Sum of all six stats
    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }
}

/// Narrow projection of a `pokemon` payload (`data/pokemon/<id>.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonRecord {
    pub id: EntityId,
    /// API slug, e.g. "pikachu"
    pub name: String,
    /// English type names ordered by slot
    pub types: Vec<String>,
    pub stats: BaseStats,
    /// Official artwork URL, `null` when the API has none
    pub image: Option<String>,
}

/// Localized projection of a `pokemon-species` payload (`data/species/<id>.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    pub id: EntityId,
    /// Localized name, or [`UNKNOWN_NAME`]
    pub name: String,
}

/// Name + URL reference as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
    pub url: String,
}

/// Sprite URLs of a form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSprites {
    pub front_default: Option<String>,
    pub front_shiny: Option<String>,
    pub back_default: Option<String>,
    pub back_shiny: Option<String>,
}

/// One entry of a form's type list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSlot {
    pub slot: u32,
    #[serde(rename = "type")]
    pub kind: NamedRef,
}

/// Projection of a `pokemon-form` payload (`data/forms/<id>.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormRecord {
    pub id: EntityId,
    pub name: String,
    pub form_name: String,
    pub is_default: bool,
    pub is_battle_only: bool,
    pub is_mega: bool,
    pub order: i64,
    pub form_order: i64,
    pub pokemon: NamedRef,
    pub sprites: FormSprites,
    pub types: Vec<TypeSlot>,
}

/// Joined, localized monster record (`data/monster/<id>.json`)
///
/// This is the shape read by the web front end. `image` is an empty
/// string when no artwork exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monster {
    pub id: EntityId,
    pub name: String,
    /// Localized type labels
    pub types: Vec<String>,
    pub stats: BaseStats,
    pub image: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base_stats_serializes_as_array() {
        let stats = BaseStats::new([35, 55, 40, 50, 50, 90]);
        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, "[35,55,40,50,50,90]");
        assert_eq!(stats.total(), 320);
        assert_eq!(stats.speed(), 90);
    }

    #[test]
    fn test_monster_key_order_is_stable() {
        let monster = Monster {
            id: 25,
            name: "ピカチュウ".to_string(),
            types: vec!["電".to_string()],
            stats: BaseStats::new([35, 55, 40, 50, 50, 90]),
            image: String::new(),
        };

        let json = serde_json::to_string(&monster).unwrap();
        let keys: Vec<usize> = ["\"id\"", "\"name\"", "\"types\"", "\"stats\"", "\"image\""]
            .iter()
            .map(|k| json.find(k).unwrap())
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_form_type_slot_uses_type_key() {
        let slot = TypeSlot {
            slot: 1,
            kind: NamedRef {
                name: "electric".to_string(),
                url: "https://pokeapi.co/api/v2/type/13/".to_string(),
            },
        };

        let value = serde_json::to_value(&slot).unwrap();
        assert_eq!(value["type"]["name"], "electric");
    }

    proptest! {
        #[test]
        fn test_base_stats_rejects_wrong_length(values in prop::collection::vec(0u32..300, 0..12)) {
            let json = serde_json::to_string(&values).unwrap();
            let parsed = serde_json::from_str::<BaseStats>(&json);
            prop_assert_eq!(parsed.is_ok(), values.len() == STAT_COUNT);
        }
    }
}
