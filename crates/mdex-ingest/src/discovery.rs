//! ID discovery over paginated list endpoints
//!
//! A list page looks like `{"results": [{"url": ".../25/"}], "next": url|null}`.
//! Discovery follows `next` until it is null and extracts the trailing
//! integer of every result URL. Any page that breaks this shape fails the
//! whole run; partial lists are never persisted.

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::resource::ResourceKind;
use crate::store::DataStore;
use crate::transport::{CachePolicy, Transport};
use mdex_common::EntityId;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extract the trailing integer segment of a resource URL.
///
/// Accepts an optional trailing slash: `.../pokemon/25/` and `.../pokemon/25`.
/// IDs are positive, so a zero segment is rejected.
pub fn parse_trailing_id(url: &str) -> Option<EntityId> {
    let segment = url.strip_suffix('/').unwrap_or(url).rsplit('/').next()?;
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok().filter(|&id: &EntityId| id > 0)
}

/// Walks list endpoints for every resource kind
pub struct IdDiscovery {
    config: IngestConfig,
    transport: Arc<dyn Transport>,
}

impl IdDiscovery {
    pub fn new(config: IngestConfig, transport: Arc<dyn Transport>) -> Self {
        IdDiscovery { config, transport }
    }

    /// Collect all IDs of `kind` in discovery order, without duplicates
    pub async fn discover(&self, kind: ResourceKind) -> Result<Vec<EntityId>> {
        let mut next = Some(self.config.list_url(kind.endpoint()));
        let mut visited = HashSet::new();
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                return Err(malformed(&url, "next cursor revisits an earlier page"));
            }

            let page = self.transport.get_json(&url, CachePolicy::NoStore).await?;
            let (page_ids, cursor) = parse_page(&url, &page)?;
            pages += 1;

            for id in page_ids {
                if seen.insert(id) {
                    ids.push(id);
                } else {
                    warn!(%kind, id, "Duplicate ID in list response, keeping first");
                }
            }

            debug!(%kind, page = pages, total = ids.len(), "List page read");
            next = cursor;
        }

        info!(%kind, pages, total = ids.len(), "Discovery complete");
        Ok(ids)
    }

    /// Discover `kind` and write `data/meta/<kind>_ids.json`
    pub async fn discover_and_persist(
        &self,
        kind: ResourceKind,
        store: &DataStore,
    ) -> Result<(Vec<EntityId>, PathBuf)> {
        let ids = self.discover(kind).await?;
        let path = store.write_ids(kind, &ids).await?;
        info!(%kind, count = ids.len(), path = %path.display(), "Saved ID list");
        Ok((ids, path))
    }
}

fn parse_page(url: &str, page: &Value) -> Result<(Vec<EntityId>, Option<String>)> {
    let results = page
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed(url, "missing 'results' array"))?;

    let next = match page.get("next") {
        Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(malformed(url, "'next' is neither string nor null")),
        None => return Err(malformed(url, "missing 'next' field")),
    };

    let ids = results
        .iter()
        .map(|entry| {
            let entry_url = entry
                .get("url")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed(url, "result without 'url'"))?;
            parse_trailing_id(entry_url)
                .ok_or_else(|| malformed(url, format!("invalid URL format: {entry_url}")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((ids, next))
}

fn malformed(url: &str, reason: impl Into<String>) -> IngestError {
    IngestError::MalformedList {
        url: url.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_trailing_id() {
        assert_eq!(parse_trailing_id("https://pokeapi.co/api/v2/pokemon/25/"), Some(25));
        assert_eq!(parse_trailing_id("https://pokeapi.co/api/v2/pokemon/10001"), Some(10001));
        assert_eq!(parse_trailing_id("https://pokeapi.co/api/v2/pokemon/pikachu/"), None);
        assert_eq!(parse_trailing_id("https://pokeapi.co/api/v2/pokemon//"), None);
        assert_eq!(parse_trailing_id("https://pokeapi.co/api/v2/pokemon/-1/"), None);
        assert_eq!(parse_trailing_id("https://pokeapi.co/api/v2/pokemon/0/"), None);
        assert_eq!(parse_trailing_id("https://pokeapi.co/api/v2/pokemon/000"), None);
    }

    #[test]
    fn test_parse_page_rejects_zero_id() {
        let page = json!({"results": [{"url": "https://x.test/pokemon/0/"}], "next": null});
        let err = parse_page("https://x.test/pokemon", &page).unwrap_err();
        assert!(matches!(err, IngestError::MalformedList { .. }));
    }

    #[test]
    fn test_parse_page_requires_next_key() {
        let page = json!({"results": [{"url": "https://x.test/pokemon/1/"}]});
        let err = parse_page("https://x.test/pokemon", &page).unwrap_err();
        assert!(matches!(err, IngestError::MalformedList { .. }));
    }

    #[test]
    fn test_parse_page_rejects_bad_url() {
        let page = json!({"results": [{"url": "https://x.test/pokemon/abc/"}], "next": null});
        assert!(parse_page("https://x.test/pokemon", &page).is_err());
    }

    #[test]
    fn test_parse_page() {
        let page = json!({
            "count": 2,
            "results": [
                {"name": "bulbasaur", "url": "https://x.test/pokemon/1/"},
                {"name": "ivysaur", "url": "https://x.test/pokemon/2/"}
            ],
            "next": "https://x.test/pokemon?offset=2&limit=2"
        });
        let (ids, next) = parse_page("https://x.test/pokemon", &page).unwrap();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(next.as_deref(), Some("https://x.test/pokemon?offset=2&limit=2"));
    }
}
