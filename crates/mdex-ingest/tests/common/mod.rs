//! Shared helpers for integration tests
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use mdex_ingest::error::{IngestError, Result};
use mdex_ingest::{CachePolicy, IngestConfig, Transport};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::subscriber::DefaultGuard;

pub const API: &str = "https://api.test/v2";

/// Config pointed at `data_dir` and the in-memory API
pub fn test_config(data_dir: &Path) -> IngestConfig {
    IngestConfig::builder()
        .api_base(API)
        .data_dir(data_dir)
        .show_progress(false)
        .build()
}

struct Route {
    body: Value,
    failures_left: u32,
}

/// Scripted in-memory transport
///
/// Unknown URLs answer 404. A route registered with `failures` answers 503
/// that many times before returning its body.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<(String, CachePolicy, Instant)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: impl Into<String>, body: Value) {
        self.route_failing(url, body, 0);
    }

    pub fn route_failing(&self, url: impl Into<String>, body: Value, failures: u32) {
        self.routes.lock().unwrap().insert(
            url.into(),
            Route {
                body,
                failures_left: failures,
            },
        );
    }

    pub fn always_fail(&self, url: impl Into<String>) {
        self.route_failing(url, Value::Null, u32::MAX);
    }

    pub fn calls_to(&self, url: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _, _)| u == url)
            .map(|(_, _, at)| *at)
            .collect()
    }

    pub fn policies(&self) -> Vec<CachePolicy> {
        self.calls.lock().unwrap().iter().map(|(_, p, _)| *p).collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_json(&self, url: &str, cache: CachePolicy) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), cache, Instant::now()));

        let mut routes = self.routes.lock().unwrap();
        let Some(route) = routes.get_mut(url) else {
            return Err(IngestError::Status {
                url: url.to_string(),
                status: 404,
            });
        };

        if route.failures_left > 0 {
            route.failures_left = route.failures_left.saturating_sub(1);
            return Err(IngestError::Status {
                url: url.to_string(),
                status: 503,
            });
        }
        Ok(route.body.clone())
    }
}

/// Gaps between consecutive instants
pub fn gaps(instants: &[Instant]) -> Vec<Duration> {
    instants.windows(2).map(|w| w[1] - w[0]).collect()
}

pub fn resource_url(endpoint: &str, id: u32) -> String {
    format!("{API}/{endpoint}/{id}")
}

pub fn pokemon_payload(id: u32, name: &str, types: &[&str], stats: [u32; 6]) -> Value {
    let names = [
        "hp",
        "attack",
        "defense",
        "special-attack",
        "special-defense",
        "speed",
    ];
    json!({
        "id": id,
        "name": name,
        "base_experience": 112,
        "types": types
            .iter()
            .enumerate()
            .map(|(i, t)| json!({"slot": i + 1, "type": {"name": t, "url": ""}}))
            .collect::<Vec<_>>(),
        "stats": names
            .iter()
            .zip(stats)
            .map(|(n, v)| json!({"base_stat": v, "effort": 0, "stat": {"name": n, "url": ""}}))
            .collect::<Vec<_>>(),
        "sprites": {
            "front_default": format!("https://img.test/{id}.png"),
            "other": {"official-artwork": {"front_default": format!("https://img.test/artwork/{id}.png")}}
        }
    })
}

pub fn species_payload(id: u32, ja_name: &str) -> Value {
    json!({
        "id": id,
        "name": "species",
        "names": [
            {"name": "English", "language": {"name": "en", "url": ""}},
            {"name": ja_name, "language": {"name": "ja-Hrkt", "url": ""}}
        ],
        "genera": []
    })
}

pub fn form_payload(id: u32, pokemon_id: u32) -> Value {
    json!({
        "id": id,
        "name": "pikachu",
        "form_name": "",
        "is_default": true,
        "is_battle_only": false,
        "is_mega": false,
        "order": 35,
        "form_order": 1,
        "pokemon": {"name": "pikachu", "url": format!("{API}/pokemon/{pokemon_id}/")},
        "sprites": {"front_default": null, "front_shiny": null, "back_default": null, "back_shiny": null},
        "types": [{"slot": 1, "type": {"name": "electric", "url": ""}}]
    })
}

/// Register the pikachu fixtures for pokemon, species and form 25
pub fn route_pikachu(transport: &MockTransport) {
    transport.route(
        resource_url("pokemon", 25),
        pokemon_payload(25, "pikachu", &["electric"], [35, 55, 40, 50, 50, 90]),
    );
    transport.route(resource_url("pokemon-species", 25), species_payload(25, "ピカチュウ"));
    transport.route(resource_url("pokemon-form", 25), form_payload(25, 25));
}

/// Every file under `root`, keyed by relative path
pub fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_string_lossy().into_owned();
                files.insert(rel, std::fs::read(&path).unwrap());
            }
        }
    }
    files
}

/// In-memory sink for formatted log lines
#[derive(Clone, Default)]
pub struct LogBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl LogBuffer {
    /// Route this thread's events into the buffer until the guard drops
    pub fn capture(&self) -> DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.bytes.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// One-page list response holding `ids`
pub fn single_page(endpoint: &str, ids: &[u32]) -> Value {
    let results: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({"name": format!("entry-{id}"), "url": format!("{API}/{endpoint}/{id}/")})
        })
        .collect();
    json!({"count": ids.len(), "next": null, "previous": null, "results": results})
}
