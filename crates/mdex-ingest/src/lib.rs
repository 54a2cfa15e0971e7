//! Monsterdex Ingest Library
//!
//! Pulls monster data from the public REST API and materializes it as
//! static JSON under `data/`.
//!
//! # Stages
//!
//! - **Discovery**: walk paginated list endpoints into `data/meta/<kind>_ids.json`
//! - **Fetch**: per-ID fetch with retry, normalize, write (pokemon, species, forms)
//! - **Build**: join pokemon + species into localized `data/monster/<id>.json`
//!
//! # Example
//!
//! ```no_run
//! use mdex_ingest::{HttpTransport, IngestConfig, Orchestrator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?;
//!     let transport = Arc::new(HttpTransport::new(&config)?);
//!     let report = Orchestrator::new(config, transport).run_full().await?;
//!     println!("built {} monsters", report.monsters.written);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod discovery;
pub mod error;
pub mod monster;
pub mod normalize;
pub mod orchestrator;
pub mod picker;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod resource;
pub mod retry;
pub mod store;
pub mod transport;

pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use monster::{MonsterBuilder, MonsterSource, TypeTranslator};
pub use normalize::{Normalizer, RecordMode};
pub use orchestrator::Orchestrator;
pub use picker::{pick_random, LastPick};
pub use pipeline::{PipelineReport, ResourcePipeline};
pub use resource::{Namespace, ResourceKind};
pub use store::DataStore;
pub use transport::{CachePolicy, HttpTransport, Transport};
