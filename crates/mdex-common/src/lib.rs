//! Monsterdex Common Library
//!
//! Shared record shapes, logging setup and error handling for the
//! Monsterdex workspace.
//!
//! # Overview
//!
//! - **Types**: the persisted JSON shapes written under `data/`
//! - **Logging**: `tracing` subscriber initialization
//! - **Error Handling**: common error and result types
//!
//! # Example
//!
//! ```no_run
//! use mdex_common::types::{BaseStats, Monster};
//!
//! let monster = Monster {
//!     id: 25,
//!     name: "ピカチュウ".to_string(),
//!     types: vec!["電".to_string()],
//!     stats: BaseStats::new([35, 55, 40, 50, 50, 90]),
//!     image: String::new(),
//! };
//! assert_eq!(monster.stats.hp(), 35);
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CommonError, Result};
pub use types::EntityId;
