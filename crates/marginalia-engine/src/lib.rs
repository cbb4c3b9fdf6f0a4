//! Marginalia Analysis Engine
//!
//! Orchestrates a pipeline of analyzers over a bookmark export.
//!
//! # Flow
//!
//! 1. [`Engine::read_export_file`] loads the export and checks it against the
//!    export schema
//! 2. [`Engine::analyze_export`] feeds every bookmark through the analyzers,
//!    sequentially or through the [`WorkerPool`] depending on volume
//! 3. [`OutputWriter`] validates the enriched export and writes it without
//!    overwriting existing files
//!
//! Analyzer failures are recorded per bookmark and never stop a run. Critical
//! failures (missing or malformed input, schema violations, write errors)
//! leave a `_partial.json` dump behind before the error is returned.
//!
//! # Example
//!
//! ```no_run
//! use marginalia_engine::{Engine, EngineConfig};
//! use std::path::Path;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), marginalia_engine::EngineError> {
//! let mut engine = Engine::new(vec![], EngineConfig::default())?;
//! let export = engine.analyze(Path::new("bookmarks.json"), Some(Path::new("out.json"))).await?;
//! println!("{} bookmarks analyzed", export.bookmarks.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod partial;
mod pool;
mod schema;
mod writer;

pub use config::{EngineConfig, OutputConfig, PoolConfig, MAX_CONCURRENCY};
pub use engine::{Engine, EngineState, WORKER_POOL_ANALYZER};
pub use error::EngineError;
pub use partial::{partial_path, PartialMetadata, PartialResults};
pub use pool::{AbortHandle, PoolStats, WorkError, WorkItem, WorkOutcome, WorkerPool};
pub use schema::{SchemaValidator, ValidationReport};
pub use writer::{OutputWriter, FILENAME_TIMESTAMP_FORMAT};
