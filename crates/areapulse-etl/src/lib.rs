//! # areapulse-etl
//!
//! Windowed, idempotent extraction of area-level commercial activity
//! snapshots from object storage, and their encoding into schema-constrained
//! Parquet tables for bulk warehouse loading.
//!
//! A run is strictly linear:
//!
//! 1. **Discovery** enumerates candidate snapshot keys for the 5 one-minute
//!    buckets ending 5 minutes before the trigger.
//! 2. **Extraction** fetches each candidate, normalizes it into one
//!    [`records::AreaObservation`] plus zero-or-more
//!    [`records::CategoryObservation`]s, and consults the
//!    [`ledger::ProcessedLedger`] so nothing is emitted twice across runs.
//! 3. **Encoding** serializes the two collections into snappy-compressed
//!    Parquet blobs.
//! 4. The blobs are uploaded, the ledger is persisted with a conditional
//!    write, and upload locations are handed to the external
//!    [`warehouse::WarehouseLoader`].
//!
//! Everything awaits sequentially; the pipeline never fetches concurrently
//! and never spawns tasks, so ledger membership checks observe exactly the
//! writes made earlier in the same run.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod civil;
pub mod coerce;
pub mod config;
pub mod discovery;
pub mod encode;
pub mod extract;
pub mod identity;
pub mod ledger;
pub mod pipeline;
pub mod records;
pub mod warehouse;

pub use config::PipelineConfig;
pub use ledger::ProcessedLedger;
pub use pipeline::{Pipeline, RunSummary};
