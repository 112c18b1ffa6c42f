//! # areapulse-core
//!
//! Shared primitives for the areapulse commercial-activity pipeline:
//!
//! - **Error Types**: Shared error definitions and result types
//! - **Storage Abstraction**: Object-storage contract with conditional writes,
//!   plus in-memory and `object_store`-backed implementations
//! - **Storage Paths**: Canonical key layout for raw snapshots, encoded
//!   tables, and the processing ledger
//! - **Observability**: Structured logging initialization
//!
//! ## Crate Boundary
//!
//! `areapulse-core` is the only crate allowed to define shared primitives.
//! The pipeline crate (`areapulse-etl`) builds on these contracts and never
//! hardcodes storage keys or error shapes of its own.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod observability;
pub mod paths;
pub mod storage;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use areapulse_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::paths::PipelinePaths;
    pub use crate::storage::{
        MemoryBackend, ObjectMeta, ObjectStoreBackend, StorageBackend, WritePrecondition,
        WriteResult,
    };
}

pub use error::{Error, Result};
pub use observability::{LogFormat, init_logging};
pub use paths::PipelinePaths;
pub use storage::{
    MemoryBackend, ObjectMeta, ObjectStoreBackend, StorageBackend, WritePrecondition, WriteResult,
};
