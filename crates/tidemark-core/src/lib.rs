//! tidemark-core library.
//!
//! The retention and ranking engine behind the channel directory: per-entity
//! subscriber-count series, tiered compaction that keeps history bounded, and
//! period-over-period rank movement.
//!
//! # Conventions
//!
//! - **Errors**: `anyhow::Result` at operation boundaries, typed errors where
//!   a caller can act on the variant.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).

pub mod catalog;
pub mod compact;
pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod rank;
pub mod store;
