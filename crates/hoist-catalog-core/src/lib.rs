//! # Hoist Catalog Core
//!
//! Pure catalog logic for Hoist Catalog: record models, unit parsing,
//! normalization, deduplication, quality gates, indexing and querying.
//!
//! This crate does no filesystem or network I/O. Persistence sits behind
//! the [`store::SnapshotStore`] trait; the `hoist-catalog` crate provides
//! the file-backed store, the raw record source, the cache, the CLI and
//! the HTTP server.
//!
//! # Data flow
//!
//! ```text
//! RawRecord ─► normalize ─► dedupe ─► quality ─► SnapshotStore
//!                                                      │
//!              query ◄── IndexSet ◄── CatalogSnapshot ◄┘
//! ```

pub mod classification;
pub mod completeness;
pub mod dedupe;
pub mod index;
pub mod models;
pub mod normalize;
pub mod quality;
pub mod query;
pub mod rules;
pub mod snapshot;
pub mod store;
pub mod units;
