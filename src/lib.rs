//! # Hoist Catalog
//!
//! Turns noisy lifting-equipment product records into a deduplicated,
//! quality-gated catalog and serves filtered queries over it.
//!
//! The pure logic (normalization, deduplication, quality gates, indexing,
//! querying) lives in `hoist-catalog-core`. This crate wires it to the
//! outside world: the raw record source, the JSON snapshot store, the TTL
//! cache, the `hcat` CLI and the HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────────┐   ┌──────────────┐
//! │ RecordSource │──▶│      Pipeline      │──▶│ JsonFileStore │
//! │  (JSON/JSONL)│   │ normalize+dedupe+QA│   │ snapshot+report│
//! └──────────────┘   └────────────────────┘   └──────┬───────┘
//!                                                    │
//!                                            ┌───────▼──────┐
//!                                            │ CatalogCache │ TTL, Arc swap
//!                                            └───────┬──────┘
//!                                  ┌─────────────────┤
//!                                  ▼                 ▼
//!                             ┌──────────┐     ┌──────────┐
//!                             │   CLI    │     │   HTTP   │
//!                             │  (hcat)  │     │  (axum)  │
//!                             └──────────┘     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! hcat pipeline                 # build ./data/catalog.json from ./raw
//! hcat quality                  # gate results and distributions
//! hcat search lodestar --classification d8
//! hcat serve                    # start HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`traits`] | `RecordSource` extension trait |
//! | [`connector_fs`] | Filesystem JSON/JSONL record source |
//! | [`json_store`] | JSON-file snapshot store |
//! | [`pipeline`] | Batch normalization pipeline |
//! | [`cache`] | TTL snapshot cache |
//! | [`search`] | CLI search |
//! | [`get`] | CLI record lookup |
//! | [`stats`] | Quality report and facet printing |
//! | [`server`] | JSON HTTP API |

pub mod cache;
pub mod config;
pub mod connector_fs;
pub mod get;
pub mod json_store;
pub mod pipeline;
pub mod search;
pub mod server;
pub mod stats;
pub mod traits;
