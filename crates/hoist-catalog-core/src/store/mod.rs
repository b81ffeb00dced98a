//! Storage abstraction for the canonical catalog.
//!
//! The [`SnapshotStore`] trait is the seam between the pipeline, which
//! writes a snapshot and its quality report, and the runtime cache, which
//! reads them back. Backends:
//!
//! | Backend | Crate | Use |
//! |---------|-------|-----|
//! | [`memory::InMemorySnapshotStore`] | core | tests, embedding |
//! | `JsonFileStore` | app | JSON files on disk |
//!
//! Implementations must be `Send + Sync` to be shared across tasks.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::CanonicalRecord;
use crate::quality::QualityReport;

/// Persistent home of the canonical snapshot and its latest quality report.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`load_snapshot`](SnapshotStore::load_snapshot) | Read all records; empty when nothing was written yet |
/// | [`save_snapshot`](SnapshotStore::save_snapshot) | Replace the snapshot atomically |
/// | [`save_report`](SnapshotStore::save_report) | Replace the quality report |
/// | [`load_report`](SnapshotStore::load_report) | Read the quality report, if any |
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load_snapshot(&self) -> Result<Vec<CanonicalRecord>>;

    async fn save_snapshot(&self, records: &[CanonicalRecord]) -> Result<()>;

    async fn save_report(&self, report: &QualityReport) -> Result<()>;

    async fn load_report(&self) -> Result<Option<QualityReport>>;
}
