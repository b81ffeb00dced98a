//! In-memory [`SnapshotStore`] implementation for tests and embedding.
//!
//! Holds the snapshot and report behind `std::sync::RwLock`.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::CanonicalRecord;
use crate::quality::QualityReport;

use super::SnapshotStore;

#[derive(Default)]
pub struct InMemorySnapshotStore {
    records: RwLock<Vec<CanonicalRecord>>,
    report: RwLock<Option<QualityReport>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<CanonicalRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            report: RwLock::new(None),
        }
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory snapshot store lock poisoned")
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load_snapshot(&self) -> Result<Vec<CanonicalRecord>> {
        Ok(self.records.read().map_err(poisoned)?.clone())
    }

    async fn save_snapshot(&self, records: &[CanonicalRecord]) -> Result<()> {
        *self.records.write().map_err(poisoned)? = records.to_vec();
        Ok(())
    }

    async fn save_report(&self, report: &QualityReport) -> Result<()> {
        *self.report.write().map_err(poisoned)? = Some(report.clone());
        Ok(())
    }

    async fn load_report(&self) -> Result<Option<QualityReport>> {
        Ok(self.report.read().map_err(poisoned)?.clone())
    }
}
