//! An immutable, queryable catalog snapshot.
//!
//! Records, their [`IndexSet`] and the quality report are built together
//! and published as one unit, so readers never see an index that belongs
//! to different records.

use chrono::{DateTime, Utc};

use crate::index::{Facets, IndexSet};
use crate::models::CanonicalRecord;
use crate::quality::{self, GateThresholds, PipelineCounts, QualityReport};
use crate::query::{self, CatalogQuery, QueryResult};

#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub records: Vec<CanonicalRecord>,
    pub index: IndexSet,
    pub report: QualityReport,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl CatalogSnapshot {
    /// Index `records` and run the quality gates over them. The pipeline
    /// counters (raw total, skipped, merged, conflicts) are only known to
    /// the run that produced the snapshot, so they are taken from the stored
    /// report when there is one. Everything else in the report describes
    /// `records`.
    pub fn build(
        records: Vec<CanonicalRecord>,
        stored_report: Option<QualityReport>,
        now: DateTime<Utc>,
    ) -> CatalogSnapshot {
        let index = IndexSet::build(&records);
        let counts = match &stored_report {
            Some(r) => PipelineCounts {
                total: r.total_records,
                processed: r.processed,
                skipped: r.skipped,
                duplicates_merged: r.duplicates_merged,
                merge_conflicts: r.merge_conflicts,
            },
            None => PipelineCounts {
                total: records.len(),
                processed: records.len(),
                ..Default::default()
            },
        };
        let report = quality::build_report(&records, counts, &GateThresholds::default(), now);
        CatalogSnapshot {
            records,
            index,
            report,
            loaded_at: Some(now),
        }
    }

    pub fn empty() -> CatalogSnapshot {
        CatalogSnapshot::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CanonicalRecord> {
        self.index.position(id).and_then(|pos| self.records.get(pos))
    }

    pub fn query(&self, query: &CatalogQuery) -> QueryResult {
        query::execute(&self.records, &self.index, query)
    }

    pub fn facets(&self) -> &Facets {
        &self.index.facets
    }
}
