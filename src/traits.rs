//! Extension point for raw record sources.
//!
//! The pipeline reads raw product records through the [`RecordSource`]
//! trait. The built-in implementation is
//! [`FsRecordSource`](crate::connector_fs::FsRecordSource), which reads
//! JSON and JSONL exports from a directory tree; other feeds (a crawler
//! queue, a spreadsheet export) implement the same trait.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │ FsRecordSource│  │ custom source │
//! └──────┬───────┘   └──────┬───────┘
//!        └────────┬─────────┘
//!                 ▼
//!        run_pipeline() → normalize → dedupe → store
//! ```

use anyhow::Result;
use async_trait::async_trait;
use hoist_catalog_core::models::RawRecord;

/// A producer of unvalidated product records.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use hoist_catalog::traits::RecordSource;
/// use hoist_catalog_core::models::RawRecord;
///
/// pub struct SpreadsheetSource;
///
/// #[async_trait]
/// impl RecordSource for SpreadsheetSource {
///     fn name(&self) -> &str { "spreadsheet" }
///     fn description(&self) -> &str { "Rows exported from the manual entry sheet" }
///
///     async fn scan(&self) -> Result<Vec<RawRecord>> {
///         Ok(vec![])
///     }
/// }
/// ```
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Short identifier shown in pipeline output (e.g. `"filesystem"`).
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Read every record the source currently holds.
    ///
    /// Malformed individual records are skipped by the source; an error
    /// means the source as a whole could not be read.
    async fn scan(&self) -> Result<Vec<RawRecord>>;
}

/// Fixed list of records. Handy for embedding and tests.
pub struct MemoryRecordSource {
    name: String,
    records: Vec<RawRecord>,
}

impl MemoryRecordSource {
    pub fn new(name: &str, records: Vec<RawRecord>) -> Self {
        Self {
            name: name.to_string(),
            records,
        }
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "In-memory record list"
    }

    async fn scan(&self) -> Result<Vec<RawRecord>> {
        Ok(self.records.clone())
    }
}
