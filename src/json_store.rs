//! JSON-file [`SnapshotStore`] backend.
//!
//! The snapshot is a pretty-printed JSON document:
//!
//! ```json
//! { "generatedAt": "2024-05-01T12:00:00Z", "count": 2, "records": [ ... ] }
//! ```
//!
//! A bare array of records is also accepted on load. Writes go to a
//! sibling `*.tmp` file that is renamed over the target, so a reader never
//! observes a half-written snapshot. A missing file loads as an empty
//! catalog.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hoist_catalog_core::models::CanonicalRecord;
use hoist_catalog_core::quality::QualityReport;
use hoist_catalog_core::store::SnapshotStore;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::StoreConfig;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotFileRef<'a> {
    generated_at: DateTime<Utc>,
    count: usize,
    records: &'a [CanonicalRecord],
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Bare(Vec<CanonicalRecord>),
    Envelope { records: Vec<CanonicalRecord> },
}

pub struct JsonFileStore {
    snapshot_path: PathBuf,
    report_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(snapshot_path: impl Into<PathBuf>, report_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            report_path: report_path.into(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(&config.snapshot_path, &config.report_path)
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }
}

/// File contents, or `None` when the file does not exist.
async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

async fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, content)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load_snapshot(&self) -> Result<Vec<CanonicalRecord>> {
        let Some(content) = read_optional(&self.snapshot_path).await? else {
            debug!(path = %self.snapshot_path.display(), "no snapshot yet");
            return Ok(Vec::new());
        };
        let file: SnapshotFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot {}", self.snapshot_path.display()))?;
        Ok(match file {
            SnapshotFile::Bare(records) => records,
            SnapshotFile::Envelope { records } => records,
        })
    }

    async fn save_snapshot(&self, records: &[CanonicalRecord]) -> Result<()> {
        let file = SnapshotFileRef {
            generated_at: Utc::now(),
            count: records.len(),
            records,
        };
        let json = serde_json::to_vec_pretty(&file)?;
        write_atomic(&self.snapshot_path, &json).await
    }

    async fn save_report(&self, report: &QualityReport) -> Result<()> {
        let json = serde_json::to_vec_pretty(report)?;
        write_atomic(&self.report_path, &json).await
    }

    async fn load_report(&self) -> Result<Option<QualityReport>> {
        let Some(content) = read_optional(&self.report_path).await? else {
            return Ok(None);
        };
        let report = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse report {}", self.report_path.display()))?;
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str) -> CanonicalRecord {
        CanonicalRecord {
            id: id.into(),
            manufacturer: "GIS AG".into(),
            model: "LPM".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_files_load_empty() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path().join("c.json"), tmp.path().join("r.json"));
        assert!(store.load_snapshot().await.unwrap().is_empty());
        assert!(store.load_report().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(
            tmp.path().join("data/catalog.json"),
            tmp.path().join("data/report.json"),
        );
        store.save_snapshot(&[record("a"), record("b")]).await.unwrap();
        let loaded = store.load_snapshot().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].id, "b");
        assert!(!tmp.path().join("data/catalog.json.tmp").exists());

        let raw = std::fs::read_to_string(store.snapshot_path()).unwrap();
        assert!(raw.contains("\"count\": 2"));

        let report = QualityReport {
            catalog_size: 2,
            ..Default::default()
        };
        store.save_report(&report).await.unwrap();
        assert_eq!(store.load_report().await.unwrap().unwrap().catalog_size, 2);
    }

    #[tokio::test]
    async fn test_bare_array_accepted() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("c.json");
        std::fs::write(&path, r#"[{"id": "x", "manufacturer": "GIS AG", "model": "LPM"}]"#).unwrap();
        let store = JsonFileStore::new(&path, tmp.path().join("r.json"));
        assert_eq!(store.load_snapshot().await.unwrap()[0].id, "x");
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("c.json");
        std::fs::write(&path, "{ broken").unwrap();
        let store = JsonFileStore::new(&path, tmp.path().join("r.json"));
        assert!(store.load_snapshot().await.is_err());
    }
}
