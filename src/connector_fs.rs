//! Filesystem raw record source.
//!
//! Walks `[sources.raw].root`, keeps files matching the include globs and
//! not matching the exclude globs, and reads records from them:
//!
//! | Extension | Layout |
//! |-----------|--------|
//! | `.jsonl` | one JSON object per line |
//! | `.json` | an object, an array of objects, or an object wrapping an array under `records`, `products` or `hoists` |
//!
//! Files are read in sorted path order so a pipeline run is deterministic.
//! Unreadable files and malformed lines are logged and skipped.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use hoist_catalog_core::models::RawRecord;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::RawSourceConfig;
use crate::traits::RecordSource;

const WRAPPER_KEYS: [&str; 3] = ["records", "products", "hoists"];

pub struct FsRecordSource {
    config: RawSourceConfig,
}

impl FsRecordSource {
    pub fn new(config: RawSourceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RecordSource for FsRecordSource {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn description(&self) -> &str {
        "JSON and JSONL record exports on local disk"
    }

    async fn scan(&self) -> Result<Vec<RawRecord>> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || scan_filesystem(&config))
            .await
            .context("filesystem scan task failed")?
    }
}

/// Matching files under the root, sorted by relative path.
pub fn list_files(config: &RawSourceConfig) -> Result<Vec<PathBuf>> {
    let root = &config.root;
    if !root.exists() {
        bail!("Raw source root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = Vec::new();
    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }
        files.push((rel_str, path.to_path_buf()));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files.into_iter().map(|(_, p)| p).collect())
}

pub fn scan_filesystem(config: &RawSourceConfig) -> Result<Vec<RawRecord>> {
    let mut records = Vec::new();
    for path in list_files(config)? {
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        let before = records.len();
        if is_jsonl(&path) {
            read_jsonl(&path, &content, &mut records);
        } else {
            read_json(&path, &content, &mut records);
        }
        debug!(file = %path.display(), records = records.len() - before, "read raw file");
    }
    Ok(records)
}

fn is_jsonl(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("jsonl") || e.eq_ignore_ascii_case("ndjson"))
        .unwrap_or(false)
}

fn push_value(path: &Path, value: Value, out: &mut Vec<RawRecord>) {
    if !value.is_object() {
        debug!(file = %path.display(), "skipping non-object record");
        return;
    }
    match RawRecord::from_json(value) {
        Ok(r) => out.push(r),
        Err(e) => warn!(file = %path.display(), error = %e, "skipping malformed record"),
    }
}

fn read_jsonl(path: &Path, content: &str, out: &mut Vec<RawRecord>) {
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(v) => push_value(path, v, out),
            Err(e) => warn!(file = %path.display(), line = i + 1, error = %e, "skipping malformed line"),
        }
    }
}

fn read_json(path: &Path, content: &str, out: &mut Vec<RawRecord>) {
    let value = match serde_json::from_str::<Value>(content) {
        Ok(v) => v,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "skipping malformed JSON file");
            return;
        }
    };
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let wrapped = WRAPPER_KEYS
                .iter()
                .find(|k| map.get(**k).map(Value::is_array).unwrap_or(false))
                .and_then(|k| map.remove(*k));
            match wrapped {
                Some(Value::Array(items)) => items,
                _ => vec![Value::Object(map)],
            }
        }
        _ => Vec::new(),
    };
    for item in items {
        push_value(path, item, out);
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(root: &Path) -> RawSourceConfig {
        RawSourceConfig {
            root: root.to_path_buf(),
            include_globs: vec!["**/*.json".into(), "**/*.jsonl".into()],
            exclude_globs: vec!["**/skip/**".into()],
            follow_symlinks: false,
        }
    }

    #[test]
    fn test_reads_all_layouts() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("a.json"), r#"{"manufacturer": "GIS", "model": "LPM"}"#).unwrap();
        fs::write(
            root.join("b.json"),
            r#"[{"manufacturer": "CM", "model": "Lodestar"}, 42, {"model": "X"}]"#,
        )
        .unwrap();
        fs::write(
            root.join("c.json"),
            r#"{"scrapedAt": "2024-01-01", "hoists": [{"manufacturer": "Movecat", "model": "V1"}]}"#,
        )
        .unwrap();
        fs::write(
            root.join("d.jsonl"),
            "{\"manufacturer\": \"Kinesys\", \"model\": \"Libra\"}\n\nnot json\n{\"manufacturer\": \"Verlinde\", \"model\": \"SM5\"}\n",
        )
        .unwrap();
        fs::write(root.join("notes.txt"), "ignored").unwrap();
        fs::create_dir(root.join("skip")).unwrap();
        fs::write(root.join("skip/e.json"), r#"{"manufacturer": "X", "model": "Y"}"#).unwrap();

        let records = scan_filesystem(&config(root)).unwrap();
        let models: Vec<String> = records
            .iter()
            .filter_map(|r| r.model.as_ref().and_then(|m| m.as_text()))
            .collect();
        assert_eq!(models, vec!["LPM", "Lodestar", "X", "V1", "Libra", "SM5"]);
    }

    #[test]
    fn test_malformed_file_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("bad.json"), "{ nope").unwrap();
        fs::write(tmp.path().join("good.json"), r#"{"manufacturer": "GIS", "model": "LPM"}"#).unwrap();
        assert_eq!(scan_filesystem(&config(tmp.path())).unwrap().len(), 1);
    }

    #[test]
    fn test_null_list_items_keep_record() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("a.jsonl"),
            "{\"manufacturer\": \"GIS\", \"model\": \"LPM\", \"images\": [\"a.jpg\", null], \"classification\": [\"d8\", null]}\n",
        )
        .unwrap();
        let records = scan_filesystem(&config(tmp.path())).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].images.as_ref().unwrap().to_list(), vec!["a.jpg"]);
    }

    #[test]
    fn test_missing_root_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = scan_filesystem(&config(&tmp.path().join("missing"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_source_trait_scan() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.jsonl"), "{\"manufacturer\": \"GIS\", \"model\": \"LPM\"}\n").unwrap();
        let source = FsRecordSource::new(config(tmp.path()));
        assert_eq!(source.name(), "filesystem");
        assert_eq!(source.scan().await.unwrap().len(), 1);
    }
}
