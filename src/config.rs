//! TOML configuration for `hcat`.
//!
//! ```toml
//! [store]
//! snapshot_path = "./data/catalog.json"
//! report_path = "./data/quality_report.json"
//!
//! [sources.raw]
//! root = "./raw"
//! include_globs = ["**/*.json", "**/*.jsonl"]
//!
//! [cache]
//! ttl_secs = 300
//!
//! [query]
//! default_limit = 50
//! max_limit = 500
//!
//! [server]
//! bind = "127.0.0.1:7340"
//! ```
//!
//! Every section except `[store]` is optional.

use anyhow::{Context, Result};
use hoist_catalog_core::query::{QueryLimits, DEFAULT_LIMIT, DEFAULT_MAX_LIMIT};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub snapshot_path: PathBuf,
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
}

fn default_report_path() -> PathBuf {
    PathBuf::from("./data/quality_report.json")
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    pub raw: Option<RawSourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawSourceConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.json".to_string(), "**/*.jsonl".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    300
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}
fn default_max_limit() -> usize {
    DEFAULT_MAX_LIMIT
}

impl QueryConfig {
    pub fn limits(&self) -> QueryLimits {
        QueryLimits {
            default_limit: self.default_limit,
            max_limit: self.max_limit,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.store.snapshot_path.as_os_str().is_empty() {
        anyhow::bail!("store.snapshot_path must not be empty");
    }

    if config.query.max_limit < 1 {
        anyhow::bail!("query.max_limit must be >= 1");
    }
    if config.query.default_limit < 1 || config.query.default_limit > config.query.max_limit {
        anyhow::bail!(
            "query.default_limit must be in [1, {}] (query.max_limit)",
            config.query.max_limit
        );
    }

    if let Some(raw) = &config.sources.raw {
        if raw.include_globs.is_empty() {
            anyhow::bail!("sources.raw.include_globs must not be empty");
        }
    }

    Ok(())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}
