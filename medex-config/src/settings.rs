use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Source that produced the loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

fn default_roots() -> Vec<PathBuf> {
    // Development fallback when no share roots are configured.
    vec![PathBuf::from("./demodata")]
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./data/medex.sqlite")
}

/// Top-level service settings. Use these to point Medex at the share
/// roots to index and to tune how the ingest pipeline spends its workers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Share roots to scan and watch, in order. A root that is missing at
    /// startup is skipped with a warning; the service only refuses to
    /// start when none of the roots can be watched.
    pub roots: Vec<PathBuf>,
    /// SQLite database file. Created on first start.
    pub database_path: PathBuf,
    /// Working directory for derived files: thumbnail cache, converted
    /// documents, and the dead-letter log.
    pub data_dir: PathBuf,
    /// Walk every root at startup, cataloging files that appeared while
    /// the service was down. Disable when restarting quickly against a
    /// very large share.
    pub scan_on_start: bool,
    pub ingest: IngestConfig,
    pub http: HttpConfig,
}

/// Ingest pipeline tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Shared event queue capacity. Producers block when it fills, which
    /// back-pressures a burst (a batch copy) instead of dropping events.
    pub queue_capacity: usize,
    /// Synchronizer workers. Events for one path always land on the same
    /// worker; more workers only help across distinct paths.
    pub sync_workers: usize,
    /// How long shutdown waits for queued events before abandoning them.
    pub shutdown_grace_ms: u64,
    /// Store writes retry this many times total on transient faults.
    pub write_retry_attempts: u32,
    /// Base backoff between store-write retries; doubles per attempt.
    pub write_retry_backoff_ms: u64,
}

/// HTTP read-API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address for the read-only catalog API.
    pub bind: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            database_path: default_database_path(),
            data_dir: default_data_dir(),
            scan_on_start: true,
            ingest: IngestConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            sync_workers: 4,
            shutdown_grace_ms: 5_000,
            write_retry_attempts: 3,
            write_retry_backoff_ms: 100,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration using environment variables. Evaluation order:
    /// 1) `$MEDEX_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$MEDEX_CONFIG_JSON` (inline JSON),
    /// 3) `./medex.toml` when present,
    /// 4) defaults.
    pub fn load_from_env() -> anyhow::Result<(Self, ConfigSource)> {
        if let Ok(path_str) = env::var("MEDEX_CONFIG_PATH") {
            if !path_str.trim().is_empty() {
                let path = PathBuf::from(path_str);
                let config = Self::load_from_file(&path)?;
                return Ok((config, ConfigSource::EnvPath(path)));
            }
        }

        if let Ok(raw) = env::var("MEDEX_CONFIG_JSON") {
            if !raw.trim().is_empty() {
                let config = Self::parse_json(&raw)
                    .context("failed to parse MEDEX_CONFIG_JSON")?;
                return Ok((config, ConfigSource::EnvInline));
            }
        }

        let local = PathBuf::from("./medex.toml");
        if local.is_file() {
            let config = Self::load_from_file(&local)?;
            return Ok((config, ConfigSource::File(local)));
        }

        Ok((Self::default(), ConfigSource::Default))
    }

    /// Parse a configuration file, TOML by default, JSON when the file
    /// carries a `.json` extension.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                Self::parse_json(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
            }
            _ => Self::parse_toml(&raw).with_context(|| format!("invalid TOML in {}", path.display())),
        }
    }

    fn parse_toml(raw: &str) -> anyhow::Result<Self> {
        toml::from_str(raw).map_err(|err| anyhow!(err))
    }

    fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).map_err(|err| anyhow!(err))
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn thumbnail_dir(&self) -> PathBuf {
        self.cache_dir().join("thumbnails")
    }

    pub fn dead_letter_path(&self) -> PathBuf {
        self.data_dir.join("dead_letter.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_dev_root() {
        let config = AppConfig::default();
        assert_eq!(config.roots, vec![PathBuf::from("./demodata")]);
        assert!(config.scan_on_start);
        assert_eq!(config.ingest.sync_workers, 4);
        assert_eq!(config.http.bind, "127.0.0.1:8000");
        assert_eq!(
            config.dead_letter_path(),
            PathBuf::from("./data/dead_letter.jsonl")
        );
    }

    #[test]
    fn test_load_toml_with_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medex.toml");
        fs::write(
            &path,
            r#"
roots = ["/mnt/nas/내과", "/mnt/nas/영상의학과"]
scan_on_start = false

[ingest]
sync_workers = 8
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.roots.len(), 2);
        assert!(!config.scan_on_start);
        assert_eq!(config.ingest.sync_workers, 8);
        // Untouched fields keep their defaults.
        assert_eq!(config.ingest.queue_capacity, 1024);
        assert_eq!(config.http.bind, "127.0.0.1:8000");
    }

    #[test]
    fn test_load_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medex.json");
        fs::write(
            &path,
            r#"{"roots": ["/mnt/nas"], "http": {"bind": "0.0.0.0:8000"}}"#,
        )
        .unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.roots, vec![PathBuf::from("/mnt/nas")]);
        assert_eq!(config.http.bind, "0.0.0.0:8000");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medex.toml");
        fs::write(&path, "roots = not-a-list").unwrap();
        assert!(AppConfig::load_from_file(&path).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(AppConfig::load_from_file(Path::new("/nonexistent/medex.toml")).is_err());
    }
}
