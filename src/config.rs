//! Configuration types for plaza.
//!
//! Loaded from `plaza.toml`. Every section is optional and falls back to
//! defaults suitable for a single-node deployment under the plaza home
//! directory:
//!
//! - [`StoreConfig`] - document store backend and location
//! - [`BlobConfig`] - blob store backend and location
//! - [`EngagementConfig`] - bulk-like cap
//! - [`StoriesConfig`] - tombstone retention and sweep batch size
//! - [`SweeperConfig`] - cron schedule and optional metrics listener
//! - [`LoggingConfig`] - log format and default level

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::constants;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// plaza.toml configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub store: StoreConfig,
    pub blobs: BlobConfig,
    pub engagement: EngagementConfig,
    pub stories: StoriesConfig,
    pub sweeper: SweeperConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redb,
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Database file. Defaults to `<plaza home>/plaza.redb`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackendKind {
    #[default]
    Filesystem,
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
    pub backend: BlobBackendKind,
    /// Blob directory. Defaults to `<plaza home>/blobs/`.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    pub bulk_like_limit: usize,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            bulk_like_limit: constants::MAX_BULK_LIKE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoriesConfig {
    pub tombstone_retention_hours: u64,
    pub sweep_batch_size: usize,
}

impl Default for StoriesConfig {
    fn default() -> Self {
        Self {
            tombstone_retention_hours: constants::DEFAULT_TOMBSTONE_RETENTION_HOURS,
            sweep_batch_size: constants::DEFAULT_SWEEP_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweeperConfig {
    /// 6-field cron expression, seconds first.
    pub schedule: String,
    /// Address for the Prometheus scrape endpoint, e.g. `127.0.0.1:9464`.
    pub metrics_addr: Option<String>,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            schedule: constants::DEFAULT_SWEEP_SCHEDULE.to_string(),
            metrics_addr: None,
        }
    }
}

impl SweeperConfig {
    /// Parsed metrics listener address, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if `metrics_addr` is not a socket address.
    pub fn metrics_socket(&self) -> Result<Option<SocketAddr>> {
        self.metrics_addr
            .as_deref()
            .map(|addr| {
                addr.parse::<SocketAddr>()
                    .with_context(|| format!("Invalid sweeper.metrics_addr: {addr}"))
            })
            .transpose()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, or defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the plaza home cannot be resolved or an existing
    /// config file cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = crate::paths::get_config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - A field has an invalid type or an unknown section is present
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error listing every problem found:
    /// - `bulk_like_limit` outside `1..=50`
    /// - zero `sweep_batch_size`
    /// - a sweep schedule that is not 6 cron fields
    /// - an unparsable metrics address
    /// - an empty path for a persistent backend
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Backends
        if self.store.backend == StoreBackend::Memory {
            warnings.push(
                "store.backend = \"memory\": counters and follow edges are lost on exit"
                    .to_string(),
            );
        }
        if let Some(path) = &self.store.path {
            if path.as_os_str().is_empty() {
                errors.push("store.path cannot be empty".to_string());
            } else if self.store.backend == StoreBackend::Memory {
                warnings.push("store.path is ignored by the memory backend".to_string());
            }
        }
        if let Some(dir) = &self.blobs.dir {
            if dir.as_os_str().is_empty() {
                errors.push("blobs.dir cannot be empty".to_string());
            } else if dir.exists() && !dir.is_dir() {
                errors.push(format!("blobs.dir is not a directory: {}", dir.display()));
            }
        }
        if self.blobs.backend == BlobBackendKind::Memory
            && self.store.backend == StoreBackend::Redb
        {
            warnings.push(
                "blobs.backend = \"memory\" with a persistent store: \
                 story media will not survive a restart"
                    .to_string(),
            );
        }

        // 2. Engagement
        let limit = self.engagement.bulk_like_limit;
        if limit == 0 || limit > constants::MAX_BULK_LIKE {
            errors.push(format!(
                "engagement.bulk_like_limit must be between 1 and {}, got {limit}",
                constants::MAX_BULK_LIKE
            ));
        }

        // 3. Stories
        if self.stories.sweep_batch_size == 0 {
            errors.push("stories.sweep_batch_size must be at least 1".to_string());
        }
        if self.stories.tombstone_retention_hours == 0 {
            warnings.push(
                "stories.tombstone_retention_hours = 0: \
                 reclaimed stories answer NotFound after the next sweep"
                    .to_string(),
            );
        }

        // 4. Sweeper
        let fields = self.sweeper.schedule.split_whitespace().count();
        if fields != 6 {
            errors.push(format!(
                "sweeper.schedule must have 6 fields (sec min hour day month weekday), \
                 got {fields}: '{}'",
                self.sweeper.schedule
            ));
        }
        if let Err(e) = self.sweeper.metrics_socket() {
            errors.push(format!("{e:#}"));
        }

        // 5. Logging
        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&self.logging.level) {
            errors.push(format!("logging.level is not a valid filter: {e}"));
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        Ok(ValidationResult { warnings })
    }

    /// Document store path, defaulting under the plaza home.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the plaza home cannot
    /// be resolved.
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store.path {
            Some(path) => Ok(path.clone()),
            None => crate::paths::get_store_path(),
        }
    }

    /// Blob directory, defaulting under the plaza home.
    ///
    /// # Errors
    ///
    /// Returns an error if no directory is configured and the plaza home
    /// cannot be resolved.
    pub fn blob_dir(&self) -> Result<PathBuf> {
        match &self.blobs.dir {
            Some(dir) => Ok(dir.clone()),
            None => crate::paths::get_blobs_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.store.backend, StoreBackend::Redb);
        assert_eq!(config.blobs.backend, BlobBackendKind::Filesystem);
        assert_eq!(config.engagement.bulk_like_limit, 50);
        assert_eq!(config.stories.tombstone_retention_hours, 168);
        assert_eq!(config.sweeper.schedule, "0 */5 * * * *");
        assert_eq!(config.logging.format, LogFormat::Pretty);

        let result = config.validate().unwrap();
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[store]
backend = "redb"
path = "/var/lib/plaza/plaza.redb"

[blobs]
backend = "filesystem"
dir = "/var/lib/plaza/blobs"

[engagement]
bulk_like_limit = 25

[stories]
tombstone_retention_hours = 48
sweep_batch_size = 200

[sweeper]
schedule = "0 * * * * *"
metrics_addr = "127.0.0.1:9464"

[logging]
format = "json"
level = "plaza=debug"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.store_path().unwrap(), PathBuf::from("/var/lib/plaza/plaza.redb"));
        assert_eq!(config.blob_dir().unwrap(), PathBuf::from("/var/lib/plaza/blobs"));
        assert_eq!(config.engagement.bulk_like_limit, 25);
        assert_eq!(config.stories.sweep_batch_size, 200);
        assert_eq!(
            config.sweeper.metrics_socket().unwrap(),
            Some("127.0.0.1:9464".parse().unwrap())
        );
        assert_eq!(config.logging.format, LogFormat::Json);
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[server]\nport = 80\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result: std::result::Result<Config, _> =
            toml::from_str("[store]\nbackend = \"sqlite\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_bulk_like_limit_bounds() {
        for limit in [0, 51] {
            let mut config = Config::default();
            config.engagement.bulk_like_limit = limit;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("bulk_like_limit"), "{err}");
        }

        let mut config = Config::default();
        config.engagement.bulk_like_limit = 1;
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = Config::default();
        config.stories.sweep_batch_size = 0;
        config.sweeper.schedule = "*/5 * * * *".to_string();
        config.sweeper.metrics_addr = Some("localhost".to_string());

        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("sweep_batch_size"));
        assert!(msg.contains("6 fields"));
        assert!(msg.contains("metrics_addr"));
    }

    #[test]
    fn test_validate_memory_backend_warns() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Memory;
        config.store.path = Some(PathBuf::from("ignored.redb"));

        let result = config.validate().unwrap();
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plaza.toml");
        fs::write(&path, "[engagement]\nbulk_like_limit = 10\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.engagement.bulk_like_limit, 10);

        let err = Config::load_from(dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
