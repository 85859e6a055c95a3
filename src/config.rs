use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::naming::DEFAULT_MAX_SEQUENCE;

/// Top-level configuration for the renamer.
///
/// Controls pipeline concurrency, naming limits, which metadata reader is used,
/// and output behavior (dry run).
///
/// # Loading
///
/// ```rust,no_run
/// use exif_renamer::config::{Config, ExtractorBackend};
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.pipeline.workers = 8;
/// config.extractor.backend = ExtractorBackend::ExifTool;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker count and queue size.
    pub pipeline: PipelineConfig,
    /// Sequence index limits for canonical names.
    pub naming: NamingConfig,
    /// Which metadata reader to use.
    pub extractor: ExtractorConfig,
    /// Output behavior (dry run).
    pub output: OutputConfig,
}

/// Concurrency settings for the file pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of files processed at once. Values below 1 are treated as 1.
    pub workers: usize,
    /// Paths buffered between discovery and the workers before discovery waits.
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Highest `_NN` suffix tried for one second before the file is reported.
    pub max_sequence: u32,
}

/// Metadata reader selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorBackend {
    /// Built-in nom-exif reader.
    #[default]
    Native,
    /// External `exiftool`, kept running for the whole batch.
    ExifTool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub backend: ExtractorBackend,
    /// exiftool binary, looked up on `PATH` unless absolute.
    pub exiftool_path: String,
}

/// Output and behavior configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// If `true`, report what would be renamed without touching any file.
    pub dry_run: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 100,
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            max_sequence: DEFAULT_MAX_SEQUENCE,
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            backend: ExtractorBackend::Native,
            exiftool_path: "exiftool".to_string(),
        }
    }
}

impl Config {
    /// Resolve the config file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.pipeline.queue_capacity, 100);
        assert_eq!(config.naming.max_sequence, 99);
        assert_eq!(config.extractor.backend, ExtractorBackend::Native);
        assert!(!config.output.dry_run);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.pipeline.workers = 2;
        config.extractor.backend = ExtractorBackend::ExifTool;
        config.save(Some(&path)).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.pipeline.workers, 2);
        assert_eq!(loaded.extractor.backend, ExtractorBackend::ExifTool);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"extractor": {"backend": "exiftool"}}"#).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.extractor.backend, ExtractorBackend::ExifTool);
        assert_eq!(loaded.extractor.exiftool_path, "exiftool");
        assert_eq!(loaded.pipeline.queue_capacity, 100);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let loaded = Config::load(Some(Path::new("/nonexistent/config.json"))).unwrap();
        assert_eq!(loaded.naming.max_sequence, 99);
    }

    #[test]
    fn invalid_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
