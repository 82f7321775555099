//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MHTCONV_CONFIG` (environment variable)
//! 2. `~/.config/mhtconv/config.toml` (Linux/macOS)
//!    `%APPDATA%\mhtconv\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::output::ConvertOptions;

/// Bytes per megabyte used for `split_size_mb`.
pub const MIB: usize = 1024 * 1024;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Conversion defaults.
    pub convert: ConvertConfig,
    /// Performance tuning.
    pub performance: PerformanceConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
}

/// Conversion defaults, overridable from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Directory receiving the HTML and extracted files.
    pub output_dir: PathBuf,
    /// Maximum size of one HTML chunk, in MB.
    pub split_size_mb: usize,
    /// Split oversized HTML into chunks.
    pub split: bool,
    /// Inline images as `data:` URIs instead of extracting them.
    pub embed_images: bool,
    /// Rewrite resource references at all.
    pub process_images: bool,
    /// Folder for extracted files, relative to `output_dir`.
    pub images_dir: String,
}

/// Performance tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Worker threads for batch conversion (0 = one per CPU).
    pub jobs: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
        }
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./convert"),
            split_size_mb: 40,
            split: true,
            embed_images: false,
            process_images: true,
            images_dir: crate::model::output::DEFAULT_IMAGES_DIR.to_string(),
        }
    }
}

impl ConvertOptions {
    /// Conversion options described by `config`.
    pub fn from_config(config: &ConvertConfig) -> Self {
        let split_size_bytes = (config.split && config.split_size_mb > 0)
            .then(|| config.split_size_mb.saturating_mul(MIB));
        Self {
            split_size_bytes,
            embed_images: config.embed_images,
            process_images: config.process_images,
            images_dir: config.images_dir.clone(),
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MHTCONV_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mhtconv").join("config.toml"))
}

/// Return the cache directory used for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mhtconv")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mhtconv.log")
}
