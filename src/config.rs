//! Configuration management for the RustMaps CLI
//!
//! Two pieces live here: [`AppPaths`], the directory layout under the
//! application directory, and [`AppConfig`], the optional `settings.toml`
//! holding tunables. A missing settings file means defaults everywhere.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::app::client::ClientConfig;
use crate::app::download::DownloadConfig;
use crate::app::generator::GeneratorConfig;
use crate::constants::{api, files, generation, http, limits};
use crate::errors::{ConfigError, ConfigResult};

/// Directory layout of the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Application directory, `~/.rustmaps` unless overridden
    pub base: PathBuf,
    pub config_file: PathBuf,
    pub settings_file: PathBuf,
    pub imports_dir: PathBuf,
    pub downloads_dir: PathBuf,
    pub log_file: PathBuf,
}

impl AppPaths {
    /// Layout rooted at `base`
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            config_file: base.join(files::CONFIG_FILE),
            settings_file: base.join(files::SETTINGS_FILE),
            imports_dir: base.join(files::IMPORTS_DIR),
            downloads_dir: base.join(files::DOWNLOADS_DIR),
            log_file: base.join(files::LOG_FILE),
            base,
        }
    }

    /// Layout under `home_override`, or under the user's home directory
    ///
    /// # Errors
    ///
    /// Returns `NoHomeDirectory` if no override is given and the home
    /// directory cannot be determined
    pub fn resolve(home_override: Option<&Path>) -> ConfigResult<Self> {
        match home_override {
            Some(base) => Ok(Self::new(base)),
            None => {
                let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
                Ok(Self::new(home.join(files::APP_DIR)))
            }
        }
    }

    /// Create the application, imports and downloads directories
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` naming the directory that could not be created
    pub fn ensure_dirs(&self) -> ConfigResult<()> {
        for dir in [&self.base, &self.imports_dir, &self.downloads_dir] {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        debug!("Using application directory {}", self.base.display());
        Ok(())
    }

    /// Name and path of every resource, for display
    pub fn entries(&self) -> [(&'static str, &Path); 5] {
        [
            ("Config", self.config_file.as_path()),
            ("Settings", self.settings_file.as_path()),
            ("Imports", self.imports_dir.as_path()),
            ("Downloads", self.downloads_dir.as_path()),
            ("Log", self.log_file.as_path()),
        ]
    }
}

/// Unified application settings for TOML serialization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote API settings
    pub api: ApiConfigToml,
    /// Orchestration loop settings
    pub generation: GenerationConfigToml,
    /// Asset download settings
    pub download: DownloadConfigToml,
}

/// TOML-friendly API client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfigToml {
    /// API root URL
    pub base_url: String,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Global ceiling on API calls (0 = unpaced)
    pub calls_per_minute: u32,
}

impl Default for ApiConfigToml {
    fn default() -> Self {
        Self {
            base_url: api::BASE_URL.to_string(),
            request_timeout_secs: http::REQUEST_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            calls_per_minute: limits::CALLS_PER_MINUTE,
        }
    }
}

/// TOML-friendly orchestration loop configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfigToml {
    /// Sleep after an idle tick, in seconds
    pub idle_backoff_secs: u64,
    /// Sleep after a submitting tick, in seconds
    pub submit_pacing_secs: u64,
    /// Re-verify complete maps older than this, in seconds
    pub freshness_window_secs: u64,
    /// New submissions per tick
    pub submissions_per_tick: usize,
}

impl Default for GenerationConfigToml {
    fn default() -> Self {
        Self {
            idle_backoff_secs: generation::IDLE_BACKOFF.as_secs(),
            submit_pacing_secs: generation::SUBMIT_PACING.as_secs(),
            freshness_window_secs: generation::FRESHNESS_WINDOW.as_secs(),
            submissions_per_tick: generation::SUBMISSIONS_PER_TICK,
        }
    }
}

/// TOML-friendly download configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfigToml {
    /// Retries after a failed asset download
    pub max_retries: u32,
    /// First retry delay in seconds; doubles per retry
    pub base_delay_secs: u64,
}

impl Default for DownloadConfigToml {
    fn default() -> Self {
        Self {
            max_retries: limits::DOWNLOAD_MAX_RETRIES,
            base_delay_secs: limits::DOWNLOAD_BASE_DELAY.as_secs(),
        }
    }
}

impl AppConfig {
    /// Load settings from `path`, falling back to defaults if it is absent
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, is not valid TOML or
    /// holds an invalid value
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_toml(&content)?;

        info!("Loaded settings from: {}", path.display());
        Ok(config)
    }

    /// Parse and validate settings text
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` or `InvalidValue`
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make the tool misbehave
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` naming the offending field
    pub fn validate(&self) -> ConfigResult<()> {
        Url::parse(&self.api.base_url).map_err(|e| ConfigError::InvalidValue {
            field: "api.base_url".to_string(),
            value: self.api.base_url.clone(),
            reason: e.to_string(),
        })?;

        if self.api.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "api.request_timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "Requests need a non-zero timeout".to_string(),
            });
        }

        if self.generation.submissions_per_tick == 0 {
            return Err(ConfigError::InvalidValue {
                field: "generation.submissions_per_tick".to_string(),
                value: "0".to_string(),
                reason: "At least one submission per tick is required".to_string(),
            });
        }

        Ok(())
    }

    /// Runtime configuration of the API client
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api.base_url.clone(),
            request_timeout: Duration::from_secs(self.api.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.api.connect_timeout_secs),
            calls_per_minute: self.api.calls_per_minute,
            ..ClientConfig::default()
        }
    }

    /// Runtime configuration of the orchestration loop
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            idle_backoff: Duration::from_secs(self.generation.idle_backoff_secs),
            submit_pacing: Duration::from_secs(self.generation.submit_pacing_secs),
            freshness_window: Duration::from_secs(self.generation.freshness_window_secs),
            submissions_per_tick: self.generation.submissions_per_tick,
        }
    }

    /// Runtime configuration of the download manager
    pub fn download_config(&self) -> DownloadConfig {
        DownloadConfig {
            max_retries: self.download.max_retries,
            base_delay: Duration::from_secs(self.download.base_delay_secs),
        }
    }
}
