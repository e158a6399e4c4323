use crate::error::{CoreError, Result};
use crate::model::{LayoutId, PageNumber, RecitationId, DEFAULT_LAYOUT_ID};
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Base URL of a locally running Mushaf service
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_RECITATION_ID: RecitationId = 1;
const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MushafReaderConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub mushaf: MushafConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Transport-level retries of transient failures
    #[serde(default)]
    pub max_retries: u32,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

impl ApiConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_retries: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MushafConfig {
    #[serde(default = "default_layout_id")]
    pub layout_id: LayoutId,
    /// Page opened at startup; clamped into the layout
    #[serde(default = "default_initial_page")]
    pub initial_page: PageNumber,
}

const fn default_layout_id() -> LayoutId {
    DEFAULT_LAYOUT_ID
}

const fn default_initial_page() -> PageNumber {
    1
}

impl Default for MushafConfig {
    fn default() -> Self {
        Self {
            layout_id: default_layout_id(),
            initial_page: default_initial_page(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_recitation_id")]
    pub recitation_id: RecitationId,
    /// Media clock update period
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

const fn default_recitation_id() -> RecitationId {
    DEFAULT_RECITATION_ID
}

const fn default_tick_interval() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

impl AudioConfig {
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            recitation_id: default_recitation_id(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to a file in the cache directory
    #[serde(default)]
    pub enabled: bool,
}

impl MushafReaderConfig {
    /// Load config from file or create template on first run
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template on
    /// first run, or an error if the file cannot be read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        let config_path = crate::paths::config_path();

        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound { path: config_path });
        }

        Self::load_from(&config_path)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(CoreError::ConfigInvalid { message });

        match url::Url::parse(&self.api.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return invalid(format!(
                    "api.base_url must be http or https, got {}",
                    url.scheme()
                ))
            }
            Err(e) => return invalid(format!("api.base_url {:?}: {e}", self.api.base_url)),
        }
        if self.api.timeout_secs == 0 {
            return invalid("api.timeout_secs must be greater than 0".into());
        }
        if self.audio.tick_interval_ms == 0 {
            return invalid("audio.tick_interval_ms must be greater than 0".into());
        }
        Ok(())
    }
}

pub const CONFIG_TEMPLATE: &str = concatcp!(
    r#"# Mushaf Reader Configuration
# ~/.config/mushaf-reader/config.toml

[api]
# Mushaf service root; endpoints such as /qul/page/{n} are resolved against it
base_url = ""#,
    DEFAULT_BASE_URL,
    "\"\ntimeout_secs = ",
    DEFAULT_TIMEOUT_SECS,
    "\nconnect_timeout_secs = ",
    DEFAULT_CONNECT_TIMEOUT_SECS,
    r#"
# Retries of transient transport failures (connection errors, 5xx); 0 disables
max_retries = 0

[mushaf]
# Pagination scheme; falls back to the first published layout if unknown
layout_id = "#,
    DEFAULT_LAYOUT_ID,
    r#"
initial_page = 1

[audio]
recitation_id = "#,
    DEFAULT_RECITATION_ID,
    "\ntick_interval_ms = ",
    DEFAULT_TICK_INTERVAL_MS,
    r#"

[logging]
# Write logs to ~/.cache/mushaf-reader/mushaf-reader.log as well as stderr
enabled = false
"#
);
