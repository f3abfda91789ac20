//! Configuration management for refcheck.
//!
//! Loads configuration from ${REFCHECK_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::remote::RetryPolicy;

/// Env var that forces narration on (`1`/`true`) or off (`0`/`false`).
pub const NARRATION_ENV_VAR: &str = "REFCHECK_NARRATION";

pub mod paths {
    //! Path resolution for refcheck configuration.
    //!
    //! REFCHECK_HOME resolution order:
    //! 1. REFCHECK_HOME environment variable (if set)
    //! 2. ~/.config/refcheck (default)
    //! 3. ./.refcheck when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the refcheck home directory.
    pub fn refcheck_home() -> PathBuf {
        if let Ok(home) = std::env::var("REFCHECK_HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".refcheck"),
            |h| h.join(".config").join("refcheck"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        refcheck_home().join("config.toml")
    }
}

/// Gemini endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    /// API key (falls back to `GEMINI_API_KEY`)
    pub api_key: Option<String>,
    /// Base URL override (`GEMINI_BASE_URL` takes precedence)
    pub base_url: Option<String>,
    /// Model used for advisory answers
    pub text_model: String,
    /// Model used for narration synthesis
    pub speech_model: String,
    /// Prebuilt voice name for narration
    pub voice: String,
    /// Transport timeout in seconds (unset = transport default)
    pub timeout_secs: Option<u64>,
}

impl GeminiSettings {
    pub const DEFAULT_TEXT_MODEL: &str = "gemini-1.5-pro";
    pub const DEFAULT_SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";
    pub const DEFAULT_VOICE: &str = "Kore";
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            text_model: Self::DEFAULT_TEXT_MODEL.to_string(),
            speech_model: Self::DEFAULT_SPEECH_MODEL.to_string(),
            voice: Self::DEFAULT_VOICE.to_string(),
            timeout_secs: None,
        }
    }
}

/// Narration synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    /// Synthesize narration audio (off by default: slides play silently)
    pub enabled: bool,
    /// Sample rate assumed when the endpoint does not report one
    pub sample_rate: u32,
    /// How long a slide without audio stays up before auto-advancing (0 = manual only)
    pub silent_dwell_ms: u64,
}

impl NarrationConfig {
    pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;
    pub const DEFAULT_SILENT_DWELL_MS: u64 = 8_000;

    /// Dwell time for silent slides; `None` means manual advance only.
    pub fn silent_dwell(&self) -> Option<Duration> {
        (self.silent_dwell_ms > 0).then(|| Duration::from_millis(self.silent_dwell_ms))
    }
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sample_rate: Self::DEFAULT_SAMPLE_RATE,
            silent_dwell_ms: Self::DEFAULT_SILENT_DWELL_MS,
        }
    }
}

/// Retry settings shared by every remote call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts(),
            base_delay_ms: policy.base_delay().as_millis() as u64,
        }
    }
}

/// Advisory panel settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    /// Replaces the built-in system instruction
    pub system_prompt: Option<String>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive (`RUST_LOG` wins when set)
    pub filter: String,
    /// Optional log file; stderr is used when unset
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gemini: GeminiSettings,
    pub narration: NarrationConfig,
    pub retry: RetryConfig,
    pub advisory: AdvisoryConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&paths::config_path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(NARRATION_ENV_VAR) {
            match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => self.narration.enabled = true,
                "0" | "false" | "off" | "no" => self.narration.enabled = false,
                other => tracing::warn!("Ignoring {NARRATION_ENV_VAR}={other:?}"),
            }
        }
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, DEFAULT_CONFIG_TEMPLATE)
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# refcheck configuration

[gemini]
# api_key = "..."            # falls back to GEMINI_API_KEY
# base_url = "https://generativelanguage.googleapis.com/v1beta"
text_model = "gemini-1.5-pro"
speech_model = "gemini-2.5-flash-preview-tts"
voice = "Kore"
# timeout_secs = 60

[narration]
# Synthesized narration is off by default; slides then play silently.
enabled = false
sample_rate = 24000
# Silent slides advance after this many milliseconds (0 = manual only).
silent_dwell_ms = 8000

[retry]
max_attempts = 5
base_delay_ms = 1000

[advisory]
# system_prompt = "..."

[logging]
filter = "info"
# file = "/tmp/refcheck.log"
"#;
