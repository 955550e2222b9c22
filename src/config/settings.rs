//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! Every field has a serde default, so a partial `settings.toml` only needs
//! to name the values it overrides.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Settings for turning the live key stream into sentences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Inactivity window in milliseconds after which an unfinished sentence
    /// is flushed.
    pub debounce_ms: u64,
    /// Characters that end a sentence and flush it immediately.
    pub terminators: String,
    /// Global key combination that toggles automatic correction
    /// (e.g. `"Ctrl+Shift+X"`).
    pub toggle_hotkey: String,
    /// Whether automatic correction is active when the app starts.
    pub start_enabled: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1500,
            terminators: ".?!".into(),
            toggle_hotkey: "Ctrl+Shift+X".into(),
            start_enabled: true,
        }
    }
}

impl CaptureConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// ---------------------------------------------------------------------------
// ServiceConfig
// ---------------------------------------------------------------------------

/// Settings for the external correction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the service; requests go to `{base_url}/correct`.
    pub base_url: String,
    /// Per-request timeout for the automatic correction loop.
    pub request_timeout_secs: u64,
    /// Delay between attempts while the service is warming up.
    pub retry_delay_ms: u64,
    /// Maximum number of attempts per sentence (100 × 3 s ≈ 5 minutes).
    pub max_attempts: u32,
    /// Timeout of the single attempt made by the manual `correct` command.
    pub manual_timeout_secs: u64,
    /// Command line used to launch the service; empty means the service is
    /// managed elsewhere.
    pub launch_command: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".into(),
            request_timeout_secs: 15,
            retry_delay_ms: 3000,
            max_attempts: 100,
            manual_timeout_secs: 60,
            launch_command: Vec::new(),
        }
    }
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn manual_timeout(&self) -> Duration {
        Duration::from_secs(self.manual_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// RewriteConfig
// ---------------------------------------------------------------------------

/// Settings for the delete-then-retype rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Pause between synthetic delete keys, in milliseconds.
    pub key_delay_ms: u64,
    /// Pause after the rewrite before capture resumes, in milliseconds.
    pub settle_ms: u64,
    /// Always treat the sentence as followed by a consumed boundary
    /// character: delete one extra character and retype a trailing space.
    pub phrase_mode: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            key_delay_ms: 15,
            settle_ms: 100,
            phrase_mode: false,
        }
    }
}

impl RewriteConfig {
    pub fn key_delay(&self) -> Duration {
        Duration::from_millis(self.key_delay_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use text_pilot::config::AppConfig;
///
/// // Default when the file is missing
/// let mut config = AppConfig::load().unwrap();
///
/// config.capture.debounce_ms = 2000;
/// config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Key capture / segmentation settings.
    pub capture: CaptureConfig,
    /// Correction service settings.
    pub service: ServiceConfig,
    /// Synthetic rewrite settings.
    pub rewrite: RewriteConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
