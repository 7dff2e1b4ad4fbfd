//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every section carries `#[serde(default)]` so a settings file written by an
//! older build (missing newer keys) still loads.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// ApiConfig
// ---------------------------------------------------------------------------

/// Third-party API credentials.  Providers without a key are skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Yandex Dictionary API key (word translations).
    pub yandex_key: Option<String>,
    /// Pexels API key (illustrative images).
    pub pexels_key: Option<String>,
}

// ---------------------------------------------------------------------------
// TranslationConfig
// ---------------------------------------------------------------------------

/// Language pair and HTTP behaviour for the lookup services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// ISO-639-1 code of the language being typed.
    pub source_lang: String,
    /// ISO-639-1 code translations are produced in.
    pub target_lang: String,
    /// Per-request timeout for every lookup service.
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_lang: "en".into(),
            target_lang: "ru".into(),
            timeout_secs: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// UserConfig
// ---------------------------------------------------------------------------

/// Per-user preferences adjustable from the companion window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Vocabulary level 0-100.  Words ranked below `level × 100` in the
    /// frequency list are considered too simple to look up.
    pub vocab_level: u32,
    /// Play the pronunciation automatically for every looked-up word.
    pub auto_pronounce: bool,
    /// Show the live sentence panel.
    pub show_sentence_window: bool,
    /// Default pronunciation voice (`"us"` or `"uk"`).
    pub voice: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            vocab_level: 10,
            auto_pronounce: true,
            show_sentence_window: true,
            voice: "us".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Timing constants of the event-to-task pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Quiet period after the last word boundary before the sentence is
    /// translated.
    pub sentence_debounce_ms: u64,
    /// Minimum interval between two accepted clipboard lookups.
    pub clipboard_throttle_ms: u64,
    /// How long a keyboard-layout answer is trusted.
    pub layout_ttl_ms: u64,
    /// Number of audio-cache polls before falling back to streaming.
    pub audio_poll_attempts: u32,
    /// Interval between two audio-cache polls.
    pub audio_poll_interval_ms: u64,
    /// Longest clipboard text still treated as a single word.
    pub max_clipboard_word_len: usize,
    /// How long shutdown waits for running lookups before abandoning them.
    pub shutdown_grace_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sentence_debounce_ms: 100,
            clipboard_throttle_ms: 500,
            layout_ttl_ms: 500,
            audio_poll_attempts: 20,
            audio_poll_interval_ms: 100,
            max_clipboard_word_len: 50,
            shutdown_grace_ms: 500,
        }
    }
}

impl PipelineConfig {
    pub fn sentence_debounce(&self) -> Duration {
        Duration::from_millis(self.sentence_debounce_ms)
    }

    pub fn clipboard_throttle(&self) -> Duration {
        Duration::from_millis(self.clipboard_throttle_ms)
    }

    pub fn layout_ttl(&self) -> Duration {
        Duration::from_millis(self.layout_ttl_ms)
    }

    pub fn audio_poll_interval(&self) -> Duration {
        Duration::from_millis(self.audio_poll_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

// ---------------------------------------------------------------------------
// LayoutConfig
// ---------------------------------------------------------------------------

/// Keyboard-layout detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Layout name the command probe must report (prefix match), e.g. `"us"`.
    pub target_layout: String,
    /// Shell command printing the active layout (non-Windows only), e.g.
    /// `"xkb-switch -p"`.  `None` treats every layout as the target one.
    pub command: Option<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            target_layout: "us".into(),
            command: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Pronunciation playback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Player command; the audio file path is appended as the last argument.
    /// `None` picks a platform default (`afplay`, `ffplay`, PowerShell).
    pub player: Option<String>,
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// egui companion window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Last saved window position `(x, y)` in screen pixels.  `None` lets the
    /// window manager pick.
    pub window_position: Option<(f32, f32)>,
    /// Window size `(width, height)`.
    pub window_size: (f32, f32),
    /// Keep the window floating above all other windows.
    pub always_on_top: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_position: None,
            window_size: (416.0, 640.0),
            always_on_top: true,
        }
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
/// use english_helper::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub translation: TranslationConfig,
    pub user: UserConfig,
    pub pipeline: PipelineConfig,
    pub layout: LayoutConfig,
    pub audio: AudioConfig,
    pub ui: UiConfig,
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

    /// Load from an explicit path (useful for tests).
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

    /// Save to an explicit path (useful for tests).
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
