//! Configuration loading from TOML files and environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::hotkey::HotKeyChord;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub hotkey: HotKeyConfig,
    #[serde(default)]
    pub popup: PopupConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Camera gesture detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Whether hand tracking runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Landmarks must be strictly more confident than this (0.0-1.0).
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Minimum per-frame rise of the fingertips that counts as reaching forward.
    #[serde(default = "default_forward_delta")]
    pub forward_delta: f64,
    /// Per-frame change below which progress decays (negative).
    #[serde(default = "default_decay_delta")]
    pub decay_delta: f64,
    /// Minimum wrist-to-index-tip distance for a frame to count.
    #[serde(default = "default_extension_threshold")]
    pub extension_threshold: f64,
    /// Consecutive forward frames needed to trigger.
    #[serde(default = "default_stretch_count")]
    pub stretch_count: u32,
    /// JSONL file of recorded hand observations to play back as the camera.
    #[serde(default)]
    pub replay_file: Option<PathBuf>,
    /// Frame interval for replay, in milliseconds.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            confidence_threshold: default_confidence_threshold(),
            forward_delta: default_forward_delta(),
            decay_delta: default_decay_delta(),
            extension_threshold: default_extension_threshold(),
            stretch_count: default_stretch_count(),
            replay_file: None,
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

impl GestureConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Trigger arbitration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Minimum time between two warnings, in milliseconds.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

impl TriggerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Global hot-key configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotKeyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Chord such as "cmd+shift+s".
    #[serde(default = "default_chord")]
    pub chord: String,
}

impl Default for HotKeyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chord: default_chord(),
        }
    }
}

impl HotKeyConfig {
    pub fn parse_chord(&self) -> Result<HotKeyChord> {
        self.chord
            .parse()
            .with_context(|| format!("Invalid hot key: {:?}", self.chord))
    }
}

/// Warning surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopupConfig {
    #[serde(default = "default_popup_text")]
    pub text: String,
    #[serde(default = "default_popup_color")]
    pub color: String,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            text: default_popup_text(),
            color: default_popup_color(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Data directory for the event journal.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// Returns the journal directory path.
    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_confidence_threshold() -> f64 {
    0.3
}

fn default_forward_delta() -> f64 {
    0.02
}

fn default_decay_delta() -> f64 {
    -0.01
}

fn default_extension_threshold() -> f64 {
    0.15
}

fn default_stretch_count() -> u32 {
    3
}

fn default_frame_interval_ms() -> u64 {
    33
}

fn default_cooldown_ms() -> u64 {
    300
}

fn default_chord() -> String {
    "cmd+shift+s".to_string()
}

fn default_popup_text() -> String {
    "STAY AWAY FROM MY SCREEN".to_string()
}

fn default_popup_color() -> String {
    "red".to_string()
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".stayaway"))
        .unwrap_or_else(|| PathBuf::from(".stayaway"))
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file")?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = config_path {
            Self::from_file(path)?
        } else {
            let default_paths = [
                PathBuf::from("config/default.toml"),
                dirs::config_dir()
                    .map(|d| d.join("stayaway/config.toml"))
                    .unwrap_or_default(),
            ];

            let mut loaded = None;
            for path in &default_paths {
                if path.exists() {
                    loaded = Some(Self::from_file(path)?);
                    break;
                }
            }
            loaded.unwrap_or_default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.logging.data_dir = expand_tilde(&config.logging.data_dir);

        Ok(config)
    }

    /// Apply `STAYAWAY_*` overrides looked up through `var`.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("STAYAWAY_GESTURE_ENABLED").and_then(|v| v.parse().ok()) {
            self.gesture.enabled = v;
        }
        if let Some(v) = var("STAYAWAY_COOLDOWN_MS").and_then(|v| v.parse().ok()) {
            self.trigger.cooldown_ms = v;
        }
        if let Some(val) = var("STAYAWAY_HOTKEY") {
            self.hotkey.chord = val;
        }
        if let Some(val) = var("STAYAWAY_POPUP_TEXT") {
            self.popup.text = val;
        }
        if let Some(val) = var("STAYAWAY_REPLAY_FILE") {
            self.gesture.replay_file = Some(PathBuf::from(val));
        }
        if let Some(val) = var("STAYAWAY_DATA_DIR") {
            self.logging.data_dir = PathBuf::from(val);
        }
        if let Some(val) = var("STAYAWAY_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        let g = &self.gesture;
        if !(0.0..=1.0).contains(&g.confidence_threshold) {
            anyhow::bail!("Confidence threshold must be between 0 and 1");
        }
        if !g.forward_delta.is_finite() || g.forward_delta <= 0.0 {
            anyhow::bail!("Forward delta must be greater than 0");
        }
        if !g.decay_delta.is_finite() || g.decay_delta > 0.0 {
            anyhow::bail!("Decay delta must not be positive");
        }
        if !g.extension_threshold.is_finite() || g.extension_threshold < 0.0 {
            anyhow::bail!("Extension threshold must not be negative");
        }
        if g.stretch_count == 0 {
            anyhow::bail!("Stretch count must be greater than 0");
        }
        if g.frame_interval_ms == 0 {
            anyhow::bail!("Frame interval must be greater than 0");
        }
        if self.trigger.cooldown_ms == 0 {
            anyhow::bail!("Cooldown must be greater than 0");
        }
        if self.popup.text.trim().is_empty() {
            anyhow::bail!("Popup text cannot be empty");
        }
        if self.hotkey.enabled {
            self.hotkey.parse_chord()?;
        }
        Ok(())
    }
}

/// Expand ~ to home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(rest) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
    }
    path.to_path_buf()
}
