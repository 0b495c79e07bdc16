// Deckbind Settings Module
// Output timing, auto-repeat and worker configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Engine settings
///
/// Loaded from a TOML file (default: ~/.config/deckbind/settings.toml).
/// Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub timing: TimingSettings,
    pub repeat: RepeatSettings,
    pub multi_tap: MultiTapSettings,
    pub workers: WorkerSettings,

    /// Path to the settings file (for reload)
    #[serde(skip)]
    source_path: Option<PathBuf>,
}

/// Pauses between output primitives, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Between a key's down and up in a single press
    pub key_hold_ms: u64,
    /// After modifiers go down and before they come up
    pub modifier_delay_ms: u64,
    /// Between a mouse button's down and up in a click
    pub click_hold_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            key_hold_ms: 30,
            modifier_delay_ms: 10,
            click_hold_ms: 20,
        }
    }
}

impl TimingSettings {
    /// No pauses at all (tests, dry runs)
    pub fn immediate() -> Self {
        Self {
            key_hold_ms: 0,
            modifier_delay_ms: 0,
            click_hold_ms: 0,
        }
    }

    pub fn key_hold(&self) -> Duration {
        Duration::from_millis(self.key_hold_ms)
    }

    pub fn modifier_delay(&self) -> Duration {
        Duration::from_millis(self.modifier_delay_ms)
    }

    pub fn click_hold(&self) -> Duration {
        Duration::from_millis(self.click_hold_ms)
    }
}

/// Auto-repeat of the main key while a modified keystroke is held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatSettings {
    pub enabled: bool,
    pub initial_delay_ms: u64,
    pub interval_ms: u64,
}

impl Default for RepeatSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_delay_ms: 400,
            interval_ms: 50,
        }
    }
}

impl RepeatSettings {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiTapSettings {
    /// Tap window used when a mode sets no release threshold
    pub window_ms: u64,
}

impl Default for MultiTapSettings {
    fn default() -> Self {
        Self { window_ms: 250 }
    }
}

impl MultiTapSettings {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Dispatch worker threads; 0 picks one per CPU, capped at 8
    pub count: usize,
}

impl WorkerSettings {
    pub fn resolved_count(&self) -> usize {
        if self.count > 0 {
            return self.count;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2)
            .clamp(1, 8)
    }
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

impl EngineSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with every output pause set to zero
    pub fn immediate() -> Self {
        Self {
            timing: TimingSettings::immediate(),
            ..Self::default()
        }
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        settings.source_path = Some(path.as_ref().to_path_buf());
        Ok(settings)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: EngineSettings =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.repeat.enabled && self.repeat.interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "repeat.interval_ms must be greater than 0 when repeat is enabled".to_string(),
            ));
        }
        if self.multi_tap.window_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "multi_tap.window_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("deckbind").join("settings.toml"))
    }

    /// Load from default location (~/.config/deckbind/settings.toml)
    pub fn load_default() -> Result<Self, SettingsError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        // Return default settings if file doesn't exist
        Ok(Self::new())
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Reload settings from the original file
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        if let Some(ref path) = self.source_path {
            let new_settings = Self::from_file(path)?;
            *self = new_settings;
            Ok(())
        } else {
            Err(SettingsError::InvalidValue("No source path set".to_string()))
        }
    }
}

/// Create default settings content for a new installation
pub fn default_settings_content() -> &'static str {
    r#"# Deckbind Settings
# Place this file at: ~/.config/deckbind/settings.toml

[timing]
# Milliseconds between a key's down and up
key_hold_ms = 30
# Milliseconds after modifiers go down / before they come up
modifier_delay_ms = 10
click_hold_ms = 20

[repeat]
# Re-send the main key while a modified keystroke is held
enabled = false
initial_delay_ms = 400
interval_ms = 50

[multi_tap]
# Tap window when an activation mode sets none
window_ms = 250

[workers]
# 0 = one per CPU (max 8)
count = 0
"#
}
