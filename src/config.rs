// Global configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub recording: RecordingDefaults,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingDefaults {
    /// Quality profile used when --quality is not given ("professional" or "light")
    #[serde(default = "default_quality")]
    pub quality: String,

    /// Seconds to count down before ffmpeg starts (0 disables)
    #[serde(default = "default_countdown")]
    pub countdown_secs: u32,

    /// Directory recordings are written to (defaults to ~/Videos)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Filename pattern for recordings
    /// Supports: {timestamp}
    #[serde(default = "default_filename_pattern")]
    pub filename_pattern: String,

    /// X11 display to capture (defaults to $DISPLAY, then ":0")
    #[serde(default)]
    pub display: Option<String>,

    /// Extra ffmpeg output options, shell-quoted
    #[serde(default)]
    pub extra_args: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Session log location (defaults to the platform state directory)
    #[serde(default)]
    pub session_log: Option<PathBuf>,
}

fn default_quality() -> String {
    "professional".to_string()
}

fn default_countdown() -> u32 {
    3
}

fn default_filename_pattern() -> String {
    "recording_{timestamp}".to_string()
}

impl Default for RecordingDefaults {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            countdown_secs: default_countdown(),
            output_dir: None,
            filename_pattern: default_filename_pattern(),
            display: None,
            extra_args: String::new(),
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("screenrec");

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from disk, or create default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from `config_path`, writing the defaults there if it is missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;

            let config: Config = toml::from_str(&contents).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?;

            Ok(config)
        } else {
            let config = Config::default();

            // Not being able to write the default file is not fatal
            if let Err(e) = config.save_to(config_path) {
                tracing::warn!("Could not create default config file: {}", e);
                tracing::warn!(
                    "Using built-in defaults. Run 'screenrec init-config' to create a config file."
                );
            }

            Ok(config)
        }
    }

    /// Like `load`, but an unreadable or malformed file falls back to the
    /// built-in defaults with a warning
    pub fn load_or_default() -> Self {
        Self::or_default(Self::load())
    }

    fn or_default(loaded: Result<Self>) -> Self {
        loaded.unwrap_or_else(|e| {
            tracing::warn!("{:#}", e);
            tracing::warn!("Ignoring the config file and using built-in defaults");
            Config::default()
        })
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Check if config file exists
    pub fn exists() -> bool {
        Self::config_path().map(|p| p.exists()).unwrap_or(false)
    }

    /// Create a default config file if it doesn't exist
    pub fn ensure_default() -> Result<()> {
        if !Self::exists() {
            let config = Config::default();
            config.save()?;
        }
        Ok(())
    }

    /// Where recordings go: configured dir, ~/Videos, home, then the cwd
    pub fn output_dir(&self) -> PathBuf {
        self.recording
            .output_dir
            .clone()
            .or_else(dirs::video_dir)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn session_log_path(&self) -> PathBuf {
        if let Some(path) = &self.logging.session_log {
            return path.clone();
        }
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .map(|d| d.join("screenrec"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("screenrec.log")
    }

    /// X11 display: config, then $DISPLAY, then ":0"
    pub fn display(&self) -> String {
        self.recording
            .display
            .clone()
            .or_else(|| std::env::var("DISPLAY").ok().filter(|d| !d.is_empty()))
            .unwrap_or_else(|| ":0".to_string())
    }
}
