//! Configuration management for the Popfolio shell.
//!
//! Configuration is loaded from TOML files in the following locations (in order):
//! 1. Platform config dir, e.g. `~/.config/popfolio/config.toml`
//! 2. `~/.config/popfolio/config.toml` (explicit Unix-style fallback)
//! 3. `./popfolio.toml` (current directory, for development)

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main configuration structure for the Popfolio shell.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Behavior configuration.
    pub behavior: BehaviorConfig,
    /// Initial viewport dimensions.
    pub viewport: ViewportConfig,
    /// Declared panels, in desktop order. Panel and control ids are assigned
    /// from this order at startup.
    #[serde(default)]
    pub panels: Vec<PanelConfig>,
}

/// Behavior-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether the shell starts in dark mode.
    #[serde(default = "default_false")]
    pub start_dark: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            start_dark: false,
        }
    }
}

/// Initial viewport dimensions, in pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    #[serde(default = "default_viewport_width")]
    pub width: i32,

    #[serde(default = "default_viewport_height")]
    pub height: i32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: default_viewport_width(),
            height: default_viewport_height(),
        }
    }
}

/// One declared panel.
///
/// # Example Config
///
/// ```toml
/// [[panels]]
/// name = "about"
/// width = 420
/// height = 320
///
/// [[panels]]
/// name = "projects"
/// width = 520
/// height = 400
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Panel name, used to address the panel from host commands.
    pub name: String,

    /// Rendered width in pixels.
    #[serde(default = "default_panel_width")]
    pub width: i32,

    /// Rendered height in pixels.
    #[serde(default = "default_panel_height")]
    pub height: i32,
}

// Default value functions for serde
fn default_log_level() -> String {
    "info".to_string()
}

fn default_false() -> bool {
    false
}

fn default_viewport_width() -> i32 {
    1280
}

fn default_viewport_height() -> i32 {
    800
}

fn default_panel_width() -> i32 {
    420
}

fn default_panel_height() -> i32 {
    320
}

impl Config {
    /// Load configuration from standard locations.
    ///
    /// Tries the following locations in order:
    /// 1. Platform config dir (`popfolio/config.toml`)
    /// 2. `~/.config/popfolio/config.toml`
    /// 3. `./popfolio.toml`
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self> {
        let paths = config_paths();

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate();
        Ok(config)
    }

    /// Warn about config values that will misbehave. Nothing here is fatal;
    /// the shell runs with whatever it is given.
    pub fn validate(&self) {
        if self.viewport.width <= 0 || self.viewport.height <= 0 {
            tracing::warn!(
                "Non-positive viewport {}x{} in config",
                self.viewport.width,
                self.viewport.height
            );
        }

        let mut seen = std::collections::HashSet::new();
        for panel in &self.panels {
            if panel.width <= 0 || panel.height <= 0 {
                tracing::warn!(
                    "Panel '{}' has non-positive size {}x{}",
                    panel.name,
                    panel.width,
                    panel.height
                );
            }
            if !seen.insert(panel.name.as_str()) {
                tracing::warn!(
                    "Duplicate panel name '{}'; only the first is addressable",
                    panel.name
                );
            }
        }
    }
}

/// Get all possible config file paths in priority order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Platform standard config dir
    if let Some(proj_dirs) = ProjectDirs::from("io", "popfolio", "popfolio") {
        paths.push(proj_dirs.config_dir().join("config.toml"));
    }

    // 2. Unix-style: ~/.config/popfolio/config.toml
    if let Some(home) = dirs_home() {
        paths.push(home.join(".config").join("popfolio").join("config.toml"));
    }

    // 3. Current directory: ./popfolio.toml
    paths.push(PathBuf::from("popfolio.toml"));

    paths
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
