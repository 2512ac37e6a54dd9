//! Configuration and color scheme management for mudplay.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.mudplay/config.toml`
//! - Gauge definitions (which variable fields become status bars)
//! - Built-in color schemes for the client chrome
//!
//! # Configuration File
//!
//! ```toml
//! server_url = "wss://play.example.org/socket/websocket"
//! game = "midmud"
//! heartbeat_secs = 30
//! mask_char = "*"
//! color_scheme = "nord"
//!
//! [[gauges]]
//! name = "HP"
//! variable_key = "Char.Vitals"
//! current_field = "hp"
//! max_field = "maxhp"
//! color_class = "red"
//! ```

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::gauge::GaugeDef;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Socket endpoint (the serializer version is appended on connect)
    pub server_url: String,
    /// Game joined when none is given on the command line
    pub game: Option<String>,
    /// Channel heartbeat interval
    pub heartbeat_secs: u64,
    /// Character drawn for each typed character in password mode
    pub mask_char: char,
    /// Color scheme name
    pub color_scheme: String,
    /// Status gauges, drawn in order
    pub gauges: Vec<GaugeDef>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:4000/socket/websocket".to_string(),
            game: None,
            heartbeat_secs: 30,
            mask_char: '*',
            color_scheme: "default".to_string(),
            gauges: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::get_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), err = %e, "invalid config, using defaults");
                Self::default()
            }),
            Err(e) => {
                warn!(path = %path.display(), err = %e, "unreadable config, using defaults");
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get the color scheme
    pub fn get_color_scheme(&self) -> ColorScheme {
        ColorScheme::by_name(&self.color_scheme)
    }
}

/// `~/.mudplay`, created on first use
pub fn config_dir() -> Option<PathBuf> {
    let dir = home_dir()?.join(".mudplay");
    if !dir.exists() {
        let _ = fs::create_dir_all(&dir);
    }
    Some(dir)
}

/// Color definition (RGB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Color for a gauge `color_class`; unknown classes get neutral gray
    pub fn for_class(class: &str) -> Self {
        match class.to_lowercase().as_str() {
            "red" | "danger" => Self::new(200, 40, 40),
            "green" | "success" => Self::new(40, 170, 60),
            "blue" | "primary" => Self::new(50, 100, 220),
            "yellow" | "warning" => Self::new(210, 180, 30),
            "cyan" | "info" => Self::new(40, 170, 190),
            "magenta" | "purple" => Self::new(170, 60, 190),
            "white" => Self::new(230, 230, 230),
            _ => Self::new(120, 120, 120),
        }
    }
}

/// Color scheme for the client chrome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorScheme {
    pub name: String,

    // Status bar colors
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    pub status_error_fg: Color,

    // Gauge colors
    pub gauge_track: Color,
    pub gauge_text: Color,

    // Prompt colors
    pub prompt_fg: Color,
    pub prompt_marker: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_scheme()
    }
}

impl ColorScheme {
    /// Default color scheme
    pub fn default_scheme() -> Self {
        Self {
            name: "default".to_string(),

            status_bar_bg: Color::new(0, 100, 0),
            status_bar_fg: Color::new(255, 255, 255),
            status_error_fg: Color::new(255, 200, 0),

            gauge_track: Color::new(50, 50, 50),
            gauge_text: Color::new(255, 255, 255),

            prompt_fg: Color::new(230, 230, 230),
            prompt_marker: Color::new(100, 150, 255),
        }
    }

    /// Solarized Dark scheme
    pub fn solarized_dark() -> Self {
        Self {
            name: "solarized-dark".to_string(),

            status_bar_bg: Color::new(7, 54, 66),
            status_bar_fg: Color::new(147, 161, 161),
            status_error_fg: Color::new(203, 75, 22),

            gauge_track: Color::new(0, 43, 54),
            gauge_text: Color::new(253, 246, 227),

            prompt_fg: Color::new(147, 161, 161),
            prompt_marker: Color::new(38, 139, 210),
        }
    }

    /// Nord scheme
    pub fn nord() -> Self {
        Self {
            name: "nord".to_string(),

            status_bar_bg: Color::new(59, 66, 82),
            status_bar_fg: Color::new(216, 222, 233),
            status_error_fg: Color::new(235, 203, 139),

            gauge_track: Color::new(46, 52, 64),
            gauge_text: Color::new(236, 239, 244),

            prompt_fg: Color::new(216, 222, 233),
            prompt_marker: Color::new(136, 192, 208),
        }
    }

    /// Dracula scheme
    pub fn dracula() -> Self {
        Self {
            name: "dracula".to_string(),

            status_bar_bg: Color::new(68, 71, 90),
            status_bar_fg: Color::new(248, 248, 242),
            status_error_fg: Color::new(255, 85, 85),

            gauge_track: Color::new(40, 42, 54),
            gauge_text: Color::new(248, 248, 242),

            prompt_fg: Color::new(248, 248, 242),
            prompt_marker: Color::new(189, 147, 249),
        }
    }

    /// Get scheme by name
    pub fn by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "solarized-dark" | "solarized_dark" => Self::solarized_dark(),
            "nord" => Self::nord(),
            "dracula" => Self::dracula(),
            _ => Self::default_scheme(),
        }
    }

    /// List available schemes
    pub fn list() -> Vec<&'static str> {
        vec!["default", "solarized-dark", "nord", "dracula"]
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server_url, "ws://localhost:4000/socket/websocket");
        assert_eq!(config.heartbeat(), Duration::from_secs(30));
        assert_eq!(config.mask_char, '*');
        assert!(config.gauges.is_empty());
    }

    #[test]
    fn test_parse_gauges() {
        let config = Config::parse(
            r##"
            game = "midmud"
            mask_char = "#"

            [[gauges]]
            name = "HP"
            variable_key = "Char.Vitals"
            current_field = "hp"
            max_field = "maxhp"
            color_class = "red"

            [[gauges]]
            name = "SP"
            message = "Char.Vitals"
            value = "sp"
            max = "maxsp"
            color = "blue"
            "##,
        )
        .unwrap();

        assert_eq!(config.game.as_deref(), Some("midmud"));
        assert_eq!(config.mask_char, '#');
        assert_eq!(config.gauges.len(), 2);
        assert_eq!(config.gauges[1].current_field, "sp");
        assert_eq!(config.gauges[1].color_class, "blue");
    }

    #[test]
    fn test_invalid_config_is_error() {
        assert!(Config::parse("heartbeat_secs = \"soon\"").is_err());
    }

    #[test]
    fn test_zero_heartbeat_clamped() {
        let config = Config::parse("heartbeat_secs = 0").unwrap();
        assert_eq!(config.heartbeat(), Duration::from_secs(1));
    }

    #[test]
    fn test_color_scheme_lookup() {
        assert_eq!(ColorScheme::by_name("Nord").name, "nord");
        assert_eq!(ColorScheme::by_name("unknown").name, "default");
        assert_eq!(ColorScheme::list().len(), 4);
        assert_eq!(Color::for_class("RED"), Color::new(200, 40, 40));
        assert_eq!(Color::for_class("bar-fancy"), Color::new(120, 120, 120));
    }
}
