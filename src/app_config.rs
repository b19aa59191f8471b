use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::default::Default;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use log::{info, warn};

use crate::errors::AppError;

/// Application configuration module
/// This module handles loading the JSON configuration file, resolving presets
/// and validating the resulting conversion settings.
/// Represents the configuration file as stored on disk
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Settings applied on top of the built-in defaults
    #[serde(default)]
    pub default_settings: SettingsOverride,

    /// Named presets, applied after the built-in preset of the same name
    #[serde(default)]
    pub presets: HashMap<String, SettingsOverride>,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// Screen resolution in pixels, written as `WIDTHxHEIGHT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FromStr for Resolution {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::MalformedConfiguration(format!("invalid resolution '{}', expected WIDTHxHEIGHT", s));
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

impl TryFrom<String> for Resolution {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Built-in display presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    P720,
    P1080,
    K2,
    K4,
    K8,
}

impl Preset {
    /// All presets in ascending resolution order
    pub const ALL: [Preset; 5] = [Self::P720, Self::P1080, Self::K2, Self::K4, Self::K8];

    // @returns: Preset name as used in config files and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Self::P720 => "720p",
            Self::P1080 => "1080p",
            Self::K2 => "2k",
            Self::K4 => "4k",
            Self::K8 => "8k",
        }
    }

    pub fn font_size(&self) -> u32 {
        match self {
            Self::P720 => 28,
            Self::P1080 => 42,
            Self::K2 => 56,
            Self::K4 => 84,
            Self::K8 => 168,
        }
    }

    pub fn resolution(&self) -> Resolution {
        match self {
            Self::P720 => Resolution::new(1280, 720),
            Self::P1080 => Resolution::new(1920, 1080),
            Self::K2 => Resolution::new(2560, 1440),
            Self::K4 => Resolution::new(3840, 2160),
            Self::K8 => Resolution::new(7680, 4320),
        }
    }

    /// Produce a copy of `settings` with this preset's font size and resolution
    pub fn apply(&self, settings: Settings) -> Settings {
        Settings {
            font_size: self.font_size(),
            resolution: self.resolution(),
            ..settings
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::MalformedConfiguration(format!("unknown preset '{}'", s)))
    }
}

/// Largest accepted `retry_count`
pub const MAX_RETRY_COUNT: u32 = 10;

/// Fully resolved conversion settings
///
/// This value is built once per run and passed by reference into every
/// conversion component. It is never mutated after validation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Region parameter passed to the danmu API
    pub geo: String,

    /// Base on-screen time of scrolling comments, in seconds
    pub scroll_duration: f64,

    /// On-screen time of top/bottom comments, in seconds
    pub fixed_duration: f64,

    pub font_size: u32,

    pub font_name: String,

    /// Font used for emoji and symbol runs
    pub fallback_font: String,

    pub resolution: Resolution,

    /// Comment opacity, 0.0 (invisible) to 1.0 (opaque)
    pub opacity: f64,

    pub enable_scroll: bool,
    pub enable_top: bool,
    pub enable_bottom: bool,

    /// Comments containing any of these (case-insensitive) are dropped
    pub filter_keywords: Vec<String>,

    /// Drop comments containing emoji or symbol glyphs
    pub filter_emoji: bool,

    /// Drop repeated records from the same user at the same time
    pub dedup: bool,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Retry count for failed requests
    pub retry_count: u32,

    /// Base backoff in milliseconds, doubled on each retry
    pub retry_backoff_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            geo: "TW,HK".to_string(),
            scroll_duration: 12.0,
            fixed_duration: 8.0,
            font_size: 42,
            font_name: "Noto Sans CJK TC".to_string(),
            fallback_font: default_fallback_font(),
            resolution: Resolution::new(1920, 1080),
            opacity: 0.8,
            enable_scroll: true,
            enable_top: true,
            enable_bottom: true,
            filter_keywords: Vec::new(),
            filter_emoji: false,
            dedup: true,
            timeout_secs: 10,
            retry_count: 2,
            retry_backoff_ms: 500,
        }
    }
}

/// Partial settings as they appear in `default_settings` and `presets`
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SettingsOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_scroll: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_top: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_bottom: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_emoji: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_backoff_ms: Option<u64>,
}

impl SettingsOverride {
    /// Produce a copy of `base` with every key present in this override replaced
    pub fn overlay(&self, base: Settings) -> Settings {
        Settings {
            geo: self.geo.clone().unwrap_or(base.geo),
            scroll_duration: self.scroll_duration.unwrap_or(base.scroll_duration),
            fixed_duration: self.fixed_duration.unwrap_or(base.fixed_duration),
            font_size: self.font_size.unwrap_or(base.font_size),
            font_name: self.font_name.clone().unwrap_or(base.font_name),
            fallback_font: self.fallback_font.clone().unwrap_or(base.fallback_font),
            resolution: self.resolution.unwrap_or(base.resolution),
            opacity: self.opacity.unwrap_or(base.opacity),
            enable_scroll: self.enable_scroll.unwrap_or(base.enable_scroll),
            enable_top: self.enable_top.unwrap_or(base.enable_top),
            enable_bottom: self.enable_bottom.unwrap_or(base.enable_bottom),
            filter_keywords: self.filter_keywords.clone().unwrap_or(base.filter_keywords),
            filter_emoji: self.filter_emoji.unwrap_or(base.filter_emoji),
            dedup: self.dedup.unwrap_or(base.dedup),
            timeout_secs: self.timeout_secs.unwrap_or(base.timeout_secs),
            retry_count: self.retry_count.unwrap_or(base.retry_count),
            retry_backoff_ms: self.retry_backoff_ms.unwrap_or(base.retry_backoff_ms),
        }
    }
}

fn default_fallback_font() -> String {
    if cfg!(target_os = "windows") {
        "Segoe UI Emoji".to_string()
    } else if cfg!(target_os = "macos") {
        "Apple Color Emoji".to_string()
    } else {
        "Noto Color Emoji".to_string()
    }
}

impl Config {
    /// Load the configuration file
    ///
    /// A missing file falls back to built-in defaults unless the path was
    /// given explicitly, in which case it is a configuration error.
    pub fn load<P: AsRef<Path>>(path: P, explicit: bool) -> Result<Self, AppError> {
        let path = path.as_ref();
        if !path.exists() {
            if explicit {
                return Err(AppError::MalformedConfiguration(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let file = File::open(path)
            .map_err(|e| AppError::MalformedConfiguration(format!("failed to open {}: {}", path.display(), e)))?;
        Self::from_reader(BufReader::new(file))
            .map_err(|e| AppError::MalformedConfiguration(format!("{}: {}", path.display(), e)))
    }

    /// Parse a configuration from JSON
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }

    /// Resolve the effective settings for an optional preset
    ///
    /// Layers, lowest first: built-in defaults, `default_settings`,
    /// the built-in preset, then the file's preset of the same name.
    pub fn settings(&self, preset: Option<Preset>) -> Result<Settings, AppError> {
        let mut settings = self.default_settings.overlay(Settings::default());

        if let Some(preset) = preset {
            settings = preset.apply(settings);
            if let Some(custom) = self.presets.get(preset.name()) {
                settings = custom.overlay(settings);
            }
            info!("Applied preset: {}", preset);
        }

        settings.validate()?;
        Ok(settings)
    }
}

impl Settings {
    /// Validate the settings for consistency and required values
    pub fn validate(&self) -> Result<(), AppError> {
        let fail = |msg: String| Err(AppError::MalformedConfiguration(msg));

        if !(self.scroll_duration.is_finite() && self.scroll_duration > 0.0) {
            return fail(format!("scroll_duration must be positive, got {}", self.scroll_duration));
        }
        if !(self.fixed_duration.is_finite() && self.fixed_duration > 0.0) {
            return fail(format!("fixed_duration must be positive, got {}", self.fixed_duration));
        }
        if self.font_size == 0 {
            return fail("font_size must be positive".to_string());
        }
        for (key, font) in [("font_name", &self.font_name), ("fallback_font", &self.fallback_font)] {
            if font.trim().is_empty() {
                return fail(format!("{} must not be empty", key));
            }
            // Font names end up inside `{\fn...}` override blocks
            if font.contains(['{', '}', '\\']) {
                return fail(format!("{} must not contain '{{', '}}' or '\\', got '{}'", key, font));
            }
        }
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return fail(format!("invalid resolution {}", self.resolution));
        }
        if self.retry_count > MAX_RETRY_COUNT {
            return fail(format!(
                "retry_count must be at most {}, got {}",
                MAX_RETRY_COUNT, self.retry_count
            ));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return fail(format!("opacity must be within 0.0-1.0, got {}", self.opacity));
        }

        Ok(())
    }
}
