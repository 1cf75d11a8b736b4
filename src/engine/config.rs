// Settings, layered from the embedded defaults, an optional user file and
// environment variables.

use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use super::error::Result;
use super::layout::{Margins, ViewMode};
use super::shadow::ShadowColors;

const DEFAULT_SETTINGS_STR: &str = include_str!("default.yaml");
const SETTINGS_FILE_NAME: &str = "page_curl";
const ENV_PREFIX: &str = "PAGE_CURL";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub view_mode: ViewMode,
    pub margins:   Margins,

    /// Scan line count across the curl. Higher is smoother.
    pub max_curl_splits: usize,
    /// Whether the last page can be turned away, leaving an empty right side.
    pub allow_last_page_curl: bool,
    /// Use pointer pressure to shrink the curl radius. When off,
    /// `default_pressure` is used for every event.
    pub enable_touch_pressure: bool,
    pub default_pressure: f64,
    pub render_left_page: bool,
    pub animation_duration_ms: u64,
    pub back_face_alpha: f64,

    pub background: [f64; 4],
    pub shadow: ShadowColors,
    pub debug: DebugSettings,

    /// Demo book size.
    pub page_count: usize,
    /// Seed for the demo page generator.
    pub seed: u64,
}

/// Initial state of the developer overlay panels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    pub show_stats:   bool,
    pub show_guides:  bool,
    pub show_outline: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            view_mode: ViewMode::OnePage,
            margins: Margins { left: 0.05, top: 0.05, right: 0.05, bottom: 0.05 },
            max_curl_splits: 10,
            allow_last_page_curl: true,
            enable_touch_pressure: false,
            default_pressure: 0.8,
            render_left_page: true,
            animation_duration_ms: 300,
            back_face_alpha: 1.0,
            background: [0.12, 0.12, 0.14, 1.0],
            shadow: ShadowColors::default(),
            debug: DebugSettings::default(),
            page_count: 24,
            seed: 1,
        }
    }
}

impl Settings {
    /// Load settings, falling back to the defaults if anything goes wrong.
    pub fn load() -> Self {
        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_SETTINGS_STR, FileFormat::Yaml))
            .add_source(File::with_name(SETTINGS_FILE_NAME).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        let settings = builder
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .unwrap_or_else(|e| {
                log::warn!("Error loading settings: {e}");
                Self::default()
            });
        log::info!(
            "settings: {:?}, {} curl splits, {} pages",
            settings.view_mode,
            settings.max_curl_splits,
            settings.page_count,
        );
        settings
    }

    /// Defaults overlaid with a YAML document.
    pub fn from_yaml(overrides: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(DEFAULT_SETTINGS_STR, FileFormat::Yaml))
            .add_source(File::from_str(overrides, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::CurlError;
    use pretty_assertions::assert_eq;

    #[test]
    fn embedded_defaults_match_default_impl() {
        assert_eq!(Settings::from_yaml("{}").unwrap(), Settings::default());
    }

    #[test]
    fn overrides_are_layered_over_defaults() {
        let settings = Settings::from_yaml(
            "view_mode: two_pages\nmargins:\n  left: 0.2\nmax_curl_splits: 32\n",
        )
        .unwrap();
        assert_eq!(settings.view_mode, ViewMode::TwoPages);
        assert_eq!(settings.margins.left, 0.2);
        assert_eq!(settings.margins.top, 0.05);
        assert_eq!(settings.max_curl_splits, 32);
        assert_eq!(settings.animation_duration(), Duration::from_millis(300));
    }

    #[test]
    fn bad_values_are_reported() {
        let err = Settings::from_yaml("view_mode: three_pages\n").unwrap_err();
        assert!(matches!(err, CurlError::Config(_)));
    }
}
