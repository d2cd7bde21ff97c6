use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use kbm_core::{RenderStrategyType, SessionOptions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 960.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Frames per second the renderer is held to; 0 renders every tick.
    pub fps_limit: u32,
    pub undo_limit: usize,
    pub scroll_sensitivity: f64,
    pub zoom_sensitivity: f64,
    /// Cue played for struck notes.
    pub strike_sample: Option<PathBuf>,
    pub default_resolution: String,
    pub log_level: String,
    pub viewport: ViewportSize,
}

impl Default for Config {
    fn default() -> Self {
        let options = SessionOptions::default();
        Self {
            fps_limit: 144,
            undo_limit: options.history_limit,
            scroll_sensitivity: options.scroll_sensitivity,
            zoom_sensitivity: options.zoom_sensitivity,
            strike_sample: None,
            default_resolution: RenderStrategyType::default().to_string(),
            log_level: "info".to_string(),
            viewport: ViewportSize::default(),
        }
    }
}

impl Config {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("kbmaker").join("config.toml"))
    }

    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Read `path`, falling back to defaults when it is missing or invalid.
    pub fn load_from(path: &Path) -> Self {
        let Ok(contents) = fs::read_to_string(path) else {
            return Self::default();
        };
        toml::from_str(&contents).unwrap_or_else(|err| {
            // the logger is configured from this file, so it is not up yet
            eprintln!("ignoring invalid config {}: {err}", path.display());
            Self::default()
        })
    }

    pub fn resolution(&self) -> RenderStrategyType {
        self.default_resolution.parse().unwrap_or_else(|err| {
            log::warn!("{err}");
            RenderStrategyType::default()
        })
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            bitmap_width: self.viewport.width,
            bitmap_height: self.viewport.height,
            fps_limit: NonZeroU32::new(self.fps_limit),
            history_limit: self.undo_limit,
            strategy: self.resolution(),
            scroll_sensitivity: self.scroll_sensitivity,
            zoom_sensitivity: self.zoom_sensitivity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        assert_eq!(Config::load_from(&dir.path().join("none.toml")), Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "fps_limit = 0\ndefault_resolution = \"1/16\"\n[viewport]\nheight = 480.0\n",
        )
        .unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.fps_limit, 0);
        assert_eq!(config.viewport.height, 480.0);
        assert_eq!(config.viewport.width, 600.0);
        assert_eq!(config.undo_limit, Config::default().undo_limit);

        let options = config.session_options();
        assert_eq!(options.fps_limit, None);
        assert_eq!(options.strategy, RenderStrategyType::R1_16);
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "fps_limit = \"fast\"").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_unknown_resolution_falls_back() {
        let config = Config {
            default_resolution: "1/5".to_string(),
            ..Config::default()
        };
        assert_eq!(config.resolution(), RenderStrategyType::default());
    }

    #[test]
    fn test_written_config_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            strike_sample: Some(PathBuf::from("cues/strike.wav")),
            log_level: "debug".to_string(),
            ..Config::default()
        };
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }
}
