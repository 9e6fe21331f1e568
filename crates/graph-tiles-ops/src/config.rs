//! Configuration for tile generation.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use graph_tiles_core::ProgressChannel;
use graph_tiles_layout::LayoutConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OpsError, OpsResult};
use crate::style::Style;

/// What to do when a single tile cannot be stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure, record it in the report and keep going.
    #[default]
    Continue,
    /// Stop at the first failure and return it.
    Abort,
}

/// Configuration for graph-tiles operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory tiles are written below (as `tiles/{z}/{col}-{row}.png`).
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Edge length of a tile in pixels.
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,

    /// Canvas edge length at zoom 1; zoom `z` renders `z` times larger.
    #[serde(default = "default_base_zoom_img_size")]
    pub base_zoom_img_size: u32,

    /// Layout-to-pixel scale at zoom 1.
    #[serde(default = "default_initial_zoom_scale")]
    pub initial_zoom_scale: f64,

    /// Zoom levels `1..=zoom_levels` are generated.
    #[serde(default = "default_zoom_levels")]
    pub zoom_levels: u32,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Ring buffer size of the progress channel.
    #[serde(default = "default_progress_capacity")]
    pub progress_capacity: usize,

    #[serde(default)]
    pub style: Style,

    #[serde(default)]
    pub simulation: LayoutConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated_tiles")
}

fn default_tile_size() -> u32 {
    256
}

fn default_base_zoom_img_size() -> u32 {
    512
}

fn default_initial_zoom_scale() -> f64 {
    1.0
}

fn default_zoom_levels() -> u32 {
    3
}

fn default_progress_capacity() -> usize {
    ProgressChannel::DEFAULT_CAPACITY
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            tile_size: default_tile_size(),
            base_zoom_img_size: default_base_zoom_img_size(),
            initial_zoom_scale: default_initial_zoom_scale(),
            zoom_levels: default_zoom_levels(),
            failure_policy: FailurePolicy::default(),
            progress_capacity: default_progress_capacity(),
            style: Style::default(),
            simulation: LayoutConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from disk with environment overrides.
    pub fn load() -> OpsResult<Self> {
        let config = match Self::config_file_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Load configuration from an explicit JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> OpsResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Apply `GT_*` overrides looked up through `var`.
    pub fn with_overrides<F>(mut self, var: F) -> OpsResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> OpsResult<T> {
            value
                .trim()
                .parse()
                .map_err(|_| OpsError::Config(format!("Invalid value for {}: {}", key, value)))
        }

        if let Some(dir) = var("GT_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(v) = var("GT_TILE_SIZE") {
            self.tile_size = parse("GT_TILE_SIZE", &v)?;
        }
        if let Some(v) = var("GT_ZOOM_LEVELS") {
            self.zoom_levels = parse("GT_ZOOM_LEVELS", &v)?;
        }
        if let Some(v) = var("GT_MAX_TICKS") {
            self.simulation.max_ticks = parse("GT_MAX_TICKS", &v)?;
        }
        Ok(self)
    }

    /// Save configuration to disk.
    pub fn save(&self) -> OpsResult<()> {
        if let Some(path) = Self::config_file_path() {
            self.save_to(&path)?;
        }
        Ok(())
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> OpsResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_file_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "graph-tiles", "graph-tiles")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Check every value for range and consistency.
    pub fn validate(&self) -> OpsResult<()> {
        if self.tile_size == 0 {
            return Err(OpsError::Config("tile_size must be > 0".into()));
        }
        if self.base_zoom_img_size == 0 {
            return Err(OpsError::Config("base_zoom_img_size must be > 0".into()));
        }
        if self.zoom_levels == 0 {
            return Err(OpsError::Config("zoom_levels must be > 0".into()));
        }
        if !(self.initial_zoom_scale.is_finite() && self.initial_zoom_scale > 0.0) {
            return Err(OpsError::Config("initial_zoom_scale must be > 0".into()));
        }
        if self.progress_capacity == 0 {
            return Err(OpsError::Config("progress_capacity must be > 0".into()));
        }
        if self.canvas_size(self.zoom_levels).is_none() {
            return Err(OpsError::Config(format!(
                "canvas at zoom {} overflows",
                self.zoom_levels
            )));
        }
        self.style.validate().map_err(OpsError::Config)?;
        self.simulation.validate()?;
        Ok(())
    }

    /// Canvas edge length at `zoom`, or `None` on overflow.
    pub fn canvas_size(&self, zoom: u32) -> Option<u32> {
        zoom.checked_mul(self.base_zoom_img_size)
    }

    /// Layout-to-pixel scale at `zoom`.
    pub fn zoom_scale(&self, zoom: u32) -> f64 {
        f64::from(zoom) * self.initial_zoom_scale
    }
}
