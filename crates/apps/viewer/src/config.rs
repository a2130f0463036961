use std::path::{Path, PathBuf};

use foundation::GeoBounds;
use layers::{LayerColors, default_layer_colors};
use runtime::WatchdogConfig;
use serde::{Deserialize, Serialize};
use streaming::{MAX_ZOOM_LEVEL, PipelineConfig, TileRange};

/// Environment variable consulted when no tile URL is configured.
pub const TILE_URL_ENV: &str = "TILE_BASE_URL";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "cannot parse {}: {source}", path.display())
            }
            ConfigError::Invalid(msg) => write!(f, "invalid map config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogSettings {
    pub min_fps: f64,
    pub max_slow_frames: u32,
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        let d = WatchdogConfig::default();
        Self {
            min_fps: d.min_fps,
            max_slow_frames: d.max_slow_frames,
        }
    }
}

impl From<WatchdogSettings> for WatchdogConfig {
    fn from(s: WatchdogSettings) -> Self {
        WatchdogConfig {
            min_fps: s.min_fps,
            max_slow_frames: s.max_slow_frames,
        }
    }
}

/// Everything the map needs at startup. Any field missing from a config file
/// takes its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Initial center, `[lng, lat]`.
    pub center: [f64; 2],
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub min_tile_zoom: u8,
    pub max_tile_zoom: u8,
    /// Pixel size of one tile on screen.
    pub tile_size: f64,
    pub tile_buffer: u32,
    pub layers: LayerColors,
    /// The camera may not show anything outside these bounds.
    pub limits: GeoBounds,
    /// Template with `{x}`, `{y}` and `{z}`; `http(s)://` or a local path.
    pub tile_url: String,
    /// Route prefetches through the background worker thread.
    pub use_worker: bool,
    /// Draw tile outlines and `x/y/z` labels.
    pub debug_tiles: bool,
    pub watchdog: WatchdogSettings,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [139.763275, 35.638126],
            zoom: 10.0,
            min_zoom: 5.0,
            max_zoom: 18.0,
            min_tile_zoom: 7,
            max_tile_zoom: 16,
            tile_size: 512.0,
            tile_buffer: 1,
            layers: default_layer_colors(),
            limits: GeoBounds::WORLD,
            tile_url: String::new(),
            use_worker: true,
            debug_tiles: false,
            watchdog: WatchdogSettings::default(),
        }
    }
}

impl MapConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Fills an empty `tile_url` from [`TILE_URL_ENV`].
    pub fn with_env_overrides(mut self) -> Self {
        if self.tile_url.is_empty() {
            if let Ok(url) = std::env::var(TILE_URL_ENV) {
                self.tile_url = url;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !(self.min_zoom.is_finite() && self.max_zoom.is_finite()) || self.min_zoom > self.max_zoom {
            return invalid(format!(
                "zoom range {}..{} is inverted or not finite",
                self.min_zoom, self.max_zoom
            ));
        }
        if !self.zoom.is_finite() {
            return invalid(format!("initial zoom {} is not finite", self.zoom));
        }
        if self.min_tile_zoom > self.max_tile_zoom {
            return invalid(format!(
                "tile zoom range {}..{} is inverted",
                self.min_tile_zoom, self.max_tile_zoom
            ));
        }
        if self.max_tile_zoom > MAX_ZOOM_LEVEL {
            return invalid(format!(
                "max_tile_zoom {} exceeds {MAX_ZOOM_LEVEL}",
                self.max_tile_zoom
            ));
        }
        if !(self.tile_size > 0.0 && self.tile_size.is_finite()) {
            return invalid(format!("tile_size must be positive, got {}", self.tile_size));
        }
        if self.tile_url.trim().is_empty() {
            return invalid(format!("tile_url is empty; set it or {TILE_URL_ENV}"));
        }
        if !self.limits.is_valid() {
            return invalid(format!("limits {:?} are empty", self.limits.to_array()));
        }
        if !self.center[0].is_finite() || !self.center[1].is_finite() {
            return invalid(format!("center {:?} is not finite", self.center));
        }
        Ok(())
    }

    pub fn tile_range(&self) -> TileRange {
        TileRange {
            min_tile_zoom: self.min_tile_zoom,
            max_tile_zoom: self.max_tile_zoom,
            tile_buffer: self.tile_buffer,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            url_template: self.tile_url.clone(),
            layers: self.layers.clone(),
            use_worker: self.use_worker,
        }
    }
}
