//! Viewer configuration with documented constants
//!
//! Every tunable used by the frame pipeline is collected here. Values are
//! loaded from TOML (missing keys fall back to the defaults below) and
//! checked once with `validate()` before a backend is built.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{Result, ViewError};

/// Configuration for the frame-composition engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    // === FRAME CLOCK ===
    /// Largest delta (seconds) a single tick may observe
    ///
    /// Absorbs huge gaps from a suspended tab so a slow tick cannot
    /// compound animation error.
    pub max_delta: f32,

    /// Weight of the previous value in the smoothed frame rate
    ///
    /// 0.9 means each new sample contributes 10%.
    pub fps_smoothing: f32,

    // === DAY / SEASON ===
    /// Simulation seconds per full day/night cycle
    pub day_length_seconds: f32,

    /// Simulation days per season
    pub season_length_days: u32,

    // === PROJECTION ===
    /// Width of one ground tile in pixels at zoom 1
    pub tile_width: f32,

    /// Height of one ground tile in pixels at zoom 1
    pub tile_height: f32,

    /// Pixels per world unit of elevation at zoom 1
    pub elevation_scale: f32,

    /// Zoom clamp range
    pub min_zoom: f32,
    pub max_zoom: f32,

    /// Exponential follow rate (per second) for smooth camera moves
    pub camera_follow_rate: f32,

    // === TERRAIN CACHE ===
    /// Tiles of padding around the visible footprint
    pub terrain_padding: i32,

    /// Camera center movement (world units) tolerated before a rebuild
    pub terrain_center_tolerance: f32,

    /// Zoom change tolerated before a rebuild
    pub terrain_zoom_tolerance: f32,

    /// Number of visual variants per terrain class
    pub terrain_variants: u32,

    /// Upper bound on raster pixels (width * height after pixel density)
    ///
    /// Hosts that cannot back a raster this large fail primary-backend
    /// construction and fall back to the reduced backend.
    pub max_raster_pixels: u64,

    // === COMPOSITOR ===
    /// Screen-space padding (pixels) added to bounding boxes before culling
    pub cull_padding: f32,

    /// Night factor above which window glow is drawn
    pub night_glow_threshold: f32,

    /// Seconds a freshly placed building takes to scale in
    pub placement_duration: f32,

    /// Seconds for interpolated colonist positions to converge
    pub colonist_smoothing: f32,

    // === EFFECTS ===
    /// Particle pool capacity (oldest evicted first)
    pub particle_capacity: usize,

    /// Floating-text pool capacity (oldest evicted first)
    pub text_capacity: usize,

    /// Ambient emissions per second for an industrial building at full quality
    pub ambient_base_rate: f32,

    /// Seconds between resource-gain samples
    pub resource_sample_interval: f32,

    /// Master switch for placement dust and ambient particles
    pub effects_enabled: bool,

    /// Smoothed fps below which particle quality is reduced
    pub quality_low_fps: f32,

    /// Smoothed fps above which particle quality recovers
    pub quality_high_fps: f32,

    // === OVERLAYS ===
    /// Pulse amplitude of the selected-entity ring (pixels)
    pub selection_pulse: f32,

    /// Hover pulse as a fraction of the selection pulse
    pub hover_pulse_ratio: f32,

    /// Pointer travel (pixels) after which a press becomes a drag
    pub drag_threshold: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            max_delta: 0.12,
            fps_smoothing: 0.9,

            day_length_seconds: 240.0,
            season_length_days: 12,

            tile_width: 64.0,
            tile_height: 32.0,
            elevation_scale: 32.0,
            min_zoom: 0.35,
            max_zoom: 3.0,
            camera_follow_rate: 6.0,

            terrain_padding: 3,
            terrain_center_tolerance: 0.45,
            terrain_zoom_tolerance: 0.04,
            terrain_variants: 4,
            max_raster_pixels: 4096 * 4096,

            cull_padding: 48.0,
            night_glow_threshold: 0.45,
            placement_duration: 0.45,
            colonist_smoothing: 0.12,

            particle_capacity: 600,
            text_capacity: 24,
            ambient_base_rate: 1.6,
            resource_sample_interval: 1.0,
            effects_enabled: true,
            quality_low_fps: 40.0,
            quality_high_fps: 55.0,

            selection_pulse: 4.0,
            hover_pulse_ratio: 0.75,
            drag_threshold: 6.0,
        }
    }
}

impl ViewConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ViewConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if !(self.max_delta > 0.0) {
            return Err(ViewError::InvalidConfig(format!(
                "max_delta ({}) must be positive",
                self.max_delta
            )));
        }

        if !(0.0..1.0).contains(&self.fps_smoothing) {
            return Err(ViewError::InvalidConfig(format!(
                "fps_smoothing ({}) must be in [0, 1)",
                self.fps_smoothing
            )));
        }

        if self.tile_width <= 0.0 || self.tile_height <= 0.0 {
            return Err(ViewError::InvalidConfig("tile dimensions must be positive".into()));
        }

        if self.min_zoom <= 0.0 || self.min_zoom > self.max_zoom {
            return Err(ViewError::InvalidConfig(format!(
                "zoom range [{}, {}] is empty",
                self.min_zoom, self.max_zoom
            )));
        }

        if self.terrain_padding < 0 || self.terrain_variants == 0 {
            return Err(ViewError::InvalidConfig(
                "terrain_padding must be >= 0 and terrain_variants > 0".into(),
            ));
        }

        if self.particle_capacity == 0 || self.text_capacity == 0 {
            return Err(ViewError::InvalidConfig("effect pools need capacity".into()));
        }

        if self.quality_low_fps >= self.quality_high_fps {
            return Err(ViewError::InvalidConfig(format!(
                "quality_low_fps ({}) should be < quality_high_fps ({})",
                self.quality_low_fps, self.quality_high_fps
            )));
        }

        if self.day_length_seconds <= 0.0 {
            return Err(ViewError::InvalidConfig("day_length_seconds must be positive".into()));
        }

        Ok(())
    }

    /// Hover ring pulse amplitude
    pub fn hover_pulse(&self) -> f32 {
        self.selection_pulse * self.hover_pulse_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ViewConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ViewConfig::from_toml_str("particle_capacity = 32\nmax_delta = 0.2\n").unwrap();
        assert_eq!(config.particle_capacity, 32);
        assert!((config.max_delta - 0.2).abs() < 1e-6);
        assert_eq!(config.text_capacity, ViewConfig::default().text_capacity);
    }

    #[test]
    fn test_invalid_zoom_range_rejected() {
        let err = ViewConfig::from_toml_str("min_zoom = 4.0\nmax_zoom = 1.0\n").unwrap_err();
        assert!(matches!(err, ViewError::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = ViewConfig::from_toml_str("max_delta = [").unwrap_err();
        assert!(matches!(err, ViewError::ConfigParse(_)));
    }

    #[test]
    fn test_hover_pulse_ratio() {
        let config = ViewConfig::default();
        assert!((config.hover_pulse() - config.selection_pulse * 0.75).abs() < 1e-6);
    }
}
