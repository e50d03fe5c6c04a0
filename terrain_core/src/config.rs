//! Startup configuration. Built once (defaults, optionally overridden by a
//! JSON file) and handed by reference to every component; nothing mutates it
//! after `validate` succeeds.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

pub type Rgb = [f32; 3];
pub type Rgba = [f32; 4];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ViewerConfig {
    pub api: ApiSettings,
    pub render: RenderSettings,
    pub camera: CameraSettings,
    pub colors: ColorSettings,
    pub thresholds: HeightThresholds,
    pub lighting: LightingSettings,
    pub app: AppSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub elevation_url: String,
    /// Slippy-map template with `{z}`, `{x}` and `{y}` placeholders.
    pub tile_url: String,
    pub request_timeout_secs: u64,
    pub tile_timeout_secs: u64,
    pub max_retries: u32,
    pub batch_size: usize,
    pub rate_limit_delay_secs: f32,
    pub user_agent: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            elevation_url: "https://api.open-elevation.com/api/v1/lookup".to_string(),
            tile_url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            request_timeout_secs: 30,
            tile_timeout_secs: 10,
            max_retries: 3,
            batch_size: 100,
            rate_limit_delay_secs: 0.1,
            user_agent: concat!("terrain-viewer/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TerrainQuality {
    Low,
    #[default]
    Medium,
    High,
}

/// Grid size, height scale and tile zoom bundled per quality level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityPreset {
    pub terrain_size: usize,
    pub height_scale: f32,
    pub tile_zoom: u32,
}

impl TerrainQuality {
    pub fn preset(self) -> QualityPreset {
        match self {
            TerrainQuality::Low => QualityPreset {
                terrain_size: 30,
                height_scale: 0.05,
                tile_zoom: 12,
            },
            TerrainQuality::Medium => QualityPreset {
                terrain_size: 50,
                height_scale: 0.1,
                tile_zoom: 14,
            },
            TerrainQuality::High => QualityPreset {
                terrain_size: 100,
                height_scale: 0.2,
                tile_zoom: 16,
            },
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "low" => Some(TerrainQuality::Low),
            "medium" => Some(TerrainQuality::Medium),
            "high" => Some(TerrainQuality::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub terrain_size: usize,
    pub height_scale: f32,
    pub quality: TerrainQuality,
    /// World-space edge length the grid is stretched across.
    pub world_span: f32,
    pub tile_zoom: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            terrain_size: 50,
            height_scale: 0.1,
            quality: TerrainQuality::Medium,
            world_span: 4.0,
            tile_zoom: 14,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub distance: f32,
    pub rotation_x: f32,
    pub rotation_y: f32,
    /// Orbit distance applied when fresh terrain arrives.
    pub loaded_distance: f32,
    pub mouse_sensitivity: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            distance: 5.0,
            rotation_x: -30.0,
            rotation_y: 0.0,
            loaded_distance: 8.0,
            mouse_sensitivity: 0.5,
            pan_speed: 0.01,
            zoom_speed: 0.001,
            min_distance: 1.0,
            max_distance: 20.0,
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorSettings {
    pub water: Rgb,
    pub land_low: Rgb,
    pub land_mid: Rgb,
    pub land_high: Rgb,
    pub grid: Rgb,
    pub placeholder: Rgb,
    pub background: Rgba,
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            water: [0.2, 0.4, 0.8],
            land_low: [0.2, 0.7, 0.2],
            land_mid: [0.6, 0.4, 0.2],
            land_high: [0.9, 0.9, 0.9],
            grid: [0.3, 0.3, 0.3],
            placeholder: [0.6, 0.8, 0.6],
            background: [0.5, 0.7, 0.9, 1.0],
        }
    }
}

/// Upper bounds (exclusive) of the water, low and mid bands on the
/// normalized `[0, 1]` height scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightThresholds {
    pub water: f32,
    pub low: f32,
    pub mid: f32,
}

impl Default for HeightThresholds {
    fn default() -> Self {
        Self {
            water: 0.3,
            low: 0.6,
            mid: 0.8,
        }
    }
}

impl HeightThresholds {
    pub fn validate(&self) -> Result<()> {
        let ordered = 0.0 < self.water && self.water < self.low && self.low < self.mid && self.mid < 1.0;
        if ordered {
            Ok(())
        } else {
            Err(TerrainError::InvalidThresholds {
                water: self.water,
                low: self.low,
                mid: self.mid,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingSettings {
    /// Direction towards the light (directional, w = 0).
    pub direction: [f32; 3],
    pub ambient: f32,
    pub diffuse: f32,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            direction: [1.0, 1.0, 1.0],
            ambient: 0.3,
            diffuse: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub fps_target: u32,
    pub cache_dir: String,
    pub cache_max_age_days: u64,
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            window_title: "Terrain Viewer".to_string(),
            window_width: 1200,
            window_height: 800,
            fps_target: 60,
            cache_dir: "cache".to_string(),
            cache_max_age_days: 7,
            log_level: "info".to_string(),
        }
    }
}

impl ViewerConfig {
    /// Read a (possibly partial) JSON config; missing keys keep defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config: ViewerConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace grid size, height scale and tile zoom with a quality preset.
    pub fn with_quality(mut self, quality: TerrainQuality) -> Self {
        let preset = quality.preset();
        self.render.quality = quality;
        self.render.terrain_size = preset.terrain_size;
        self.render.height_scale = preset.height_scale;
        self.render.tile_zoom = preset.tile_zoom;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        if !(self.render.height_scale > 0.0) {
            return Err(TerrainError::InvalidScale(self.render.height_scale));
        }
        if self.render.terrain_size < crate::grid::MIN_GRID_EDGE {
            return Err(TerrainError::Config(format!(
                "terrain_size must be at least {} (got {})",
                crate::grid::MIN_GRID_EDGE,
                self.render.terrain_size
            )));
        }
        if !(self.render.world_span > 0.0) {
            return Err(TerrainError::Config(format!(
                "world_span must be positive (got {})",
                self.render.world_span
            )));
        }
        let camera = &self.camera;
        if !(camera.min_distance > 0.0 && camera.min_distance <= camera.max_distance) {
            return Err(TerrainError::Config(format!(
                "camera distance bounds must satisfy 0 < min <= max (got {}..{})",
                camera.min_distance, camera.max_distance
            )));
        }
        if self.api.batch_size == 0 {
            return Err(TerrainError::Config("api.batch_size must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Preset coordinates offered by the viewer CLI.
pub const DEFAULT_LOCATIONS: &[(&str, (f64, f64))] = &[
    ("Istanbul", (41.0082, 28.9784)),
    ("Ankara", (39.9334, 32.8597)),
    ("Izmir", (38.4192, 27.1287)),
    ("Antalya", (36.8969, 30.7133)),
    ("Bursa", (40.1826, 29.0665)),
    ("Everest", (27.9881, 86.9250)),
    ("Grand_Canyon", (36.1069, -112.1129)),
    ("Mount_Fuji", (35.3606, 138.7274)),
];

/// Case-insensitive lookup; unknown names fall back to Istanbul.
pub fn location_coordinates(name: &str) -> (f64, f64) {
    DEFAULT_LOCATIONS
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, coords)| *coords)
        .unwrap_or(DEFAULT_LOCATIONS[0].1)
}
