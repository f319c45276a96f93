use anyhow::{Context, Result};
use glam::Vec3;
use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "ModelConfig::default_path")]
    pub path: PathBuf,
}

/// Camera lens shared by the orbit and walk drivers.
#[derive(Debug, Clone, Deserialize)]
pub struct LensConfig {
    #[serde(default = "LensConfig::default_fov_degrees")]
    pub fov_y_degrees: f32,
    #[serde(default = "LensConfig::default_near")]
    pub near: f32,
    #[serde(default = "LensConfig::default_far")]
    pub far: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavigationConfig {
    #[serde(default = "NavigationConfig::default_base_speed")]
    pub base_speed: f32,
    #[serde(default = "NavigationConfig::default_sprint_speed")]
    pub sprint_speed: f32,
    #[serde(default = "NavigationConfig::default_vertical_speed")]
    pub vertical_speed: f32,
    #[serde(default = "NavigationConfig::default_min_height")]
    pub min_height: f32,
    #[serde(default = "NavigationConfig::default_max_height")]
    pub max_height: f32,
    #[serde(default = "NavigationConfig::default_look_sensitivity")]
    pub look_sensitivity: f32,
    #[serde(default = "NavigationConfig::default_orbit_damping")]
    pub orbit_damping: f32,
    #[serde(default = "NavigationConfig::default_zoom_step")]
    pub zoom_step: f32,
    #[serde(default = "NavigationConfig::default_max_frame_dt")]
    pub max_frame_dt: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FramingConfig {
    #[serde(default = "FramingConfig::default_min_distance")]
    pub min_distance: f32,
    #[serde(default = "FramingConfig::default_depth_scale")]
    pub depth_scale: f32,
    #[serde(default = "FramingConfig::default_lateral_scale")]
    pub lateral_scale: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "OverlayConfig::default_name_patterns")]
    pub name_patterns: Vec<String>,
    #[serde(default = "OverlayConfig::default_opacity_threshold")]
    pub opacity_threshold: f32,
}

/// Camera pose restored by the reset-view action and used before a model loads.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "ViewConfig::default_camera")]
    pub camera: Vec3,
    #[serde(default = "ViewConfig::default_target")]
    pub target: Vec3,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ViewerConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub lens: LensConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub framing: FramingConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub default_view: ViewConfig,
    #[serde(default)]
    pub input_bindings: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct ViewerConfigOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub model_path: Option<PathBuf>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { title: "GLB Viewer".to_string(), width: 1280, height: 720 }
    }
}

impl ModelConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("model.glb")
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { path: Self::default_path() }
    }
}

impl LensConfig {
    const fn default_fov_degrees() -> f32 {
        62.0
    }

    const fn default_near() -> f32 {
        0.05
    }

    const fn default_far() -> f32 {
        500.0
    }
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: Self::default_fov_degrees(),
            near: Self::default_near(),
            far: Self::default_far(),
        }
    }
}

impl NavigationConfig {
    const fn default_base_speed() -> f32 {
        3.2
    }

    const fn default_sprint_speed() -> f32 {
        6.2
    }

    const fn default_vertical_speed() -> f32 {
        2.4
    }

    const fn default_min_height() -> f32 {
        0.6
    }

    const fn default_max_height() -> f32 {
        10.0
    }

    const fn default_look_sensitivity() -> f32 {
        0.002
    }

    const fn default_orbit_damping() -> f32 {
        0.06
    }

    const fn default_zoom_step() -> f32 {
        0.95
    }

    const fn default_max_frame_dt() -> f32 {
        0.05
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            base_speed: Self::default_base_speed(),
            sprint_speed: Self::default_sprint_speed(),
            vertical_speed: Self::default_vertical_speed(),
            min_height: Self::default_min_height(),
            max_height: Self::default_max_height(),
            look_sensitivity: Self::default_look_sensitivity(),
            orbit_damping: Self::default_orbit_damping(),
            zoom_step: Self::default_zoom_step(),
            max_frame_dt: Self::default_max_frame_dt(),
        }
    }
}

impl FramingConfig {
    const fn default_min_distance() -> f32 {
        3.0
    }

    const fn default_depth_scale() -> f32 {
        0.18
    }

    const fn default_lateral_scale() -> f32 {
        0.65
    }
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            min_distance: Self::default_min_distance(),
            depth_scale: Self::default_depth_scale(),
            lateral_scale: Self::default_lateral_scale(),
        }
    }
}

impl OverlayConfig {
    fn default_name_patterns() -> Vec<String> {
        ["overlay", "turn", "hoist"].iter().map(|s| s.to_string()).collect()
    }

    const fn default_opacity_threshold() -> f32 {
        0.9
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            name_patterns: Self::default_name_patterns(),
            opacity_threshold: Self::default_opacity_threshold(),
        }
    }
}

impl ViewConfig {
    const fn default_camera() -> Vec3 {
        Vec3::new(10.0, -14.0, 3.2)
    }

    const fn default_target() -> Vec3 {
        Vec3::new(20.0, 10.0, 2.2)
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self { camera: Self::default_camera(), target: Self::default_target() }
    }
}

impl ViewerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("[config] {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ViewerConfigOverrides) {
        if let Some(width) = overrides.width {
            self.window.width = width;
        }
        if let Some(height) = overrides.height {
            self.window.height = height;
        }
        if let Some(path) = &overrides.model_path {
            self.model.path = path.clone();
        }
    }
}

impl ViewerConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.model_path.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.width.is_some() {
            fields.push("width");
        }
        if self.height.is_some() {
            fields.push("height");
        }
        if self.model_path.is_some() {
            fields.push("model");
        }
        fields
    }
}
