use crate::occlusion::DEFAULT_OCCLUSION_NEAR_THRESHOLD;
use crate::SceneResult;
use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// Cell size of newly created scenes, clamped to `MIN_CELL_SIZE..=MAX_CELL_SIZE`
    pub default_cell_size: f32,
    pub default_world_min: Vec3,
    pub default_world_max: Vec3,
    /// Objects closer to the camera than this plus their radius are never occlusion tested
    pub occlusion_near_threshold: f32,
    /// Distance over which a light fades out past its visible range
    pub light_fade_range: f32,
    pub enable_occlusion_culling: bool,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        VisibilityConfig {
            default_cell_size: 50.,
            default_world_min: Vec3::new(-250., -10., -250.),
            default_world_max: Vec3::new(250., 100., 250.),
            occlusion_near_threshold: DEFAULT_OCCLUSION_NEAR_THRESHOLD,
            light_fade_range: 5.,
            enable_occlusion_culling: true,
        }
    }
}

impl VisibilityConfig {
    pub fn from_json(json: &str) -> SceneResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
