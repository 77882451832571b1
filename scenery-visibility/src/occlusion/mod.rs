use crate::geometry::BoundingSphere;
use crate::{CameraAxes, PolygonSoup};
use glam::Mat4;

mod software_occlusion_buffer;
pub use software_occlusion_buffer::OcclusionStats;
pub use software_occlusion_buffer::SoftwareOcclusionBuffer;

/// Objects closer to the camera than this plus their radius skip the occlusion test
pub const DEFAULT_OCCLUSION_NEAR_THRESHOLD: f32 = 10.;

/// Depth-buffer occlusion as driven by the render query: clear, set matrices, draw the occluders of
/// nearby frustum-visible models, then test the bounds of every remaining candidate.
pub trait OcclusionCuller {
    fn clear(&mut self);

    fn set_matrices(
        &mut self,
        view_projection: &Mat4,
    );

    fn draw_occluder(
        &mut self,
        mesh: &PolygonSoup,
        world_transform: &Mat4,
    );

    /// Returns false only if the sphere is hidden behind what was drawn
    fn test_bounds(
        &mut self,
        sphere: &BoundingSphere,
        camera: &CameraAxes,
    ) -> bool;

    /// Occluders are only drawn for objects within this distance (plus radius) of the camera
    fn occluder_range(&self) -> f32;
}
