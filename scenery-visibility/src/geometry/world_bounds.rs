use crate::geometry::{AxisAlignedBoundingBox, BoundingSphere};
use glam::Vec3;

/// World-space bounds of an object as reported by its bounds component
#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct WorldBounds {
    pub sphere: BoundingSphere,
    pub aabb: AxisAlignedBoundingBox,
}

impl WorldBounds {
    pub fn from_sphere(sphere: BoundingSphere) -> Self {
        let half_extents = Vec3::splat(sphere.radius);
        WorldBounds {
            sphere,
            aabb: AxisAlignedBoundingBox::from_center_half_extents(sphere.position, half_extents),
        }
    }
}
