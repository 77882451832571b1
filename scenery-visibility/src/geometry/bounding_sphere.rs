use glam::{Vec3, Vec4};
use serde::Deserialize;
use serde::Serialize;

#[derive(Default, Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub position: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(
        position: Vec3,
        radius: f32,
    ) -> Self {
        BoundingSphere { position, radius }
    }

    /// Touching spheres count as intersecting.
    pub fn intersects(
        &self,
        other: &BoundingSphere,
    ) -> bool {
        let reach = self.radius + other.radius;
        self.position.distance_squared(other.position) <= reach * reach
    }

    /// Min and max corners of the sphere's footprint on the XZ plane, packed as
    /// `(x_min, z_min, x_max, z_max)`.
    pub fn xz_rect(&self) -> Vec4 {
        let p = self.position;
        let r = self.radius;
        Vec4::new(p.x - r, p.z - r, p.x + r, p.z + r)
    }
}
