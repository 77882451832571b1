use glam::Vec3;
use serde::Deserialize;
use serde::Serialize;

#[derive(Default, Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisAlignedBoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl AxisAlignedBoundingBox {
    pub fn new(
        min: Vec3,
        max: Vec3,
    ) -> Self {
        AxisAlignedBoundingBox { min, max }
    }

    pub fn from_center_half_extents(
        center: Vec3,
        half_extents: Vec3,
    ) -> Self {
        AxisAlignedBoundingBox {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Half-length of the box projected on `direction`
    pub fn projected_radius(
        &self,
        direction: Vec3,
    ) -> f32 {
        self.half_extents().dot(direction.abs())
    }
}
