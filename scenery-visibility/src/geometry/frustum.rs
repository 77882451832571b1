use crate::geometry::plane::Plane;
use crate::geometry::BoundingSphere;
use crate::ViewFrustum;
use glam::Vec3;

/// Six inward-facing planes, indexed by `ViewFrustum::NEAR` .. `ViewFrustum::BOTTOM`
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    pub fn new(planes: [Plane; 6]) -> Self {
        Frustum { planes }
    }

    pub fn contains_point(
        &self,
        point: Vec3,
    ) -> bool {
        self.planes.iter().all(|plane| plane.distance(point) >= 0.)
    }

    /// Scalar reference for `PackedFrustumPlanes`. A sphere tangent to a plane is inside.
    pub fn contains_sphere(
        &self,
        sphere: &BoundingSphere,
    ) -> bool {
        let negative_radius = -sphere.radius;
        self.planes
            .iter()
            .all(|plane| plane.distance(sphere.position) >= negative_radius)
    }
}
