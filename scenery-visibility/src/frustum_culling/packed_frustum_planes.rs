use crate::geometry::{BoundingSphere, Frustum};
use bit_vec::BitVec;
use glam::Vec4;

/// The six frustum planes transposed into structure-of-arrays form. The first batch holds planes
/// 0..4, the second holds planes 4 and 5 twice, so every sphere is tested with two 4-wide passes.
#[derive(Copy, Clone, Debug)]
pub struct PackedFrustumPlanes {
    xs: [Vec4; 2],
    ys: [Vec4; 2],
    zs: [Vec4; 2],
    ds: [Vec4; 2],
}

impl PackedFrustumPlanes {
    pub fn new(frustum: &Frustum) -> Self {
        let p = frustum.planes.map(|plane| plane.normal);
        PackedFrustumPlanes {
            xs: [
                Vec4::new(p[0].x, p[1].x, p[2].x, p[3].x),
                Vec4::new(p[4].x, p[5].x, p[4].x, p[5].x),
            ],
            ys: [
                Vec4::new(p[0].y, p[1].y, p[2].y, p[3].y),
                Vec4::new(p[4].y, p[5].y, p[4].y, p[5].y),
            ],
            zs: [
                Vec4::new(p[0].z, p[1].z, p[2].z, p[3].z),
                Vec4::new(p[4].z, p[5].z, p[4].z, p[5].z),
            ],
            ds: [
                Vec4::new(p[0].w, p[1].w, p[2].w, p[3].w),
                Vec4::new(p[4].w, p[5].w, p[4].w, p[5].w),
            ],
        }
    }

    /// True if the sphere is entirely on the negative side of at least one plane.
    #[inline(always)]
    pub fn culls(
        &self,
        sphere: &BoundingSphere,
    ) -> bool {
        let x = Vec4::splat(sphere.position.x);
        let y = Vec4::splat(sphere.position.y);
        let z = Vec4::splat(sphere.position.z);
        let negative_radius = Vec4::splat(-sphere.radius);

        let mut bitmask = 0;
        for batch in 0..2 {
            let distances = self.xs[batch] * x + self.ys[batch] * y + self.zs[batch] * z + self.ds[batch];
            bitmask |= distances.cmplt(negative_radius).bitmask();
        }

        bitmask != 0
    }
}

/// Exact frustum test for a dense array of spheres. Bits of spheres that pass are set in `visible`;
/// bits that are already set stay set, so results of several passes accumulate.
#[profiling::function]
pub fn cull_spheres(
    frustum: &Frustum,
    spheres: &[BoundingSphere],
    visible: &mut BitVec,
) {
    debug_assert_eq!(spheres.len(), visible.len());

    let planes = PackedFrustumPlanes::new(frustum);
    for (index, sphere) in spheres.iter().enumerate() {
        if !planes.culls(sphere) {
            visible.set(index, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Plane;
    use crate::ViewFrustum;
    use glam::Vec3;

    fn forward_frustum() -> Frustum {
        ViewFrustum::new_perspective(
            Vec3::ZERO,
            Vec3::Z,
            Vec3::Y,
            60f32.to_radians(),
            1.0,
            0.5,
            1000.,
        )
        .acquire_frustum()
    }

    #[test]
    fn test_sphere_beyond_far_plane_is_culled() {
        let frustum = forward_frustum();
        let spheres = [
            BoundingSphere::new(Vec3::new(0., 0., 2000.), 1.),
            BoundingSphere::new(Vec3::new(0., 0., 500.), 1.),
            BoundingSphere::new(Vec3::new(0., 0., -50.), 1.),
        ];
        let mut visible = BitVec::from_elem(3, false);
        cull_spheres(&frustum, &spheres, &mut visible);

        assert!(!visible[0]);
        assert!(visible[1]);
        assert!(!visible[2]);
    }

    #[test]
    fn test_tangent_sphere_is_visible() {
        // Unit cube frustum with the far plane at z = 10
        let mut planes = [Plane::default(); 6];
        planes[ViewFrustum::NEAR] = Plane::new(Vec3::Z, Vec3::ZERO);
        planes[ViewFrustum::FAR] = Plane::new(-Vec3::Z, Vec3::new(0., 0., 10.));
        planes[ViewFrustum::LEFT] = Plane::new(Vec3::X, Vec3::new(-10., 0., 0.));
        planes[ViewFrustum::RIGHT] = Plane::new(-Vec3::X, Vec3::new(10., 0., 0.));
        planes[ViewFrustum::TOP] = Plane::new(-Vec3::Y, Vec3::new(0., 10., 0.));
        planes[ViewFrustum::BOTTOM] = Plane::new(Vec3::Y, Vec3::new(0., -10., 0.));
        let frustum = Frustum::new(planes);

        let spheres = [
            BoundingSphere::new(Vec3::new(0., 0., 12.), 2.),
            BoundingSphere::new(Vec3::new(0., 0., 12.5), 2.),
            BoundingSphere::new(Vec3::new(0., -12., 5.), 2.),
        ];
        let mut visible = BitVec::from_elem(3, false);
        cull_spheres(&frustum, &spheres, &mut visible);

        assert!(visible[0]);
        assert!(!visible[1]);
        assert!(visible[2]);
    }

    #[test]
    fn test_results_accumulate() {
        let frustum = forward_frustum();
        let spheres = [
            BoundingSphere::new(Vec3::new(0., 0., 2000.), 1.),
            BoundingSphere::new(Vec3::new(0., 0., 10.), 1.),
        ];
        let mut visible = BitVec::from_elem(2, false);
        visible.set(0, true);
        cull_spheres(&frustum, &spheres, &mut visible);

        assert!(visible[0]);
        assert!(visible[1]);
    }

    #[test]
    fn test_packed_matches_scalar() {
        let frustum = forward_frustum();
        let planes = PackedFrustumPlanes::new(&frustum);
        for i in 0..200 {
            let t = i as f32;
            let sphere = BoundingSphere::new(
                Vec3::new((t * 7.3) % 600. - 300., (t * 3.1) % 200. - 100., (t * 13.7) % 1400. - 200.),
                (t * 0.37) % 20.,
            );
            assert_eq!(planes.culls(&sphere), !frustum.contains_sphere(&sphere));
        }
    }
}
