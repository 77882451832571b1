mod packed_frustum_planes;
pub use packed_frustum_planes::cull_spheres;
pub use packed_frustum_planes::PackedFrustumPlanes;
