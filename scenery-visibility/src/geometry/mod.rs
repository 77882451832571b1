mod axis_aligned_bounding_box;
pub use axis_aligned_bounding_box::AxisAlignedBoundingBox;

mod bounding_sphere;
pub use bounding_sphere::BoundingSphere;

mod frustum;
pub use frustum::Frustum;

mod plane;
pub use plane::Plane;

mod world_bounds;
pub use world_bounds::WorldBounds;
