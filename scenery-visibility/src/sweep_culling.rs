use crate::geometry::AxisAlignedBoundingBox;
use bit_vec::BitVec;
use glam::Vec3;

const DIRECTION_EPSILON: f32 = 0.00001;

/// Tests whether an object, moved along the light direction, passes through the cascade bounds.
///
/// The sweep distance `t` (how far the object travels along `direction`) is bounded first on the
/// direction axis, then on X, Y and Z. An axis the light does not move along reduces to a plain
/// interval overlap. The object is a caster iff every axis leaves a non-empty range of `t >= 0`.
pub fn sweep_intersects(
    cascade: &AxisAlignedBoundingBox,
    direction: Vec3,
    object: &AxisAlignedBoundingBox,
) -> bool {
    let cascade_center = cascade.center().dot(direction);
    let cascade_radius = cascade.projected_radius(direction);
    let object_center = object.center().dot(direction);
    let object_radius = object.projected_radius(direction);

    let mut t_min = (cascade_center - cascade_radius) - (object_center + object_radius);
    let mut t_max = (cascade_center + cascade_radius) - (object_center - object_radius);

    // The cascade is entirely behind the object as seen from the light
    if t_max < 0. {
        return false;
    }
    t_min = t_min.max(0.);

    for axis in 0..3 {
        let d = direction[axis];
        let (c_min, c_max) = (cascade.min[axis], cascade.max[axis]);
        let (o_min, o_max) = (object.min[axis], object.max[axis]);

        if d.abs() < DIRECTION_EPSILON {
            if c_min > o_max || o_min > c_max {
                return false;
            }
            continue;
        }

        let mut enter = (c_min - o_max) / d;
        let mut exit = (c_max - o_min) / d;
        if enter > exit {
            std::mem::swap(&mut enter, &mut exit);
        }

        t_min = t_min.max(enter);
        t_max = t_max.min(exit);
        if t_min > t_max {
            return false;
        }
    }

    true
}

/// Sets the bit of every object that can cast a shadow into `cascade` along `direction`. The
/// direction must be normalized.
#[profiling::function]
pub fn cull_aabbs_sweep(
    cascade: &AxisAlignedBoundingBox,
    direction: Vec3,
    objects: &[AxisAlignedBoundingBox],
    casters: &mut BitVec,
) {
    debug_assert_eq!(objects.len(), casters.len());
    debug_assert!((direction.length_squared() - 1.).abs() < 0.001);

    for (index, object) in objects.iter().enumerate() {
        if sweep_intersects(cascade, direction, object) {
            casters.set(index, true);
        }
    }
}
