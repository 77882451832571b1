use glam::{Vec3, Vec4};

/// Plane stored as `(normal, d)`. Points with a positive distance are on the inside.
#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec4,
}

impl Plane {
    pub fn new(
        normal: Vec3,
        point: Vec3,
    ) -> Self {
        let normal = normal.normalize();
        let d = -normal.dot(point);

        Plane {
            normal: normal.extend(d),
        }
    }

    pub fn get_normal(&self) -> Vec3 {
        self.normal.truncate()
    }

    pub fn d(&self) -> f32 {
        self.normal.w
    }

    pub fn distance(
        &self,
        p: Vec3,
    ) -> f32 {
        self.normal.w + self.normal.truncate().dot(p)
    }
}
