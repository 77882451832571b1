use crate::geometry::Frustum;
use crate::{OrthographicParameters, PerspectiveParameters, Projection};
use glam::{Mat4, Vec3};

/// A camera: eye, look-at target, up vector and projection. Produces the frustum planes and the
/// `ViewParams` a render query needs.
#[derive(Clone, Debug)]
pub struct ViewFrustum {
    projection: Projection,
    eye_position: Vec3,
    look_at: Vec3,
    up: Vec3,
}

impl ViewFrustum {
    pub const NEAR: usize = 0;
    pub const FAR: usize = 1;
    pub const LEFT: usize = 2;
    pub const RIGHT: usize = 3;
    pub const TOP: usize = 4;
    pub const BOTTOM: usize = 5;

    pub fn new_perspective(
        eye_position: Vec3,
        look_at: Vec3,
        up: Vec3,
        fov_y_radians: f32,
        ratio: f32,
        near_distance: f32,
        far_distance: f32,
    ) -> Self {
        ViewFrustum {
            projection: Projection::Perspective(PerspectiveParameters::new(
                fov_y_radians,
                ratio,
                near_distance,
                far_distance,
            )),
            eye_position,
            look_at,
            up,
        }
    }

    pub fn new_orthographic(
        eye_position: Vec3,
        look_at: Vec3,
        up: Vec3,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near_distance: f32,
        far_distance: f32,
    ) -> Self {
        ViewFrustum {
            projection: Projection::Orthographic(OrthographicParameters::new(
                left,
                right,
                bottom,
                top,
                near_distance,
                far_distance,
            )),
            eye_position,
            look_at,
            up,
        }
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn set_transforms(
        &mut self,
        eye_position: Vec3,
        look_at: Vec3,
        up: Vec3,
    ) {
        self.eye_position = eye_position;
        self.look_at = look_at;
        self.up = up;
    }

    pub fn eye_position(&self) -> Vec3 {
        self.eye_position
    }

    pub fn look_at(&self) -> Vec3 {
        self.look_at
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    // NOTE: Right-handed. The camera looks down -z.
    pub(crate) fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let z = (self.eye_position - self.look_at).normalize();
        let x = (self.up.cross(z)).normalize();
        let y = z.cross(x);
        (x, y, z)
    }

    pub fn acquire_frustum(&self) -> Frustum {
        let mut frustum = Frustum::default();
        self.projection.update_frustum(self, &mut frustum);
        frustum
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye_position, self.look_at, self.up)
    }

    pub fn view_params(&self) -> ViewParams {
        ViewParams::new(
            self.eye_position,
            self.view_matrix(),
            self.projection.as_rh_mat4(),
        )
    }
}

/// Camera state supplied with every query: position plus view and projection matrices.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewParams {
    pub camera_position: Vec3,
    pub view: Mat4,
    pub projection: Mat4,
}

/// World-space right and up vectors of the camera, used to build camera-facing quads.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CameraAxes {
    pub x_axis: Vec3,
    pub y_axis: Vec3,
    pub position: Vec3,
}

impl ViewParams {
    pub fn new(
        camera_position: Vec3,
        view: Mat4,
        projection: Mat4,
    ) -> Self {
        ViewParams {
            camera_position,
            view,
            projection,
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    pub fn camera_axes(&self) -> CameraAxes {
        let view_inverse = self.view.inverse();
        CameraAxes {
            x_axis: view_inverse.x_axis.truncate(),
            y_axis: view_inverse.y_axis.truncate(),
            position: self.camera_position,
        }
    }
}
