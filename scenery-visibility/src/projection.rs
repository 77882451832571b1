use crate::geometry::{Frustum, Plane};
use crate::ViewFrustum;
use glam::{Mat4, Vec3};

#[derive(Clone, Debug, PartialEq)]
pub enum Projection {
    Perspective(PerspectiveParameters),
    Orthographic(OrthographicParameters),
}

impl Projection {
    pub fn depth_bounds(&self) -> (f32, f32) {
        match self {
            Projection::Perspective(parameters) => (parameters.near_distance, parameters.far_distance),
            Projection::Orthographic(parameters) => (parameters.near_distance, parameters.far_distance),
        }
    }

    /// Right-handed, depth mapped to 0..1. The occlusion buffer relies on that range.
    pub fn as_rh_mat4(&self) -> Mat4 {
        match self {
            Projection::Perspective(parameters) => Mat4::perspective_rh(
                parameters.fov_y_radians,
                parameters.ratio,
                parameters.near_distance,
                parameters.far_distance,
            ),
            Projection::Orthographic(parameters) => Mat4::orthographic_rh(
                parameters.left,
                parameters.right,
                parameters.bottom,
                parameters.top,
                parameters.near_distance,
                parameters.far_distance,
            ),
        }
    }

    pub(crate) fn update_frustum(
        &self,
        view_frustum: &ViewFrustum,
        frustum: &mut Frustum,
    ) {
        let eye = view_frustum.eye_position();
        let (x, y, z) = view_frustum.basis();
        let (near, far) = self.depth_bounds();

        // Forward is -z
        frustum.planes[ViewFrustum::NEAR] = Plane::new(-z, eye - z * near);
        frustum.planes[ViewFrustum::FAR] = Plane::new(z, eye - z * far);

        match self {
            Projection::Perspective(parameters) => {
                // Side planes all contain the eye. Each inward axis leans toward the view
                // direction by the tangent of the half angle.
                let tan_y = parameters.tan_half_fov_y;
                let tan_x = tan_y * parameters.ratio;
                frustum.planes[ViewFrustum::TOP] = Plane::new(-y - z * tan_y, eye);
                frustum.planes[ViewFrustum::BOTTOM] = Plane::new(y - z * tan_y, eye);
                frustum.planes[ViewFrustum::LEFT] = Plane::new(x - z * tan_x, eye);
                frustum.planes[ViewFrustum::RIGHT] = Plane::new(-x - z * tan_x, eye);
            }
            Projection::Orthographic(parameters) => {
                let offset = |axis: Vec3, amount: f32| eye + axis * amount;
                frustum.planes[ViewFrustum::TOP] = Plane::new(-y, offset(y, parameters.top));
                frustum.planes[ViewFrustum::BOTTOM] = Plane::new(y, offset(y, parameters.bottom));
                frustum.planes[ViewFrustum::LEFT] = Plane::new(x, offset(x, parameters.left));
                frustum.planes[ViewFrustum::RIGHT] = Plane::new(-x, offset(x, parameters.right));
            }
        }
    }
}

/// Box-shaped view volume, as used for shadow cascades. Extents are relative to the eye.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct OrthographicParameters {
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
    near_distance: f32,
    far_distance: f32,
}

impl OrthographicParameters {
    pub fn new(
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near_distance: f32,
        far_distance: f32,
    ) -> Self {
        OrthographicParameters {
            left,
            right,
            bottom,
            top,
            near_distance,
            far_distance,
        }
    }
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct PerspectiveParameters {
    fov_y_radians: f32,
    tan_half_fov_y: f32,
    ratio: f32,
    near_distance: f32,
    far_distance: f32,
}

impl PerspectiveParameters {
    pub fn new(
        fov_y_radians: f32,
        ratio: f32,
        near_distance: f32,
        far_distance: f32,
    ) -> Self {
        PerspectiveParameters {
            fov_y_radians,
            tan_half_fov_y: (fov_y_radians * 0.5).tan(),
            ratio,
            near_distance,
            far_distance,
        }
    }

    pub fn fov_y_radians(&self) -> f32 {
        self.fov_y_radians
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }
}
