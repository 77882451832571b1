use super::OcclusionCuller;
use crate::geometry::BoundingSphere;
use crate::{CameraAxes, PolygonSoup};
use glam::{Mat4, Vec3, Vec4};

const DEFAULT_OCCLUDER_RANGE: f32 = 100.;
const W_EPSILON: f32 = 0.0000001;
const AREA_EPSILON: f32 = 0.00001;

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct OcclusionStats {
    pub occluder_count: u32,
    pub occluder_triangle_count: u32,
    pub tested_count: u32,
    pub hidden_count: u32,
}

/// CPU depth buffer. Occluders are rasterized with edge functions at pixel centers; bounds are
/// tested as a camera-facing quad placed at the sphere's nearest point.
pub struct SoftwareOcclusionBuffer {
    width: u32,
    height: u32,
    depth: Vec<f32>,
    view_projection: Mat4,
    occluder_range: f32,
    visible_pixel_threshold: u32,
    stats: OcclusionStats,
}

impl SoftwareOcclusionBuffer {
    pub fn new(
        width: u32,
        height: u32,
    ) -> Self {
        assert!(width > 0 && height > 0);
        SoftwareOcclusionBuffer {
            width,
            height,
            depth: vec![1.; (width * height) as usize],
            view_projection: Mat4::IDENTITY,
            occluder_range: DEFAULT_OCCLUDER_RANGE,
            visible_pixel_threshold: 0,
            stats: OcclusionStats::default(),
        }
    }

    pub fn with_occluder_range(
        mut self,
        occluder_range: f32,
    ) -> Self {
        self.occluder_range = occluder_range;
        self
    }

    /// Bounds covering this many unoccluded pixels or fewer count as hidden
    pub fn with_visible_pixel_threshold(
        mut self,
        visible_pixel_threshold: u32,
    ) -> Self {
        self.visible_pixel_threshold = visible_pixel_threshold;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stats(&self) -> &OcclusionStats {
        &self.stats
    }

    pub fn depth_at(
        &self,
        x: u32,
        y: u32,
    ) -> f32 {
        self.depth[(y * self.width + x) as usize]
    }

    // Clip space to (pixel x, pixel y, depth). None if the point is behind the eye or the near plane.
    fn to_screen(
        &self,
        clip: Vec4,
    ) -> Option<Vec3> {
        if clip.w <= W_EPSILON {
            return None;
        }

        let ndc = clip.truncate() / clip.w;
        if ndc.z < 0. {
            return None;
        }

        Some(Vec3::new(
            (ndc.x * 0.5 + 0.5) * self.width as f32,
            (0.5 - ndc.y * 0.5) * self.height as f32,
            ndc.z,
        ))
    }

    // Visits every pixel whose center lies inside the triangle, with the interpolated depth
    fn rasterize<F: FnMut(usize, f32)>(
        &self,
        v0: Vec3,
        v1: Vec3,
        v2: Vec3,
        mut f: F,
    ) {
        let mut area = edge(v0, v1, v2.x, v2.y);
        if area.abs() < AREA_EPSILON {
            return;
        }

        // Accept both windings
        let (v1, v2) = if area < 0. {
            area = -area;
            (v2, v1)
        } else {
            (v1, v2)
        };

        let min_x = v0.x.min(v1.x).min(v2.x).floor().max(0.) as u32;
        let min_y = v0.y.min(v1.y).min(v2.y).floor().max(0.) as u32;
        let max_x = (v0.x.max(v1.x).max(v2.x).ceil() as i64).min(self.width as i64 - 1);
        let max_y = (v0.y.max(v1.y).max(v2.y).ceil() as i64).min(self.height as i64 - 1);
        if max_x < 0 || max_y < 0 {
            return;
        }

        for y in min_y..=(max_y as u32) {
            let py = y as f32 + 0.5;
            for x in min_x..=(max_x as u32) {
                let px = x as f32 + 0.5;
                let w0 = edge(v1, v2, px, py);
                let w1 = edge(v2, v0, px, py);
                let w2 = edge(v0, v1, px, py);
                if w0 < 0. || w1 < 0. || w2 < 0. {
                    continue;
                }

                let z = (w0 * v0.z + w1 * v1.z + w2 * v2.z) / area;
                f((y * self.width + x) as usize, z);
            }
        }
    }
}

fn edge(
    a: Vec3,
    b: Vec3,
    px: f32,
    py: f32,
) -> f32 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

impl OcclusionCuller for SoftwareOcclusionBuffer {
    fn clear(&mut self) {
        for depth in &mut self.depth {
            *depth = 1.;
        }
        self.stats = OcclusionStats::default();
    }

    fn set_matrices(
        &mut self,
        view_projection: &Mat4,
    ) {
        self.view_projection = *view_projection;
    }

    #[profiling::function]
    fn draw_occluder(
        &mut self,
        mesh: &PolygonSoup,
        world_transform: &Mat4,
    ) {
        let transform = self.view_projection * *world_transform;

        for triangle in 0..mesh.triangle_count() {
            let indices = mesh.triangle(triangle);
            let mut screen = [Vec3::ZERO; 3];
            let mut clipped = false;
            for (corner, index) in indices.iter().enumerate() {
                let position = match mesh.vertex_positions.get(*index) {
                    Some(position) => *position,
                    None => {
                        clipped = true;
                        continue;
                    }
                };
                match self.to_screen(transform * position.extend(1.)) {
                    Some(point) => screen[corner] = point,
                    None => clipped = true,
                }
            }

            // NOTE: Triangles crossing the near plane are dropped rather than clipped. Drawing less
            // occluder area can only keep more objects visible.
            if clipped {
                continue;
            }

            let mut depth = std::mem::take(&mut self.depth);
            self.rasterize(screen[0], screen[1], screen[2], |index, z| {
                if z < depth[index] {
                    depth[index] = z;
                }
            });
            self.depth = depth;
        }

        self.stats.occluder_count += 1;
        self.stats.occluder_triangle_count += mesh.triangle_count() as u32;
    }

    #[profiling::function]
    fn test_bounds(
        &mut self,
        sphere: &BoundingSphere,
        camera: &CameraAxes,
    ) -> bool {
        self.stats.tested_count += 1;

        let to_camera = camera.position - sphere.position;
        let distance = to_camera.length();
        if distance <= sphere.radius {
            return true;
        }

        // Billboard tangent to the sphere on the side facing the camera
        let center = sphere.position + to_camera * (sphere.radius / distance);
        let x = camera.x_axis * sphere.radius;
        let y = camera.y_axis * sphere.radius;
        let corners = [center - x - y, center - x + y, center + x + y, center + x - y];

        let mut screen = [Vec3::ZERO; 4];
        for (i, corner) in corners.iter().enumerate() {
            match self.to_screen(self.view_projection * corner.extend(1.)) {
                Some(point) => screen[i] = point,
                None => return true,
            }
        }

        let mut sampled = 0u32;
        let mut unoccluded = 0u32;
        for (a, b, c) in [(0, 1, 2), (2, 3, 0)] {
            self.rasterize(screen[a], screen[b], screen[c], |index, z| {
                sampled += 1;
                if z < self.depth[index] {
                    unoccluded += 1;
                }
            });
        }

        // Too small to land on a pixel center: nothing to judge by
        let visible = sampled == 0 || unoccluded > self.visible_pixel_threshold;
        if !visible {
            self.stats.hidden_count += 1;
        }
        visible
    }

    fn occluder_range(&self) -> f32 {
        self.occluder_range
    }
}
