use crate::geometry::{BoundingSphere, Frustum};
use crate::scene::ObjectHandle;
use crate::{SceneResult, ViewFrustum, VisibilityError};
use bit_vec::BitVec;
use glam::{Vec2, Vec3, Vec4};
use scenery_base::{ArenaError, ArenaVec, StackArena};
use slotmap::SecondaryMap;

pub const MIN_CELL_SIZE: f32 = 10.;
pub const MAX_CELL_SIZE: f32 = 1000.;

// Trailing partial cells thinner than this are merged into their neighbour
const CELL_EPSILON: f32 = 0.00001;

// Highest density value reported by `cell_density`
const MAX_CELL_DENSITY: usize = 765;

#[derive(Default)]
struct GridMembership {
    cells: Vec<u32>,
    // Equal to `SpatialGrid::cull_stamp` once the object was collected by the current cull
    visit_stamp: u32,
}

/// Debug view of one cell, see `SpatialGrid::cell_info`
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridCellInfo {
    pub cell: u32,
    pub min: Vec2,
    pub max: Vec2,
    pub object_count: usize,
    pub visible: bool,
}

/// Uniform grid over the XZ extent of a scene.
///
/// Each cell stores its rectangle as two 4-wide vectors, `(x_min, z_min, x_min, z_min)` and
/// `(x_max, z_max, x_max, z_max)`, so two object rectangles can be tested against a cell with one
/// compare. Membership is kept both ways: every cell lists its objects and every object lists its
/// cells, so removing an object costs the number of cells it overlaps.
pub struct SpatialGrid {
    cell_size: f32,
    columns: u32,
    rows: u32,
    world_min: Vec3,
    world_max: Vec3,
    max_radius: f32,
    cell_bounds: Vec<Vec4>,
    cell_objects: Vec<Vec<ObjectHandle>>,
    memberships: SecondaryMap<ObjectHandle, GridMembership>,
    visible_cells: BitVec,
    cull_stamp: u32,
}

impl SpatialGrid {
    /// Builds the cells covering `world_min..world_max`. The last row and column take whatever
    /// remains of the extent, so they may be narrower than `cell_size`.
    #[profiling::function]
    pub fn new(
        cell_size: f32,
        world_min: Vec3,
        world_max: Vec3,
    ) -> SceneResult<Self> {
        if !world_min.cmplt(world_max).all() {
            return Err(VisibilityError::DegenerateWorldExtents {
                min: world_min,
                max: world_max,
            });
        }

        let cell_size = clamp_cell_size(cell_size);
        let (columns, last_width) = split_extent(world_max.x - world_min.x, cell_size);
        let (rows, last_depth) = split_extent(world_max.z - world_min.z, cell_size);

        let cell_count = (columns as usize)
            .checked_mul(rows as usize)
            .filter(|count| *count <= u32::MAX as usize)
            .ok_or(VisibilityError::OutOfMemory(
                ArenaError::HeapAllocationFailed {
                    requested: usize::MAX,
                },
            ))?;

        let mut cell_bounds = try_alloc::<Vec4>(cell_count * 2)?;
        let mut cell_objects = try_alloc::<Vec<ObjectHandle>>(cell_count)?;

        let mut z = world_min.z;
        for row in 0..rows {
            let depth = if row == rows - 1 { last_depth } else { cell_size };
            let mut x = world_min.x;
            for column in 0..columns {
                let width = if column == columns - 1 {
                    last_width
                } else {
                    cell_size
                };
                cell_bounds.push(Vec4::new(x, z, x, z));
                cell_bounds.push(Vec4::new(x + width, z + depth, x + width, z + depth));
                cell_objects.push(Vec::new());
                x += cell_size;
            }
            z += cell_size;
        }

        log::debug!(
            "Created spatial grid {}x{} (cell size {}) over {:?}..{:?}",
            columns,
            rows,
            cell_size,
            world_min,
            world_max
        );

        Ok(SpatialGrid {
            cell_size,
            columns,
            rows,
            world_min,
            world_max,
            max_radius: 0.,
            cell_bounds,
            cell_objects,
            memberships: SecondaryMap::new(),
            visible_cells: BitVec::from_elem(cell_count, false),
            cull_stamp: 0,
        })
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cell_count(&self) -> usize {
        self.cell_objects.len()
    }

    pub fn world_min(&self) -> Vec3 {
        self.world_min
    }

    pub fn world_max(&self) -> Vec3 {
        self.world_max
    }

    pub fn cell_objects(
        &self,
        cell: u32,
    ) -> &[ObjectHandle] {
        &self.cell_objects[cell as usize]
    }

    /// Cells the object is currently a member of
    pub fn object_cells(
        &self,
        object: ObjectHandle,
    ) -> &[u32] {
        self.memberships
            .get(object)
            .map(|membership| &membership.cells[..])
            .unwrap_or(&[])
    }

    /// Cells that survived the most recent `cull`
    pub fn visible_cells(&self) -> &BitVec {
        &self.visible_cells
    }

    /// Replaces every cell with a new layout and re-inserts `objects`. On failure the grid is left
    /// untouched.
    #[profiling::function]
    pub fn rebuild(
        &mut self,
        cell_size: f32,
        world_min: Vec3,
        world_max: Vec3,
        arena: &StackArena,
        objects: &[(ObjectHandle, BoundingSphere)],
    ) -> SceneResult<()> {
        let mut grid = SpatialGrid::new(cell_size, world_min, world_max)?;
        grid.push(arena, objects)?;
        *self = grid;
        Ok(())
    }

    /// Inserts a batch of objects into every cell their XZ footprint overlaps. Objects must not
    /// already be in the grid. Scratch memory comes from `arena` and is released before returning.
    #[profiling::function]
    pub fn push(
        &mut self,
        arena: &StackArena,
        objects: &[(ObjectHandle, BoundingSphere)],
    ) -> SceneResult<()> {
        let scope = arena.scope();
        let arena = scope.arena();

        let mut accepted = arena.alloc_vec::<(ObjectHandle, BoundingSphere)>(objects.len())?;
        for &(object, sphere) in objects {
            if is_degenerate(&sphere) {
                log::warn!(
                    "Object {:?} has degenerate bounds {:?} and is not added to the grid",
                    object,
                    sphere
                );
                continue;
            }

            debug_assert!(
                self.object_cells(object).is_empty(),
                "Object {:?} pushed into the grid twice",
                object
            );
            accepted.push((object, sphere))?;
        }

        // NOTE(dvd): Two rectangles per pair of vectors: (min1.x, min1.z, min2.x, min2.z) and the
        // matching max. An odd count repeats the last rectangle, its result is ignored.
        let mut rects = arena.alloc_vec::<Vec4>(accepted.len() + 1)?;
        for pair in accepted.chunks(2) {
            let a = pair[0].1.xz_rect();
            let b = pair.get(1).map_or(a, |(_, sphere)| sphere.xz_rect());
            rects.push(Vec4::new(a.x, a.y, b.x, b.y))?;
            rects.push(Vec4::new(a.z, a.w, b.z, b.w))?;
        }
        for (_, sphere) in accepted.iter() {
            self.max_radius = self.max_radius.max(sphere.radius);
        }

        for cell in 0..self.cell_objects.len() {
            let cell_min = self.cell_bounds[cell * 2];
            let cell_max = self.cell_bounds[cell * 2 + 1];

            for (pair_index, rect) in rects.chunks_exact(2).enumerate() {
                let outside =
                    cell_min.cmpgt(rect[1]).bitmask() | cell_max.cmplt(rect[0]).bitmask();

                let first = pair_index * 2;
                if outside & 0x3 == 0 {
                    self.add_to_cell(cell as u32, accepted[first].0);
                }
                if outside & 0xC == 0 && first + 1 < accepted.len() {
                    self.add_to_cell(cell as u32, accepted[first + 1].0);
                }
            }
        }

        Ok(())
    }

    /// Removes a batch of objects from every cell they are in
    #[profiling::function]
    pub fn pull(
        &mut self,
        objects: &[ObjectHandle],
    ) {
        for &object in objects {
            self.pull_single(object);
        }
    }

    /// Non-batched `push`, used when an object is created
    pub fn push_single(
        &mut self,
        object: ObjectHandle,
        sphere: &BoundingSphere,
    ) {
        if is_degenerate(sphere) {
            log::warn!(
                "Object {:?} has degenerate bounds {:?} and is not added to the grid",
                object,
                sphere
            );
            return;
        }

        debug_assert!(
            self.object_cells(object).is_empty(),
            "Object {:?} pushed into the grid twice",
            object
        );

        let rect = sphere.xz_rect();
        self.max_radius = self.max_radius.max(sphere.radius);
        for cell in 0..self.cell_objects.len() {
            let cell_min = self.cell_bounds[cell * 2];
            let cell_max = self.cell_bounds[cell * 2 + 1];

            let x_out = rect.x > cell_max.x || rect.z < cell_min.x;
            let z_out = rect.y > cell_max.y || rect.w < cell_min.y;
            if !(x_out || z_out) {
                self.add_to_cell(cell as u32, object);
            }
        }
    }

    /// Non-batched `pull`, used when an object is destroyed
    pub fn pull_single(
        &mut self,
        object: ObjectHandle,
    ) {
        if let Some(membership) = self.memberships.remove(object) {
            for cell in membership.cells {
                let objects = &mut self.cell_objects[cell as usize];
                if let Some(position) = objects.iter().position(|x| *x == object) {
                    objects.swap_remove(position);
                }
            }
        }
    }

    /// Removes every object from the grid, keeping the cells
    pub fn clear(&mut self) {
        for objects in &mut self.cell_objects {
            objects.clear();
        }
        self.memberships.clear();
        self.max_radius = 0.;
    }

    /// Collects the objects of every cell that is not entirely outside the frustum. Each object is
    /// appended at most once per call. Updates `visible_cells`.
    #[profiling::function]
    pub fn cull(
        &mut self,
        frustum: &Frustum,
        visible_objects: &mut ArenaVec<ObjectHandle>,
    ) -> SceneResult<()> {
        self.cull_stamp = self.cull_stamp.wrapping_add(1);
        if self.cull_stamp == 0 {
            for (_, membership) in self.memberships.iter_mut() {
                membership.visit_stamp = 0;
            }
            self.cull_stamp = 1;
        }
        let stamp = self.cull_stamp;

        let planes = self.project_frustum(frustum);
        for cell in 0..self.cell_objects.len() {
            let cell_min = self.cell_bounds[cell * 2];
            let cell_max = self.cell_bounds[cell * 2 + 1];

            // Corners (min.x, min.z) (min.x, max.z) (max.x, min.z) (max.x, max.z)
            let xs = Vec4::new(cell_min.x, cell_min.x, cell_max.x, cell_max.x);
            let zs = Vec4::new(cell_min.y, cell_max.y, cell_min.y, cell_max.y);

            let culled = planes.iter().any(|plane| {
                let distances = xs * plane.x + zs * plane.y + Vec4::splat(plane.z);
                distances.is_negative_bitmask() == 0b1111
            });

            self.visible_cells.set(cell, !culled);
            if culled {
                continue;
            }

            for &object in &self.cell_objects[cell] {
                if let Some(membership) = self.memberships.get_mut(object) {
                    if membership.visit_stamp != stamp {
                        membership.visit_stamp = stamp;
                        visible_objects.push(object)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Range query restricted to the cells left visible by the last `cull`. Objects whose cell
    /// overlaps the sphere's XZ footprint are appended once.
    #[profiling::function]
    pub fn cull_sphere(
        &self,
        sphere: &BoundingSphere,
        objects: &mut ArenaVec<ObjectHandle>,
    ) -> SceneResult<()> {
        let rect = sphere.xz_rect();
        let sphere_min = Vec4::new(rect.x, rect.y, rect.x, rect.y);
        let sphere_max = Vec4::new(rect.z, rect.w, rect.z, rect.w);

        for cell in 0..self.cell_objects.len() {
            if !self.visible_cells[cell] {
                continue;
            }

            let cell_min = self.cell_bounds[cell * 2];
            let cell_max = self.cell_bounds[cell * 2 + 1];
            let outside =
                cell_min.cmpgt(sphere_max).bitmask() | cell_max.cmplt(sphere_min).bitmask();
            if outside & 0x3 != 0 {
                continue;
            }

            // Cells hold few objects, a linear scan beats hashing here
            for &object in &self.cell_objects[cell] {
                if !objects.contains(&object) {
                    objects.push(object)?;
                }
            }
        }

        Ok(())
    }

    pub fn cell_info(&self) -> impl Iterator<Item = GridCellInfo> + '_ {
        (0..self.cell_objects.len()).map(move |cell| {
            let cell_min = self.cell_bounds[cell * 2];
            let cell_max = self.cell_bounds[cell * 2 + 1];
            GridCellInfo {
                cell: cell as u32,
                min: Vec2::new(cell_min.x, cell_min.y),
                max: Vec2::new(cell_max.x, cell_max.y),
                object_count: self.cell_objects[cell].len(),
                visible: self.visible_cells[cell],
            }
        })
    }

    /// Heat value in `0..=765` for debug overlays. Saturates at three objects per unit of cell size.
    pub fn cell_density(
        &self,
        cell: u32,
    ) -> u32 {
        let count = self.cell_objects[cell as usize].len() as f32;
        let saturation = self.cell_size * 3.;
        ((count * MAX_CELL_DENSITY as f32 / saturation) as usize).min(MAX_CELL_DENSITY) as u32
    }

    fn add_to_cell(
        &mut self,
        cell: u32,
        object: ObjectHandle,
    ) {
        if let Some(entry) = self.memberships.entry(object) {
            entry.or_insert_with(GridMembership::default).cells.push(cell);
            self.cell_objects[cell as usize].push(object);
        }
    }

    // Projects the four side planes onto XZ as (nx, nz, d). The y term is folded into d using the
    // most favourable height an object in this grid can reach, and d is pushed out by the largest
    // radius. A sphere that passes the exact test then always keeps the cell holding its center.
    fn project_frustum(
        &self,
        frustum: &Frustum,
    ) -> [Vec3; 4] {
        let y_min = self.world_min.y - self.max_radius;
        let y_max = self.world_max.y + self.max_radius;

        [
            ViewFrustum::LEFT,
            ViewFrustum::RIGHT,
            ViewFrustum::TOP,
            ViewFrustum::BOTTOM,
        ]
        .map(|index| {
            let n = frustum.planes[index].normal;
            let y = if n.y > 0. { y_max } else { y_min };
            Vec3::new(n.x, n.z, n.w + n.y * y + self.max_radius)
        })
    }
}

pub fn clamp_cell_size(cell_size: f32) -> f32 {
    cell_size.clamp(MIN_CELL_SIZE, MAX_CELL_SIZE)
}

fn split_extent(
    extent: f32,
    cell_size: f32,
) -> (u32, f32) {
    let full_cells = (extent / cell_size).floor() as u32;
    let remainder = extent % cell_size;
    if remainder > CELL_EPSILON {
        (full_cells + 1, remainder)
    } else {
        (full_cells.max(1), cell_size)
    }
}

fn is_degenerate(sphere: &BoundingSphere) -> bool {
    !(sphere.radius > 0.) || !sphere.position.is_finite()
}

fn try_alloc<T>(count: usize) -> SceneResult<Vec<T>> {
    let mut values = Vec::new();
    values.try_reserve_exact(count).map_err(|_| {
        VisibilityError::OutOfMemory(ArenaError::HeapAllocationFailed {
            requested: count.saturating_mul(std::mem::size_of::<T>()),
        })
    })?;
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneObject;
    use slotmap::DenseSlotMap;

    fn default_grid() -> SpatialGrid {
        SpatialGrid::new(50., Vec3::new(-250., -10., -250.), Vec3::new(250., 100., 250.)).unwrap()
    }

    fn handles(count: usize) -> Vec<ObjectHandle> {
        let mut objects = DenseSlotMap::<ObjectHandle, SceneObject>::with_key();
        (0..count)
            .map(|i| objects.insert(SceneObject::new(&format!("object_{}", i))))
            .collect()
    }

    #[test]
    fn test_cell_layout() {
        let grid = default_grid();
        assert_eq!(grid.columns(), 10);
        assert_eq!(grid.rows(), 10);
        assert_eq!(grid.cell_count(), 100);

        let first = grid.cell_info().next().unwrap();
        assert_eq!(first.min, Vec2::new(-250., -250.));
        assert_eq!(first.max, Vec2::new(-200., -200.));
    }

    #[test]
    fn test_partial_trailing_cells() {
        let grid = SpatialGrid::new(50., Vec3::new(0., 0., 0.), Vec3::new(120., 10., 50.)).unwrap();
        assert_eq!(grid.columns(), 3);
        assert_eq!(grid.rows(), 1);

        let last = grid.cell_info().last().unwrap();
        assert_eq!(last.min, Vec2::new(100., 0.));
        assert_eq!(last.max, Vec2::new(120., 50.));
    }

    #[test]
    fn test_cell_size_is_clamped() {
        let grid = SpatialGrid::new(1., Vec3::ZERO, Vec3::new(100., 1., 100.)).unwrap();
        assert_eq!(grid.cell_size(), MIN_CELL_SIZE);
        let grid = SpatialGrid::new(5000., Vec3::ZERO, Vec3::new(100., 1., 100.)).unwrap();
        assert_eq!(grid.cell_size(), MAX_CELL_SIZE);
        assert_eq!(grid.cell_count(), 1);
    }

    #[test]
    fn test_degenerate_extents_are_rejected() {
        let result = SpatialGrid::new(50., Vec3::ZERO, Vec3::new(0., 10., 100.));
        assert!(matches!(
            result,
            Err(VisibilityError::DegenerateWorldExtents { .. })
        ));
    }

    #[test]
    fn test_push_inside_single_cell() {
        let arena = StackArena::new(4096);
        let mut grid = default_grid();
        let object = handles(1)[0];

        grid.push(
            &arena,
            &[(object, BoundingSphere::new(Vec3::new(25., 0., 25.), 10.))],
        )
        .unwrap();

        assert_eq!(grid.object_cells(object), &[55]);
        assert_eq!(grid.cell_objects(55), &[object]);
        assert_eq!(arena.allocated(), 0);
    }

    #[test]
    fn test_push_at_origin_touches_the_four_corner_cells() {
        let arena = StackArena::new(4096);
        let mut grid = default_grid();
        let object = handles(1)[0];

        grid.push(&arena, &[(object, BoundingSphere::new(Vec3::ZERO, 10.))])
            .unwrap();

        let mut cells = grid.object_cells(object).to_vec();
        cells.sort();
        assert_eq!(cells, vec![44, 45, 54, 55]);
    }

    #[test]
    fn test_batched_push_matches_single_push() {
        let arena = StackArena::new(64 * 1024);
        let objects = handles(7);
        let spheres: Vec<_> = objects
            .iter()
            .enumerate()
            .map(|(i, object)| {
                let t = i as f32;
                (
                    *object,
                    BoundingSphere::new(Vec3::new(t * 61. - 200., 0., 180. - t * 47.), 5. + t * 9.),
                )
            })
            .collect();

        let mut batched = default_grid();
        batched.push(&arena, &spheres).unwrap();

        let mut single = default_grid();
        for (object, sphere) in &spheres {
            single.push_single(*object, sphere);
        }

        for object in &objects {
            assert!(!batched.object_cells(*object).is_empty());
            assert_eq!(batched.object_cells(*object), single.object_cells(*object));
        }
    }

    #[test]
    fn test_push_pull_round_trip() {
        let arena = StackArena::new(4096);
        let mut grid = default_grid();
        let objects = handles(3);
        let spheres = [
            (objects[0], BoundingSphere::new(Vec3::new(0., 0., 0.), 60.)),
            (objects[1], BoundingSphere::new(Vec3::new(-240., 0., 240.), 5.)),
            (objects[2], BoundingSphere::new(Vec3::new(100., 0., -30.), 20.)),
        ];

        grid.push(&arena, &spheres).unwrap();
        assert!(grid.object_cells(objects[0]).len() > 4);

        grid.pull(&objects);
        for object in &objects {
            assert!(grid.object_cells(*object).is_empty());
        }
        assert!(grid.cell_info().all(|cell| cell.object_count == 0));
    }

    #[test]
    fn test_degenerate_sphere_is_skipped() {
        let arena = StackArena::new(4096);
        let mut grid = default_grid();
        let object = handles(1)[0];

        grid.push(&arena, &[(object, BoundingSphere::new(Vec3::ZERO, 0.))])
            .unwrap();
        assert!(grid.object_cells(object).is_empty());

        grid.push_single(object, &BoundingSphere::new(Vec3::ZERO, -1.));
        assert!(grid.object_cells(object).is_empty());
    }

    #[test]
    fn test_cull_collects_each_object_once() {
        let arena = StackArena::new(64 * 1024);
        let mut grid = default_grid();
        let objects = handles(2);
        grid.push(
            &arena,
            &[
                (objects[0], BoundingSphere::new(Vec3::new(0., 0., 50.), 40.)),
                (objects[1], BoundingSphere::new(Vec3::new(0., 0., -240.), 5.)),
            ],
        )
        .unwrap();

        let frustum = ViewFrustum::new_perspective(
            Vec3::new(0., 0., -5.),
            Vec3::new(0., 0., 10.),
            Vec3::Y,
            60f32.to_radians(),
            1.0,
            0.5,
            1000.,
        )
        .acquire_frustum();

        for _ in 0..2 {
            let mut visible = arena.alloc_vec::<ObjectHandle>(4).unwrap();
            grid.cull(&frustum, &mut visible).unwrap();
            assert_eq!(&visible[..], &[objects[0]]);
        }
    }

    #[test]
    fn test_cull_sphere_uses_visible_cells() {
        let arena = StackArena::new(64 * 1024);
        let mut grid = default_grid();
        let objects = handles(3);
        grid.push(
            &arena,
            &[
                (objects[0], BoundingSphere::new(Vec3::new(10., 0., 60.), 30.)),
                (objects[1], BoundingSphere::new(Vec3::new(-200., 0., 200.), 5.)),
                (objects[2], BoundingSphere::new(Vec3::new(20., 0., -220.), 5.)),
            ],
        )
        .unwrap();

        let frustum = ViewFrustum::new_perspective(
            Vec3::ZERO,
            Vec3::Z,
            Vec3::Y,
            60f32.to_radians(),
            1.0,
            0.5,
            1000.,
        )
        .acquire_frustum();

        let mut visible = arena.alloc_vec::<ObjectHandle>(4).unwrap();
        grid.cull(&frustum, &mut visible).unwrap();

        // The query sphere covers the whole world, but only frustum-visible cells are searched
        let mut in_range = arena.alloc_vec::<ObjectHandle>(0).unwrap();
        grid.cull_sphere(&BoundingSphere::new(Vec3::ZERO, 1000.), &mut in_range)
            .unwrap();
        assert!(in_range.contains(&objects[0]));
        assert!(!in_range.contains(&objects[2]));
        assert_eq!(
            in_range.iter().filter(|x| **x == objects[0]).count(),
            1
        );
    }

    #[test]
    fn test_cell_density() {
        let arena = StackArena::new(4096);
        let mut grid = SpatialGrid::new(10., Vec3::ZERO, Vec3::new(10., 10., 10.)).unwrap();
        let objects = handles(40);
        let spheres: Vec<_> = objects
            .iter()
            .map(|object| (*object, BoundingSphere::new(Vec3::new(5., 5., 5.), 1.)))
            .collect();

        assert_eq!(grid.cell_density(0), 0);
        grid.push(&arena, &spheres[..15]).unwrap();
        assert_eq!(grid.cell_density(0), 382);
        grid.push(&arena, &spheres[15..]).unwrap();
        assert_eq!(grid.cell_density(0), 765);
    }
}
