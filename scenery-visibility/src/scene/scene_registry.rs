use super::{ObjectOwner, Scene, SceneObject, SpatialUpdate};
use crate::geometry::BoundingSphere;
use crate::lod::LodSchemeRegistry;
use crate::occlusion::OcclusionCuller;
use crate::{
    clamp_cell_size, BoundsProvider, SceneResult, VisibilityConfig, VisibilityError,
};
use crossbeam_channel::Sender;
use glam::Vec3;
use rustc_hash::FxHashMap;
use scenery_base::StackArena;
use slotmap::{new_key_type, DenseSlotMap, SlotMap};

new_key_type! { pub struct SceneHandle; }
new_key_type! { pub struct ObjectHandle; }

/// Owns every scene and every object, plus the shared state queries read: LOD schemes,
/// configuration and the occlusion culler.
pub struct SceneRegistry {
    pub(crate) config: VisibilityConfig,
    pub(crate) lod_schemes: LodSchemeRegistry,
    pub(crate) scenes: SlotMap<SceneHandle, Scene>,
    scene_lookup: FxHashMap<String, SceneHandle>,
    pub(crate) objects: DenseSlotMap<ObjectHandle, SceneObject>,
    pub(crate) global_objects: Vec<ObjectHandle>,
    active_scene: Option<SceneHandle>,
    pub(crate) occlusion_culler: Option<Box<dyn OcclusionCuller>>,
}

impl Default for SceneRegistry {
    fn default() -> Self {
        SceneRegistry::new(VisibilityConfig::default(), LodSchemeRegistry::default())
    }
}

impl SceneRegistry {
    pub fn new(
        config: VisibilityConfig,
        lod_schemes: LodSchemeRegistry,
    ) -> Self {
        SceneRegistry {
            config,
            lod_schemes,
            scenes: Default::default(),
            scene_lookup: Default::default(),
            objects: Default::default(),
            global_objects: Vec::new(),
            active_scene: None,
            occlusion_culler: None,
        }
    }

    pub fn config(&self) -> &VisibilityConfig {
        &self.config
    }

    pub fn lod_schemes(&self) -> &LodSchemeRegistry {
        &self.lod_schemes
    }

    pub fn set_occlusion_culler(
        &mut self,
        occlusion_culler: Option<Box<dyn OcclusionCuller>>,
    ) {
        self.occlusion_culler = occlusion_culler;
    }

    pub fn occlusion_culler(&self) -> Option<&dyn OcclusionCuller> {
        self.occlusion_culler.as_deref()
    }

    // --------
    // Scenes
    // --------

    /// Returns the existing scene when one with the same name exists
    pub fn create_scene(
        &mut self,
        name: &str,
    ) -> SceneResult<SceneHandle> {
        if let Some(scene) = self.scene_lookup.get(name) {
            return Ok(*scene);
        }

        let scene = Scene::new(
            name,
            self.config.default_cell_size,
            self.config.default_world_min,
            self.config.default_world_max,
        )?;

        let handle = self.scenes.insert(scene);
        self.scene_lookup.insert(name.to_string(), handle);
        log::debug!("Created scene '{}' {:?}", name, handle);
        Ok(handle)
    }

    /// Destroys the scene and every object in it
    pub fn destroy_scene(
        &mut self,
        scene: SceneHandle,
    ) {
        debug_assert!(self.scenes.contains_key(scene));
        if !self.scenes.contains_key(scene) {
            return;
        }

        self.clear_scene(ObjectOwner::Scene(scene));
        if self.active_scene == Some(scene) {
            self.active_scene = None;
        }

        if let Some(removed) = self.scenes.remove(scene) {
            self.scene_lookup.remove(removed.name());
            log::debug!("Destroyed scene '{}' {:?}", removed.name(), scene);
        }
    }

    pub fn find_scene(
        &self,
        name: &str,
    ) -> Option<SceneHandle> {
        self.scene_lookup.get(name).copied()
    }

    pub fn scene(
        &self,
        scene: SceneHandle,
    ) -> Option<&Scene> {
        self.scenes.get(scene)
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    pub fn set_active_scene(
        &mut self,
        scene: Option<SceneHandle>,
    ) {
        debug_assert!(scene.map_or(true, |scene| self.scenes.contains_key(scene)));
        self.active_scene = scene.filter(|scene| self.scenes.contains_key(*scene));
    }

    pub fn active_scene(&self) -> Option<SceneHandle> {
        self.active_scene
    }

    pub fn set_physics_scene(
        &mut self,
        scene: SceneHandle,
        physics_scene: Option<u64>,
    ) {
        debug_assert!(self.scenes.contains_key(scene));
        if let Some(scene) = self.scenes.get_mut(scene) {
            scene.set_physics_scene(physics_scene);
        }
    }

    pub fn physics_scene(
        &self,
        scene: SceneHandle,
    ) -> Option<u64> {
        self.scenes.get(scene).and_then(|scene| scene.physics_scene())
    }

    /// Sets the world extents of a scene and rebuilds its grid. Extents that are not increasing on
    /// every axis are rejected and the scene keeps its current grid.
    #[profiling::function]
    pub fn set_scene_size<B: BoundsProvider + ?Sized>(
        &mut self,
        scene: SceneHandle,
        world_min: Vec3,
        world_max: Vec3,
        bounds_provider: &B,
    ) -> SceneResult<()> {
        if !world_min.cmplt(world_max).all() {
            log::warn!(
                "Ignoring scene size {:?}..{:?}: extents must increase on every axis",
                world_min,
                world_max
            );
            return Err(VisibilityError::DegenerateWorldExtents {
                min: world_min,
                max: world_max,
            });
        }

        let cell_size = match self.scenes.get(scene) {
            Some(scene) => scene.grid.cell_size(),
            None => {
                debug_assert!(false, "Invalid scene {:?}", scene);
                return Ok(());
            }
        };

        self.rebuild_grid(scene, cell_size, world_min, world_max, bounds_provider)
    }

    pub fn scene_size(
        &self,
        scene: SceneHandle,
    ) -> Option<(Vec3, Vec3)> {
        self.scenes
            .get(scene)
            .map(|scene| (scene.grid.world_min(), scene.grid.world_max()))
    }

    /// Clamps `cell_size` to `MIN_CELL_SIZE..=MAX_CELL_SIZE` and rebuilds the grid
    #[profiling::function]
    pub fn set_cell_size<B: BoundsProvider + ?Sized>(
        &mut self,
        scene: SceneHandle,
        cell_size: f32,
        bounds_provider: &B,
    ) -> SceneResult<()> {
        let (world_min, world_max) = match self.scene_size(scene) {
            Some(size) => size,
            None => {
                debug_assert!(false, "Invalid scene {:?}", scene);
                return Ok(());
            }
        };

        self.rebuild_grid(
            scene,
            clamp_cell_size(cell_size),
            world_min,
            world_max,
            bounds_provider,
        )
    }

    pub fn cell_size(
        &self,
        scene: SceneHandle,
    ) -> Option<f32> {
        self.scenes.get(scene).map(|scene| scene.grid.cell_size())
    }

    fn rebuild_grid<B: BoundsProvider + ?Sized>(
        &mut self,
        scene: SceneHandle,
        cell_size: f32,
        world_min: Vec3,
        world_max: Vec3,
        bounds_provider: &B,
    ) -> SceneResult<()> {
        let scene = match self.scenes.get_mut(scene) {
            Some(scene) => scene,
            None => return Ok(()),
        };

        let mut bounded = Vec::with_capacity(scene.objects.len());
        for &handle in &scene.objects {
            if let Some(sphere) = self
                .objects
                .get(handle)
                .and_then(|object| resolve_sphere(object, bounds_provider))
            {
                bounded.push((handle, sphere));
            }
        }

        let arena = StackArena::unbounded();
        scene
            .grid
            .rebuild(cell_size, world_min, world_max, &arena, &bounded)?;

        log::debug!(
            "Rebuilt grid of scene '{}' with {} bounded objects",
            scene.name(),
            bounded.len()
        );
        Ok(())
    }

    // --------
    // Objects
    // --------

    /// Adds an object to a scene (or to the global list). It does not enter the grid until
    /// `object_created` is called with a world that can resolve its bounds.
    pub fn create_object(
        &mut self,
        owner: ObjectOwner,
        mut object: SceneObject,
    ) -> Option<ObjectHandle> {
        object.owner = owner;
        match owner {
            ObjectOwner::Global => {
                object.index = self.global_objects.len();
                let handle = self.objects.insert(object);
                self.global_objects.push(handle);
                Some(handle)
            }
            ObjectOwner::Scene(scene) => {
                debug_assert!(self.scenes.contains_key(scene), "Invalid scene {:?}", scene);
                let scene = self.scenes.get_mut(scene)?;
                object.index = scene.objects.len();
                let handle = self.objects.insert(object);
                scene.objects.push(handle);
                Some(handle)
            }
        }
    }

    /// Pulls the object out of the grid, removes it from its owner's list and frees its slot
    pub fn destroy_object(
        &mut self,
        object: ObjectHandle,
    ) {
        debug_assert!(self.objects.contains_key(object), "Invalid object {:?}", object);
        self.object_destroyed(object);

        let removed = match self.objects.remove(object) {
            Some(removed) => removed,
            None => return,
        };

        let list = match removed.owner {
            ObjectOwner::Global => Some(&mut self.global_objects),
            ObjectOwner::Scene(scene) => self.scenes.get_mut(scene).map(|scene| &mut scene.objects),
        };

        if let Some(list) = list {
            let index = removed.index;
            debug_assert_eq!(list.get(index), Some(&object));
            if list.get(index) == Some(&object) {
                list.swap_remove(index);
                if let Some(&moved) = list.get(index) {
                    if let Some(moved) = self.objects.get_mut(moved) {
                        moved.index = index;
                    }
                }
            }
        }
    }

    pub fn find_object(
        &self,
        owner: ObjectOwner,
        name: &str,
    ) -> Option<ObjectHandle> {
        self.objects_in_scene(owner)
            .iter()
            .copied()
            .find(|handle| {
                self.objects
                    .get(*handle)
                    .map_or(false, |object| object.name() == name)
            })
    }

    pub fn object(
        &self,
        object: ObjectHandle,
    ) -> Option<&SceneObject> {
        self.objects.get(object)
    }

    pub fn object_mut(
        &mut self,
        object: ObjectHandle,
    ) -> Option<&mut SceneObject> {
        self.objects.get_mut(object)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn objects_in_scene(
        &self,
        owner: ObjectOwner,
    ) -> &[ObjectHandle] {
        match owner {
            ObjectOwner::Global => &self.global_objects,
            ObjectOwner::Scene(scene) => self
                .scenes
                .get(scene)
                .map(|scene| &scene.objects[..])
                .unwrap_or(&[]),
        }
    }

    /// Destroys every object of a scene, or every global object
    pub fn clear_scene(
        &mut self,
        owner: ObjectOwner,
    ) {
        let objects = self.objects_in_scene(owner).to_vec();
        for object in objects.into_iter().rev() {
            self.destroy_object(object);
        }
    }

    // --------
    // Spatial updates
    // --------

    /// Queues the object to be moved in its scene's grid before the next query. No-op for global
    /// objects.
    pub fn notify_bounds_changed(
        &self,
        object: ObjectHandle,
    ) {
        if let Some(ObjectOwner::Scene(scene)) = self.objects.get(object).map(|x| x.owner) {
            if let Some(scene) = self.scenes.get(scene) {
                scene.queue_spatial_update(SpatialUpdate::BoundsChanged(object));
            }
        }
    }

    pub fn new_spatial_update_sender(
        &self,
        scene: SceneHandle,
    ) -> Option<Sender<SpatialUpdate>> {
        self.scenes
            .get(scene)
            .map(|scene| scene.new_spatial_update_sender())
    }

    /// Inserts a new object into its scene's grid
    pub fn object_created<B: BoundsProvider + ?Sized>(
        &mut self,
        object: ObjectHandle,
        bounds_provider: &B,
    ) {
        let (owner, sphere) = match self.objects.get(object) {
            Some(x) => (x.owner, resolve_sphere(x, bounds_provider)),
            None => return,
        };

        if let (ObjectOwner::Scene(scene), Some(sphere)) = (owner, sphere) {
            if let Some(scene) = self.scenes.get_mut(scene) {
                scene.grid.push_single(object, &sphere);
            }
        }
    }

    /// Removes the object from its scene's grid
    pub fn object_destroyed(
        &mut self,
        object: ObjectHandle,
    ) {
        if let Some(ObjectOwner::Scene(scene)) = self.objects.get(object).map(|x| x.owner) {
            if let Some(scene) = self.scenes.get_mut(scene) {
                scene.grid.pull_single(object);
            }
        }
    }

    /// Drains the scene's spatial update queue: every live object named in it is pulled from the
    /// grid and pushed back with its current bounds. Duplicates are applied once.
    #[profiling::function]
    pub fn apply_spatial_updates<B: BoundsProvider + ?Sized>(
        &mut self,
        scene: SceneHandle,
        bounds_provider: &B,
        arena: &StackArena,
    ) -> SceneResult<()> {
        let scene_data = match self.scenes.get_mut(scene) {
            Some(scene) => scene,
            None => return Ok(()),
        };

        if !scene_data.has_pending_spatial_updates() {
            return Ok(());
        }

        let scope = arena.scope();
        let arena = scope.arena();

        // Draining stops at the reserved capacity so collecting can't fail. Updates sent meanwhile
        // stay queued for the next call.
        let pending = scene_data.receiver().len();
        let mut moved = arena.alloc_vec::<ObjectHandle>(pending)?;
        {
            profiling::scope!("receiver.try_iter");
            for update in scene_data.receiver().try_iter().take(pending) {
                match update {
                    SpatialUpdate::BoundsChanged(object) => moved.push(object)?,
                }
            }
        }
        moved.sort_unstable();
        moved.dedup();

        let result = reinsert_moved(
            scene,
            scene_data,
            &self.objects,
            &moved,
            bounds_provider,
            arena,
        );
        if let Err(error) = &result {
            log::warn!(
                "Spatial updates for scene '{}' failed ({}), {} objects requeued",
                scene_data.name(),
                error,
                moved.len()
            );
            for &object in moved.iter() {
                scene_data.queue_spatial_update(SpatialUpdate::BoundsChanged(object));
            }
        }
        result
    }
}

// Pulls every moved object and pushes it back with its current bounds. All arena allocation made
// here happens before the first pull, except inside `SpatialGrid::push`, which allocates before it
// touches any cell.
fn reinsert_moved<B: BoundsProvider + ?Sized>(
    scene: SceneHandle,
    scene_data: &mut Scene,
    objects: &DenseSlotMap<ObjectHandle, SceneObject>,
    moved: &[ObjectHandle],
    bounds_provider: &B,
    arena: &StackArena,
) -> SceneResult<()> {
    let mut batch = arena.alloc_vec::<(ObjectHandle, BoundingSphere)>(moved.len())?;
    for &handle in moved {
        // Entries of destroyed objects or of objects that belong elsewhere are dropped
        let object = match objects.get(handle) {
            Some(object) if object.owner == ObjectOwner::Scene(scene) => object,
            _ => continue,
        };

        if let Some(sphere) = resolve_sphere(object, bounds_provider) {
            batch.push((handle, sphere))?;
        }
    }

    // Objects that lost their bounds are pulled and not pushed back
    for &handle in moved {
        scene_data.grid.pull_single(handle);
    }

    log::trace!(
        "Applying {} spatial updates to scene '{}'",
        batch.len(),
        scene_data.name()
    );
    scene_data.grid.push(arena, &batch)
}

fn resolve_sphere<B: BoundsProvider + ?Sized>(
    object: &SceneObject,
    bounds_provider: &B,
) -> Option<BoundingSphere> {
    object
        .bounds()
        .and_then(|bounds| bounds_provider.world_bounds(bounds))
        .map(|bounds| bounds.sphere)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ObjectType;
    use crate::test_support::TestWorld;
    use crate::{MAX_CELL_SIZE, MIN_CELL_SIZE};

    fn registry_with_scene() -> (SceneRegistry, SceneHandle) {
        let mut registry = SceneRegistry::default();
        let scene = registry.create_scene("main").unwrap();
        (registry, scene)
    }

    #[test]
    fn test_create_scene_reuses_name() {
        let (mut registry, scene) = registry_with_scene();
        assert_eq!(registry.create_scene("main").unwrap(), scene);
        assert_eq!(registry.find_scene("main"), Some(scene));
        assert_eq!(registry.scene_count(), 1);

        let (min, max) = registry.scene_size(scene).unwrap();
        assert_eq!(min, Vec3::new(-250., -10., -250.));
        assert_eq!(max, Vec3::new(250., 100., 250.));
        assert_eq!(registry.cell_size(scene), Some(50.));
    }

    #[test]
    fn test_destroy_scene_destroys_objects() {
        let (mut registry, scene) = registry_with_scene();
        let object = registry
            .create_object(ObjectOwner::Scene(scene), SceneObject::new("crate"))
            .unwrap();
        registry.set_active_scene(Some(scene));

        registry.destroy_scene(scene);
        assert!(registry.object(object).is_none());
        assert_eq!(registry.find_scene("main"), None);
        assert_eq!(registry.active_scene(), None);
    }

    #[test]
    fn test_destroy_swaps_last_object_into_place() {
        let (mut registry, scene) = registry_with_scene();
        let owner = ObjectOwner::Scene(scene);
        let a = registry.create_object(owner, SceneObject::new("a")).unwrap();
        let b = registry.create_object(owner, SceneObject::new("b")).unwrap();
        let c = registry.create_object(owner, SceneObject::new("c")).unwrap();

        registry.destroy_object(a);
        assert_eq!(registry.objects_in_scene(owner), &[c, b]);
        assert_eq!(registry.object(c).unwrap().index(), 0);
        assert_eq!(registry.object(b).unwrap().index(), 1);
        assert_eq!(registry.find_object(owner, "c"), Some(c));
        assert_eq!(registry.find_object(owner, "a"), None);
    }

    #[test]
    fn test_global_objects() {
        let mut registry = SceneRegistry::default();
        let global = registry
            .create_object(
                ObjectOwner::Global,
                SceneObject::new("sky").with_object_type(ObjectType::Model),
            )
            .unwrap();
        assert_eq!(registry.objects_in_scene(ObjectOwner::Global), &[global]);

        // Global objects have no queue to post to
        registry.notify_bounds_changed(global);

        registry.clear_scene(ObjectOwner::Global);
        assert!(registry.objects_in_scene(ObjectOwner::Global).is_empty());
        assert_eq!(registry.object_count(), 0);
    }

    #[test]
    fn test_physics_scene() {
        let (mut registry, scene) = registry_with_scene();
        assert_eq!(registry.physics_scene(scene), None);
        registry.set_physics_scene(scene, Some(7));
        assert_eq!(registry.physics_scene(scene), Some(7));
    }

    #[test]
    fn test_object_lifecycle_updates_grid() {
        let (mut registry, scene) = registry_with_scene();
        let mut world = TestWorld::default();
        let bounds = world.add_bounds(BoundingSphere::new(Vec3::new(25., 0., 25.), 10.));

        let object = registry
            .create_object(
                ObjectOwner::Scene(scene),
                SceneObject::new("crate").with_bounds(bounds),
            )
            .unwrap();
        registry.object_created(object, &world);
        assert_eq!(registry.scene(scene).unwrap().grid().object_cells(object), &[55]);

        registry.destroy_object(object);
        assert!(registry.scene(scene).unwrap().grid().cell_objects(55).is_empty());
    }

    #[test]
    fn test_spatial_updates_move_objects() {
        let (mut registry, scene) = registry_with_scene();
        let mut world = TestWorld::default();
        let bounds = world.add_bounds(BoundingSphere::new(Vec3::new(25., 0., 25.), 10.));
        let object = registry
            .create_object(
                ObjectOwner::Scene(scene),
                SceneObject::new("crate").with_bounds(bounds),
            )
            .unwrap();
        registry.object_created(object, &world);

        world.set_bounds(bounds, BoundingSphere::new(Vec3::new(-225., 0., -225.), 10.));
        registry.notify_bounds_changed(object);
        registry.notify_bounds_changed(object);
        let sender = registry.new_spatial_update_sender(scene).unwrap();
        sender.send(SpatialUpdate::BoundsChanged(object)).unwrap();

        let arena = StackArena::new(64 * 1024);
        registry
            .apply_spatial_updates(scene, &world, &arena)
            .unwrap();

        let grid = registry.scene(scene).unwrap().grid();
        assert_eq!(grid.object_cells(object), &[0]);
        assert!(grid.cell_objects(55).is_empty());
        assert!(!registry.scene(scene).unwrap().has_pending_spatial_updates());
        assert_eq!(arena.allocated(), 0);
    }

    fn moved_row(
        registry: &mut SceneRegistry,
        scene: SceneHandle,
        world: &mut TestWorld,
    ) -> Vec<ObjectHandle> {
        let mut objects = Vec::new();
        for i in 0..10 {
            let x = -225. + 50. * i as f32;
            let bounds = world.add_bounds(BoundingSphere::new(Vec3::new(x, 0., 25.), 5.));
            let object = registry
                .create_object(
                    ObjectOwner::Scene(scene),
                    SceneObject::new(&format!("crate{}", i)).with_bounds(bounds),
                )
                .unwrap();
            registry.object_created(object, &*world);

            world.set_bounds(bounds, BoundingSphere::new(Vec3::new(x, 0., -225.), 5.));
            registry.notify_bounds_changed(object);
            objects.push(object);
        }
        objects
    }

    #[test]
    fn test_failed_update_leaves_grid_untouched() {
        let (mut registry, scene) = registry_with_scene();
        let mut world = TestWorld::default();
        let objects = moved_row(&mut registry, scene, &mut world);

        // Room for the drained handles, not for the batch of new bounds
        let arena = StackArena::new(200);
        assert!(registry
            .apply_spatial_updates(scene, &world, &arena)
            .is_err());
        assert_eq!(arena.allocated(), 0);

        let scene_data = registry.scene(scene).unwrap();
        assert!(scene_data.has_pending_spatial_updates());
        for (i, object) in objects.iter().enumerate() {
            assert_eq!(scene_data.grid().object_cells(*object), &[50 + i as u32]);
        }
    }

    #[test]
    fn test_failed_update_is_applied_on_retry() {
        let (mut registry, scene) = registry_with_scene();
        let mut world = TestWorld::default();
        let objects = moved_row(&mut registry, scene, &mut world);

        // Fails inside the grid push, after the moved objects were pulled
        let small = StackArena::new(600);
        assert!(registry
            .apply_spatial_updates(scene, &world, &small)
            .is_err());
        assert!(registry.scene(scene).unwrap().has_pending_spatial_updates());

        let arena = StackArena::new(1024 * 1024);
        registry
            .apply_spatial_updates(scene, &world, &arena)
            .unwrap();

        let scene_data = registry.scene(scene).unwrap();
        assert!(!scene_data.has_pending_spatial_updates());
        for (i, object) in objects.iter().enumerate() {
            assert_eq!(scene_data.grid().object_cells(*object), &[i as u32]);
        }
        assert!((50..60).all(|cell| scene_data.grid().cell_objects(cell).is_empty()));
    }

    #[test]
    fn test_updates_for_destroyed_objects_are_dropped() {
        let (mut registry, scene) = registry_with_scene();
        let mut world = TestWorld::default();
        let bounds = world.add_bounds(BoundingSphere::new(Vec3::ZERO, 5.));
        let object = registry
            .create_object(
                ObjectOwner::Scene(scene),
                SceneObject::new("crate").with_bounds(bounds),
            )
            .unwrap();
        registry.object_created(object, &world);
        registry.notify_bounds_changed(object);
        registry.destroy_object(object);

        let arena = StackArena::new(4096);
        registry
            .apply_spatial_updates(scene, &world, &arena)
            .unwrap();
        assert!(registry
            .scene(scene)
            .unwrap()
            .grid()
            .cell_info()
            .all(|cell| cell.object_count == 0));
    }

    #[test]
    fn test_resize_rebuilds_grid() {
        let (mut registry, scene) = registry_with_scene();
        let mut world = TestWorld::default();
        let bounds = world.add_bounds(BoundingSphere::new(Vec3::new(5., 0., 5.), 1.));
        let object = registry
            .create_object(
                ObjectOwner::Scene(scene),
                SceneObject::new("crate").with_bounds(bounds),
            )
            .unwrap();
        registry.object_created(object, &world);

        registry
            .set_scene_size(scene, Vec3::new(0., 0., 0.), Vec3::new(100., 10., 100.), &world)
            .unwrap();
        let grid = registry.scene(scene).unwrap().grid();
        assert_eq!(grid.cell_count(), 4);
        assert_eq!(grid.object_cells(object), &[0]);

        registry.set_cell_size(scene, 1., &world).unwrap();
        assert_eq!(registry.cell_size(scene), Some(MIN_CELL_SIZE));
        assert_eq!(registry.scene(scene).unwrap().grid().cell_count(), 100);

        registry.set_cell_size(scene, 1e6, &world).unwrap();
        assert_eq!(registry.cell_size(scene), Some(MAX_CELL_SIZE));
    }

    #[test]
    fn test_degenerate_scene_size_is_ignored() {
        let (mut registry, scene) = registry_with_scene();
        let world = TestWorld::default();
        let result =
            registry.set_scene_size(scene, Vec3::new(0., 0., 0.), Vec3::new(100., 0., 100.), &world);
        assert!(matches!(
            result,
            Err(VisibilityError::DegenerateWorldExtents { .. })
        ));
        assert_eq!(registry.scene(scene).unwrap().grid().cell_count(), 100);
    }
}
