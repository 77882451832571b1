use super::render_query::GatheredQuery;
use super::{RenderLight, RenderModel, RenderQuery};
use crate::geometry::{AxisAlignedBoundingBox, BoundingSphere, Frustum};
use crate::lod::{light_intensity, select_model_tier, select_shadow_tier, LodSchemeRegistry};
use crate::occlusion::OcclusionCuller;
use crate::scene::{ObjectHandle, ObjectType, SceneHandle, SceneObject, SceneRegistry};
use crate::{
    cull_aabbs_sweep, cull_spheres, ModelId, SceneResult, SceneWorld, ViewParams, VisibilityConfig,
};
use glam::{Mat4, Vec3};
use scenery_base::{ArenaError, ArenaVec, StackArena};
use slotmap::DenseSlotMap;

/// Stages every query passes through, in order. A failure in any stage releases everything the
/// query allocated so far.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum QueryStage {
    PendingSpatialUpdate,
    GridCull,
    ExactFrustumCull,
    OccluderDraw,
    OcclusionTest,
    PerObjectGather,
    Assembled,
}

fn enter_stage(stage: QueryStage) {
    log::trace!("Render query stage {:?}", stage);
}

/// Models and lights visible through `frustum`, after grid, exact sphere and occlusion culling.
/// Global objects are always candidates.
#[profiling::function]
pub fn build_frustum_query<'a, W: SceneWorld + ?Sized>(
    registry: &mut SceneRegistry,
    scene: SceneHandle,
    world: &mut W,
    arena: &'a StackArena,
    frustum: &Frustum,
    view_params: &ViewParams,
) -> SceneResult<RenderQuery<'a>> {
    enter_stage(QueryStage::PendingSpatialUpdate);
    registry.apply_spatial_updates(scene, &*world, arena)?;

    let SceneRegistry {
        config,
        lod_schemes,
        scenes,
        objects,
        global_objects,
        occlusion_culler,
        ..
    } = registry;

    let scene_data = match scenes.get_mut(scene) {
        Some(scene_data) => scene_data,
        None => {
            debug_assert!(false, "Invalid scene {:?}", scene);
            return Ok(RenderQuery::empty(arena)?);
        }
    };

    if scene_data.objects.is_empty() && global_objects.is_empty() {
        return Ok(RenderQuery::empty(arena)?);
    }

    let (gathered, lod_switches) = {
        let scope = arena.scope();
        let scratch = scope.arena();

        enter_stage(QueryStage::GridCull);
        let mut candidates = scratch.alloc_vec::<ObjectHandle>(
            scene_data.objects.len() + global_objects.len(),
        )?;
        scene_data.grid.cull(frustum, &mut candidates)?;
        candidates.extend_from_slice(global_objects)?;

        enter_stage(QueryStage::ExactFrustumCull);
        let (mut handles, mut spheres) = resolve_bounds(scratch, objects, &*world, &candidates)?;
        let mut visible = scratch.alloc_bits(spheres.len(), false)?;
        cull_spheres(frustum, &spheres, &mut visible);
        compact(&mut handles, &mut spheres, |index| visible[index]);

        if config.enable_occlusion_culling {
            if let Some(culler) = occlusion_culler.as_deref_mut() {
                cull_occluded(
                    culler,
                    config,
                    objects,
                    &*world,
                    scratch,
                    &mut handles,
                    &mut spheres,
                    view_params,
                )?;
            }
        }

        enter_stage(QueryStage::PerObjectGather);
        let mut gather = QueryGather::new(scratch, handles.len())?;
        for (&handle, sphere) in handles.iter().zip(spheres.iter()) {
            let object = match objects.get(handle) {
                Some(object) => object,
                None => continue,
            };

            match object.object_type() {
                ObjectType::Model => gather.push_model(
                    lod_schemes,
                    handle,
                    object,
                    sphere,
                    view_params.camera_position,
                    &*world,
                    false,
                )?,
                ObjectType::Light => gather.push_light(
                    lod_schemes,
                    config,
                    handle,
                    object,
                    sphere,
                    view_params.camera_position,
                    &*world,
                )?,
                _ => {}
            }
        }

        gather.finish()
    };

    enter_stage(QueryStage::Assembled);
    log::trace!(
        "Frustum query: {} objects, {} models, {} lights",
        gathered.object_count,
        gathered.models.len(),
        gathered.lights.len()
    );
    let query = RenderQuery::commit(arena, gathered)?;
    apply_lod_switches(objects, world, &lod_switches);
    Ok(query)
}

/// Shadow casters for one cascade: every model (scene or global) that does not exclude shadows and
/// whose bounds, swept along `light_direction`, pass through `cascade`. Shadow LOD is applied.
#[profiling::function]
pub fn build_cascade_query<'a, W: SceneWorld + ?Sized>(
    registry: &mut SceneRegistry,
    scene: SceneHandle,
    world: &mut W,
    arena: &'a StackArena,
    cascade: &AxisAlignedBoundingBox,
    light_direction: Vec3,
    view_params: &ViewParams,
) -> SceneResult<RenderQuery<'a>> {
    enter_stage(QueryStage::PendingSpatialUpdate);
    registry.apply_spatial_updates(scene, &*world, arena)?;

    let direction = light_direction.normalize_or_zero();
    if direction == Vec3::ZERO {
        log::warn!("Cascade query with zero light direction");
        return Ok(RenderQuery::empty(arena)?);
    }

    let SceneRegistry {
        lod_schemes,
        scenes,
        objects,
        global_objects,
        ..
    } = registry;

    let scene_data = match scenes.get(scene) {
        Some(scene_data) => scene_data,
        None => {
            debug_assert!(false, "Invalid scene {:?}", scene);
            return Ok(RenderQuery::empty(arena)?);
        }
    };

    let (gathered, lod_switches) = {
        let scope = arena.scope();
        let scratch = scope.arena();

        // Cascades ignore the grid: casters far outside the camera's view still throw shadows
        // into it.
        enter_stage(QueryStage::GridCull);
        let mut candidates =
            scratch.alloc_vec::<ObjectHandle>(scene_data.objects.len() + global_objects.len())?;
        for &handle in scene_data.objects.iter().chain(global_objects.iter()) {
            let casts = objects.get(handle).map_or(false, |object| {
                object.object_type() == ObjectType::Model
                    && object.casts_shadows()
                    && object.shadow_model().is_some()
            });
            if casts {
                candidates.push(handle)?;
            }
        }

        enter_stage(QueryStage::ExactFrustumCull);
        let mut handles = scratch.alloc_vec::<ObjectHandle>(candidates.len())?;
        let mut spheres = scratch.alloc_vec::<BoundingSphere>(candidates.len())?;
        let mut aabbs = scratch.alloc_vec::<AxisAlignedBoundingBox>(candidates.len())?;
        for &handle in candidates.iter() {
            let bounds = objects
                .get(handle)
                .and_then(|object| object.bounds())
                .and_then(|bounds| world.world_bounds(bounds));
            if let Some(bounds) = bounds {
                handles.push(handle)?;
                spheres.push(bounds.sphere)?;
                aabbs.push(bounds.aabb)?;
            } else {
                log::debug!("Shadow caster {:?} has no bounds, skipped", handle);
            }
        }

        let mut casters = scratch.alloc_bits(aabbs.len(), false)?;
        cull_aabbs_sweep(cascade, direction, &aabbs, &mut casters);
        compact(&mut handles, &mut spheres, |index| casters[index]);

        enter_stage(QueryStage::PerObjectGather);
        let mut gather = QueryGather::new(scratch, handles.len())?;
        for (&handle, sphere) in handles.iter().zip(spheres.iter()) {
            if let Some(object) = objects.get(handle) {
                gather.push_model(
                    lod_schemes,
                    handle,
                    object,
                    sphere,
                    view_params.camera_position,
                    &*world,
                    true,
                )?;
            }
        }

        gather.finish()
    };

    enter_stage(QueryStage::Assembled);
    log::trace!(
        "Cascade query: {} casters, {} models",
        gathered.object_count,
        gathered.models.len()
    );
    let query = RenderQuery::commit(arena, gathered)?;
    apply_lod_switches(objects, world, &lod_switches);
    Ok(query)
}

/// Models touching `sphere`, searched only in the grid cells left visible by the last frustum
/// query of the scene. Gathered with shadow LOD.
#[profiling::function]
pub fn build_sphere_query<'a, W: SceneWorld + ?Sized>(
    registry: &mut SceneRegistry,
    scene: SceneHandle,
    world: &mut W,
    arena: &'a StackArena,
    sphere: &BoundingSphere,
    view_params: &ViewParams,
) -> SceneResult<RenderQuery<'a>> {
    enter_stage(QueryStage::PendingSpatialUpdate);
    registry.apply_spatial_updates(scene, &*world, arena)?;

    let SceneRegistry {
        lod_schemes,
        scenes,
        objects,
        ..
    } = registry;

    let scene_data = match scenes.get(scene) {
        Some(scene_data) => scene_data,
        None => {
            debug_assert!(false, "Invalid scene {:?}", scene);
            return Ok(RenderQuery::empty(arena)?);
        }
    };

    let (gathered, lod_switches) = {
        let scope = arena.scope();
        let scratch = scope.arena();

        enter_stage(QueryStage::GridCull);
        let mut candidates = scratch.alloc_vec::<ObjectHandle>(0)?;
        scene_data.grid.cull_sphere(sphere, &mut candidates)?;
        candidates.retain(|handle| {
            objects
                .get(*handle)
                .map_or(false, |object| object.object_type() == ObjectType::Model)
        });

        enter_stage(QueryStage::ExactFrustumCull);
        let (mut handles, mut spheres) = resolve_bounds(scratch, objects, &*world, &candidates)?;
        let keep = {
            let mut keep = scratch.alloc_bits(spheres.len(), false)?;
            for (index, bounds) in spheres.iter().enumerate() {
                keep.set(index, sphere.intersects(bounds));
            }
            keep
        };
        compact(&mut handles, &mut spheres, |index| keep[index]);

        enter_stage(QueryStage::PerObjectGather);
        let mut gather = QueryGather::new(scratch, handles.len())?;
        for (&handle, bounds) in handles.iter().zip(spheres.iter()) {
            if let Some(object) = objects.get(handle) {
                gather.push_model(
                    lod_schemes,
                    handle,
                    object,
                    bounds,
                    view_params.camera_position,
                    &*world,
                    true,
                )?;
            }
        }

        gather.finish()
    };

    enter_stage(QueryStage::Assembled);
    let query = RenderQuery::commit(arena, gathered)?;
    apply_lod_switches(objects, world, &lod_switches);
    Ok(query)
}

// Looks up the world-space sphere of every candidate. Candidates without bounds are dropped.
fn resolve_bounds<'s, W: SceneWorld + ?Sized>(
    scratch: &'s StackArena,
    objects: &DenseSlotMap<ObjectHandle, SceneObject>,
    world: &W,
    candidates: &[ObjectHandle],
) -> Result<(ArenaVec<'s, ObjectHandle>, ArenaVec<'s, BoundingSphere>), ArenaError> {
    let mut handles = scratch.alloc_vec::<ObjectHandle>(candidates.len())?;
    let mut spheres = scratch.alloc_vec::<BoundingSphere>(candidates.len())?;

    for &handle in candidates {
        let bounds = objects
            .get(handle)
            .and_then(|object| object.bounds())
            .and_then(|bounds| world.world_bounds(bounds));

        match bounds {
            Some(bounds) => {
                handles.push(handle)?;
                spheres.push(bounds.sphere)?;
            }
            None => log::debug!("Object {:?} has no bounds, skipped", handle),
        }
    }

    Ok((handles, spheres))
}

// Keeps the entries for which `keep(index)` holds, preserving order
fn compact<F: Fn(usize) -> bool>(
    handles: &mut ArenaVec<ObjectHandle>,
    spheres: &mut ArenaVec<BoundingSphere>,
    keep: F,
) {
    debug_assert_eq!(handles.len(), spheres.len());

    let mut write = 0;
    for read in 0..handles.len() {
        if keep(read) {
            handles[write] = handles[read];
            spheres[write] = spheres[read];
            write += 1;
        }
    }

    handles.truncate(write);
    spheres.truncate(write);
}

fn within_range(
    camera_position: Vec3,
    sphere: &BoundingSphere,
    range: f32,
) -> bool {
    let l = range + sphere.radius;
    camera_position.distance_squared(sphere.position) < l * l
}

// Draws the occluders of nearby visible models, then drops every object hidden behind them.
// Objects within the near threshold are never tested.
#[allow(clippy::too_many_arguments)]
fn cull_occluded<W: SceneWorld + ?Sized>(
    culler: &mut dyn OcclusionCuller,
    config: &VisibilityConfig,
    objects: &DenseSlotMap<ObjectHandle, SceneObject>,
    world: &W,
    scratch: &StackArena,
    handles: &mut ArenaVec<ObjectHandle>,
    spheres: &mut ArenaVec<BoundingSphere>,
    view_params: &ViewParams,
) -> Result<(), ArenaError> {
    let camera_position = view_params.camera_position;

    enter_stage(QueryStage::OccluderDraw);
    {
        profiling::scope!("draw occluders");
        culler.clear();
        culler.set_matrices(&view_params.view_projection());

        let occluder_range = culler.occluder_range();
        for (&handle, sphere) in handles.iter().zip(spheres.iter()) {
            if !within_range(camera_position, sphere, occluder_range) {
                continue;
            }

            let object = match objects.get(handle) {
                Some(object) if object.object_type() == ObjectType::Model => object,
                _ => continue,
            };

            let mesh = object.model().and_then(|model| world.occluder_mesh(model));
            if let Some(mesh) = mesh {
                let transform = object
                    .transform()
                    .and_then(|transform| world.world_transform(transform))
                    .unwrap_or(Mat4::IDENTITY);
                culler.draw_occluder(mesh, &transform);
            }
        }
    }

    enter_stage(QueryStage::OcclusionTest);
    profiling::scope!("test occlusion");
    let camera_axes = view_params.camera_axes();
    let mut keep = scratch.alloc_bits(spheres.len(), false)?;
    for (index, sphere) in spheres.iter().enumerate() {
        let visible = within_range(camera_position, sphere, config.occlusion_near_threshold)
            || culler.test_bounds(sphere, &camera_axes);
        keep.set(index, visible);
    }

    let before = handles.len();
    compact(handles, spheres, |index| keep[index]);
    log::trace!("Occlusion culled {} of {} objects", before - handles.len(), before);
    Ok(())
}

// Flat output arrays under construction, allocated from the query's scratch scope
struct QueryGather<'s> {
    object_count: usize,
    matrices: ArenaVec<'s, Mat4>,
    bounds: ArenaVec<'s, BoundingSphere>,
    models: ArenaVec<'s, RenderModel>,
    lights: ArenaVec<'s, RenderLight>,
    lod_switches: ArenaVec<'s, LodSwitch>,
}

// A model change picked during gathering. Applied only once the query has been committed, so a
// failed build leaves objects and their model state as they were.
#[derive(Copy, Clone, Debug, PartialEq)]
struct LodSwitch {
    object: ObjectHandle,
    previous: Option<ModelId>,
    next: ModelId,
    shadow: bool,
}

fn apply_lod_switches<W: SceneWorld + ?Sized>(
    objects: &mut DenseSlotMap<ObjectHandle, SceneObject>,
    world: &mut W,
    lod_switches: &[LodSwitch],
) {
    for switch in lod_switches {
        let object = match objects.get_mut(switch.object) {
            Some(object) => object,
            None => continue,
        };

        if let Some(previous) = switch.previous {
            world.transfer_model_state(previous, switch.next);
        }
        if switch.shadow {
            object.set_current_shadow_model(switch.next);
        } else {
            object.set_current_model(switch.next);
        }
    }
}

impl<'s> QueryGather<'s> {
    fn new(
        scratch: &'s StackArena,
        object_capacity: usize,
    ) -> Result<Self, ArenaError> {
        Ok(QueryGather {
            object_count: 0,
            matrices: scratch.alloc_vec(object_capacity)?,
            bounds: scratch.alloc_vec(object_capacity)?,
            models: scratch.alloc_vec(object_capacity)?,
            lights: scratch.alloc_vec(0)?,
            lod_switches: scratch.alloc_vec(0)?,
        })
    }

    // Applies LOD (or shadow LOD) and emits one descriptor per renderable node. Models that are too
    // far away or have nothing to draw are skipped.
    #[allow(clippy::too_many_arguments)]
    fn push_model<W: SceneWorld + ?Sized>(
        &mut self,
        lod_schemes: &LodSchemeRegistry,
        handle: ObjectHandle,
        object: &SceneObject,
        sphere: &BoundingSphere,
        camera_position: Vec3,
        world: &W,
        shadow: bool,
    ) -> Result<(), ArenaError> {
        let current = if shadow {
            object.shadow_model()
        } else {
            object.model()
        };

        let model = match object.lod().copied() {
            Some(lod) => {
                let scheme = match lod_schemes.model_scheme(lod.scheme) {
                    Some(scheme) => scheme,
                    None => {
                        log::warn!("Object {:?} uses an unknown LOD scheme", handle);
                        return Ok(());
                    }
                };

                let tier = if shadow {
                    select_shadow_tier(scheme, camera_position, sphere)
                } else {
                    select_model_tier(scheme, camera_position, sphere)
                };
                let tier = match tier {
                    Some(tier) => tier,
                    None => return Ok(()),
                };

                let next = lod.model(tier);
                if current != Some(next) {
                    self.lod_switches.push(LodSwitch {
                        object: handle,
                        previous: current,
                        next,
                        shadow,
                    })?;
                }
                next
            }
            None => match current {
                Some(model) => model,
                None => return Ok(()),
            },
        };

        let nodes = match world.renderable_nodes(model) {
            Some(nodes) if !nodes.is_empty() => nodes,
            _ => {
                log::trace!("Model {:?} of {:?} has nothing to draw", model, handle);
                return Ok(());
            }
        };

        let bounds_index = self.bounds.len() as u32;
        self.bounds.push(*sphere)?;

        for node in nodes {
            let matrix_index = self.matrices.len() as u32;
            self.matrices.push(node.world_transform)?;
            self.models.push(RenderModel {
                object: handle,
                model,
                node_index: node.node_index,
                pose: node.pose,
                material: node.material,
                sun_shadows: object.casts_shadows(),
                matrix_index,
                bounds_index,
            })?;
        }

        self.object_count += 1;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn push_light<W: SceneWorld + ?Sized>(
        &mut self,
        lod_schemes: &LodSchemeRegistry,
        config: &VisibilityConfig,
        handle: ObjectHandle,
        object: &SceneObject,
        sphere: &BoundingSphere,
        camera_position: Vec3,
        world: &W,
    ) -> Result<(), ArenaError> {
        let light = match object.light() {
            Some(light) => *light,
            None => return Ok(()),
        };

        let scheme = light
            .scheme
            .or_else(|| lod_schemes.default_light_scheme())
            .and_then(|scheme| lod_schemes.light_scheme(scheme));
        let scheme = match scheme {
            Some(scheme) => scheme,
            None => {
                log::warn!("Light {:?} has no LOD scheme", handle);
                return Ok(());
            }
        };

        let intensity =
            match light_intensity(scheme, camera_position, sphere, config.light_fade_range) {
                Some(intensity) => intensity,
                None => return Ok(()),
            };

        let transform = object
            .transform()
            .and_then(|transform| world.world_transform(transform))
            .unwrap_or_else(|| Mat4::from_translation(sphere.position));

        let bounds_index = self.bounds.len() as u32;
        self.bounds.push(*sphere)?;
        let matrix_index = self.matrices.len() as u32;
        self.matrices.push(transform)?;

        self.lights.push(RenderLight {
            object: handle,
            light: light.light,
            matrix_index,
            bounds_index,
            intensity,
        })?;

        self.object_count += 1;
        Ok(())
    }

    fn finish(self) -> (GatheredQuery, Vec<LodSwitch>) {
        let gathered = GatheredQuery {
            object_count: self.object_count,
            matrices: self.matrices.into_vec(),
            bounds: self.bounds.into_vec(),
            models: self.models.into_vec(),
            lights: self.lights.into_vec(),
        };
        (gathered, self.lod_switches.into_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lod::LodModel;
    use crate::test_support::TestWorld;

    struct LodFixture {
        schemes: LodSchemeRegistry,
        world: TestWorld,
        objects: DenseSlotMap<ObjectHandle, SceneObject>,
        object: ObjectHandle,
        high: ModelId,
        medium: ModelId,
    }

    impl LodFixture {
        fn new() -> Self {
            let schemes = LodSchemeRegistry::default();
            let mut world = TestWorld::default();
            let high = world.add_model(1, Mat4::IDENTITY);
            let medium = world.add_model(1, Mat4::IDENTITY);
            let scheme = schemes.default_model_scheme().unwrap();

            let mut objects = DenseSlotMap::with_key();
            let object = objects.insert(
                SceneObject::new("tree")
                    .with_object_type(ObjectType::Model)
                    .with_lod_model(LodModel::new(scheme, high, Some(medium), None)),
            );

            LodFixture {
                schemes,
                world,
                objects,
                object,
                high,
                medium,
            }
        }

        fn push(
            &self,
            gather: &mut QueryGather,
        ) -> Result<(), ArenaError> {
            // 60 units from the camera with radius 1 is in the medium band
            let sphere = BoundingSphere::new(Vec3::new(0., 0., 60.), 1.);
            gather.push_model(
                &self.schemes,
                self.object,
                &self.objects[self.object],
                &sphere,
                Vec3::ZERO,
                &self.world,
                false,
            )
        }
    }

    #[test]
    fn test_lod_switch_applies_after_gather() {
        let mut fixture = LodFixture::new();
        let arena = StackArena::new(4096);
        let mut gather = QueryGather::new(&arena, 1).unwrap();
        fixture.push(&mut gather).unwrap();

        assert_eq!(fixture.objects[fixture.object].model(), Some(fixture.high));
        assert!(fixture.world.transfers.is_empty());

        let (gathered, lod_switches) = gather.finish();
        assert_eq!(gathered.models[0].model, fixture.medium);

        apply_lod_switches(&mut fixture.objects, &mut fixture.world, &lod_switches);
        assert_eq!(fixture.objects[fixture.object].model(), Some(fixture.medium));
        assert_eq!(fixture.world.transfers, vec![(fixture.high, fixture.medium)]);
    }

    #[test]
    fn test_failed_gather_keeps_current_model() {
        let fixture = LodFixture::new();

        // Room for the recorded switch at most, never for the bounds as well
        let arena = StackArena::new(160);
        let mut gather = QueryGather::new(&arena, 0).unwrap();
        assert!(fixture.push(&mut gather).is_err());

        assert_eq!(fixture.objects[fixture.object].model(), Some(fixture.high));
        assert!(fixture.world.transfers.is_empty());
    }
}
