use crate::geometry::BoundingSphere;
use crate::scene::ObjectHandle;
use crate::{LightId, MaterialId, ModelId, PoseId};
use glam::Mat4;
use scenery_base::{ArenaError, ArenaMark, ArenaVec, StackArena};

/// One drawable node of a gathered model
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderModel {
    pub object: ObjectHandle,
    pub model: ModelId,
    pub node_index: u32,
    pub pose: Option<PoseId>,
    pub material: Option<MaterialId>,
    pub sun_shadows: bool,
    /// Index into `RenderQuery::matrices` of the same query
    pub matrix_index: u32,
    /// Index into `RenderQuery::bounds` of the same query
    pub bounds_index: u32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderLight {
    pub object: ObjectHandle,
    pub light: LightId,
    pub matrix_index: u32,
    pub bounds_index: u32,
    /// 1.0 inside the light's visible range, fading to 0.0 past it
    pub intensity: f32,
}

/// Output of a query build before it is moved into the caller's arena
#[derive(Default)]
pub(crate) struct GatheredQuery {
    pub object_count: usize,
    pub matrices: Vec<Mat4>,
    pub bounds: Vec<BoundingSphere>,
    pub models: Vec<RenderModel>,
    pub lights: Vec<RenderLight>,
}

/// Flat per-frame description of what to draw. Every array lives in the arena the query was built
/// with, so the query cannot outlive it.
pub struct RenderQuery<'a> {
    arena: &'a StackArena,
    start: ArenaMark,
    end: ArenaMark,
    object_count: usize,
    matrices: ArenaVec<'a, Mat4>,
    bounds: ArenaVec<'a, BoundingSphere>,
    models: ArenaVec<'a, RenderModel>,
    lights: ArenaVec<'a, RenderLight>,
}

impl<'a> RenderQuery<'a> {
    /// Copies the gathered arrays into `arena`. Nothing stays charged on failure.
    pub(crate) fn commit(
        arena: &'a StackArena,
        gathered: GatheredQuery,
    ) -> Result<Self, ArenaError> {
        let start = arena.mark();
        match Self::commit_arrays(arena, start, gathered) {
            Ok(query) => Ok(query),
            Err(e) => {
                arena.rollback(start);
                Err(e)
            }
        }
    }

    fn commit_arrays(
        arena: &'a StackArena,
        start: ArenaMark,
        gathered: GatheredQuery,
    ) -> Result<Self, ArenaError> {
        let matrices = arena.commit_vec(gathered.matrices)?;
        let bounds = arena.commit_vec(gathered.bounds)?;
        let models = arena.commit_vec(gathered.models)?;
        let lights = arena.commit_vec(gathered.lights)?;

        Ok(RenderQuery {
            arena,
            start,
            end: arena.mark(),
            object_count: gathered.object_count,
            matrices,
            bounds,
            models,
            lights,
        })
    }

    pub(crate) fn empty(arena: &'a StackArena) -> Result<Self, ArenaError> {
        Self::commit(arena, GatheredQuery::default())
    }

    /// Number of objects that contributed at least one model or light
    pub fn object_count(&self) -> usize {
        self.object_count
    }

    pub fn matrices(&self) -> &[Mat4] {
        &self.matrices
    }

    pub fn bounds(&self) -> &[BoundingSphere] {
        &self.bounds
    }

    pub fn models(&self) -> &[RenderModel] {
        &self.models
    }

    pub fn lights(&self) -> &[RenderLight] {
        &self.lights
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty() && self.lights.is_empty()
    }
}

/// Releases the query's arena block. Queries must be destroyed in reverse order of creation; one
/// that is not on top of the arena stays allocated until the arena is reset.
pub fn destroy_query(query: RenderQuery) {
    let arena = query.arena;
    if arena.mark() == query.end {
        arena.rollback(query.start);
    } else {
        log::warn!(
            "Render query destroyed out of order ({} bytes), left for arena reset",
            query.end.offset() - query.start.offset()
        );
    }
}
