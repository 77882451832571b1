use crate::scene::ObjectHandle;
use crate::{SceneResult, SpatialGrid};
use crossbeam_channel::{unbounded, Receiver, Sender};
use glam::Vec3;

/// Changes that must reach the grid before the next cull. Any system holding a sender may queue
/// them; they are applied when the next query for the scene is built.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpatialUpdate {
    BoundsChanged(ObjectHandle),
}

pub struct Scene {
    name: String,
    pub(crate) objects: Vec<ObjectHandle>,
    pub(crate) grid: SpatialGrid,
    physics_scene: Option<u64>,
    sender: Sender<SpatialUpdate>,
    receiver: Receiver<SpatialUpdate>,
}

impl Scene {
    pub(crate) fn new(
        name: &str,
        cell_size: f32,
        world_min: Vec3,
        world_max: Vec3,
    ) -> SceneResult<Self> {
        let (sender, receiver) = unbounded();
        Ok(Scene {
            name: name.to_string(),
            objects: Vec::new(),
            grid: SpatialGrid::new(cell_size, world_min, world_max)?,
            physics_scene: None,
            sender,
            receiver,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn objects(&self) -> &[ObjectHandle] {
        &self.objects
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn physics_scene(&self) -> Option<u64> {
        self.physics_scene
    }

    pub(crate) fn set_physics_scene(
        &mut self,
        physics_scene: Option<u64>,
    ) {
        self.physics_scene = physics_scene;
    }

    pub fn new_spatial_update_sender(&self) -> Sender<SpatialUpdate> {
        self.sender.clone()
    }

    pub(crate) fn queue_spatial_update(
        &self,
        update: SpatialUpdate,
    ) {
        // The scene owns the receiver, so this can only fail while the scene is being dropped
        if self.sender.send(update).is_err() {
            log::warn!("Spatial update {:?} dropped", update);
        }
    }

    pub(crate) fn receiver(&self) -> &Receiver<SpatialUpdate> {
        &self.receiver
    }

    pub fn has_pending_spatial_updates(&self) -> bool {
        !self.receiver.is_empty()
    }
}
