use crate::lod::{LodModel, LodSchemeId, LodTier};
use crate::scene::SceneHandle;
use crate::{BoundsId, LightId, ModelId, TransformId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Model,
    Light,
    Camera,
    Trigger,
    Other,
}

bitflags::bitflags! {
    #[derive(Default)]
    pub struct ObjectFlags: u32 {
        /// Never moves after creation
        const STATIC = 1 << 0;
        /// Never gathered as a shadow caster by cascade queries
        const EXCLUDE_SHADOWS = 1 << 1;
    }
}

/// Where an object lives. Global objects are not in any grid and are part of every query.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectOwner {
    Global,
    Scene(SceneHandle),
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LightComponent {
    pub light: LightId,
    /// `None` uses the "default" light scheme
    pub scheme: Option<LodSchemeId>,
}

/// An object placed in a scene. Components are ids into data owned by the providers.
#[derive(Clone, Debug)]
pub struct SceneObject {
    name: String,
    object_type: ObjectType,
    flags: ObjectFlags,
    bounds: Option<BoundsId>,
    transform: Option<TransformId>,
    model: Option<ModelId>,
    shadow_model: Option<ModelId>,
    light: Option<LightComponent>,
    lod: Option<LodModel>,
    pub(crate) owner: ObjectOwner,
    pub(crate) index: usize,
}

impl SceneObject {
    pub fn new(name: &str) -> Self {
        SceneObject {
            name: name.to_string(),
            object_type: ObjectType::Other,
            flags: ObjectFlags::empty(),
            bounds: None,
            transform: None,
            model: None,
            shadow_model: None,
            light: None,
            lod: None,
            owner: ObjectOwner::Global,
            index: 0,
        }
    }

    pub fn with_object_type(
        mut self,
        object_type: ObjectType,
    ) -> Self {
        self.object_type = object_type;
        self
    }

    pub fn with_flags(
        mut self,
        flags: ObjectFlags,
    ) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_bounds(
        mut self,
        bounds: BoundsId,
    ) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_transform(
        mut self,
        transform: TransformId,
    ) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_model(
        mut self,
        model: ModelId,
    ) -> Self {
        self.set_model(Some(model));
        self
    }

    /// The highest detail model of `lod` becomes the current model until the first query picks
    /// a tier.
    pub fn with_lod_model(
        mut self,
        lod: LodModel,
    ) -> Self {
        self.set_model(Some(lod.model(LodTier::High)));
        self.lod = Some(lod);
        self
    }

    pub fn with_light(
        mut self,
        light: LightId,
        scheme: Option<LodSchemeId>,
    ) -> Self {
        self.light = Some(LightComponent { light, scheme });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn flags(&self) -> ObjectFlags {
        self.flags
    }

    pub fn set_flags(
        &mut self,
        flags: ObjectFlags,
    ) {
        self.flags = flags;
    }

    pub fn casts_shadows(&self) -> bool {
        !self.flags.contains(ObjectFlags::EXCLUDE_SHADOWS)
    }

    pub fn bounds(&self) -> Option<BoundsId> {
        self.bounds
    }

    pub fn set_bounds(
        &mut self,
        bounds: Option<BoundsId>,
    ) {
        self.bounds = bounds;
    }

    pub fn transform(&self) -> Option<TransformId> {
        self.transform
    }

    pub fn set_transform(
        &mut self,
        transform: Option<TransformId>,
    ) {
        self.transform = transform;
    }

    /// Model drawn by frustum queries, swapped by LOD selection
    pub fn model(&self) -> Option<ModelId> {
        self.model
    }

    /// Model drawn into shadow maps, swapped by shadow LOD selection
    pub fn shadow_model(&self) -> Option<ModelId> {
        self.shadow_model
    }

    pub fn set_model(
        &mut self,
        model: Option<ModelId>,
    ) {
        self.model = model;
        self.shadow_model = model;
    }

    pub(crate) fn set_current_model(
        &mut self,
        model: ModelId,
    ) {
        self.model = Some(model);
    }

    pub(crate) fn set_current_shadow_model(
        &mut self,
        model: ModelId,
    ) {
        self.shadow_model = Some(model);
    }

    pub fn light(&self) -> Option<&LightComponent> {
        self.light.as_ref()
    }

    pub fn lod(&self) -> Option<&LodModel> {
        self.lod.as_ref()
    }

    pub fn owner(&self) -> ObjectOwner {
        self.owner
    }

    /// Position in the owner's object list. Changes when another object is removed.
    pub fn index(&self) -> usize {
        self.index
    }
}
