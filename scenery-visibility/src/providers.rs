use crate::geometry::WorldBounds;
use crate::PolygonSoup;
use glam::Mat4;

macro_rules! declare_component_id {
    ($struct_name:ident) => {
        /// Opaque id of a component owned outside of the visibility pipeline
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $struct_name(pub u64);

        impl From<u64> for $struct_name {
            fn from(id: u64) -> Self {
                $struct_name(id)
            }
        }
    };
}

declare_component_id!(BoundsId);
declare_component_id!(TransformId);
declare_component_id!(ModelId);
declare_component_id!(LightId);
declare_component_id!(PoseId);
declare_component_id!(MaterialId);

/// One drawable part of a model
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderableNode {
    pub node_index: u32,
    pub world_transform: Mat4,
    pub pose: Option<PoseId>,
    pub material: Option<MaterialId>,
}

pub trait BoundsProvider {
    fn world_bounds(
        &self,
        bounds: BoundsId,
    ) -> Option<WorldBounds>;

    fn world_transform(
        &self,
        transform: TransformId,
    ) -> Option<Mat4>;
}

pub trait ModelProvider {
    /// `None` when the model is unknown or not loaded yet
    fn renderable_nodes(
        &self,
        model: ModelId,
    ) -> Option<&[RenderableNode]>;

    fn occluder_mesh(
        &self,
        model: ModelId,
    ) -> Option<&PolygonSoup>;

    /// Copies node transforms and skinned pose from `from` into `to` so switching LOD tier does not
    /// make animation pop.
    fn transfer_model_state(
        &mut self,
        from: ModelId,
        to: ModelId,
    );
}

/// Everything a query needs from the outside world
pub trait SceneWorld: BoundsProvider + ModelProvider {}

impl<T: BoundsProvider + ModelProvider> SceneWorld for T {}
