use crate::geometry::{BoundingSphere, WorldBounds};
use crate::{
    BoundsId, BoundsProvider, ModelId, ModelProvider, PolygonSoup, RenderableNode, TransformId,
};
use glam::Mat4;
use rustc_hash::FxHashMap;

/// In-memory stand-in for the component storage a game would provide
#[derive(Default)]
pub struct TestWorld {
    next_id: u64,
    bounds: FxHashMap<BoundsId, WorldBounds>,
    transforms: FxHashMap<TransformId, Mat4>,
    nodes: FxHashMap<ModelId, Vec<RenderableNode>>,
    occluders: FxHashMap<ModelId, PolygonSoup>,
    pub transfers: Vec<(ModelId, ModelId)>,
}

impl TestWorld {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_bounds(
        &mut self,
        sphere: BoundingSphere,
    ) -> BoundsId {
        let id = BoundsId(self.allocate_id());
        self.bounds.insert(id, WorldBounds::from_sphere(sphere));
        id
    }

    pub fn set_bounds(
        &mut self,
        id: BoundsId,
        sphere: BoundingSphere,
    ) {
        self.bounds.insert(id, WorldBounds::from_sphere(sphere));
    }

    pub fn add_transform(
        &mut self,
        transform: Mat4,
    ) -> TransformId {
        let id = TransformId(self.allocate_id());
        self.transforms.insert(id, transform);
        id
    }

    /// A model made of `node_count` drawable nodes, all placed at `transform`
    pub fn add_model(
        &mut self,
        node_count: u32,
        transform: Mat4,
    ) -> ModelId {
        let id = ModelId(self.allocate_id());
        let nodes = (0..node_count)
            .map(|node_index| RenderableNode {
                node_index,
                world_transform: transform,
                pose: None,
                material: None,
            })
            .collect();
        self.nodes.insert(id, nodes);
        id
    }

    pub fn set_occluder(
        &mut self,
        model: ModelId,
        mesh: PolygonSoup,
    ) {
        self.occluders.insert(model, mesh);
    }
}

impl BoundsProvider for TestWorld {
    fn world_bounds(
        &self,
        bounds: BoundsId,
    ) -> Option<WorldBounds> {
        self.bounds.get(&bounds).copied()
    }

    fn world_transform(
        &self,
        transform: TransformId,
    ) -> Option<Mat4> {
        self.transforms.get(&transform).copied()
    }
}

impl ModelProvider for TestWorld {
    fn renderable_nodes(
        &self,
        model: ModelId,
    ) -> Option<&[RenderableNode]> {
        self.nodes.get(&model).map(|nodes| &nodes[..])
    }

    fn occluder_mesh(
        &self,
        model: ModelId,
    ) -> Option<&PolygonSoup> {
        self.occluders.get(&model)
    }

    fn transfer_model_state(
        &mut self,
        from: ModelId,
        to: ModelId,
    ) {
        self.transfers.push((from, to));
    }
}
