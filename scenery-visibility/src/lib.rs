//! Per-frame visibility for scenes made of thousands of placed objects: a uniform XZ grid as
//! broadphase, exact sphere/frustum culling, software occlusion, a light-direction sweep for shadow
//! cascades and distance LOD, assembled into flat render queries allocated from a `StackArena`.

mod error;
mod frustum_culling;
mod polygon_soup;
mod projection;
mod providers;
mod spatial_grid;
mod sweep_culling;
mod view_frustum;
mod visibility_config;

pub mod geometry;
pub mod lod;
pub mod occlusion;
pub mod render_query;
pub mod scene;

#[cfg(test)]
mod test_support;

pub use error::*;
pub use frustum_culling::*;
pub use polygon_soup::*;
pub use projection::*;
pub use providers::*;
pub use spatial_grid::*;
pub use sweep_culling::*;
pub use view_frustum::*;
pub use visibility_config::*;

pub use scene::{ObjectHandle, SceneHandle};
