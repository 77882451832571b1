mod scene;
pub use scene::*;

mod scene_object;
pub use scene_object::*;

mod scene_registry;
pub use scene_registry::*;
