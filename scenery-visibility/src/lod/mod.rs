mod lod_scheme;
pub use lod_scheme::*;

mod lod_selection;
pub use lod_selection::*;
