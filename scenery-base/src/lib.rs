//! Lowest level crate of `scenery`. Includes the per-frame stack arena and some basic memory utilities

pub mod memory;

mod stack_arena;
pub use stack_arena::ArenaError;
pub use stack_arena::ArenaMark;
pub use stack_arena::ArenaScope;
pub use stack_arena::ArenaVec;
pub use stack_arena::StackArena;
pub use stack_arena::ARENA_ALIGNMENT;
